//! Tests for the log inspection and fetch tools

use serde_json::{json, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

use sleuth_agent::tools::{
    register_default_tools, AnalyzeLogsTool, FetchSourceTool, SearchLogsTool, ToolRegistry,
    ToolTrait,
};
use sleuth_config::FetchConfig;
use sleuth_fetch::LogFetcher;

fn setup(content: &str) -> (TempDir, HashMap<String, PathBuf>) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("application.log");
    std::fs::write(&path, content).unwrap();
    let paths = HashMap::from([
        ("application".to_string(), path),
        ("error".to_string(), dir.path().join("absent.log")),
    ]);
    (dir, paths)
}

fn parse(out: &str) -> Value {
    serde_json::from_str(out).unwrap()
}

/// Test case-insensitive keyword search keeping the latest matches
#[tokio::test]
async fn test_search_logs_recent_matches() {
    let content = "\
INFO login ok user=alice
ERROR Login failed user=bob
INFO checkout ok
WARN login slow user=carol
";
    let (_dir, paths) = setup(content);
    let tool = SearchLogsTool::new(paths);

    let out = tool
        .execute(json!({"keyword": "LOGIN", "log_type": "application", "lines": 2}))
        .await
        .unwrap();
    let out = parse(&out);

    assert_eq!(out["total_matches"], 3);
    assert_eq!(out["match_count"], 2);
    assert_eq!(
        out["matches"],
        json!(["ERROR Login failed user=bob", "WARN login slow user=carol"])
    );
}

/// Test that the default line count applies
#[tokio::test]
async fn test_search_logs_default_lines() {
    let content: String = (0..80).map(|i| format!("line {} timeout\n", i)).collect();
    let (_dir, paths) = setup(&content);
    let tool = SearchLogsTool::new(paths);

    let out = tool
        .execute(json!({"keyword": "timeout", "log_type": "application"}))
        .await
        .unwrap();
    let out = parse(&out);

    assert_eq!(out["match_count"], 50);
    assert_eq!(out["matches"][0], "line 30 timeout");
}

/// Test unknown, missing and malformed inputs
#[tokio::test]
async fn test_search_logs_errors() {
    let (_dir, paths) = setup("INFO ok\n");
    let tool = SearchLogsTool::new(paths);

    let err = tool
        .execute(json!({"keyword": "x", "log_type": "kernel"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("UNKNOWN LOG TYPE"));

    let err = tool
        .execute(json!({"keyword": "x", "log_type": "error"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("LOG FILE NOT FOUND"));

    assert!(tool.execute(json!({"keyword": "x"})).await.is_err());
    assert!(tool
        .execute(json!({"keyword": "  ", "log_type": "application"}))
        .await
        .is_err());
}

/// Test error overview over the tail of a log
#[tokio::test]
async fn test_analyze_logs() {
    let mut content = String::new();
    for i in 0..1200 {
        if i % 100 == 0 {
            content.push_str(&format!("ERROR job {} failed\n", i));
        } else {
            content.push_str(&format!("INFO job {} ok\n", i));
        }
    }
    content.push_str("java.lang.IllegalStateException: closed\n");

    let (_dir, paths) = setup(&content);
    let tool = AnalyzeLogsTool::new(paths);

    let out = tool
        .execute(json!({"log_type": "application"}))
        .await
        .unwrap();
    let out = parse(&out);

    // Tail keeps jobs 201..=1199 plus the exception
    assert_eq!(out["total_lines"], 1000);
    assert_eq!(out["error_count"], 10);
    let recent = out["recent_errors"].as_array().unwrap();
    assert_eq!(recent.len(), 10);
    assert_eq!(recent[0], "ERROR job 300 failed");
    assert_eq!(recent[9], "java.lang.IllegalStateException: closed");
}

/// Test that the fetch tool returns normalized content and signal lines
#[tokio::test]
async fn test_fetch_source_tool() {
    let (dir, _) = setup("INFO boot\nERROR disk full\n");
    let source = format!("file://{}", dir.path().join("application.log").display());
    let fetcher = Arc::new(LogFetcher::new(FetchConfig::default()).unwrap());
    let tool = FetchSourceTool::new(fetcher).with_max_chars(8);

    let out = tool.execute(json!({"source": source})).await.unwrap();
    let out = parse(&out);

    assert_eq!(out["content_type"], "text");
    assert_eq!(out["scheme"], "file");
    assert_eq!(out["attempts"], 1);
    assert_eq!(out["truncated"], true);
    assert_eq!(out["content"], "INFO boo");
    assert_eq!(out["signal_lines"], json!([{"line": 2, "text": "ERROR disk full"}]));
}

/// Test that fetch failures surface as tool errors
#[tokio::test]
async fn test_fetch_source_tool_failure() {
    let fetcher = Arc::new(LogFetcher::new(FetchConfig::default()).unwrap());
    let tool = FetchSourceTool::new(fetcher);

    let err = tool
        .execute(json!({"source": "gopher://example.com/log"}))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("UNSUPPORTED SCHEME"));
}

/// Test that only the trailing slice of a large log is loaded
#[tokio::test]
async fn test_large_log_reads_bounded_tail() {
    let content: String = (0..500)
        .map(|i| format!("ERROR job {:03} failed\n", i))
        .collect();
    let (_dir, paths) = setup(&content);

    // Each line is 21 bytes, so 100 bytes holds the last 4 whole lines
    let analyze = AnalyzeLogsTool::new(paths.clone()).with_max_bytes(100);
    let out = parse(
        &analyze
            .execute(json!({"log_type": "application"}))
            .await
            .unwrap(),
    );
    assert_eq!(out["truncated"], true);
    assert_eq!(out["total_lines"], 4);
    assert_eq!(out["recent_errors"][0], "ERROR job 496 failed");
    assert_eq!(out["recent_errors"][3], "ERROR job 499 failed");

    let search = SearchLogsTool::new(paths).with_max_bytes(100);
    let out = parse(
        &search
            .execute(json!({"keyword": "job 0", "log_type": "application"}))
            .await
            .unwrap(),
    );
    assert_eq!(out["truncated"], true);
    assert_eq!(out["total_matches"], 0);
}

/// Test that the default tools inherit the fetch size cap
#[tokio::test]
async fn test_default_tools_use_fetch_cap() {
    let content: String = (0..100).map(|i| format!("WARN tick {:03}\n", i)).collect();
    let (_dir, paths) = setup(&content);
    let config = FetchConfig {
        max_size: 64,
        ..FetchConfig::default()
    };
    let fetcher = Arc::new(LogFetcher::new(config).unwrap());

    let mut registry = ToolRegistry::new();
    register_default_tools(&mut registry, fetcher, paths);
    let out = registry
        .execute("search_logs", json!({"keyword": "tick", "log_type": "application"}))
        .await
        .unwrap();
    let out = parse(&out);

    assert_eq!(out["truncated"], true);
    assert!(out["total_matches"].as_u64().unwrap() <= 4);
    assert_eq!(out["matches"].as_array().unwrap().last().unwrap(), "WARN tick 099");
}
