//! Local log inspection over the configured named logs
//!
//! Files are read directly; nothing is handed to a shell.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::SeekFrom;
use std::path::PathBuf;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing::debug;

use sleuth_parser::LogAnnotator;

use super::ToolTrait;

const DEFAULT_SEARCH_LINES: usize = 50;
const ANALYZE_TAIL: usize = 1000;
const RECENT_ERRORS: usize = 10;

type ToolResult = Result<String, Box<dyn std::error::Error + Send + Sync>>;

/// Largest trailing slice of a log the tools will load
pub const DEFAULT_MAX_BYTES: usize = 10 * 1024 * 1024;

/// Read at most the last `max_bytes` of the named log
///
/// When the file is larger, the partial first line of the slice is dropped
/// and the second value is `true`.
async fn read_log(
    log_paths: &HashMap<String, PathBuf>,
    log_type: &str,
    max_bytes: usize,
) -> Result<(String, bool), Box<dyn std::error::Error + Send + Sync>> {
    let path = log_paths
        .get(log_type)
        .ok_or_else(|| format!("◆ UNKNOWN LOG TYPE: {}", log_type))?;
    let cannot_read = |e: std::io::Error| -> Box<dyn std::error::Error + Send + Sync> {
        if e.kind() == std::io::ErrorKind::NotFound {
            format!("◆ LOG FILE NOT FOUND: {}", path.display()).into()
        } else {
            format!("◆ CANNOT READ {}: {}", path.display(), e).into()
        }
    };

    let mut file = tokio::fs::File::open(path).await.map_err(cannot_read)?;
    let len = file.metadata().await.map_err(cannot_read)?.len();
    let cap = max_bytes as u64;
    let truncated = len > cap;
    if truncated {
        file.seek(SeekFrom::Start(len - cap))
            .await
            .map_err(cannot_read)?;
    }

    let mut bytes = Vec::with_capacity(len.min(cap) as usize);
    file.take(cap)
        .read_to_end(&mut bytes)
        .await
        .map_err(cannot_read)?;

    let mut content = String::from_utf8_lossy(&bytes).into_owned();
    if truncated {
        let start = content.find('\n').map(|i| i + 1).unwrap_or(content.len());
        content.drain(..start);
        debug!("◆ READ LAST {} OF {} BYTES FROM {}", cap, len, path.display());
    }
    Ok((content, truncated))
}

fn log_type_schema(log_paths: &HashMap<String, PathBuf>) -> serde_json::Value {
    let mut names: Vec<&String> = log_paths.keys().collect();
    names.sort();
    json!({ "type": "string", "enum": names, "description": "Named log to inspect" })
}

/// Keyword search over a named log
pub struct SearchLogsTool {
    log_paths: HashMap<String, PathBuf>,
    max_bytes: usize,
}

impl SearchLogsTool {
    pub fn new(log_paths: HashMap<String, PathBuf>) -> Self {
        Self {
            log_paths,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// Only search the last `max_bytes` of each log
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[derive(Deserialize)]
struct SearchLogsArgs {
    keyword: String,
    log_type: String,
    #[serde(default = "default_lines")]
    lines: usize,
}

fn default_lines() -> usize {
    DEFAULT_SEARCH_LINES
}

#[async_trait]
impl ToolTrait for SearchLogsTool {
    fn name(&self) -> &str {
        "search_logs"
    }

    fn description(&self) -> &str {
        "Search a named log for a keyword (case-insensitive) and return the most recent matches."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "keyword": { "type": "string", "description": "Text to look for" },
                "log_type": log_type_schema(&self.log_paths),
                "lines": { "type": "integer", "description": "Maximum matches to return", "default": DEFAULT_SEARCH_LINES }
            },
            "required": ["keyword", "log_type"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> ToolResult {
        let args: SearchLogsArgs = serde_json::from_value(args)?;
        if args.keyword.trim().is_empty() {
            return Err("◆ EMPTY KEYWORD".into());
        }
        debug!("◆ SEARCHING {} FOR '{}'", args.log_type, args.keyword);

        let (content, truncated) =
            read_log(&self.log_paths, &args.log_type, self.max_bytes).await?;
        let needle = args.keyword.to_lowercase();
        let matches: Vec<&str> = content
            .lines()
            .filter(|line| line.to_lowercase().contains(&needle))
            .collect();
        let recent = &matches[matches.len().saturating_sub(args.lines)..];

        let out = json!({
            "keyword": args.keyword,
            "log_type": args.log_type,
            "match_count": recent.len(),
            "total_matches": matches.len(),
            "matches": recent,
            "truncated": truncated,
        });
        Ok(serde_json::to_string_pretty(&out)?)
    }
}

/// Error overview of the tail of a named log
pub struct AnalyzeLogsTool {
    log_paths: HashMap<String, PathBuf>,
    annotator: LogAnnotator,
    max_bytes: usize,
}

impl AnalyzeLogsTool {
    pub fn new(log_paths: HashMap<String, PathBuf>) -> Self {
        Self {
            log_paths,
            annotator: LogAnnotator::new(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    /// Only analyze the last `max_bytes` of each log
    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }
}

#[derive(Deserialize)]
struct AnalyzeLogsArgs {
    log_type: String,
}

#[async_trait]
impl ToolTrait for AnalyzeLogsTool {
    fn name(&self) -> &str {
        "analyze_logs"
    }

    fn description(&self) -> &str {
        "Scan the last 1000 lines of a named log for errors and exceptions."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "log_type": log_type_schema(&self.log_paths)
            },
            "required": ["log_type"]
        })
    }

    async fn execute(&self, args: serde_json::Value) -> ToolResult {
        let args: AnalyzeLogsArgs = serde_json::from_value(args)?;
        debug!("◆ ANALYZING {}", args.log_type);

        let (content, truncated) =
            read_log(&self.log_paths, &args.log_type, self.max_bytes).await?;
        let lines: Vec<&str> = content.lines().collect();
        let tail = &lines[lines.len().saturating_sub(ANALYZE_TAIL)..];

        let errors: Vec<&str> = tail
            .iter()
            .enumerate()
            .filter_map(|(i, line)| {
                self.annotator
                    .annotate_line(i + 1, line)
                    .filter(|a| a.is_error())
                    .map(|_| line.trim())
            })
            .collect();
        let recent = &errors[errors.len().saturating_sub(RECENT_ERRORS)..];

        let out = json!({
            "log_type": args.log_type,
            "total_lines": tail.len(),
            "error_count": errors.len(),
            "recent_errors": recent,
            "truncated": truncated,
        });
        Ok(serde_json::to_string_pretty(&out)?)
    }
}
