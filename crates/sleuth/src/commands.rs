//! Sleuth command implementations

use anyhow::{Context, Result};
use serde_json::json;
use std::io::Read;
use std::path::Path;
use tracing::info;

use sleuth_agent::FetchDigest;
use sleuth_config::Config;
use sleuth_fetch::{FetchOverrides, FetchResult, LogFetcher};
use sleuth_parser::extract_links;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━";

/// Options of the `fetch` command
pub struct FetchArgs {
    pub source: String,
    pub query: Option<String>,
    pub headers: Vec<(String, String)>,
    pub json: bool,
}

async fn load_config(path: &Path) -> Result<Config> {
    Config::load_from(path)
        .await
        .with_context(|| format!("Cannot load config from {}", path.display()))
}

async fn build_fetcher(path: &Path) -> Result<LogFetcher> {
    let config = load_config(path).await?;
    LogFetcher::new(config.fetch).context("Invalid fetch configuration")
}

/// Use the argument, or read everything from stdin
fn read_input(text: Option<String>) -> Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Cannot read stdin")?;
            Ok(buf)
        }
    }
}

/// Write a default config
pub async fn init_command(path: &Path) -> Result<()> {
    println!("◆ Initializing Sleuth...");
    println!("{}", RULE);

    let config = sleuth_config::init_at(path).await?;

    println!("Config:   {}", path.display());
    println!("Timeout:  {}s", config.fetch.timeout_secs);
    println!("Schemes:  {}", join(&config.fetch.allowed_schemes));
    println!("\n◆ Sleuth initialized");
    println!("\nNext steps:");
    println!("  1. Review allowed_schemes and blocked_hosts in the config");
    println!("  2. Fetch something: sleuth fetch file:///var/log/syslog");

    Ok(())
}

/// Fetch one source
pub async fn fetch_command(config_path: &Path, args: FetchArgs) -> Result<()> {
    let fetcher = build_fetcher(config_path).await?;

    let mut overrides = FetchOverrides::default();
    for (name, value) in args.headers {
        overrides = overrides.with_header(name, value);
    }
    if let Some(query) = args.query {
        overrides = overrides.with_query(query);
    }

    let result = fetcher
        .fetch(&args.source, overrides)
        .await
        .with_context(|| format!("Cannot fetch {}", args.source))?;
    info!("◆ Fetched {} bytes", result.size);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result_json(&result))?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn result_json(result: &FetchResult) -> serde_json::Value {
    json!({
        "source": result.source,
        "scheme": result.scheme.to_string(),
        "content_type": result.content_type,
        "declared_type": result.declared_type,
        "size": result.size,
        "attempts": result.attempts,
        "summary": result.parsed.summary,
        "notes": result.parsed.notes,
        "text": result.text(),
    })
}

fn print_result(result: &FetchResult) {
    println!("◆ {}", result.source);
    println!("{}", RULE);
    println!("Scheme:   {}", result.scheme);
    println!(
        "Type:     {}{}",
        result.content_type,
        result
            .declared_type
            .as_deref()
            .map(|d| format!(" (declared {})", d))
            .unwrap_or_default()
    );
    println!("Size:     {} bytes", result.size);
    println!("Attempts: {}", result.attempts);
    println!("Summary:  {}", result.parsed.summary.headline());
    for note in &result.parsed.notes {
        println!("Note:     {}", note);
    }

    let signal = result.parsed.signal_lines();
    if !signal.is_empty() {
        println!("\n◆ Signal lines");
        for (number, line) in signal {
            println!("  {:>5}: {}", number, line);
        }
    }

    println!("\n◆ Content");
    println!("{}", result.text());
}

/// Fetch everything mentioned in text and print a digest
pub async fn scan_command(config_path: &Path, text: Option<String>, json: bool) -> Result<()> {
    let text = read_input(text)?;
    let fetcher = build_fetcher(config_path).await?;

    let reports = fetcher.fetch_from_text(&text).await;
    let digest = FetchDigest::from_reports(&reports);

    if json {
        println!("{}", serde_json::to_string_pretty(&digest)?);
        return Ok(());
    }

    println!("◆ Evidence Digest");
    println!("{}", RULE);
    println!(
        "Sources:  {} ({} fetched, {} failed)",
        digest.total_sources, digest.successful, digest.failed
    );
    println!("Size:     {} bytes", digest.total_size);
    println!("Errors:   {}", digest.error_count);
    println!("Warnings: {}", digest.warning_count);

    if !digest.sources.is_empty() {
        println!("\n◆ Sources");
        for row in &digest.sources {
            match (&row.summary, &row.error) {
                (_, Some(error)) => println!("  ✗ {} [{}]: {}", row.url, row.kind, error),
                (Some(summary), None) => println!("  ✓ {} [{}]: {}", row.url, row.kind, summary),
                (None, None) => println!("  ✓ {} [{}]", row.url, row.kind),
            }
        }
    }
    if !digest.key_findings.is_empty() {
        println!("\n◆ Key findings");
        for finding in &digest.key_findings {
            println!("  {}", finding);
        }
    }
    if !digest.error_patterns.is_empty() {
        println!("\n◆ Error patterns");
        for pattern in &digest.error_patterns {
            println!("  {:<24} {}", pattern.pattern, pattern.count);
        }
    }
    if !digest.recommendations.is_empty() {
        println!("\n◆ Recommendations");
        for rec in &digest.recommendations {
            println!("  - {}", rec);
        }
    }

    Ok(())
}

/// List the sources found in text
pub fn links_command(text: Option<String>) -> Result<()> {
    let text = read_input(text)?;
    let links = extract_links(&text);

    if links.is_empty() {
        println!("No sources found");
        return Ok(());
    }
    for link in links {
        println!("{:<9} {}", link.kind.to_string(), link.url);
    }
    Ok(())
}

/// Show configuration status
pub async fn status_command(config_path: &Path) -> Result<()> {
    println!("◆ Sleuth Status");
    println!("{}", RULE);
    println!(
        "Config:     {} {}",
        config_path.display(),
        if config_path.exists() {
            "[OK]"
        } else {
            "[Missing, using defaults]"
        }
    );

    let config = load_config(config_path).await?;
    let fetch = &config.fetch;
    println!("Timeout:    {}s", fetch.timeout_secs);
    println!("Max size:   {} bytes", fetch.max_size);
    println!(
        "Attempts:   {} ({}s apart)",
        fetch.attempts(),
        fetch.retry_delay_secs
    );
    println!("Schemes:    {}", join(&fetch.allowed_schemes));
    println!("Blocked:    {}", join(&fetch.blocked_hosts));
    println!("Reasoning:  {}", config.agent.reasoning_mode);

    println!("\n◆ Named logs");
    for (name, path) in &config.agent.log_paths {
        let resolved = config.log_path(name).unwrap_or_else(|| path.into());
        println!(
            "  {:<12} {} {}",
            name,
            resolved.display(),
            if resolved.exists() { "[OK]" } else { "[Missing]" }
        );
    }

    Ok(())
}

fn join<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}
