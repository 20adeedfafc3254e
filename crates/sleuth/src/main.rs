//! Sleuth - fetch and triage the logs an incident report points at

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{
    fetch_command, init_command, links_command, scan_command, status_command, FetchArgs,
};

/// Sleuth - log and data source triage
#[derive(Parser)]
#[command(name = "sleuth")]
#[command(about = "◆ Fetch and triage the logs behind an incident")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Config file (defaults to ~/.sleuth/config.json)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize config
    Init,
    /// Fetch one source and show its normalized content
    Fetch {
        /// URL, DSN or file:// path
        source: String,
        /// Query to run against a database source
        #[arg(short, long)]
        query: Option<String>,
        /// Extra request header, repeatable
        #[arg(short = 'H', long = "header", value_name = "NAME=VALUE", value_parser = parse_header)]
        headers: Vec<(String, String)>,
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Fetch every source mentioned in text and summarize the evidence
    Scan {
        /// Problem description (read from stdin when omitted)
        text: Option<String>,
        /// Print the digest as JSON
        #[arg(long)]
        json: bool,
    },
    /// List the sources mentioned in text without fetching them
    Links {
        /// Text to scan (read from stdin when omitted)
        text: Option<String>,
    },
    /// Show configuration status
    Status,
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("empty header name in '{}'", s));
    }
    Ok((name.to_string(), value.trim().to_string()))
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = if cli.verbose {
        EnvFilter::new(default_level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.unwrap_or_else(sleuth_config::config_path);

    match cli.command {
        Commands::Init => {
            if let Err(e) = init_command(&config_path).await {
                error!("Init failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Fetch {
            source,
            query,
            headers,
            json,
        } => {
            let args = FetchArgs {
                source,
                query,
                headers,
                json,
            };
            if let Err(e) = fetch_command(&config_path, args).await {
                error!("Fetch failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Scan { text, json } => {
            if let Err(e) = scan_command(&config_path, text, json).await {
                error!("Scan failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Links { text } => {
            if let Err(e) = links_command(text) {
                error!("Links failed: {:#}", e);
                std::process::exit(1);
            }
        }
        Commands::Status => {
            if let Err(e) = status_command(&config_path).await {
                error!("Status failed: {:#}", e);
                std::process::exit(1);
            }
        }
    }
}
