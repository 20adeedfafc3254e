//! Fetch any supported source through the shared fetcher

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use sleuth_fetch::{FetchOverrides, LogFetcher};

use super::ToolTrait;

const DEFAULT_MAX_CHARS: usize = 20_000;

pub struct FetchSourceTool {
    fetcher: Arc<LogFetcher>,
    max_chars: usize,
}

impl FetchSourceTool {
    pub fn new(fetcher: Arc<LogFetcher>) -> Self {
        Self {
            fetcher,
            max_chars: DEFAULT_MAX_CHARS,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

#[derive(Deserialize)]
struct FetchSourceArgs {
    source: String,
    #[serde(default)]
    query: Option<String>,
    #[serde(default)]
    headers: BTreeMap<String, String>,
}

#[async_trait]
impl ToolTrait for FetchSourceTool {
    fn name(&self) -> &str {
        "fetch_source"
    }

    fn description(&self) -> &str {
        "Fetch a log or data source (http, https, ftp, file, database DSN) and return its normalized content."
    }

    fn parameters(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "source": { "type": "string", "description": "URL or DSN to fetch" },
                "query": { "type": "string", "description": "Query for database sources" },
                "headers": {
                    "type": "object",
                    "additionalProperties": { "type": "string" },
                    "description": "Extra request headers"
                }
            },
            "required": ["source"]
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
    ) -> Result<String, Box<dyn std::error::Error + Send + Sync>> {
        let args: FetchSourceArgs = serde_json::from_value(args)?;
        debug!("◆ TOOL FETCH: {}", args.source);

        let overrides = FetchOverrides {
            headers: args.headers,
            query: args.query,
        };
        let result = self.fetcher.fetch(&args.source, overrides).await?;

        let text = result.text();
        let truncated = text.chars().count() > self.max_chars;
        let content: String = text.chars().take(self.max_chars).collect();
        let signal: Vec<_> = result
            .parsed
            .signal_lines()
            .into_iter()
            .map(|(number, line)| json!({ "line": number, "text": line }))
            .collect();

        let out = json!({
            "source": result.source,
            "scheme": result.scheme.to_string(),
            "content_type": result.content_type,
            "size": result.size,
            "attempts": result.attempts,
            "summary": result.parsed.summary.headline(),
            "signal_lines": signal,
            "truncated": truncated,
            "content": content,
        });
        Ok(serde_json::to_string_pretty(&out)?)
    }
}
