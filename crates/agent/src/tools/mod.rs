//! Diagnostic tools

pub mod fetch;
pub mod logs;
pub mod system;

pub use fetch::FetchSourceTool;
pub use logs::{AnalyzeLogsTool, SearchLogsTool};
pub use system::SystemMetricsTool;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use sleuth_fetch::LogFetcher;

use crate::{AgentError, Result};

type BoxedTool = Box<dyn ToolTrait + Send + Sync>;

#[async_trait]
pub trait ToolTrait: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters(&self) -> Value;
    async fn execute(
        &self,
        args: Value,
    ) -> std::result::Result<String, Box<dyn std::error::Error + Send + Sync>>;
}

/// Name, description and JSON schema of a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn of(tool: &dyn ToolTrait) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            parameters: tool.parameters(),
        }
    }
}

/// Typed tool registry
pub struct ToolRegistry {
    tools: HashMap<String, BoxedTool>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: ToolTrait + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Box::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<&(dyn ToolTrait + Send + Sync)> {
        self.tools.get(name).map(|t| t.as_ref())
    }

    pub fn has(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Definitions sorted by name
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|t| ToolDefinition::of(t.as_ref()))
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;
        debug!("◆ RUNNING TOOL {}", name);
        tool.execute(args)
            .await
            .map_err(|e| AgentError::ToolExecution(format!("{}: {}", name, e)))
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Register the built-in diagnostic tools
pub fn register_default_tools(
    registry: &mut ToolRegistry,
    fetcher: Arc<LogFetcher>,
    log_paths: HashMap<String, PathBuf>,
) {
    let max_bytes = fetcher.config().max_size;
    registry.register(FetchSourceTool::new(fetcher));
    registry.register(SearchLogsTool::new(log_paths.clone()).with_max_bytes(max_bytes));
    registry.register(AnalyzeLogsTool::new(log_paths).with_max_bytes(max_bytes));
    registry.register(SystemMetricsTool::new());
}
