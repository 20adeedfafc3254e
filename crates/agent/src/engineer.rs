//! The engineer agent: evidence in, advice out

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use sleuth_config::{expand_home, AgentSettings};
use sleuth_fetch::{LogFetcher, SourceReport};

use crate::collaborators::{Advice, KnowledgeHit, KnowledgeSource, Problem, Reasoner};
use crate::digest::FetchDigest;
use crate::tools::{register_default_tools, ToolRegistry, ToolTrait};
use crate::Result;

/// Earlier investigations handed to the reasoner as context
const CONTEXT_HISTORY: usize = 5;

/// Condensed record of a past investigation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub summary: String,
}

/// Full outcome of one investigation
#[derive(Debug)]
pub struct Investigation {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub query: String,
    pub reports: Vec<SourceReport>,
    pub digest: FetchDigest,
    pub knowledge: Vec<KnowledgeHit>,
    pub advice: Advice,
    /// Degraded steps that did not stop the investigation
    pub notes: Vec<String>,
}

pub struct EngineerAgent {
    fetcher: Arc<LogFetcher>,
    knowledge: Arc<dyn KnowledgeSource>,
    reasoner: Arc<dyn Reasoner>,
    settings: AgentSettings,
    tools: ToolRegistry,
    history: Mutex<VecDeque<HistoryEntry>>,
}

impl EngineerAgent {
    pub fn new(
        fetcher: Arc<LogFetcher>,
        knowledge: Arc<dyn KnowledgeSource>,
        reasoner: Arc<dyn Reasoner>,
        settings: AgentSettings,
    ) -> Self {
        let log_paths: HashMap<String, PathBuf> = settings
            .log_paths
            .iter()
            .map(|(name, path)| (name.clone(), expand_home(path)))
            .collect();

        let mut tools = ToolRegistry::new();
        register_default_tools(&mut tools, Arc::clone(&fetcher), log_paths);

        Self {
            fetcher,
            knowledge,
            reasoner,
            settings,
            tools,
            history: Mutex::new(VecDeque::new()),
        }
    }

    pub fn fetcher(&self) -> &LogFetcher {
        &self.fetcher
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Add a caller-supplied diagnostic tool
    pub fn register_tool<T: ToolTrait + 'static>(&mut self, tool: T) {
        info!("◆ TOOL REGISTERED: {}", tool.name());
        self.tools.register(tool);
    }

    pub async fn run_tool(&self, name: &str, args: Value) -> Result<String> {
        self.tools.execute(name, args).await
    }

    /// Teach the knowledge source something new
    ///
    /// Without metadata the entry is tagged `source: manual` with the
    /// current timestamp.
    pub async fn add_knowledge(
        &self,
        content: &str,
        metadata: Option<BTreeMap<String, String>>,
    ) -> Result<()> {
        let metadata = metadata.unwrap_or_else(|| {
            BTreeMap::from([
                ("source".to_string(), "manual".to_string()),
                ("timestamp".to_string(), Utc::now().to_rfc3339()),
            ])
        });
        self.knowledge.add(content, metadata).await?;
        info!("◆ KNOWLEDGE ADDED ({} chars)", content.len());
        Ok(())
    }

    /// Fetch everything the query mentions, consult the collaborators and
    /// record the outcome
    ///
    /// Failed fetches and a failed knowledge lookup are recorded and the
    /// investigation continues; only a reasoner failure aborts it.
    pub async fn investigate(&self, query: &str) -> Result<Investigation> {
        let id = Uuid::new_v4();
        info!("◆ INVESTIGATION {} STARTED", id);
        let mut notes = Vec::new();

        let reports = self.fetcher.fetch_from_text(query).await;
        let digest = FetchDigest::from_reports(&reports);
        if digest.has_failures() {
            notes.push(format!(
                "{} of {} sources could not be fetched",
                digest.failed, digest.total_sources
            ));
        }

        let knowledge = match self
            .knowledge
            .search(query, self.settings.knowledge_top_k)
            .await
        {
            Ok(hits) => hits,
            Err(e) => {
                warn!("◆ KNOWLEDGE LOOKUP FAILED: {}", e);
                notes.push(format!("knowledge lookup failed: {}", e));
                Vec::new()
            }
        };

        let problem = Problem {
            query: query.to_string(),
            mode: self.settings.reasoning_mode,
            digest: digest.clone(),
            knowledge: knowledge.clone(),
            history: self.recent_history(CONTEXT_HISTORY).await,
        };
        let advice = self.reasoner.analyze(problem).await?;

        let investigation = Investigation {
            id,
            timestamp: Utc::now(),
            query: query.to_string(),
            reports,
            digest,
            knowledge,
            advice,
            notes,
        };
        self.remember(&investigation).await;
        info!(
            "◆ INVESTIGATION {} COMPLETE: {} SOURCES, {} ERRORS",
            id, investigation.digest.total_sources, investigation.digest.error_count
        );
        Ok(investigation)
    }

    async fn remember(&self, investigation: &Investigation) {
        let mut history = self.history.lock().await;
        history.push_back(HistoryEntry {
            id: investigation.id,
            timestamp: investigation.timestamp,
            query: investigation.query.clone(),
            summary: investigation.advice.summary.clone(),
        });
        while history.len() > self.settings.history_limit {
            history.pop_front();
        }
    }

    async fn recent_history(&self, n: usize) -> Vec<HistoryEntry> {
        let history = self.history.lock().await;
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).cloned().collect()
    }

    /// Past investigations, oldest first
    pub async fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().await.iter().cloned().collect()
    }

    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
        info!("◆ HISTORY CLEARED");
    }
}
