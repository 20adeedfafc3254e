//! External collaborators: knowledge retrieval and reasoning

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use sleuth_config::ReasoningMode;

use crate::digest::FetchDigest;
use crate::engineer::HistoryEntry;
use crate::Result;

/// One knowledge-base entry relevant to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeHit {
    pub content: String,
    /// Backend-defined relevance, higher is closer
    pub score: f32,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl KnowledgeHit {
    pub fn new(content: impl Into<String>, score: f32) -> Self {
        Self {
            content: content.into(),
            score,
            metadata: BTreeMap::new(),
        }
    }
}

/// Everything the reasoner gets to look at
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub query: String,
    pub mode: ReasoningMode,
    pub digest: FetchDigest,
    pub knowledge: Vec<KnowledgeHit>,
    /// Most recent earlier investigations, oldest first
    pub history: Vec<HistoryEntry>,
}

/// Reasoner verdict
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Advice {
    pub summary: String,
    #[serde(default)]
    pub root_cause: Option<String>,
    #[serde(default)]
    pub steps: Vec<String>,
}

impl Advice {
    pub fn new(summary: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            ..Self::default()
        }
    }
}

/// Knowledge-base lookup (vector store or anything else)
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Result<Vec<KnowledgeHit>>;

    /// Store a new entry for later searches
    async fn add(&self, content: &str, metadata: BTreeMap<String, String>) -> Result<()>;
}

/// Problem analysis backend; the reasoning mode is passed through untouched
#[async_trait]
pub trait Reasoner: Send + Sync {
    async fn analyze(&self, problem: Problem) -> Result<Advice>;
}
