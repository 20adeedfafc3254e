//! Investigation orchestration
//!
//! Turns a free-form problem description into fetched evidence, a digest of
//! that evidence, knowledge hits and advice from an external reasoner.
//! Knowledge retrieval and reasoning are collaborators supplied by the
//! caller; this crate only wires them together.

use thiserror::Error;

use sleuth_fetch::FetchError;

pub mod collaborators;
pub mod digest;
pub mod engineer;
pub mod tools;

pub use collaborators::{Advice, KnowledgeHit, KnowledgeSource, Problem, Reasoner};
pub use digest::{ErrorPattern, FetchDigest, SourceRow};
pub use engineer::{EngineerAgent, HistoryEntry, Investigation};
pub use tools::{ToolDefinition, ToolRegistry, ToolTrait};

/// Orchestration errors
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("◆ FETCH FAILED: {0}")]
    Fetch(#[from] FetchError),

    #[error("◆ COLLABORATOR FAILED: {0}")]
    Collaborator(String),

    #[error("◆ TOOL NOT FOUND: {0}")]
    ToolNotFound(String),

    #[error("◆ TOOL FAILED: {0}")]
    ToolExecution(String),
}

pub type Result<T> = std::result::Result<T, AgentError>;
