//! Content normalization for fetched evidence
//!
//! Turns raw bytes into a normalized text representation with a detected
//! content kind, and flags the lines of plain-text logs that are likely
//! diagnostic signal. Also extracts fetchable sources from free-form text.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod content;
pub mod heuristics;
pub mod links;

pub use content::{ContentParser, ContentSummary, ParsedContent};
pub use heuristics::{LineAnnotation, LogAnnotator, Severity};
pub use links::{extract_links, ExtractedLink, LinkKind};

/// Structured decode failures
///
/// Never fatal: the parser records them as notes and falls back to text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("declared JSON did not parse: {0}")]
    Json(String),

    #[error("declared XML did not parse: {0}")]
    Xml(String),

    #[error("content is not valid UTF-8, decoded lossily")]
    Encoding,
}

/// Detected content type of a fetched payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Json,
    Xml,
    Text,
    Unknown,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Json => "json",
            ContentKind::Xml => "xml",
            ContentKind::Text => "text",
            ContentKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
