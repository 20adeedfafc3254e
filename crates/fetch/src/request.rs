//! Request and result types

use std::collections::BTreeMap;

use sleuth_parser::{ContentKind, ExtractedLink, ParsedContent};

use crate::error::FetchError;
use crate::scheme::Scheme;

/// A classified source ready for a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub source: String,
    pub scheme: Scheme,
    /// Merged over the configured default headers
    pub headers: BTreeMap<String, String>,
    /// Only meaningful for database sources
    pub query: Option<String>,
}

/// Per-call additions to a fetch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOverrides {
    pub headers: BTreeMap<String, String>,
    pub query: Option<String>,
}

impl FetchOverrides {
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }
}

/// What a handler reports besides the bytes it pushed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transfer {
    /// Content type from transport headers or file extension
    pub content_type: Option<String>,
}

impl Transfer {
    pub fn typed(content_type: impl Into<String>) -> Self {
        Self {
            content_type: Some(content_type.into()),
        }
    }
}

/// Normalized outcome of one fetch-and-parse
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub source: String,
    pub scheme: Scheme,
    pub content: Vec<u8>,
    pub content_type: ContentKind,
    pub declared_type: Option<String>,
    pub size: usize,
    pub attempts: u32,
    pub parsed: ParsedContent,
}

impl FetchResult {
    /// Normalized text
    pub fn text(&self) -> &str {
        &self.parsed.text
    }
}

/// Outcome of fetching one link found in free text
#[derive(Debug)]
pub struct SourceReport {
    pub link: ExtractedLink,
    pub result: Result<FetchResult, FetchError>,
}

impl SourceReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}
