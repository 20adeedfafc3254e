//! Source handlers and the custom handler registry

pub mod database;
pub mod file;
pub mod ftp;
pub mod http;

pub use database::DatabaseHandler;
pub use file::FileHandler;
pub use ftp::FtpHandler;
pub use http::HttpHandler;

use async_trait::async_trait;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::buffer::BoundedBuffer;
use crate::error::{FetchError, Result};
use crate::request::{FetchRequest, Transfer};
use crate::scheme::Scheme;

/// Retrieval strategy for one scheme
///
/// Implementations push content into `sink` and report metadata. Timeout,
/// size cap and retries are applied around them by the governor.
#[async_trait]
pub trait SourceHandler: Send + Sync {
    async fn fetch(&self, request: &FetchRequest, sink: &mut BoundedBuffer) -> Result<Transfer>;

    /// Whether transient failures of this handler may be retried
    fn retryable(&self) -> bool {
        true
    }
}

/// Content produced by a function handler
#[derive(Debug, Clone, Default)]
pub struct Payload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Payload {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: None,
        }
    }

    pub fn typed(bytes: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
        Self {
            bytes: bytes.into(),
            content_type: Some(content_type.into()),
        }
    }
}

/// Adapts an async function into a `SourceHandler`
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> SourceHandler for FnHandler<F>
where
    F: Fn(FetchRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Payload>> + Send + 'static,
{
    async fn fetch(&self, request: &FetchRequest, sink: &mut BoundedBuffer) -> Result<Transfer> {
        let payload = (self.func)(request.clone()).await?;
        sink.push(&payload.bytes)?;
        Ok(Transfer {
            content_type: payload.content_type,
        })
    }
}

/// Typed registry of handlers for schemes that are not built in
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn SourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` under `name`, validating the name first
    pub fn register(&mut self, name: &str, handler: Arc<dyn SourceHandler>) -> Result<()> {
        let name = validate_name(name)?;
        self.handlers.insert(name, handler);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn SourceHandler>> {
        self.handlers.get(&name.to_ascii_lowercase()).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.handlers.contains_key(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim().to_ascii_lowercase();
    let well_formed = !name.is_empty()
        && name.starts_with(|c: char| c.is_ascii_alphabetic())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !well_formed {
        return Err(FetchError::InvalidHandler(format!(
            "'{}' is not a valid scheme name",
            name
        )));
    }
    if Scheme::is_builtin_name(&name) {
        return Err(FetchError::InvalidHandler(format!(
            "'{}' is a built-in scheme",
            name
        )));
    }
    Ok(name)
}
