//! Fetch failure taxonomy

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Typed fetch failures
///
/// Retryable variants are retried by the governor up to the configured
/// attempt bound; everything else surfaces immediately.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("UNSUPPORTED SCHEME: {0}")]
    UnsupportedScheme(String),

    #[error("INVALID SOURCE '{input}': {reason}")]
    InvalidSource { input: String, reason: String },

    #[error("BLOCKED HOST: {0}")]
    BlockedHost(String),

    #[error("TIMED OUT AFTER {0:?}")]
    Timeout(Duration),

    #[error("SIZE LIMIT OF {limit} BYTES EXCEEDED")]
    SizeExceeded { limit: usize },

    #[error("CONNECTION FAILED: {0}")]
    Connection(String),

    #[error("HTTP {status} FROM {url}")]
    Http { status: u16, url: String },

    #[error("FILE NOT FOUND: {0}")]
    NotFound(PathBuf),

    #[error("PERMISSION DENIED: {0}")]
    PermissionDenied(String),

    #[error("I/O ERROR: {0}")]
    Io(#[from] std::io::Error),

    #[error("DATABASE SOURCE REQUIRES A QUERY")]
    MissingQuery,

    #[error("QUERY FAILED: {0}")]
    QueryExecution(String),

    #[error("PROTOCOL ERROR: {0}")]
    Protocol(String),

    #[error("INVALID HANDLER: {0}")]
    InvalidHandler(String),

    #[error("INVALID CONFIG: {0}")]
    Config(String),

    #[error("GAVE UP AFTER {attempts} ATTEMPTS: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<FetchError>,
    },
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl FetchError {
    pub(crate) fn invalid_source(input: impl Into<String>, reason: impl Into<String>) -> Self {
        FetchError::InvalidSource {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout(_) | FetchError::Connection(_) => true,
            FetchError::Http { status, .. } => {
                *status >= 500 || *status == 408 || *status == 429
            }
            _ => false,
        }
    }

    /// Underlying cause, looking through retry exhaustion
    pub fn root_cause(&self) -> &FetchError {
        match self {
            FetchError::Exhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }

    /// Attempts made before this failure surfaced
    pub fn attempts(&self) -> u32 {
        match self {
            FetchError::Exhausted { attempts, .. } => *attempts,
            _ => 1,
        }
    }
}
