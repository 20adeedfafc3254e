//! Evidence retrieval for Sleuth
//!
//! Pulls raw content from HTTP(S), FTP, local files, databases and
//! registered custom schemes, under a shared timeout, size cap and retry
//! policy, and hands it to the content parser.

pub mod buffer;
pub mod error;
pub mod fetcher;
pub mod governor;
pub mod handlers;
pub mod request;
pub mod scheme;

pub use buffer::BoundedBuffer;
pub use error::{FetchError, Result};
pub use fetcher::LogFetcher;
pub use governor::{Governed, Governor, RetryState};
pub use handlers::{FnHandler, HandlerRegistry, Payload, SourceHandler};
pub use request::{FetchOverrides, FetchRequest, FetchResult, SourceReport, Transfer};
pub use scheme::{classify, Scheme};

pub use sleuth_config::FetchConfig;
pub use sleuth_parser::{ContentKind, ParsedContent};
