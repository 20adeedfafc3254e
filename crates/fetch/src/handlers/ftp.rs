//! FTP retrieval
//!
//! suppaftp's blocking client runs on the blocking pool. When the governor's
//! deadline fires the worker is abandoned and finishes on its own.

use async_trait::async_trait;
use std::io::Read;
use suppaftp::types::FileType;
use suppaftp::{FtpError, FtpStream};
use tracing::debug;
use url::Url;

use super::SourceHandler;
use crate::buffer::BoundedBuffer;
use crate::error::{FetchError, Result};
use crate::request::{FetchRequest, Transfer};

const DEFAULT_PORT: u16 = 21;
const ANONYMOUS: &str = "anonymous";

#[derive(Debug, Default)]
pub struct FtpHandler;

impl FtpHandler {
    pub fn new() -> Self {
        Self
    }
}

/// Connection target parsed from an `ftp://` URL
#[derive(Debug, Clone, PartialEq, Eq)]
struct FtpTarget {
    host: String,
    port: u16,
    user: String,
    password: String,
    path: String,
}

impl FtpTarget {
    fn parse(source: &str) -> Result<Self> {
        let url = Url::parse(source).map_err(|e| FetchError::invalid_source(source, e.to_string()))?;
        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| FetchError::invalid_source(source, "missing host"))?
            .to_string();
        let path = url.path().to_string();
        if path.is_empty() || path == "/" {
            return Err(FetchError::invalid_source(source, "missing file path"));
        }

        let user = if url.username().is_empty() {
            ANONYMOUS.to_string()
        } else {
            url.username().to_string()
        };
        let password = url.password().unwrap_or(ANONYMOUS).to_string();

        Ok(Self {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            user,
            password,
            path,
        })
    }
}

fn map_ftp(err: FtpError) -> FetchError {
    match err {
        FtpError::ConnectionError(e) => FetchError::Connection(e.to_string()),
        other => FetchError::Protocol(other.to_string()),
    }
}

/// Download `target`, keeping at most `limit` bytes
fn retrieve(target: FtpTarget, limit: usize) -> Result<Vec<u8>> {
    let mut ftp = FtpStream::connect((target.host.as_str(), target.port)).map_err(map_ftp)?;
    ftp.login(target.user.as_str(), target.password.as_str())
        .map_err(map_ftp)?;
    ftp.transfer_type(FileType::Binary).map_err(map_ftp)?;

    let mut stream = ftp.retr_as_stream(target.path.as_str()).map_err(map_ftp)?;
    let mut data = Vec::new();
    stream
        .by_ref()
        .take(limit as u64 + 1)
        .read_to_end(&mut data)
        .map_err(|e| FetchError::Connection(e.to_string()))?;
    if data.len() > limit {
        return Err(FetchError::SizeExceeded { limit });
    }

    ftp.finalize_retr_stream(stream).map_err(map_ftp)?;
    let _ = ftp.quit();
    Ok(data)
}

#[async_trait]
impl SourceHandler for FtpHandler {
    async fn fetch(&self, request: &FetchRequest, sink: &mut BoundedBuffer) -> Result<Transfer> {
        let target = FtpTarget::parse(&request.source)?;
        debug!("◆ RETR {} FROM {}:{}", target.path, target.host, target.port);

        let limit = sink.remaining();
        let data = tokio::task::spawn_blocking(move || retrieve(target, limit))
            .await
            .map_err(|e| FetchError::Protocol(format!("ftp worker failed: {}", e)))??;

        sink.push(&data)?;
        Ok(Transfer::default())
    }
}
