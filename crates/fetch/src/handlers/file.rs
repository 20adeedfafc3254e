//! Local file retrieval

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::debug;
use url::Url;

use super::SourceHandler;
use crate::buffer::BoundedBuffer;
use crate::error::{FetchError, Result};
use crate::request::{FetchRequest, Transfer};

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Debug, Default)]
pub struct FileHandler;

impl FileHandler {
    pub fn new() -> Self {
        Self
    }
}

/// Local path named by a `file://` URL
pub fn file_path(source: &str) -> Result<PathBuf> {
    let url = Url::parse(source.trim())
        .map_err(|e| FetchError::invalid_source(source, e.to_string()))?;
    url.to_file_path()
        .map_err(|_| FetchError::invalid_source(source, "not a local file path"))
}

fn map_io(err: std::io::Error, path: &Path) -> FetchError {
    match err.kind() {
        ErrorKind::NotFound => FetchError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => FetchError::PermissionDenied(path.display().to_string()),
        _ => FetchError::Io(err),
    }
}

/// Content type guessed from the file extension
fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    let kind = match ext.as_str() {
        "json" | "ndjson" => "application/json",
        "xml" => "application/xml",
        "html" | "htm" => "text/html",
        "log" | "txt" | "out" | "err" => "text/plain",
        _ => return None,
    };
    Some(kind)
}

#[async_trait]
impl SourceHandler for FileHandler {
    async fn fetch(&self, request: &FetchRequest, sink: &mut BoundedBuffer) -> Result<Transfer> {
        let path = file_path(&request.source)?;
        debug!("◆ READ {}", path.display());

        let mut file = tokio::fs::File::open(&path)
            .await
            .map_err(|e| map_io(e, &path))?;
        let metadata = file.metadata().await.map_err(|e| map_io(e, &path))?;
        if metadata.is_dir() {
            return Err(FetchError::invalid_source(
                request.source.as_str(),
                "is a directory",
            ));
        }
        sink.ensure_fits(metadata.len())?;

        let mut chunk = vec![0u8; CHUNK_SIZE];
        loop {
            let n = file.read(&mut chunk).await.map_err(|e| map_io(e, &path))?;
            if n == 0 {
                break;
            }
            sink.push(&chunk[..n])?;
        }

        Ok(Transfer {
            content_type: content_type_for(&path).map(String::from),
        })
    }

    /// Missing or unreadable files do not heal between attempts
    fn retryable(&self) -> bool {
        false
    }
}
