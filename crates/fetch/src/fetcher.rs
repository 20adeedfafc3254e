//! LogFetcher facade
//!
//! classify -> host check -> governed handler -> parse

use futures::future::join_all;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use sleuth_config::FetchConfig;
use sleuth_parser::{extract_links, ContentParser};

use crate::error::{FetchError, Result};
use crate::governor::Governor;
use crate::handlers::{
    DatabaseHandler, FileHandler, FnHandler, FtpHandler, HandlerRegistry, HttpHandler, Payload,
    SourceHandler,
};
use crate::request::{FetchOverrides, FetchRequest, FetchResult, SourceReport};
use crate::scheme::{self, Scheme};

/// Entry point for retrieving evidence from any supported source
pub struct LogFetcher {
    config: Arc<FetchConfig>,
    governor: Governor,
    parser: ContentParser,
    http: Arc<HttpHandler>,
    ftp: Arc<FtpHandler>,
    file: Arc<FileHandler>,
    database: Arc<DatabaseHandler>,
    registry: HandlerRegistry,
}

impl LogFetcher {
    pub fn new(config: FetchConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| FetchError::Config(e.to_string()))?;
        let config = Arc::new(config);

        Ok(Self {
            governor: Governor::new(Arc::clone(&config)),
            parser: ContentParser::new(),
            http: Arc::new(HttpHandler::new(Arc::clone(&config))?),
            ftp: Arc::new(FtpHandler::new()),
            file: Arc::new(FileHandler::new()),
            database: Arc::new(DatabaseHandler::new()),
            registry: HandlerRegistry::new(),
            config,
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Registered custom scheme names
    pub fn handlers(&self) -> Vec<String> {
        self.registry.names()
    }

    /// Register a handler for a custom scheme or an extra database engine
    ///
    /// Registration does not extend the allow-list.
    pub fn register_handler<H>(&mut self, name: &str, handler: H) -> Result<()>
    where
        H: SourceHandler + 'static,
    {
        self.registry.register(name, Arc::new(handler))?;
        info!("◆ HANDLER REGISTERED: {}", name.trim().to_ascii_lowercase());
        Ok(())
    }

    /// Register an async function as a handler
    pub fn register_fn<F, Fut>(&mut self, name: &str, func: F) -> Result<()>
    where
        F: Fn(FetchRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Payload>> + Send + 'static,
    {
        self.register_handler(name, FnHandler::new(func))
    }

    pub fn classify(&self, source: &str) -> Result<Scheme> {
        scheme::classify(source, &self.config, |name| self.registry.has(name))
    }

    /// Classify `source` and merge `overrides` over the default headers
    pub fn request(&self, source: &str, overrides: FetchOverrides) -> Result<FetchRequest> {
        let scheme = self.classify(source)?;
        // Header names are case-insensitive, so merge on the lowercased name
        let headers: BTreeMap<String, String> = self
            .config
            .default_headers
            .iter()
            .chain(overrides.headers.iter())
            .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
            .collect();

        Ok(FetchRequest {
            source: source.trim().to_string(),
            scheme,
            headers,
            query: overrides.query,
        })
    }

    pub async fn fetch(&self, source: &str, overrides: FetchOverrides) -> Result<FetchResult> {
        let request = self.request(source, overrides)?;
        self.fetch_request(&request).await
    }

    /// Fetch an already built request
    ///
    /// The allow-list and deny-list are checked again, so hand-built
    /// requests get the same policy as classified ones.
    pub async fn fetch_request(&self, request: &FetchRequest) -> Result<FetchResult> {
        if !self.config.is_scheme_allowed(request.scheme.allow_key()) {
            return Err(FetchError::UnsupportedScheme(format!(
                "scheme '{}' is not allowed",
                request.scheme.allow_key()
            )));
        }
        scheme::check_host(&request.source, &self.config)?;

        let handler = self.handler_for(&request.scheme)?;
        debug!("◆ FETCHING {} ({})", request.source, request.scheme);

        let governed = self.governor.run(handler.as_ref(), request).await?;
        let declared = governed.transfer.content_type;
        let parsed = self.parser.parse(&governed.content, declared.as_deref());
        info!(
            "◆ FETCHED {}: {} BYTES AS {} IN {} ATTEMPT(S)",
            request.source,
            governed.content.len(),
            parsed.kind,
            governed.attempts
        );

        Ok(FetchResult {
            source: request.source.clone(),
            scheme: request.scheme.clone(),
            size: governed.content.len(),
            content: governed.content,
            content_type: parsed.kind,
            declared_type: declared,
            attempts: governed.attempts,
            parsed,
        })
    }

    /// Fetch every source concurrently; results keep input order
    pub async fn fetch_all<S: AsRef<str>>(&self, sources: &[S]) -> Vec<Result<FetchResult>> {
        join_all(
            sources
                .iter()
                .map(|s| self.fetch(s.as_ref(), FetchOverrides::default())),
        )
        .await
    }

    /// Fetch every source mentioned in `text`
    pub async fn fetch_from_text(&self, text: &str) -> Vec<SourceReport> {
        let links = extract_links(text);
        if links.is_empty() {
            debug!("◆ NO SOURCES FOUND IN TEXT");
            return Vec::new();
        }
        info!("◆ FOUND {} SOURCE(S) IN TEXT", links.len());

        let sources: Vec<&str> = links.iter().map(|l| l.url.as_str()).collect();
        let results = self.fetch_all(&sources).await;

        links
            .into_iter()
            .zip(results)
            .map(|(link, result)| {
                if let Err(e) = &result {
                    warn!("◆ SOURCE {} FAILED: {}", link.url, e);
                }
                SourceReport { link, result }
            })
            .collect()
    }

    fn handler_for(&self, scheme: &Scheme) -> Result<Arc<dyn SourceHandler>> {
        let handler: Arc<dyn SourceHandler> = match scheme {
            Scheme::Http | Scheme::Https => self.http.clone(),
            Scheme::Ftp => self.ftp.clone(),
            Scheme::File => self.file.clone(),
            Scheme::Database { engine } => match self.registry.get(engine) {
                Some(custom) => custom,
                None if DatabaseHandler::supports(engine) => self.database.clone(),
                None => {
                    return Err(FetchError::UnsupportedScheme(format!(
                        "no driver registered for '{}'",
                        engine
                    )))
                }
            },
            Scheme::Custom(name) => self.registry.get(name).ok_or_else(|| {
                FetchError::UnsupportedScheme(format!("no handler registered for '{}'", name))
            })?,
        };
        Ok(handler)
    }
}
