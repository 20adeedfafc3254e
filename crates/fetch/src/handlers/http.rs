//! HTTP/HTTPS retrieval over a shared reqwest client

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::redirect::Policy;
use std::sync::Arc;
use tracing::debug;

use sleuth_config::FetchConfig;

use super::SourceHandler;
use crate::buffer::BoundedBuffer;
use crate::error::{FetchError, Result};
use crate::request::{FetchRequest, Transfer};
use crate::scheme::is_blocked;

const MAX_REDIRECTS: usize = 10;

pub struct HttpHandler {
    client: reqwest::Client,
}

impl HttpHandler {
    /// Build the shared client: user agent, default headers, and a redirect
    /// policy that refuses to follow into the deny-list
    pub fn new(config: Arc<FetchConfig>) -> Result<Self> {
        let headers = header_map(&config.default_headers)?;
        let policy_config = Arc::clone(&config);
        let policy = Policy::custom(move |attempt| {
            let blocked = attempt
                .url()
                .host_str()
                .map(|h| is_blocked(h, &policy_config))
                .unwrap_or(false);
            if blocked {
                let host = attempt.url().host_str().unwrap_or_default().to_string();
                attempt.error(FetchError::BlockedHost(host))
            } else if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error(FetchError::Protocol("too many redirects".into()))
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .connect_timeout(config.timeout())
            .redirect(policy)
            .build()
            .map_err(|e| FetchError::Config(e.to_string()))?;

        Ok(Self { client })
    }
}

fn header_map<'a>(
    pairs: impl IntoIterator<Item = (&'a String, &'a String)>,
) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| FetchError::Config(format!("header name '{}': {}", name, e)))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| FetchError::Config(format!("header value for '{}': {}", name, e)))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn map_reqwest(err: reqwest::Error) -> FetchError {
    if err.is_redirect() {
        let mut cause = std::error::Error::source(&err);
        while let Some(e) = cause {
            if let Some(FetchError::BlockedHost(host)) = e.downcast_ref::<FetchError>() {
                return FetchError::BlockedHost(host.clone());
            }
            cause = e.source();
        }
        return FetchError::Protocol(err.to_string());
    }
    if err.is_builder() {
        let input = err.url().map(|u| u.to_string()).unwrap_or_default();
        return FetchError::invalid_source(input, err.to_string());
    }
    FetchError::Connection(err.to_string())
}

#[async_trait]
impl SourceHandler for HttpHandler {
    async fn fetch(&self, request: &FetchRequest, sink: &mut BoundedBuffer) -> Result<Transfer> {
        let headers = header_map(&request.headers)?;
        debug!("◆ GET {}", request.source);

        let mut response = self
            .client
            .get(&request.source)
            .headers(headers)
            .send()
            .await
            .map_err(map_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        if let Some(length) = response.content_length() {
            sink.ensure_fits(length)?;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        while let Some(chunk) = response.chunk().await.map_err(map_reqwest)? {
            sink.push(&chunk)?;
        }

        Ok(Transfer { content_type })
    }
}
