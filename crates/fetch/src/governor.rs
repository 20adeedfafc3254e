//! Governance wrapper: timeout, size cap and retry policy
//!
//! Every handler, built in or registered, runs through `Governor::run`.
//! Handlers only push bytes; the governor decides when to give up.

use std::sync::Arc;
use std::time::Duration;

use sleuth_config::FetchConfig;
use tracing::{debug, warn};

use crate::buffer::BoundedBuffer;
use crate::error::{FetchError, Result};
use crate::handlers::SourceHandler;
use crate::request::{FetchRequest, Transfer};

/// Bookkeeping for one request's attempts
#[derive(Debug)]
pub struct RetryState {
    pub attempt: u32,
    pub last_error: Option<FetchError>,
    pub delay: Duration,
}

impl RetryState {
    pub fn new(delay: Duration) -> Self {
        Self {
            attempt: 0,
            last_error: None,
            delay,
        }
    }
}

/// Bytes and metadata of a successful governed transfer
#[derive(Debug)]
pub struct Governed {
    pub content: Vec<u8>,
    pub transfer: Transfer,
    pub attempts: u32,
}

#[derive(Debug, Clone)]
pub struct Governor {
    config: Arc<FetchConfig>,
}

impl Governor {
    pub fn new(config: Arc<FetchConfig>) -> Self {
        Self { config }
    }

    /// Run `handler` for `request` under the configured limits
    pub async fn run(
        &self,
        handler: &dyn SourceHandler,
        request: &FetchRequest,
    ) -> Result<Governed> {
        let timeout = self.config.timeout();
        let max_attempts = if handler.retryable() {
            self.config.attempts()
        } else {
            1
        };
        let mut state = RetryState::new(self.config.retry_delay());

        loop {
            state.attempt += 1;
            debug!(
                "◆ ATTEMPT {}/{} FOR {}",
                state.attempt, max_attempts, request.source
            );

            let mut sink = BoundedBuffer::new(self.config.max_size);
            let outcome =
                tokio::time::timeout(timeout, handler.fetch(request, &mut sink)).await;

            let err = match outcome {
                Ok(Ok(_)) if sink.overflowed() => FetchError::SizeExceeded {
                    limit: sink.limit(),
                },
                Ok(Ok(transfer)) => {
                    return Ok(Governed {
                        content: sink.into_inner(),
                        transfer,
                        attempts: state.attempt,
                    })
                }
                Ok(Err(e)) => e,
                Err(_) => FetchError::Timeout(timeout),
            };
            drop(sink);

            if !err.is_retryable() {
                return Err(err);
            }
            if state.attempt >= max_attempts {
                if max_attempts == 1 {
                    return Err(err);
                }
                return Err(FetchError::Exhausted {
                    attempts: state.attempt,
                    last: Box::new(err),
                });
            }

            warn!(
                "◆ ATTEMPT {}/{} FAILED FOR {}: {}, RETRYING IN {:?}",
                state.attempt, max_attempts, request.source, err, state.delay
            );
            state.last_error = Some(err);
            tokio::time::sleep(state.delay).await;
        }
    }
}
