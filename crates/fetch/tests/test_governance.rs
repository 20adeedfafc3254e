//! Tests for the policy applied around every handler

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sleuth_fetch::{
    BoundedBuffer, FetchConfig, FetchError, FetchOverrides, FetchRequest, LogFetcher, Payload,
    Result, SourceHandler, Transfer,
};

/// Handler that records how often it was invoked
struct Spy {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl SourceHandler for Spy {
    async fn fetch(&self, _: &FetchRequest, sink: &mut BoundedBuffer) -> Result<Transfer> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        sink.push(b"spied")?;
        Ok(Transfer::default())
    }
}

fn quick_config() -> FetchConfig {
    FetchConfig {
        retry_delay_secs: 0.0,
        ..FetchConfig::default()
    }
}

fn spied(config: FetchConfig) -> (LogFetcher, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut fetcher = LogFetcher::new(config).unwrap();
    fetcher
        .register_handler(
            "spy",
            Spy {
                calls: Arc::clone(&calls),
            },
        )
        .unwrap();
    (fetcher, calls)
}

/// Test that a registered but disallowed scheme never reaches its handler
#[tokio::test]
async fn test_unsupported_scheme_skips_handler() {
    let (fetcher, calls) = spied(quick_config());

    let err = fetcher
        .fetch("spy://bucket/app.log", FetchOverrides::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::UnsupportedScheme(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Test that unknown prefixes are rejected
#[tokio::test]
async fn test_unknown_scheme() {
    let fetcher = LogFetcher::new(quick_config()).unwrap();
    let err = fetcher
        .fetch("gopher://example.com/log", FetchOverrides::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::UnsupportedScheme(_)));
}

/// Test that blocked hosts fail before any handler runs
#[tokio::test]
async fn test_blocked_host_skips_handler() {
    let mut config = quick_config();
    config.allowed_schemes.insert("spy".into());
    let (fetcher, calls) = spied(config);

    let err = fetcher
        .fetch("spy://localhost/app.log", FetchOverrides::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::BlockedHost(ref h) if h == "localhost"));

    let err = fetcher
        .fetch("http://127.0.0.1:8080/app.log", FetchOverrides::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::BlockedHost(_)));

    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Test that an allowed custom scheme is served by its handler
#[tokio::test]
async fn test_custom_scheme_dispatch() {
    let mut config = quick_config();
    config.allowed_schemes.insert("spy".into());
    let (fetcher, calls) = spied(config);

    let result = fetcher
        .fetch("spy://bucket/app.log", FetchOverrides::default())
        .await
        .unwrap();

    assert_eq!(result.text(), "spied");
    assert_eq!(result.attempts, 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(fetcher.handlers(), vec!["spy"]);
}

/// Test that built-in scheme names cannot be taken over
#[test]
fn test_register_builtin_name_rejected() {
    let mut fetcher = LogFetcher::new(quick_config()).unwrap();
    let err = fetcher
        .register_fn("https", |_req: FetchRequest| async { Ok(Payload::new("x")) })
        .unwrap_err();
    assert!(matches!(err, FetchError::InvalidHandler(_)));
}

/// Test that oversize content fails without being retried
#[tokio::test]
async fn test_size_exceeded() {
    let mut config = quick_config();
    config.max_size = 16;
    config.allowed_schemes.insert("big".into());
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut fetcher = LogFetcher::new(config).unwrap();
    fetcher
        .register_fn("big", move |_req: FetchRequest| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Payload::new(vec![b'x'; 64])) }
        })
        .unwrap();

    let err = fetcher
        .fetch("big://blob", FetchOverrides::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::SizeExceeded { limit: 16 }));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Register a handler that fails with a connection error `failures` times
fn flaky(config: FetchConfig, failures: usize) -> (LogFetcher, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);

    let mut fetcher = LogFetcher::new(config).unwrap();
    fetcher
        .register_fn("flaky", move |_req: FetchRequest| {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n <= failures {
                    Err(FetchError::Connection(format!("reset on attempt {}", n)))
                } else {
                    Ok(Payload::new("recovered"))
                }
            }
        })
        .unwrap();
    (fetcher, calls)
}

/// Test that transient failures are retried until success
#[tokio::test]
async fn test_retry_then_success() {
    let mut config = quick_config();
    config.max_retries = 3;
    config.allowed_schemes.insert("flaky".into());
    let (fetcher, calls) = flaky(config, 2);

    let result = fetcher
        .fetch("flaky://svc/log", FetchOverrides::default())
        .await
        .unwrap();

    assert_eq!(result.attempts, 3);
    assert_eq!(result.text(), "recovered");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// Test that persistent transient failures exhaust the attempt bound
#[tokio::test]
async fn test_retry_exhausted() {
    let mut config = quick_config();
    config.max_retries = 3;
    config.allowed_schemes.insert("flaky".into());
    let (fetcher, calls) = flaky(config, usize::MAX);

    let err = fetcher
        .fetch("flaky://svc/log", FetchOverrides::default())
        .await
        .unwrap_err();

    match &err {
        FetchError::Exhausted { attempts, last } => {
            assert_eq!(*attempts, 3);
            assert!(matches!(**last, FetchError::Connection(ref m) if m == "reset on attempt 3"));
        }
        other => panic!("expected exhaustion, got {:?}", other),
    }
    assert!(matches!(err.root_cause(), FetchError::Connection(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// Test that a single allowed attempt surfaces the bare error
#[tokio::test]
async fn test_single_attempt_not_wrapped() {
    let mut config = quick_config();
    config.max_retries = 1;
    config.allowed_schemes.insert("flaky".into());
    let (fetcher, calls) = flaky(config, usize::MAX);

    let err = fetcher
        .fetch("flaky://svc/log", FetchOverrides::default())
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Connection(_)));
    assert_eq!(err.attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

/// Test that the per-attempt deadline cancels slow handlers
#[tokio::test]
async fn test_timeout() {
    let mut config = quick_config();
    config.timeout_secs = 1;
    config.max_retries = 1;
    config.allowed_schemes.insert("slow".into());

    let mut fetcher = LogFetcher::new(config).unwrap();
    fetcher
        .register_fn("slow", |_req: FetchRequest| async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(Payload::new("too late"))
        })
        .unwrap();

    let err = fetcher
        .fetch("slow://svc/log", FetchOverrides::default())
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_secs(1)));
}

/// Test that overrides are merged over the default headers
#[tokio::test]
async fn test_headers_and_query_reach_handler() {
    let mut config = quick_config();
    config.allowed_schemes.insert("echo".into());
    config
        .default_headers
        .insert("X-Team".into(), "platform".into());
    config.default_headers.insert("X-Env".into(), "prod".into());

    let mut fetcher = LogFetcher::new(config).unwrap();
    fetcher
        .register_fn("echo", |req: FetchRequest| async move {
            let body = format!(
                "{} {} {}",
                req.headers["x-team"],
                req.headers["x-env"],
                req.query.unwrap_or_default()
            );
            Ok(Payload::new(body))
        })
        .unwrap();

    let overrides = FetchOverrides::default()
        .with_header("X-Env", "staging")
        .with_query("tail");
    let result = fetcher.fetch("echo://svc", overrides).await.unwrap();
    assert_eq!(result.text(), "platform staging tail");
}

/// Test that an override differing only in case replaces the default
#[test]
fn test_header_merge_ignores_case() {
    let mut config = quick_config();
    config.default_headers.insert("x-env".into(), "prod".into());
    config
        .default_headers
        .insert("Authorization".into(), "Bearer a".into());
    let fetcher = LogFetcher::new(config).unwrap();

    let request = fetcher
        .request(
            "https://logs.example.com/app.log",
            FetchOverrides::default().with_header("X-Env", "staging"),
        )
        .unwrap();

    assert_eq!(request.headers.len(), 2);
    assert_eq!(request.headers["x-env"], "staging");
    assert_eq!(request.headers["authorization"], "Bearer a");
}
