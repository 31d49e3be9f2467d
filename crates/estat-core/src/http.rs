//! Blocking HTTP GET on top of async reqwest.
//!
//! Uses the async client internally with a per-request timeout, but presents
//! a sync interface so the pagination loop stays a plain loop.

use std::sync::LazyLock;
use std::time::Duration;

use crate::error::{EstatError, Result};
use crate::retry;

/// Connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Per-request network settings.
#[derive(Clone, Copy, Debug)]
pub struct HttpConfig {
    /// Whole-request timeout
    pub request_timeout: Duration,
    /// Retry attempts for 429/5xx/connection errors
    pub max_retries: u32,
    /// First backoff delay; doubles on every retry
    pub base_delay: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(60),
            max_retries: 3,
            base_delay: Duration::from_secs(2),
        }
    }
}

/// Shared async HTTP client with connection pooling.
static SHARED_CLIENT: LazyLock<reqwest::Client> = LazyLock::new(|| {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(4)
        .build()
        .expect("failed to build HTTP client")
});

/// Shared tokio runtime for HTTP operations.
pub static SHARED_RUNTIME: LazyLock<tokio::runtime::Runtime> = LazyLock::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("failed to build tokio runtime")
});

/// Anything that can GET a URL and hand back the body.
///
/// [`HttpClient`] is the network implementation; tests substitute canned
/// responses.
pub trait Fetch: Send + Sync {
    fn get(&self, url: &str) -> Result<Vec<u8>>;
}

/// Blocking client with retry and timeout from [`HttpConfig`].
#[derive(Clone, Debug, Default)]
pub struct HttpClient {
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    fn get_once(&self, url: &str) -> Result<Vec<u8>> {
        let timeout = self.config.request_timeout;
        SHARED_RUNTIME.handle().block_on(async {
            let resp = SHARED_CLIENT
                .get(url)
                .timeout(timeout)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|e| EstatError::from_reqwest(&e))?;
            let body = resp
                .bytes()
                .await
                .map_err(|e| EstatError::from_reqwest(&e))?;
            Ok(body.to_vec())
        })
    }
}

impl Fetch for HttpClient {
    fn get(&self, url: &str) -> Result<Vec<u8>> {
        retry::retry_with_backoff(
            self.config.max_retries,
            self.config.base_delay,
            || self.get_once(url),
        )
    }
}

/// Join query parameters onto `base` without re-encoding them.
///
/// Parameter values here are validated ids, cursors and numbers, so they
/// never need escaping.
pub fn build_uri(base: &str, params: &[(&str, &str)]) -> String {
    let query: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("{base}?{}", query.join("&"))
}
