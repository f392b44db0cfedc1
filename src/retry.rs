//! Retry logic with exponential backoff
//!
//! The fetch engine never retries on its own; a failed asset is simply dropped.
//! Callers that want transient failures retried wrap a collaborator in
//! [`Retrying`], which applies [`fetch_with_retry`] to every call.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use detail_loader::config::{HttpConfig, RetryConfig};
//! use detail_loader::fetcher::{AssetFetcher, HttpImageFetcher, Image, build_client};
//! use detail_loader::retry::Retrying;
//!
//! # fn example() -> detail_loader::Result<()> {
//! let client = build_client(&HttpConfig::default())?;
//! let images: Arc<dyn AssetFetcher<Image>> = Arc::new(Retrying::new(
//!     HttpImageFetcher::new(client),
//!     RetryConfig::default(),
//! ));
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

use crate::config::RetryConfig;
use crate::error::FetchError;
use crate::fetcher::{AssetFetcher, RecordFetcher};
use crate::types::{AssetRef, RecordId};

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (timeouts, connection resets, overloaded servers) should return `true`.
/// Permanent failures (missing records, bad references, corrupt payloads) should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Transport(_) => true,
            // Request timeout, rate limiting, and server-side failures
            FetchError::RemoteStatus { status } => {
                matches!(status, 408 | 429) || (500..=599).contains(status)
            }
            FetchError::InvalidReference { .. } => false,
            FetchError::Decode(_) => false,
            FetchError::RecordNotFound(_) => false,
            // A superseded load must stop, not try again
            FetchError::Cancelled => false,
        }
    }
}

/// Execute an async operation with exponential backoff retry logic
///
/// Returns the successful result or the last error after all retry attempts are exhausted.
/// `config.max_attempts` counts retries, so the operation runs at most `max_attempts + 1` times.
pub async fn fetch_with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 0;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 0 {
                    tracing::debug!(attempts = attempt + 1, "Fetch succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                attempt += 1;

                tracing::debug!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Fetch failed, retrying"
                );

                let jittered_delay = if config.jitter {
                    add_jitter(delay)
                } else {
                    delay
                };

                tokio::time::sleep(jittered_delay).await;

                let next_delay =
                    Duration::from_secs_f64(delay.as_secs_f64() * config.backoff_multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(
                        error = %e,
                        attempts = attempt + 1,
                        "Fetch failed after all retry attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay lands between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    Duration::from_secs_f64(delay.as_secs_f64() * (1.0 + jitter_factor))
}

/// Decorator that retries transient failures of the wrapped collaborator
pub struct Retrying<F> {
    inner: F,
    config: RetryConfig,
}

impl<F> Retrying<F> {
    /// Wrap `inner`, retrying according to `config`
    pub fn new(inner: F, config: RetryConfig) -> Self {
        Self { inner, config }
    }

    /// The wrapped collaborator
    pub fn inner(&self) -> &F {
        &self.inner
    }
}

#[async_trait]
impl<F, R> RecordFetcher<R> for Retrying<F>
where
    F: RecordFetcher<R>,
    R: Send + 'static,
{
    async fn fetch_record(&self, id: &RecordId) -> Result<R, FetchError> {
        fetch_with_retry(&self.config, || self.inner.fetch_record(id)).await
    }
}

#[async_trait]
impl<F, A> AssetFetcher<A> for Retrying<F>
where
    F: AssetFetcher<A>,
    A: Send + 'static,
{
    async fn fetch_asset(&self, reference: &AssetRef) -> Result<A, FetchError> {
        fetch_with_retry(&self.config, || self.inner.fetch_asset(reference)).await
    }
}
