//! Ordered concurrent fetch engine: fan-out, fan-in, reassembly by index.
//!
//! Every input is tagged with its original index and fetched on its own tokio
//! task, so units run in parallel on a multi-threaded runtime and complete in
//! any order. Once all of them have settled the outcomes are sorted by index
//! and failures are dropped. Completion order is never relied upon.

use std::future::Future;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::fetcher::AssetFetcher;
use crate::types::{AssetRef, FetchOutcome};

/// Fetch every input concurrently and return one outcome per input, in input order.
///
/// - `limit` bounds how many units run at once (`None` = all at once)
/// - `cancel` makes units that have not finished resolve as [`FetchError::Cancelled`]
/// - `on_settled(completed, total)` is called after each unit settles, in completion order
///
/// An empty input returns immediately without spawning anything. A unit that
/// panics is reported as a transport failure and does not affect its siblings.
pub async fn fan_out_ordered<I, T, F, Fut, P>(
    inputs: Vec<I>,
    limit: Option<usize>,
    cancel: &CancellationToken,
    fetch: F,
    mut on_settled: P,
) -> Vec<FetchOutcome<T>>
where
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T, FetchError>> + Send + 'static,
    T: Send + 'static,
    P: FnMut(usize, usize),
{
    let total = inputs.len();
    if total == 0 {
        return Vec::new();
    }

    let permits = limit.map(|n| Arc::new(Semaphore::new(n.max(1))));

    // Spawn eagerly so every unit is in flight before the first one is awaited
    let handles: Vec<_> = inputs
        .into_iter()
        .enumerate()
        .map(|(index, input)| {
            let unit = fetch(input);
            let permits = permits.clone();
            let cancel = cancel.clone();
            let handle = tokio::spawn(async move {
                let work = async move {
                    let _permit = match permits {
                        Some(semaphore) => match semaphore.acquire_owned().await {
                            Ok(permit) => Some(permit),
                            Err(_) => return Err(FetchError::Cancelled),
                        },
                        None => None,
                    };
                    unit.await
                };
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(FetchError::Cancelled),
                    result = work => result,
                }
            });
            (index, handle)
        })
        .collect();

    let mut settled: Vec<(usize, FetchOutcome<T>)> = stream::iter(handles)
        .map(|(index, handle)| async move {
            let outcome = match handle.await {
                Ok(result) => FetchOutcome::from(result),
                Err(e) if e.is_cancelled() => FetchOutcome::Failure(FetchError::Cancelled),
                Err(e) => FetchOutcome::Failure(FetchError::Transport(format!(
                    "fetch task panicked: {}",
                    e
                ))),
            };
            (index, outcome)
        })
        .buffer_unordered(total)
        .inspect({
            let mut completed = 0;
            move |_| {
                completed += 1;
                on_settled(completed, total);
            }
        })
        .collect()
        .await;

    settled.sort_by_key(|(index, _)| *index);
    settled.into_iter().map(|(_, outcome)| outcome).collect()
}

/// Progress of one engine run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchProgress {
    /// Units settled so far (success or failure)
    pub completed: usize,
    /// Units dispatched
    pub total: usize,
}

/// Fans asset fetches out to an [`AssetFetcher`] and back in, in original order.
///
/// Individual failures never surface as errors: the caller only ever sees fewer
/// assets than it asked for.
pub struct OrderedConcurrentFetchEngine<A> {
    fetcher: Arc<dyn AssetFetcher<A>>,
    max_concurrent: Option<usize>,
}

impl<A> Clone for OrderedConcurrentFetchEngine<A> {
    fn clone(&self) -> Self {
        Self {
            fetcher: Arc::clone(&self.fetcher),
            max_concurrent: self.max_concurrent,
        }
    }
}

impl<A> OrderedConcurrentFetchEngine<A>
where
    A: Send + 'static,
{
    /// Create an engine with unbounded fan-out
    pub fn new(fetcher: Arc<dyn AssetFetcher<A>>) -> Self {
        Self {
            fetcher,
            max_concurrent: None,
        }
    }

    /// Bound the number of concurrent fetches (`None` = unbounded)
    #[must_use]
    pub fn with_max_concurrent(mut self, max_concurrent: Option<usize>) -> Self {
        self.max_concurrent = max_concurrent;
        self
    }

    /// Configured fan-out bound
    pub fn max_concurrent(&self) -> Option<usize> {
        self.max_concurrent
    }

    /// Fetch all `refs` and return the successful assets in original order
    pub async fn fetch_ordered(&self, refs: Vec<AssetRef>) -> Vec<A> {
        self.fetch_ordered_with(refs, &CancellationToken::new(), |_| {})
            .await
    }

    /// Like [`fetch_ordered`](Self::fetch_ordered), with cancellation and progress reporting
    pub async fn fetch_ordered_with<P>(
        &self,
        refs: Vec<AssetRef>,
        cancel: &CancellationToken,
        on_progress: P,
    ) -> Vec<A>
    where
        P: FnMut(FetchProgress),
    {
        let requested = refs.len();
        let assets: Vec<A> = self
            .fetch_outcomes(refs, cancel, on_progress)
            .await
            .into_iter()
            .filter_map(FetchOutcome::success)
            .collect();

        if assets.len() < requested {
            tracing::debug!(
                requested = requested,
                loaded = assets.len(),
                "Dropped failed asset fetches"
            );
        }
        assets
    }

    /// Fetch all `refs` and return every outcome, sorted by original index
    pub async fn fetch_outcomes<P>(
        &self,
        refs: Vec<AssetRef>,
        cancel: &CancellationToken,
        mut on_progress: P,
    ) -> Vec<FetchOutcome<A>>
    where
        P: FnMut(FetchProgress),
    {
        let fetcher = Arc::clone(&self.fetcher);
        let outcomes = fan_out_ordered(
            refs.clone(),
            self.max_concurrent,
            cancel,
            move |reference: AssetRef| {
                let fetcher = Arc::clone(&fetcher);
                async move { fetcher.fetch_asset(&reference).await }
            },
            |completed, total| on_progress(FetchProgress { completed, total }),
        )
        .await;

        for (reference, outcome) in refs.iter().zip(&outcomes) {
            match outcome.failure() {
                Some(FetchError::Cancelled) => {
                    tracing::debug!(asset = %reference, "Asset fetch cancelled");
                }
                Some(e) => {
                    tracing::debug!(
                        asset = %reference,
                        kind = e.kind(),
                        error = %e,
                        "Asset fetch failed, skipping"
                    );
                }
                None => {}
            }
        }
        outcomes
    }
}
