//! Shared test helpers: scripted record and asset collaborators.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::FetchError;
use crate::fetcher::{AssetFetcher, RecordFetcher};
use crate::types::{AssetRef, Record, RecordId};

/// Minimal record used across tests
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Story {
    pub(crate) id: String,
    pub(crate) image_urls: Vec<String>,
}

impl Story {
    pub(crate) fn new(id: &str, image_urls: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            image_urls: image_urls.iter().map(|u| u.to_string()).collect(),
        }
    }
}

impl Record for Story {
    fn asset_urls(&self) -> Vec<String> {
        self.image_urls.clone()
    }
}

/// How a scripted asset fetch behaves
#[derive(Clone)]
struct AssetScript {
    delay: Duration,
    failure: Option<FetchError>,
}

/// Asset fetcher whose per-url delay and failure are scripted.
///
/// Successful fetches return the url uppercased, so results can be matched
/// back to their references.
#[derive(Default)]
pub(crate) struct ScriptedAssets {
    scripts: HashMap<String, AssetScript>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedAssets {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Succeed for `url` after `delay`
    pub(crate) fn succeed(mut self, url: &str, delay: Duration) -> Self {
        self.scripts.insert(
            url.to_string(),
            AssetScript {
                delay,
                failure: None,
            },
        );
        self
    }

    /// Fail for `url` with `error` after `delay`
    pub(crate) fn fail(mut self, url: &str, delay: Duration, error: FetchError) -> Self {
        self.scripts.insert(
            url.to_string(),
            AssetScript {
                delay,
                failure: Some(error),
            },
        );
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

/// Expected asset value for a url fetched through [`ScriptedAssets`]
pub(crate) fn asset_for(url: &str) -> String {
    url.to_uppercase()
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AssetFetcher<String> for ScriptedAssets {
    async fn fetch_asset(&self, reference: &AssetRef) -> Result<String, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlight(&self.in_flight);

        let script = self
            .scripts
            .get(reference.url())
            .cloned()
            .unwrap_or(AssetScript {
                delay: Duration::ZERO,
                failure: None,
            });

        tokio::time::sleep(script.delay).await;
        match script.failure {
            Some(e) => Err(e),
            None => Ok(asset_for(reference.url())),
        }
    }
}

/// How a scripted record fetch behaves
struct RecordScript {
    gate: Option<Arc<Notify>>,
    result: Result<Story, FetchError>,
}

/// Record fetcher with scripted results and optional gates that hold a fetch
/// until the test releases it.
#[derive(Default)]
pub(crate) struct ScriptedRecords {
    scripts: HashMap<RecordId, RecordScript>,
    calls: AtomicUsize,
}

impl ScriptedRecords {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Resolve `story` immediately
    pub(crate) fn story(mut self, story: Story) -> Self {
        self.scripts.insert(
            RecordId::from(story.id.as_str()),
            RecordScript {
                gate: None,
                result: Ok(story),
            },
        );
        self
    }

    /// Resolve `story` only after the returned gate is notified
    pub(crate) fn gated_story(&mut self, story: Story) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.scripts.insert(
            RecordId::from(story.id.as_str()),
            RecordScript {
                gate: Some(Arc::clone(&gate)),
                result: Ok(story),
            },
        );
        gate
    }

    /// Fail fetches of `id` with `error` only after the returned gate is notified
    pub(crate) fn gated_failure(&mut self, id: &str, error: FetchError) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.scripts.insert(
            RecordId::from(id),
            RecordScript {
                gate: Some(Arc::clone(&gate)),
                result: Err(error),
            },
        );
        gate
    }

    /// Fail fetches of `id` with `error`
    pub(crate) fn failing(mut self, id: &str, error: FetchError) -> Self {
        self.scripts.insert(
            RecordId::from(id),
            RecordScript {
                gate: None,
                result: Err(error),
            },
        );
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordFetcher<Story> for ScriptedRecords {
    async fn fetch_record(&self, id: &RecordId) -> Result<Story, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let Some(script) = self.scripts.get(id) else {
            return Err(FetchError::RecordNotFound(id.clone()));
        };
        if let Some(gate) = &script.gate {
            gate.notified().await;
        }
        script.result.clone()
    }
}

/// Record fetcher whose fetch always panics
pub(crate) struct PanickingRecords;

#[async_trait]
impl RecordFetcher<Story> for PanickingRecords {
    async fn fetch_record(&self, id: &RecordId) -> Result<Story, FetchError> {
        panic!("record decoder blew up on {}", id);
    }
}
