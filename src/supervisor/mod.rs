//! Load supervision split into focused submodules.
//!
//! The `LoadSupervisor` struct and its methods are organized by concern:
//! - [`control`] - Starting, reloading, cancelling and resetting loads
//! - [`load_task`] - The spawned task that fetches a record and its assets
//!
//! Every load is tagged with a [`LoadToken`]. Starting a new load mints a new
//! token and retires the previous one; a task whose token has been retired may
//! keep running, but none of its results reach the state store.

mod control;
mod load_task;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::engine::OrderedConcurrentFetchEngine;
use crate::error::{Error, Result};
use crate::fetcher::{
    AssetFetcher, HttpImageFetcher, HttpRecordFetcher, Image, RecordFetcher, build_client,
};
use crate::store::LoadStateStore;
use crate::types::{Event, LoadState, LoadToken, Record, RecordId};

/// The load that currently owns the state store
pub(crate) struct ActiveLoad {
    pub(crate) token: LoadToken,
    pub(crate) id: RecordId,
    /// Fires when the load is superseded (only if stale fetches are aborted)
    pub(crate) cancel: CancellationToken,
}

/// Everything guarded by the writer lock
///
/// Token checks and state writes happen under the same lock, so a retired
/// token can never write after its successor has been published.
#[derive(Default)]
pub(crate) struct WriterState {
    /// Last generation handed out
    pub(crate) generation: u64,
    /// In-flight load, if any
    pub(crate) current: Option<ActiveLoad>,
    /// Id of the most recent `load` call, for `reload`
    pub(crate) last_id: Option<RecordId>,
}

/// State shared between the supervisor handle and its spawned load tasks
pub(crate) struct Shared<R, A> {
    pub(crate) config: Arc<Config>,
    pub(crate) record_fetcher: Arc<dyn RecordFetcher<R>>,
    pub(crate) engine: OrderedConcurrentFetchEngine<A>,
    pub(crate) store: LoadStateStore<R, A>,
    pub(crate) writer: Mutex<WriterState>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Runtime load tasks are spawned on
    pub(crate) runtime: tokio::runtime::Handle,
}

impl<R, A> Shared<R, A>
where
    R: Record,
    A: Send + Sync + 'static,
{
    pub(crate) fn lock_writer(&self) -> MutexGuard<'_, WriterState> {
        // A panic while holding the lock cannot leave the counters half-written
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns true if `token` still owns the state store
    pub(crate) fn is_current(&self, token: LoadToken) -> bool {
        Self::owns(&self.lock_writer(), token)
    }

    fn owns(writer: &WriterState, token: LoadToken) -> bool {
        writer
            .current
            .as_ref()
            .is_some_and(|active| active.token == token)
    }

    /// Publish `state` and `event` if `token` is still current
    ///
    /// `finish` marks the load as terminal: afterwards nothing is in flight.
    /// Returns false (and writes nothing) for a retired token.
    pub(crate) fn commit(
        &self,
        token: LoadToken,
        state: LoadState<R, A>,
        event: Event,
        finish: bool,
    ) -> bool {
        let mut writer = self.lock_writer();
        if !Self::owns(&writer, token) {
            return false;
        }
        self.store.replace(state);
        self.emit(event);
        if finish {
            writer.current = None;
        }
        true
    }

    /// Emit an event; having no subscribers is not an error
    pub(crate) fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

/// Coordinates loading one record and its assets for a detail screen.
///
/// Cloneable: all clones drive the same state store. At most one load is
/// current at a time; calling [`load`](Self::load) again supersedes it.
pub struct LoadSupervisor<R, A> {
    pub(crate) shared: Arc<Shared<R, A>>,
}

impl<R, A> Clone for LoadSupervisor<R, A> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<R, A> LoadSupervisor<R, A>
where
    R: Record,
    A: Send + Sync + 'static,
{
    /// Create a supervisor with injected collaborators
    ///
    /// Must be called from within a tokio runtime; load tasks are spawned on it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an invalid configuration and
    /// [`Error::NoRuntime`] when called outside a runtime.
    pub fn new(
        config: Config,
        record_fetcher: Arc<dyn RecordFetcher<R>>,
        asset_fetcher: Arc<dyn AssetFetcher<A>>,
    ) -> Result<Self> {
        config.validate()?;

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::NoRuntime(e.to_string()))?;

        let (event_tx, _rx) = tokio::sync::broadcast::channel(config.loader.event_buffer);

        let engine = OrderedConcurrentFetchEngine::new(asset_fetcher)
            .with_max_concurrent(config.loader.max_concurrent_fetches);

        tracing::debug!(
            max_concurrent_fetches = ?config.loader.max_concurrent_fetches,
            abort_stale_fetches = config.loader.abort_stale_fetches,
            "Load supervisor created"
        );

        Ok(Self {
            shared: Arc::new(Shared {
                config: Arc::new(config),
                record_fetcher,
                engine,
                store: LoadStateStore::new(),
                writer: Mutex::new(WriterState::default()),
                event_tx,
                runtime,
            }),
        })
    }

    /// Snapshot of the current load state
    pub fn state(&self) -> LoadState<R, A> {
        self.shared.store.current()
    }

    /// The state store this supervisor writes to
    pub fn store(&self) -> &LoadStateStore<R, A> {
        &self.shared.store
    }

    /// Subscribe to load state changes
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<LoadState<R, A>> {
        self.shared.store.subscribe()
    }

    /// Subscribe to lifecycle events
    ///
    /// Each subscriber gets its own receiver. Slow subscribers may observe
    /// `RecvError::Lagged` once the configured buffer overflows.
    pub fn subscribe_events(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.shared.event_tx.subscribe()
    }

    /// Token of the in-flight load, if any
    pub fn current_token(&self) -> Option<LoadToken> {
        self.shared
            .lock_writer()
            .current
            .as_ref()
            .map(|active| active.token)
    }

    /// Configuration this supervisor was created with
    pub fn config(&self) -> &Config {
        &self.shared.config
    }
}

impl<R> LoadSupervisor<R, Image>
where
    R: Record + DeserializeOwned,
{
    /// Create a supervisor that fetches records as JSON and assets as images over HTTP
    ///
    /// Records are requested from `config.http.record_url_template`. Neither
    /// collaborator retries; use [`new`](Self::new) with
    /// [`Retrying`](crate::retry::Retrying) wrappers for that.
    pub fn from_http(config: Config) -> Result<Self> {
        let client = build_client(&config.http)?;
        let records = HttpRecordFetcher::<R>::new(client.clone(), config.http.clone());
        let images = HttpImageFetcher::new(client);
        Self::new(config, Arc::new(records), Arc::new(images))
    }
}
