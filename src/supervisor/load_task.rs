//! Load task orchestration: record, then assets, then one final publish.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::types::{AssetRef, Event, LoadState, LoadToken, Record, RecordId, Stage};

use super::Shared;

/// Everything one spawned load needs, so helpers don't take long parameter lists
pub(crate) struct LoadTaskContext<R, A> {
    pub(crate) shared: Arc<Shared<R, A>>,
    pub(crate) id: RecordId,
    pub(crate) token: LoadToken,
    pub(crate) cancel: CancellationToken,
}

impl<R, A> LoadTaskContext<R, A>
where
    R: Record,
    A: Send + Sync + 'static,
{
    fn generation(&self) -> u64 {
        self.token.generation()
    }

    /// Fetch the record on its own task, giving up early if the load is aborted
    ///
    /// A panicking fetcher surfaces as a transport failure, like a panicking
    /// asset unit in the engine.
    async fn fetch_record(&self) -> Result<R, FetchError> {
        let fetcher = Arc::clone(&self.shared.record_fetcher);
        let id = self.id.clone();
        let mut unit = tokio::spawn(async move { fetcher.fetch_record(&id).await });

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                unit.abort();
                Err(FetchError::Cancelled)
            }
            joined = &mut unit => match joined {
                Ok(result) => result,
                Err(e) if e.is_cancelled() => Err(FetchError::Cancelled),
                Err(e) => Err(FetchError::Transport(format!(
                    "record fetch panicked: {}",
                    e
                ))),
            },
        }
    }

    /// Record that a superseded load stopped without publishing
    fn discard(&self, stage: Stage) {
        tracing::debug!(
            record_id = %self.id,
            generation = self.generation(),
            stage = ?stage,
            "Discarding result of superseded load"
        );
        self.shared.emit(Event::LoadDiscarded {
            id: self.id.clone(),
            generation: self.generation(),
            stage,
        });
    }

    /// Publish the terminal failure state for a failed record fetch
    fn fail(&self, error: FetchError) {
        let state = LoadState::Failed(self.shared.config.messages.failed_message.clone());
        let event = Event::LoadFailed {
            id: self.id.clone(),
            generation: self.generation(),
            kind: error.kind().to_string(),
            error: error.to_string(),
        };

        if self.shared.commit(self.token, state, event, true) {
            tracing::warn!(
                record_id = %self.id,
                generation = self.generation(),
                kind = error.kind(),
                error = %error,
                "Record fetch failed"
            );
        } else {
            self.discard(Stage::Record);
        }
    }

    /// Publish asset progress; dropped silently once superseded
    fn publish_progress(&self, completed: usize, total: usize) {
        let state = LoadState::Loading(self.shared.config.messages.progress(completed, total));
        let event = Event::Progress {
            id: self.id.clone(),
            generation: self.generation(),
            completed,
            total,
        };
        self.shared.commit(self.token, state, event, false);
    }

    /// Publish the record together with its final asset list
    fn complete(&self, record: R, assets: Vec<A>, requested: usize) {
        let loaded = assets.len();
        let state = LoadState::Loaded {
            record: Arc::new(record),
            assets: Arc::from(assets),
        };
        let event = Event::LoadCompleted {
            id: self.id.clone(),
            generation: self.generation(),
            requested,
            loaded,
        };

        if self.shared.commit(self.token, state, event, true) {
            tracing::info!(
                record_id = %self.id,
                generation = self.generation(),
                requested,
                loaded,
                "Load completed"
            );
        } else {
            self.discard(Stage::Commit);
        }
    }
}

/// Core load task: orchestrates one record and its assets.
///
/// Phases:
/// 1. Fetch the record (a failure here is terminal)
/// 2. Checkpoint: drop the record if the load was superseded meanwhile
/// 3. Fetch all assets concurrently, publishing progress
/// 4. Checkpoint and publish `Loaded` in a single write
pub(crate) async fn run_load_task<R, A>(ctx: LoadTaskContext<R, A>)
where
    R: Record,
    A: Send + Sync + 'static,
{
    // Phase 1: record
    let record = match ctx.fetch_record().await {
        Ok(record) => record,
        Err(FetchError::Cancelled) => {
            ctx.discard(Stage::Record);
            return;
        }
        Err(e) => {
            ctx.fail(e);
            return;
        }
    };

    // Phase 2: first checkpoint
    if !ctx.shared.is_current(ctx.token) {
        ctx.discard(Stage::Record);
        return;
    }

    // Phase 3: assets
    let refs = AssetRef::from_urls(record.asset_urls());
    let requested = refs.len();
    let assets = if refs.is_empty() {
        Vec::new()
    } else {
        ctx.publish_progress(0, requested);
        ctx.shared
            .engine
            .fetch_ordered_with(refs, &ctx.cancel, |progress| {
                ctx.publish_progress(progress.completed, progress.total)
            })
            .await
    };

    // Phase 4: final checkpoint and publish
    ctx.complete(record, assets, requested);
}
