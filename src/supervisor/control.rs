//! Load lifecycle control: load, reload, cancel, reset.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::types::{Event, LoadState, LoadToken, Record, RecordId};

use super::load_task::{LoadTaskContext, run_load_task};
use super::{ActiveLoad, LoadSupervisor, WriterState};

impl<R, A> LoadSupervisor<R, A>
where
    R: Record,
    A: Send + Sync + 'static,
{
    /// Start loading the record `id` and its assets
    ///
    /// Returns immediately. Before returning, the state is `Loading` with the
    /// configured loading message and any previous load has been superseded:
    /// nothing it produces from now on will be published.
    ///
    /// The returned handle resolves once the spawned task has finished,
    /// whether it published a result or was superseded. Dropping it does not
    /// stop the load.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use detail_loader::*;
    /// # async fn example(supervisor: LoadSupervisor<MyStory, Image>) {
    /// supervisor.load("story-42");
    /// # }
    /// # struct MyStory;
    /// # impl Record for MyStory { fn asset_urls(&self) -> Vec<String> { vec![] } }
    /// ```
    pub fn load(&self, id: impl Into<RecordId>) -> JoinHandle<()> {
        let id = id.into();
        let abort = self.shared.config.loader.abort_stale_fetches;

        let (token, cancel) = {
            let mut writer = self.shared.lock_writer();
            if let Some(previous) = writer.current.take() {
                tracing::debug!(
                    record_id = %previous.id,
                    generation = previous.token.generation(),
                    "Superseding in-flight load"
                );
                if abort {
                    previous.cancel.cancel();
                }
            }

            writer.generation += 1;
            let token = LoadToken::from_generation(writer.generation);
            let cancel = CancellationToken::new();
            writer.current = Some(ActiveLoad {
                token,
                id: id.clone(),
                cancel: cancel.clone(),
            });
            writer.last_id = Some(id.clone());

            self.shared.store.replace(LoadState::Loading(
                self.shared.config.messages.loading_message.clone(),
            ));
            self.shared.emit(Event::LoadStarted {
                id: id.clone(),
                generation: token.generation(),
            });
            (token, cancel)
        };

        tracing::info!(record_id = %id, generation = token.generation(), "Load started");

        let ctx = LoadTaskContext {
            shared: std::sync::Arc::clone(&self.shared),
            id,
            token,
            cancel,
        };
        self.shared.runtime.spawn(run_load_task(ctx))
    }

    /// Load the most recently requested id again
    ///
    /// Returns `None` if `load` was never called. Also works after a failure
    /// or a cancel, which is how a "pull to refresh" retry is driven.
    pub fn reload(&self) -> Option<JoinHandle<()>> {
        let id = self.shared.lock_writer().last_id.clone()?;
        Some(self.load(id))
    }

    /// Retire the current load without starting another one
    ///
    /// The state is left as it is: a screen going away does not need to see
    /// `Idle`. Safe to call repeatedly, with or without a load in flight.
    pub fn cancel_all(&self) {
        let mut writer = self.shared.lock_writer();
        self.retire(&mut writer);
    }

    /// Retire the current load and return the state to `Idle`
    pub fn reset(&self) {
        let mut writer = self.shared.lock_writer();
        self.retire(&mut writer);
        self.shared.store.replace(LoadState::Idle);
    }

    fn retire(&self, writer: &mut WriterState) {
        let Some(previous) = writer.current.take() else {
            return;
        };
        if self.shared.config.loader.abort_stale_fetches {
            previous.cancel.cancel();
        }
        tracing::debug!(
            record_id = %previous.id,
            generation = previous.token.generation(),
            "Load cancelled"
        );
        self.shared.emit(Event::LoadCancelled {
            generation: previous.token.generation(),
        });
    }
}
