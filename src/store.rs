//! Observable load state holder.

use tokio::sync::watch;

use crate::types::LoadState;

/// Single-writer, multi-reader holder of a screen's [`LoadState`].
///
/// Every write replaces the whole state in one step, so readers either see the
/// previous state or the new one: a `Loaded` state is never visible with its
/// asset list still being filled in. Only the owning supervisor writes.
pub struct LoadStateStore<R, A> {
    tx: watch::Sender<LoadState<R, A>>,
}

impl<R, A> Default for LoadStateStore<R, A> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R, A> LoadStateStore<R, A> {
    /// Create a store in the `Idle` state
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(LoadState::Idle);
        Self { tx }
    }

    /// Snapshot of the current state
    ///
    /// Cheap: record and assets are shared, not copied.
    pub fn current(&self) -> LoadState<R, A> {
        self.tx.borrow().clone()
    }

    /// Subscribe to state changes
    ///
    /// The receiver starts at the current state; `changed().await` resolves on
    /// every later replacement. Intermediate states may be skipped by slow
    /// readers, but the latest one is always observed.
    pub fn subscribe(&self) -> watch::Receiver<LoadState<R, A>> {
        self.tx.subscribe()
    }

    /// Replace the whole state, returning the previous one
    pub(crate) fn replace(&self, state: LoadState<R, A>) -> LoadState<R, A> {
        self.tx.send_replace(state)
    }
}
