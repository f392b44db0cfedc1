use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use super::LoadSupervisor;
use crate::config::Config;
use crate::error::{Error, FetchError};
use crate::test_helpers::{PanickingRecords, ScriptedAssets, ScriptedRecords, Story};
use crate::types::{Event, LoadState, Stage};


type TestSupervisor = LoadSupervisor<Story, String>;

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn config(abort_stale_fetches: bool) -> Config {
    let mut config = Config::default();
    config.loader.abort_stale_fetches = abort_stale_fetches;
    config
}

/// Build a supervisor over scripted collaborators, keeping handles for call counting
fn create_test_supervisor(
    records: ScriptedRecords,
    assets: ScriptedAssets,
    config: Config,
) -> (TestSupervisor, Arc<ScriptedRecords>, Arc<ScriptedAssets>) {
    let records = Arc::new(records);
    let assets = Arc::new(assets);
    let supervisor = TestSupervisor::new(config, records.clone(), assets.clone()).unwrap();
    (supervisor, records, assets)
}

/// Everything emitted so far, without waiting
fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

fn loaded_id(state: &LoadState<Story, String>) -> Option<&str> {
    state.record().map(|story| story.id.as_str())
}
