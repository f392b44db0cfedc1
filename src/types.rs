//! Core types for detail-loader

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::FetchError;

/// Opaque identifier of the primary entity being loaded
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    /// Create a new RecordId
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the inner identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for RecordId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for RecordId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to one binary asset, tagged with its position in the record's asset list
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetRef {
    index: usize,
    url: String,
}

impl AssetRef {
    /// Create a reference for the asset at `index`
    pub fn new(index: usize, url: impl Into<String>) -> Self {
        Self {
            index,
            url: url.into(),
        }
    }

    /// Build indexed references from an ordered list of URLs
    pub fn from_urls<I, S>(urls: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        urls.into_iter()
            .enumerate()
            .map(|(index, url)| Self::new(index, url))
            .collect()
    }

    /// Position of this asset in the original list
    pub fn index(&self) -> usize {
        self.index
    }

    /// The raw reference (usually a URL)
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Display for AssetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.index, self.url)
    }
}

/// Validity marker of one load operation
///
/// Minted from a monotonically increasing generation counter. Only the supervisor
/// creates tokens; a token compares equal only to itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LoadToken(u64);

impl LoadToken {
    pub(crate) fn from_generation(generation: u64) -> Self {
        Self(generation)
    }

    /// Generation number of this token (strictly increasing per supervisor)
    pub fn generation(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for LoadToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

/// Result of one individual fetch
#[derive(Clone, Debug, PartialEq)]
pub enum FetchOutcome<T> {
    /// The fetch produced a value
    Success(T),
    /// The fetch failed; the value is dropped by the engine
    Failure(FetchError),
}

impl<T> FetchOutcome<T> {
    /// Returns true for `Success`
    pub fn is_success(&self) -> bool {
        matches!(self, FetchOutcome::Success(_))
    }

    /// Convert into the success value, discarding failures
    pub fn success(self) -> Option<T> {
        match self {
            FetchOutcome::Success(value) => Some(value),
            FetchOutcome::Failure(_) => None,
        }
    }

    /// Borrow the failure, if any
    pub fn failure(&self) -> Option<&FetchError> {
        match self {
            FetchOutcome::Success(_) => None,
            FetchOutcome::Failure(e) => Some(e),
        }
    }
}

impl<T> From<Result<T, FetchError>> for FetchOutcome<T> {
    fn from(result: Result<T, FetchError>) -> Self {
        match result {
            Ok(value) => FetchOutcome::Success(value),
            Err(e) => FetchOutcome::Failure(e),
        }
    }
}

/// A record that references an ordered list of remote assets
pub trait Record: Send + Sync + 'static {
    /// Asset locations in display order
    fn asset_urls(&self) -> Vec<String>;
}

/// Observable state of a detail screen's load
///
/// `Loaded` carries the record and its final asset list together; both are
/// `Arc`-shared so readers can clone the state cheaply.
#[derive(Debug)]
pub enum LoadState<R, A> {
    /// Nothing requested yet (or reset)
    Idle,
    /// A load is in flight; the message describes its progress
    Loading(String),
    /// The record and every successfully fetched asset, in original order
    Loaded {
        /// The fetched record
        record: Arc<R>,
        /// Successfully fetched assets, possibly fewer than requested
        assets: Arc<[A]>,
    },
    /// The record could not be fetched; the message is user-facing
    Failed(String),
}

impl<R, A> Clone for LoadState<R, A> {
    fn clone(&self) -> Self {
        match self {
            LoadState::Idle => LoadState::Idle,
            LoadState::Loading(message) => LoadState::Loading(message.clone()),
            LoadState::Loaded { record, assets } => LoadState::Loaded {
                record: Arc::clone(record),
                assets: Arc::clone(assets),
            },
            LoadState::Failed(message) => LoadState::Failed(message.clone()),
        }
    }
}

impl<R, A> Default for LoadState<R, A> {
    fn default() -> Self {
        LoadState::Idle
    }
}

impl<R, A> LoadState<R, A> {
    /// Short lowercase name of the state, for logs and events
    pub fn name(&self) -> &'static str {
        match self {
            LoadState::Idle => "idle",
            LoadState::Loading(_) => "loading",
            LoadState::Loaded { .. } => "loaded",
            LoadState::Failed(_) => "failed",
        }
    }

    /// Returns true while a load is in flight
    pub fn is_loading(&self) -> bool {
        matches!(self, LoadState::Loading(_))
    }

    /// The progress or failure message, if the state carries one
    pub fn message(&self) -> Option<&str> {
        match self {
            LoadState::Loading(message) | LoadState::Failed(message) => Some(message),
            LoadState::Idle | LoadState::Loaded { .. } => None,
        }
    }

    /// The loaded record, if any
    pub fn record(&self) -> Option<&R> {
        match self {
            LoadState::Loaded { record, .. } => Some(record.as_ref()),
            _ => None,
        }
    }

    /// The loaded assets, if any
    pub fn assets(&self) -> Option<&[A]> {
        match self {
            LoadState::Loaded { assets, .. } => Some(&assets[..]),
            _ => None,
        }
    }
}

/// Stage of a load at which a stale result was dropped
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// After the record fetch resolved
    Record,
    /// Right before the final `Loaded` write
    Commit,
}

/// Lifecycle events emitted by a [`LoadSupervisor`](crate::LoadSupervisor)
///
/// Events are emitted in the same order as the state transitions they describe.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new load was started; any previous load is superseded
    LoadStarted {
        /// Requested record
        id: RecordId,
        /// Generation of the new load
        generation: u64,
    },

    /// Asset fetching progressed
    Progress {
        /// Requested record
        id: RecordId,
        /// Generation of the load
        generation: u64,
        /// Asset fetches settled so far (success or failure)
        completed: usize,
        /// Asset fetches dispatched
        total: usize,
    },

    /// The record and its assets were published
    LoadCompleted {
        /// Loaded record
        id: RecordId,
        /// Generation of the load
        generation: u64,
        /// Number of assets the record referenced
        requested: usize,
        /// Number of assets that were fetched successfully
        loaded: usize,
    },

    /// The record fetch failed
    LoadFailed {
        /// Requested record
        id: RecordId,
        /// Generation of the load
        generation: u64,
        /// Machine-readable failure kind
        kind: String,
        /// Failure detail (not user-facing)
        error: String,
    },

    /// A superseded load was dropped before publishing (its result or its abort)
    LoadDiscarded {
        /// Requested record
        id: RecordId,
        /// Generation of the stale load
        generation: u64,
        /// Where the stale result was dropped
        stage: Stage,
    },

    /// The current load was cancelled without a replacement
    LoadCancelled {
        /// Generation of the cancelled load
        generation: u64,
    },
}
