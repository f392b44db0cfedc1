//! Error types for detail-loader
//!
//! Two layers of errors exist:
//! - [`FetchError`] - the per-fetch failure taxonomy produced by record and asset
//!   collaborators. Asset-level failures never escape the fetch engine; record-level
//!   failures become a terminal `Failed` load state.
//! - [`Error`] - construction and configuration failures of the library itself.

use crate::types::RecordId;
use thiserror::Error;

/// Result type alias for detail-loader operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for detail-loader
///
/// Returned by constructors and configuration helpers. Load operations never
/// return this type: their failures are observable through the load state.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "max_concurrent_fetches")
        key: Option<String>,
    },

    /// HTTP client could not be constructed
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No tokio runtime was available to spawn load tasks on
    #[error("no tokio runtime available: {0}")]
    NoRuntime(String),
}

impl Error {
    /// Build a configuration error for a specific key
    pub fn config(key: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Failure of a single record or asset fetch
///
/// Cheap to clone so it can travel inside [`FetchOutcome`](crate::types::FetchOutcome)
/// values and lifecycle events.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FetchError {
    /// The asset reference could not be turned into a fetchable location
    #[error("invalid reference {reference}: {reason}")]
    InvalidReference {
        /// The offending reference as given by the record
        reference: String,
        /// Why it was rejected
        reason: String,
    },

    /// Connection, timeout, or body transfer failure
    #[error("transport failure: {0}")]
    Transport(String),

    /// The remote answered with a non-success status
    #[error("remote returned status {status}")]
    RemoteStatus {
        /// HTTP status code
        status: u16,
    },

    /// The payload arrived but could not be decoded
    #[error("decode failure: {0}")]
    Decode(String),

    /// The requested record does not exist
    #[error("record {0} not found")]
    RecordNotFound(RecordId),

    /// The fetch was abandoned because its load was superseded
    #[error("fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Machine-readable error kind, stable across releases
    ///
    /// Suitable for analytics and event payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::InvalidReference { .. } => "invalid_reference",
            FetchError::Transport(_) => "transport",
            FetchError::RemoteStatus { .. } => "remote_status",
            FetchError::Decode(_) => "decode",
            FetchError::RecordNotFound(_) => "record_not_found",
            FetchError::Cancelled => "cancelled",
        }
    }

    /// Returns true for the silent cancellation outcome
    pub fn is_cancelled(&self) -> bool {
        matches!(self, FetchError::Cancelled)
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return FetchError::RemoteStatus {
                status: status.as_u16(),
            };
        }
        if e.is_decode() {
            return FetchError::Decode(e.to_string());
        }
        let detail = if e.is_timeout() {
            format!("request timed out: {}", e)
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else {
            e.to_string()
        };
        FetchError::Transport(detail)
    }
}
