//! Configuration types for detail-loader

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Placeholder replaced by the URL-encoded record id in [`HttpConfig::record_url_template`]
pub const RECORD_ID_PLACEHOLDER: &str = "{id}";

/// Fan-out and supersession behavior
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Upper bound on concurrent asset fetches per load (None = unbounded)
    ///
    /// Unbounded matches the behavior of the screens this crate backs. Records with
    /// very large asset lists may want a bound to avoid exhausting sockets.
    #[serde(default)]
    pub max_concurrent_fetches: Option<usize>,

    /// Interrupt in-flight fetches of a superseded load (default: true)
    ///
    /// Stale results are discarded at checkpoints either way; this only stops
    /// wasting bandwidth on them.
    #[serde(default = "default_true")]
    pub abort_stale_fetches: bool,

    /// Capacity of the lifecycle event channel (default: 256)
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_concurrent_fetches: None,
            abort_stale_fetches: true,
            event_buffer: default_event_buffer(),
        }
    }
}

/// User-facing messages published through the load state
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageConfig {
    /// Shown while the record is being fetched
    #[serde(default = "default_loading_message")]
    pub loading_message: String,

    /// Shown while assets are being fetched; `{completed}` and `{total}` are substituted
    #[serde(default = "default_progress_message")]
    pub progress_message: String,

    /// Shown when the record could not be fetched
    #[serde(default = "default_failed_message")]
    pub failed_message: String,
}

impl Default for MessageConfig {
    fn default() -> Self {
        Self {
            loading_message: default_loading_message(),
            progress_message: default_progress_message(),
            failed_message: default_failed_message(),
        }
    }
}

impl MessageConfig {
    /// Render the progress message for `completed` of `total` settled asset fetches
    pub fn progress(&self, completed: usize, total: usize) -> String {
        self.progress_message
            .replace("{completed}", &completed.to_string())
            .replace("{total}", &total.to_string())
    }
}

/// HTTP collaborator settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Record endpoint; must contain `{id}` (default: "http://localhost/stories/{id}")
    #[serde(default = "default_record_url_template")]
    pub record_url_template: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            record_url_template: default_record_url_template(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    /// Build the record URL for an id
    pub fn record_url(&self, id: &str) -> String {
        self.record_url_template
            .replace(RECORD_ID_PLACEHOLDER, &urlencoding::encode(id))
    }
}

/// Retry configuration for transient failures
///
/// Only applied when a collaborator is wrapped in [`Retrying`](crate::retry::Retrying).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (default: 3)
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Initial delay before first retry (default: 200 milliseconds)
    #[serde(default = "default_initial_delay", with = "duration_ms_serde")]
    pub initial_delay: Duration,

    /// Maximum delay between retries (default: 5 seconds)
    #[serde(default = "default_max_delay", with = "duration_ms_serde")]
    pub max_delay: Duration,

    /// Multiplier for exponential backoff (default: 2.0)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: true)
    #[serde(default = "default_true")]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_delay: default_initial_delay(),
            max_delay: default_max_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: true,
        }
    }
}

/// Main configuration for a [`LoadSupervisor`](crate::LoadSupervisor)
///
/// Fields are organized into sub-configs:
/// - [`loader`](LoaderConfig) - fan-out bound, stale-fetch abort, event buffer
/// - [`messages`](MessageConfig) - user-facing state messages
/// - [`http`](HttpConfig) - HTTP collaborator settings
/// - [`retry`](RetryConfig) - opt-in retry policy
///
/// `loader` and `messages` are flattened, so their keys sit at the top level of
/// the JSON form.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Fan-out and supersession behavior
    #[serde(flatten)]
    pub loader: LoaderConfig,

    /// User-facing messages
    #[serde(flatten)]
    pub messages: MessageConfig,

    /// HTTP collaborator settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Retry policy for wrapped collaborators
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Config {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values that would make loads misbehave
    pub fn validate(&self) -> Result<()> {
        if self.loader.max_concurrent_fetches == Some(0) {
            return Err(Error::config(
                "max_concurrent_fetches",
                "must be greater than zero (omit it for unbounded fan-out)",
            ));
        }
        if self.loader.event_buffer == 0 {
            return Err(Error::config("event_buffer", "must be greater than zero"));
        }
        if !self.http.record_url_template.contains(RECORD_ID_PLACEHOLDER) {
            return Err(Error::config(
                "http.record_url_template",
                format!("must contain the {} placeholder", RECORD_ID_PLACEHOLDER),
            ));
        }
        if self.retry.backoff_multiplier < 1.0 {
            return Err(Error::config(
                "retry.backoff_multiplier",
                "must be at least 1.0",
            ));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    256
}

fn default_loading_message() -> String {
    "Loading story…".to_string()
}

fn default_progress_message() -> String {
    "Loading images ({completed} of {total})…".to_string()
}

fn default_failed_message() -> String {
    "Couldn't load this story. Pull to refresh to try again.".to_string()
}

fn default_record_url_template() -> String {
    "http://localhost/stories/{id}".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_user_agent() -> String {
    concat!("detail-loader/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_delay() -> Duration {
    Duration::from_millis(200)
}

fn default_max_delay() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

// Duration serialization helper
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Millisecond Duration serialization helper (retry delays are sub-second)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
