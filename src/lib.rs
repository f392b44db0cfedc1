//! # detail-loader
//!
//! Supersedable, order-preserving loader for detail screens: fetch one record,
//! then every asset it references concurrently, and publish both together.
//!
//! ## Design Philosophy
//!
//! detail-loader is designed to be:
//! - **Order-preserving** - Assets are published in the record's order, whatever order they arrive in
//! - **Failure-tolerant** - A broken asset is skipped; only a missing record fails the load
//! - **Supersedable** - A newer request always wins; stale results never reach the screen
//! - **Event-driven** - Consumers observe a state store and a lifecycle event stream
//!
//! ## Quick Start
//!
//! ```no_run
//! use detail_loader::{Config, Image, LoadSupervisor, Record};
//!
//! #[derive(serde::Deserialize)]
//! struct Story {
//!     title: String,
//!     image_urls: Vec<String>,
//! }
//!
//! impl Record for Story {
//!     fn asset_urls(&self) -> Vec<String> {
//!         self.image_urls.clone()
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut config = Config::default();
//!     config.http.record_url_template = "https://api.example.com/stories/{id}".into();
//!
//!     let supervisor: LoadSupervisor<Story, Image> = LoadSupervisor::from_http(config)?;
//!
//!     // Watch the screen state
//!     let mut state = supervisor.subscribe();
//!     tokio::spawn(async move {
//!         while state.changed().await.is_ok() {
//!             println!("state: {}", state.borrow_and_update().name());
//!         }
//!     });
//!
//!     supervisor.load("42").await?;
//!     if let Some(story) = supervisor.state().record() {
//!         println!("{}", story.title);
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Configuration types
pub mod config;
/// Ordered concurrent fetch engine
pub mod engine;
/// Error types
pub mod error;
/// Record and asset collaborators
pub mod fetcher;
/// Retry logic with exponential backoff
pub mod retry;
/// Observable load state
pub mod store;
/// Load supervision (decomposed into focused submodules)
pub mod supervisor;
/// Core types and events
pub mod types;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;

// Re-export commonly used types
pub use config::{Config, HttpConfig, LoaderConfig, MessageConfig, RetryConfig};
pub use engine::{FetchProgress, OrderedConcurrentFetchEngine, fan_out_ordered};
pub use error::{Error, FetchError, Result};
pub use fetcher::{AssetFetcher, HttpImageFetcher, HttpRecordFetcher, Image, RecordFetcher};
pub use retry::Retrying;
pub use store::LoadStateStore;
pub use supervisor::LoadSupervisor;
pub use types::{
    AssetRef, Event, FetchOutcome, LoadState, LoadToken, Record, RecordId, Stage,
};
