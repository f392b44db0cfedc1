//! Collaborator interfaces for fetching records and assets.
//!
//! The supervisor and engine only see these traits, injected as `Arc<dyn ...>`,
//! so transports can be swapped (or scripted in tests) without touching the
//! pipeline. HTTP implementations live in [`http`], image validation in [`decode`].

use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::{AssetRef, RecordId};

pub mod decode;
pub mod http;

pub use self::decode::{Image, decode_image, decode_image_blocking};
pub use self::http::{HttpImageFetcher, HttpRecordFetcher, build_client};

/// Fetches one primary record by id.
///
/// Implementations report a missing record as [`FetchError::RecordNotFound`] and
/// never retry on their own; wrap them in [`Retrying`](crate::retry::Retrying) for that.
#[async_trait]
pub trait RecordFetcher<R>: Send + Sync {
    /// Fetch the record identified by `id`
    async fn fetch_record(&self, id: &RecordId) -> Result<R, FetchError>;
}

/// Fetches one binary asset by reference.
///
/// Implementations validate the remote status and payload decodability before
/// returning `Ok`; every validation failure is an `Err`, never a panic.
#[async_trait]
pub trait AssetFetcher<A>: Send + Sync {
    /// Fetch and validate the asset behind `reference`
    async fn fetch_asset(&self, reference: &AssetRef) -> Result<A, FetchError>;
}
