//! HTTP implementations of the record and asset collaborators.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;

use crate::config::HttpConfig;
use crate::error::{Error, FetchError, Result};
use crate::types::{AssetRef, RecordId};

use super::decode::{Image, decode_image_blocking};
use super::{AssetFetcher, RecordFetcher};

/// Build the shared HTTP client from configuration
///
/// One client is shared by the record and asset fetchers so they reuse the
/// same connection pool.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.request_timeout)
        .user_agent(config.user_agent.clone())
        .build()
        .map_err(Error::Network)
}

/// Fetches JSON records from a templated endpoint
pub struct HttpRecordFetcher<R> {
    client: reqwest::Client,
    config: HttpConfig,
    _record: PhantomData<fn() -> R>,
}

impl<R> HttpRecordFetcher<R> {
    /// Create a fetcher using `client` for requests to `config.record_url_template`
    pub fn new(client: reqwest::Client, config: HttpConfig) -> Self {
        Self {
            client,
            config,
            _record: PhantomData,
        }
    }
}

#[async_trait]
impl<R> RecordFetcher<R> for HttpRecordFetcher<R>
where
    R: DeserializeOwned + Send + 'static,
{
    async fn fetch_record(&self, id: &RecordId) -> std::result::Result<R, FetchError> {
        let url = self.config.record_url(id.as_str());

        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(FetchError::RecordNotFound(id.clone()));
        }
        if !status.is_success() {
            return Err(FetchError::RemoteStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            FetchError::Decode(format!("invalid record payload for {}: {}", id, e))
        })
    }
}

/// Fetches image assets and validates that they decode
#[derive(Clone)]
pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    /// Create a fetcher using `client`
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

/// Parse an asset reference into an absolute http(s) URL
pub(crate) fn parse_reference(reference: &AssetRef) -> std::result::Result<url::Url, FetchError> {
    let url = url::Url::parse(reference.url()).map_err(|e| FetchError::InvalidReference {
        reference: reference.url().to_string(),
        reason: e.to_string(),
    })?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        scheme => Err(FetchError::InvalidReference {
            reference: reference.url().to_string(),
            reason: format!("unsupported scheme '{}'", scheme),
        }),
    }
}

#[async_trait]
impl AssetFetcher<Image> for HttpImageFetcher {
    async fn fetch_asset(&self, reference: &AssetRef) -> std::result::Result<Image, FetchError> {
        let url = parse_reference(reference)?;

        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::RemoteStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await?;
        decode_image_blocking(reference, body.to_vec()).await
    }
}
