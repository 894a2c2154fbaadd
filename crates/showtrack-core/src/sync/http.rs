//! HTTP transport implementation.
//!
//! Sends [`ApiRequest`]s to the sync server with reqwest. Path segments are
//! percent-encoded onto the configured base URL, so device names and ids
//! containing spaces or slashes stay a single segment.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ETAG, LOCATION};
use reqwest::{Client, Url};
use tracing::debug;

use super::transport::{ApiRequest, ApiResponse, SyncTransport, TransportError, DEVICE_ID_HEADER};
use crate::config::Config;

/// reqwest-backed sync transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: Url,
    client: Client,
}

impl HttpTransport {
    /// Create a transport for the server at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let base_url =
            Url::parse(base_url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(base_url.to_string()));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("showtrack/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        Ok(Self { base_url, client })
    }

    /// Create a transport from the configured server URL
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let Some(ref url) = config.server_url else {
            return Err(TransportError::InvalidUrl("no server URL configured".to_string()));
        };
        Self::new(url, config.request_timeout())
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Full URL for a request
    pub fn url_for(&self, request: &ApiRequest) -> Result<Url, TransportError> {
        let mut url = self.base_url.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| TransportError::InvalidUrl(self.base_url.to_string()))?;
            segments.pop_if_empty();
            segments.extend(request.path_segments());
        }
        Ok(url)
    }
}

#[async_trait(?Send)]
impl SyncTransport for HttpTransport {
    async fn send(&self, request: &ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(request)?;
        debug!("{} {}", request.method(), url);

        let mut builder = self
            .client
            .request(request.method(), url)
            .header(DEVICE_ID_HEADER, request.device_id());
        if let Some(body) = request.body() {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        let header = |name| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let etag = header(ETAG);
        let location = header(LOCATION);

        let body = response
            .text()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        debug!("{} {} -> {}", request.method(), request.path(), status);

        Ok(ApiResponse {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            etag,
            location,
            body,
        })
    }
}
