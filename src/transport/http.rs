use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use tracing::debug;

use super::Transport;
use crate::config::ClientConfig;
use crate::error::TransportError;

/// reqwest-backed implementation of [`Transport`].
///
/// Requests carry `Accept: application/json` and honour the timeouts of the
/// [`ClientConfig`] they were built from. Servers give no timeout guarantees
/// of their own, so the request timeout is the only bound on a hung call.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Build a transport from client settings.
    pub fn new(config: &ClientConfig) -> Result<Self, TransportError> {
        Self::with_timeouts(
            config.timeout(),
            config.connect_timeout(),
            config.accept_invalid_certs,
        )
    }

    /// Build a transport with explicit timeouts.
    pub fn with_timeouts(
        timeout: Duration,
        connect_timeout: Duration,
        accept_invalid_certs: bool,
    ) -> Result<Self, TransportError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .danger_accept_invalid_certs(accept_invalid_certs)
            .build()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        Ok(Self { client })
    }

    /// Wrap an already configured reqwest client.
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    async fn read(&self, url: &str, response: reqwest::Response) -> Result<Bytes, TransportError> {
        let status = response.status();
        let body = response.bytes().await.map_err(|e| map_error(url, e))?;

        if !status.is_success() {
            debug!("{} answered {} ({} bytes)", url, status, body.len());
            return Err(TransportError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body,
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_error(url, e))?;
        self.read(url, response).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<Bytes, TransportError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| map_error(url, e))?;
        self.read(url, response).await
    }
}

fn map_error(url: &str, err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(url.to_string())
    } else if err.is_builder() {
        TransportError::InvalidUrl(format!("{}: {}", url, err))
    } else {
        TransportError::Connection(format!("{}: {}", url, err))
    }
}
