//! Transport layer.
//!
//! The client never talks to the network directly. Every request goes
//! through the [`Transport`] trait, which keeps the session and metadata
//! logic testable against in-memory servers.
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                 Client                  │
//! └────────────────────┬────────────────────┘
//!                      │  ApiUrl (query.rs)
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │            Transport Trait              │
//! └────────────────────┬────────────────────┘
//!                      │  Bytes
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │      Payload classification             │
//! │  {d: ...} / array / scalar / XML        │
//! └─────────────────────────────────────────┘
//! ```

mod http;
mod query;
mod response;

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;

pub use http::HttpTransport;
pub use query::{join_url, quote, ApiUrl};
pub use response::{xml_text_elements, Fault, Payload, PayloadError};

/// Issues requests against a server and returns raw response bodies.
///
/// Implementations must be thread-safe. A non-success HTTP status should be
/// reported as [`TransportError::Status`] with the body attached.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET the given absolute URL.
    async fn get(&self, url: &str) -> Result<Bytes, TransportError>;

    /// POST a JSON body to the given absolute URL.
    async fn post_json(&self, url: &str, body: &serde_json::Value)
        -> Result<Bytes, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        (**self).get(url).await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<Bytes, TransportError> {
        (**self).post_json(url, body).await
    }
}
