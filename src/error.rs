use bytes::Bytes;
use thiserror::Error;

/// Errors raised by the HTTP transport before a response could be classified
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// DNS, connect or TLS failure
    #[error("Connection error: {0}")]
    Connection(String),

    /// The request did not complete within the configured timeout
    #[error("Request timed out: {0}")]
    Timeout(String),

    /// Server answered with a non-success status
    ///
    /// The body is kept because servers report structured faults
    /// (`Code` + `Message`) alongside error statuses.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String, body: Bytes },

    /// URL could not be built or parsed
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Errors surfaced by client operations
#[derive(Debug, Clone, Error)]
pub enum ClientError {
    /// Transport failure while talking to the server
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session id is neither registered nor the local server sentinel
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// No explicit session, nothing registered and no local server running
    #[error("No session available: connect to a server or start the local viewer")]
    NoSession,

    /// Structured fault reported by the server
    #[error(
        "{endpoint} for '{input}' resulted in: {message} (code {code}; keep in mind that paths are case-sensitive)"
    )]
    Server {
        endpoint: &'static str,
        input: String,
        code: String,
        message: String,
    },

    /// Response could not be interpreted
    #[error("Unexpected response from {endpoint}: {reason}")]
    UnexpectedResponse {
        endpoint: &'static str,
        reason: String,
    },

    /// Server returned no usable value for the input
    #[error("{endpoint} returned nothing for '{input}'")]
    NotFound {
        endpoint: &'static str,
        input: String,
    },

    /// Caller supplied an unusable parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ClientError {
    /// Whether the error came from the network rather than the server's answer.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }
}
