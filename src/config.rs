//! Client configuration.
//!
//! [`ClientConfig`] derives [`clap::Args`], so applications embedding the
//! client can flatten it into their own command line:
//!
//! ```ignore
//! #[derive(clap::Parser)]
//! struct Cli {
//!     #[command(flatten)]
//!     client: wsi_client::ClientConfig,
//! }
//! ```
//!
//! # Environment Variables
//!
//! Every option can also be set via an environment variable with the
//! `WSI_CLIENT_` prefix:
//!
//! - `WSI_CLIENT_LOCAL_URL` - Base URL of the local viewer (default: http://localhost:54001/)
//! - `WSI_CLIENT_CALLER` - Caller tag sent when authenticating (default: SDK.Rust)
//! - `WSI_CLIENT_TIMEOUT` - Whole-request timeout in seconds (default: 30)
//! - `WSI_CLIENT_CONNECT_TIMEOUT` - Connect timeout in seconds (default: 10)
//! - `WSI_CLIENT_ACCEPT_INVALID_CERTS` - Accept self-signed TLS certificates (default: false)

use std::time::Duration;

use clap::Args;

// =============================================================================
// Default Values
// =============================================================================

/// Well-known base URL of the local viewer.
pub const DEFAULT_LOCAL_URL: &str = "http://localhost:54001/";

/// Caller tag sent on authentication. Also the sentinel session id of the local viewer.
pub const DEFAULT_CALLER: &str = "SDK.Rust";

/// Default whole-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default connect timeout in seconds.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

// =============================================================================
// Client Configuration
// =============================================================================

/// Settings shared by every session a client manages.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Base URL of the local viewer that needs no authentication.
    #[arg(long, default_value = DEFAULT_LOCAL_URL, env = "WSI_CLIENT_LOCAL_URL")]
    pub local_url: String,

    /// Caller tag sent on authentication requests.
    #[arg(long, default_value = DEFAULT_CALLER, env = "WSI_CLIENT_CALLER")]
    pub caller: String,

    /// Whole-request timeout in seconds.
    #[arg(long = "timeout", default_value_t = DEFAULT_TIMEOUT_SECS, env = "WSI_CLIENT_TIMEOUT")]
    pub timeout_secs: u64,

    /// Connect timeout in seconds.
    #[arg(
        long = "connect-timeout",
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "WSI_CLIENT_CONNECT_TIMEOUT"
    )]
    pub connect_timeout_secs: u64,

    /// Accept invalid TLS certificates (self-signed lab servers).
    #[arg(long, default_value_t = false, env = "WSI_CLIENT_ACCEPT_INVALID_CERTS")]
    pub accept_invalid_certs: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            local_url: DEFAULT_LOCAL_URL.to_string(),
            caller: DEFAULT_CALLER.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            accept_invalid_certs: false,
        }
    }
}

impl ClientConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.timeout_secs == 0 {
            return Err("timeout must be greater than 0".to_string());
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect timeout must be greater than 0".to_string());
        }
        if self.connect_timeout_secs > self.timeout_secs {
            return Err("connect timeout cannot exceed the request timeout".to_string());
        }

        if self.caller.trim().is_empty() {
            return Err("caller tag is required. Set --caller or WSI_CLIENT_CALLER".to_string());
        }

        match url::Url::parse(&self.local_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
            Ok(url) => Err(format!("local URL must be http(s), got '{}'", url.scheme())),
            Err(e) => Err(format!("local URL '{}' is invalid: {}", self.local_url, e)),
        }
    }

    /// Whole-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Connect timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Sentinel session id used for the local viewer.
    pub fn local_session_id(&self) -> &str {
        &self.caller
    }
}

// =============================================================================
// Tests
// =============================================================================
