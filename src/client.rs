//! The client: session lifecycle and request plumbing.
//!
//! A [`Client`] owns the [`SessionRegistry`] and the [`Transport`] every
//! request goes through. Operations on slides, directories, tiles and forms
//! live in their own modules as further `impl` blocks on [`Client`].
//!
//! # Default session
//!
//! Operations take an optional session id. When it is omitted, the
//! earliest registered session still alive is used (first wins; a later
//! [`Client::connect`] never takes over). With nothing registered, the
//! local viewer is probed and, if it is running, registered under its
//! sentinel id.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{ClientError, TransportError};
use crate::session::{Session, SessionRegistry};
use crate::transport::{join_url, ApiUrl, HttpTransport, Payload, PayloadError, Transport};

// =============================================================================
// Client
// =============================================================================

/// Client for one process (or one test), shareable across tasks via `Arc`.
pub struct Client<T: Transport = HttpTransport> {
    transport: T,
    config: ClientConfig,
    registry: SessionRegistry,
    /// Serializes probing of the local viewer so concurrent resolvers agree
    probe_lock: Mutex<()>,
}

impl Client<HttpTransport> {
    /// Create a client talking HTTP with the given settings.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        config.validate().map_err(ClientError::InvalidParameter)?;
        let transport = HttpTransport::new(&config)?;
        Ok(Self::with_transport(transport, config))
    }
}

impl<T: Transport> Client<T> {
    /// Create a client on top of an arbitrary transport.
    pub fn with_transport(transport: T, config: ClientConfig) -> Self {
        Self {
            transport,
            config,
            registry: SessionRegistry::new(),
            probe_lock: Mutex::new(()),
        }
    }

    /// Client settings.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// The underlying transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Registry of live sessions.
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    // =========================================================================
    // Session resolution
    // =========================================================================

    /// Decide which session an operation should use.
    ///
    /// An explicit id is returned unchanged; it is validated when used. With
    /// no explicit id, the first registered session wins. If none is
    /// registered, the local viewer is probed and registered under its
    /// sentinel id when it is running. Returns `None` when nothing is
    /// available.
    pub async fn resolve_session(&self, explicit: Option<&str>) -> Option<String> {
        if let Some(id) = explicit {
            return Some(id.to_string());
        }

        if let Some(first) = self.registry.first().await {
            return Some(first.id().to_string());
        }

        let _probe = self.probe_lock.lock().await;
        // Another task may have registered a session while we waited
        if let Some(first) = self.registry.first().await {
            return Some(first.id().to_string());
        }

        if self.local_server_running().await {
            let session = self.register_local(0).await;
            debug!("Using local viewer session {}", session.id());
            Some(session.id().to_string())
        } else {
            debug!("No session registered and local viewer not running");
            None
        }
    }

    /// Base URL (with trailing `/`) of the server a session belongs to.
    pub async fn url_for(&self, session_id: &str) -> Result<String, ClientError> {
        if session_id == self.config.local_session_id() {
            return Ok(join_url(&self.config.local_url, ""));
        }

        self.registry
            .get(session_id)
            .await
            .map(|session| session.server_url().to_string())
            .ok_or_else(|| ClientError::InvalidSession(session_id.to_string()))
    }

    /// Resolve and look up the session an operation runs against.
    pub(crate) async fn session(&self, explicit: Option<&str>) -> Result<Arc<Session>, ClientError> {
        let id = self
            .resolve_session(explicit)
            .await
            .ok_or(ClientError::NoSession)?;

        if let Some(session) = self.registry.get(&id).await {
            return Ok(session);
        }

        if id == self.config.local_session_id() {
            return Ok(self.register_local(0).await);
        }

        Err(ClientError::InvalidSession(id))
    }

    /// Whether `session` is the local viewer's sentinel session.
    pub(crate) fn is_local(&self, session: &Session) -> bool {
        session.id() == self.config.local_session_id()
    }

    async fn register_local(&self, initial_bytes: u64) -> Arc<Session> {
        let session = Session::new(
            self.config.local_session_id(),
            &self.config.local_url,
            None,
            initial_bytes,
        );
        self.registry.register(session).await
    }

    // =========================================================================
    // Connect / Disconnect
    // =========================================================================

    /// Authenticate against a server and register the resulting session.
    ///
    /// The local viewer URL needs no credentials: it is only probed for
    /// liveness. Any failure (unreachable server, rejected credentials,
    /// unexpected answer) is logged and reported as `None`. Nothing is
    /// retried.
    pub async fn connect(&self, server_url: &str, username: &str, password: &str) -> Option<String> {
        if same_server(server_url, &self.config.local_url) {
            if !self.local_server_running().await {
                warn!("Local viewer at {} is not running", server_url);
                return None;
            }
            let session = self.register_local(0).await;
            return Some(session.id().to_string());
        }

        let url = ApiUrl::new(server_url, "api/json/authenticate")
            .param("caller", &self.config.caller)
            .param_opt("username", Some(username).filter(|u| !u.is_empty()))
            .param_opt("password", Some(password).filter(|p| !p.is_empty()));
        let url = match url.build() {
            Ok(url) => url,
            Err(e) => {
                warn!("Cannot connect to {}: {}", server_url, e);
                return None;
            }
        };

        let body = match self.transport.get(&url).await {
            Ok(body) => body,
            Err(e) => {
                warn!("Authentication against {} failed: {}", server_url, e);
                return None;
            }
        };

        let Some(session_id) = parse_login(&body) else {
            warn!("Authentication against {} was rejected", server_url);
            return None;
        };

        let username = (!username.is_empty()).then(|| username.to_string());
        let session = self
            .registry
            .register(Session::new(session_id, server_url, username, body.len() as u64))
            .await;
        info!("Connected to {} (session {})", session.server_url(), session.id());
        Some(session.id().to_string())
    }

    /// Close a session.
    ///
    /// A best-effort de-authentication call is made first; its response still
    /// counts towards the session's downloaded bytes. Returns `false` when
    /// the resolved session is not registered.
    pub async fn disconnect(&self, session_id: Option<&str>) -> bool {
        let Some(id) = self.resolve_session(session_id).await else {
            return false;
        };
        let Some(session) = self.registry.get(&id).await else {
            debug!("Disconnect of unknown session {}", id);
            return false;
        };

        let url = ApiUrl::new(&session.api_url(), "DeAuthenticate").param("sessionID", &id);
        match url.build() {
            Ok(url) => match self.transport.get(&url).await {
                Ok(body) => session.add_bytes(body.len() as u64),
                Err(TransportError::Status { body, .. }) => session.add_bytes(body.len() as u64),
                Err(e) => debug!("De-authentication of {} failed: {}", id, e),
            },
            Err(e) => debug!("De-authentication of {} skipped: {}", id, e),
        }

        let removed = self.registry.remove(&id).await.is_some();
        if removed {
            info!(
                "Disconnected session {} ({} bytes downloaded)",
                id,
                session.bytes_downloaded()
            );
        }
        removed
    }

    // =========================================================================
    // Server probes
    // =========================================================================

    /// Ask a server whether it is the local "lite" viewer.
    ///
    /// Servers only expose this probe on their XML API; the answer is a
    /// `<boolean>` element.
    ///
    /// Defaults to the local viewer URL. `None` means the server could not
    /// be reached or gave no usable answer.
    pub async fn is_lite(&self, server_url: Option<&str>) -> Option<bool> {
        let base = server_url.unwrap_or(&self.config.local_url);
        let url = ApiUrl::new(base, "api/xml/IsLite").build().ok()?;

        match self.transport.get(&url).await {
            Ok(body) => Payload::parse(&body).ok()?.into_bool(),
            Err(e) => {
                debug!("IsLite probe of {} failed: {}", base, e);
                None
            }
        }
    }

    /// Version string reported by a server (defaults to the local viewer).
    pub async fn version_info(&self, server_url: Option<&str>) -> Result<Option<String>, ClientError> {
        let base = server_url.unwrap_or(&self.config.local_url);
        let url = ApiUrl::new(base, "api/json/GetVersionInfo").build()?;

        let body = self.transport.get(&url).await?;
        let payload = Payload::parse(&body).map_err(|e| payload_error("GetVersionInfo", base, e))?;
        Ok(payload.into_string())
    }

    /// Check that a session is still accepted by its server.
    pub async fn ping(&self, session_id: Option<&str>) -> bool {
        let Ok(session) = self.session(session_id).await else {
            return false;
        };
        let url = ApiUrl::new(&session.api_url(), "Ping").param("sessionID", session.id());

        match self.api_get(&session, "Ping", session.id(), url).await {
            Ok(payload) => payload.into_bool().unwrap_or(false),
            Err(e) => {
                debug!("Ping of {} failed: {}", session.id(), e);
                false
            }
        }
    }

    /// Bytes downloaded so far over a session, if it is registered.
    pub async fn bytes_downloaded(&self, session_id: &str) -> Option<u64> {
        self.registry
            .get(session_id)
            .await
            .map(|session| session.bytes_downloaded())
    }

    /// Ids of all registered sessions, in registration order.
    pub async fn sessions(&self) -> Vec<String> {
        self.registry.ids().await
    }

    async fn local_server_running(&self) -> bool {
        self.is_lite(None).await == Some(true)
    }

    // =========================================================================
    // Request helpers
    // =========================================================================

    /// GET an API endpoint and classify the answer.
    pub(crate) async fn api_get(
        &self,
        session: &Session,
        endpoint: &'static str,
        input: &str,
        url: ApiUrl,
    ) -> Result<Payload, ClientError> {
        let body = self.fetch(session, endpoint, input, url).await?;
        Payload::parse(&body).map_err(|e| payload_error(endpoint, input, e))
    }

    /// POST a JSON body to an API endpoint and classify the answer.
    pub(crate) async fn api_post(
        &self,
        session: &Session,
        endpoint: &'static str,
        input: &str,
        url: ApiUrl,
        body: &serde_json::Value,
    ) -> Result<Payload, ClientError> {
        let url = url.build()?;
        debug!("POST {}", url);
        let result = self.transport.post_json(&url, body).await;
        let body = account(session, endpoint, input, result)?;
        Payload::parse(&body).map_err(|e| payload_error(endpoint, input, e))
    }

    /// GET a raw body (images), counting it against the session.
    pub(crate) async fn fetch(
        &self,
        session: &Session,
        endpoint: &'static str,
        input: &str,
        url: ApiUrl,
    ) -> Result<Bytes, ClientError> {
        let url = url.build()?;
        debug!("GET {}", url);
        let result = self.transport.get(&url).await;
        account(session, endpoint, input, result)
    }
}

/// Count a response against the session and surface structured faults
/// carried by error statuses.
fn account(
    session: &Session,
    endpoint: &'static str,
    input: &str,
    result: Result<Bytes, TransportError>,
) -> Result<Bytes, ClientError> {
    match result {
        Ok(body) => {
            session.add_bytes(body.len() as u64);
            Ok(body)
        }
        Err(TransportError::Status { status, url, body }) => {
            session.add_bytes(body.len() as u64);
            if let Err(PayloadError::Fault(fault)) = Payload::parse(&body) {
                return Err(ClientError::Server {
                    endpoint,
                    input: input.to_string(),
                    code: fault.code,
                    message: fault.message,
                });
            }
            Err(TransportError::Status { status, url, body }.into())
        }
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn payload_error(endpoint: &'static str, input: &str, err: PayloadError) -> ClientError {
    match err {
        PayloadError::Fault(fault) => ClientError::Server {
            endpoint,
            input: input.to_string(),
            code: fault.code,
            message: fault.message,
        },
        PayloadError::Malformed(reason) => ClientError::UnexpectedResponse { endpoint, reason },
    }
}

/// Extract the session id from an authentication answer.
///
/// `Success` may be a boolean or a string in any case.
fn parse_login(body: &[u8]) -> Option<String> {
    let login = Payload::parse(body).ok()?.into_object()?;

    let success = match login.get("Success")? {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::String(s) => s.eq_ignore_ascii_case("true"),
        _ => false,
    };
    if !success {
        return None;
    }

    login
        .get("SessionId")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

fn same_server(a: &str, b: &str) -> bool {
    a.trim_end_matches('/')
        .eq_ignore_ascii_case(b.trim_end_matches('/'))
}
