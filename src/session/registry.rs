use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

use crate::slide::MetadataCache;
use crate::transport::join_url;

// =============================================================================
// Session
// =============================================================================

/// An authenticated (or local) session bound to one server.
///
/// The server URL never changes once the session is created. The session
/// owns its slide metadata cache and a running total of downloaded bytes.
#[derive(Debug)]
pub struct Session {
    id: String,
    server_url: String,
    username: Option<String>,
    bytes_downloaded: AtomicU64,
    cache: MetadataCache,
}

impl Session {
    /// Create a session for `server_url`, seeding the byte counter.
    ///
    /// The stored URL always ends with `/`.
    pub fn new(
        id: impl Into<String>,
        server_url: &str,
        username: Option<String>,
        initial_bytes: u64,
    ) -> Self {
        Self {
            id: id.into(),
            server_url: join_url(server_url, ""),
            username,
            bytes_downloaded: AtomicU64::new(initial_bytes),
            cache: MetadataCache::new(),
        }
    }

    /// Server-issued (or sentinel) session id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Base URL of the owning server, with a trailing `/`.
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    /// Base URL of the JSON API below the server URL.
    pub fn api_url(&self) -> String {
        join_url(&self.server_url, "api/json/")
    }

    /// Username the session was opened with (absent for the local viewer).
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Total bytes received over the session's lifetime.
    pub fn bytes_downloaded(&self) -> u64 {
        self.bytes_downloaded.load(Ordering::Relaxed)
    }

    /// Account for a received response body.
    pub fn add_bytes(&self, bytes: u64) {
        self.bytes_downloaded.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Slide metadata cached for this session.
    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }
}

// =============================================================================
// SessionRegistry
// =============================================================================

/// Insertion-ordered registry of live sessions.
///
/// The first registered session is the default one: registering more
/// sessions never changes which session an implicit lookup resolves to while
/// the first one is alive.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    order: Vec<String>,
    sessions: HashMap<String, Arc<Session>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session.
    ///
    /// If the id is already registered the existing session is kept and
    /// returned, so an id keeps mapping to the server it was first issued by.
    pub async fn register(&self, session: Session) -> Arc<Session> {
        let mut inner = self.inner.write().await;
        if let Some(existing) = inner.sessions.get(session.id()) {
            debug!("Session {} already registered, keeping it", session.id());
            return existing.clone();
        }

        let session = Arc::new(session);
        inner.order.push(session.id().to_string());
        inner
            .sessions
            .insert(session.id().to_string(), session.clone());
        session
    }

    /// Look up a session by id.
    pub async fn get(&self, id: &str) -> Option<Arc<Session>> {
        let inner = self.inner.read().await;
        inner.sessions.get(id).cloned()
    }

    /// The earliest registered session still alive.
    pub async fn first(&self) -> Option<Arc<Session>> {
        let inner = self.inner.read().await;
        inner
            .order
            .first()
            .and_then(|id| inner.sessions.get(id))
            .cloned()
    }

    /// Remove a session and its cache.
    pub async fn remove(&self, id: &str) -> Option<Arc<Session>> {
        let mut inner = self.inner.write().await;
        let removed = inner.sessions.remove(id)?;
        inner.order.retain(|existing| existing != id);
        Some(removed)
    }

    /// Whether a session id is registered.
    pub async fn contains(&self, id: &str) -> bool {
        let inner = self.inner.read().await;
        inner.sessions.contains_key(id)
    }

    /// Registered session ids in registration order.
    pub async fn ids(&self) -> Vec<String> {
        let inner = self.inner.read().await;
        inner.order.clone()
    }

    /// Number of registered sessions.
    pub async fn len(&self) -> usize {
        let inner = self.inner.read().await;
        inner.sessions.len()
    }

    /// Whether no session is registered.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
