//! Per-session slide metadata cache.
//!
//! Metadata is fetched at most once per key for the lifetime of a session
//! and never evicted or refreshed: slide metadata is treated as immutable
//! while a session is open.
//!
//! # Concurrency
//!
//! Each key owns a [`OnceCell`]. Concurrent misses on the same key wait on the
//! same cell, so only one of them performs the fetch (and only one response
//! is counted against the session's byte total). A fetch that fails or
//! returns nothing leaves the cell empty, and the next caller tries again.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::{OnceCell, RwLock};
use tracing::debug;

use super::info::SlideInfo;
use crate::error::ClientError;

/// Why a fill attempt left the cell empty.
enum Miss {
    Unclassified,
    Failed(ClientError),
}

/// Fetch-once cache of slide metadata, keyed by path and UID.
#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: RwLock<HashMap<String, Arc<OnceCell<Arc<SlideInfo>>>>>,
}

impl MetadataCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached record for `key`, without fetching.
    pub async fn get(&self, key: &str) -> Option<Arc<SlideInfo>> {
        let entries = self.entries.read().await;
        entries.get(key).and_then(|cell| cell.get().cloned())
    }

    /// Whether a record is cached for `key`.
    pub async fn contains(&self, key: &str) -> bool {
        self.get(key).await.is_some()
    }

    /// Store a record under `key` unless one is already cached there.
    ///
    /// Returns `true` if the record was stored.
    pub async fn insert(&self, key: &str, info: Arc<SlideInfo>) -> bool {
        let cell = self.cell(key).await;
        cell.set(info).is_ok()
    }

    /// Return the record for `key`, running `fetch` on a miss.
    ///
    /// `fetch` returning `Ok(None)` means the server answer could not be
    /// classified; nothing is cached and `Ok(None)` is returned.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        key: &str,
        fetch: F,
    ) -> Result<Option<Arc<SlideInfo>>, ClientError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<SlideInfo>, ClientError>>,
    {
        let cell = self.cell(key).await;
        if let Some(info) = cell.get() {
            debug!("Metadata cache hit for {}", key);
            return Ok(Some(info.clone()));
        }

        let filled = cell
            .get_or_try_init(|| async {
                debug!("Metadata cache miss for {}", key);
                match fetch().await {
                    Ok(Some(info)) => Ok(Arc::new(info)),
                    Ok(None) => Err(Miss::Unclassified),
                    Err(e) => Err(Miss::Failed(e)),
                }
            })
            .await;

        match filled {
            Ok(info) => Ok(Some(info.clone())),
            Err(Miss::Unclassified) => Ok(None),
            Err(Miss::Failed(e)) => Err(e),
        }
    }

    /// Any cached record (used to sample server-wide properties such as tile size).
    pub async fn any(&self) -> Option<Arc<SlideInfo>> {
        let entries = self.entries.read().await;
        entries.values().find_map(|cell| cell.get().cloned())
    }

    /// Number of keys holding a record.
    pub async fn len(&self) -> usize {
        let entries = self.entries.read().await;
        entries.values().filter(|cell| cell.initialized()).count()
    }

    /// Whether no record is cached.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Keys holding a record, sorted.
    pub async fn keys(&self) -> Vec<String> {
        let entries = self.entries.read().await;
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, cell)| cell.initialized())
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    async fn cell(&self, key: &str) -> Arc<OnceCell<Arc<SlideInfo>>> {
        {
            let entries = self.entries.read().await;
            if let Some(cell) = entries.get(key) {
                return cell.clone();
            }
        }

        let mut entries = self.entries.write().await;
        entries
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }
}
