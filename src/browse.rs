//! Directory and slide enumeration.
//!
//! Listings are never cached: every call goes to the server. Recursive
//! listings descend depth-first and concatenate results in server order,
//! each directory's own listing first, then the recursive result of each
//! of its children.

use futures::future::{BoxFuture, FutureExt};
use tracing::{debug, warn};

use crate::client::Client;
use crate::error::ClientError;
use crate::session::Session;
use crate::transport::{ApiUrl, Transport};

/// Path that denotes the virtual root above all root directories.
const ROOT: &str = "/";

// =============================================================================
// Recursion
// =============================================================================

/// How far a listing descends below its start directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Recursion {
    /// Immediate children only
    #[default]
    None,
    /// Descend until the tree is exhausted
    Unlimited,
    /// Descend this many more levels
    Depth(u32),
}

impl Recursion {
    /// Budget for the next level down, or `None` when descent stops here.
    pub fn descend(self) -> Option<Recursion> {
        match self {
            Recursion::None | Recursion::Depth(0) => None,
            Recursion::Unlimited => Some(Recursion::Unlimited),
            Recursion::Depth(n) => Some(Recursion::Depth(n - 1)),
        }
    }
}

impl From<bool> for Recursion {
    fn from(recursive: bool) -> Self {
        if recursive {
            Recursion::Unlimited
        } else {
            Recursion::None
        }
    }
}

impl From<u32> for Recursion {
    fn from(depth: u32) -> Self {
        Recursion::Depth(depth)
    }
}

// =============================================================================
// Listings
// =============================================================================

impl<T: Transport> Client<T> {
    /// Top-level directories of the server, in server order.
    pub async fn get_root_directories(
        &self,
        session_id: Option<&str>,
    ) -> Result<Vec<String>, ClientError> {
        let session = self.session(session_id).await?;
        self.root_directories(&session).await
    }

    async fn root_directories(&self, session: &Session) -> Result<Vec<String>, ClientError> {
        let url = ApiUrl::new(&session.api_url(), "GetRootDirectories")
            .param("sessionID", session.id());
        self.api_get(session, "GetRootDirectories", ROOT, url)
            .await?
            .into_strings()
            .ok_or_else(|| ClientError::UnexpectedResponse {
                endpoint: "GetRootDirectories",
                reason: "expected a list of paths".to_string(),
            })
    }

    /// Subdirectories of `start_dir`, descending as far as `recursion` allows.
    ///
    /// `recursion` accepts a [`Recursion`], a `bool` (unlimited or none) or a
    /// `u32` depth budget.
    pub async fn get_directories(
        &self,
        start_dir: &str,
        session_id: Option<&str>,
        recursion: impl Into<Recursion>,
    ) -> Result<Vec<String>, ClientError> {
        let session = self.session(session_id).await?;
        self.directories_recursive(&session, start_dir.to_string(), recursion.into())
            .await
    }

    /// Slides in `start_dir`, plus those of its subdirectories as far as
    /// `recursion` allows.
    pub async fn get_slides(
        &self,
        start_dir: &str,
        session_id: Option<&str>,
        recursion: impl Into<Recursion>,
    ) -> Result<Vec<String>, ClientError> {
        let session = self.session(session_id).await?;
        self.slides_recursive(&session, start_dir.to_string(), recursion.into())
            .await
    }

    fn directories_recursive<'a>(
        &'a self,
        session: &'a Session,
        dir: String,
        recursion: Recursion,
    ) -> BoxFuture<'a, Result<Vec<String>, ClientError>> {
        async move {
            let listing = self.list(session, "GetDirectories", &dir).await?;
            let Some(next) = recursion.descend() else {
                return Ok(listing);
            };

            let mut result = listing.clone();
            for child in listing {
                result.extend(self.directories_recursive(session, child, next).await?);
            }
            Ok(result)
        }
        .boxed()
    }

    fn slides_recursive<'a>(
        &'a self,
        session: &'a Session,
        dir: String,
        recursion: Recursion,
    ) -> BoxFuture<'a, Result<Vec<String>, ClientError>> {
        async move {
            let mut slides = self.list(session, "GetFiles", &dir).await?;
            let Some(next) = recursion.descend() else {
                return Ok(slides);
            };

            for child in self.list(session, "GetDirectories", &dir).await? {
                slides.extend(self.slides_recursive(session, child, next).await?);
            }
            Ok(slides)
        }
        .boxed()
    }

    async fn list(
        &self,
        session: &Session,
        endpoint: &'static str,
        dir: &str,
    ) -> Result<Vec<String>, ClientError> {
        let url = ApiUrl::new(&session.api_url(), endpoint)
            .param("sessionID", session.id())
            .param("path", dir);

        self.api_get(session, endpoint, dir, url)
            .await?
            .into_strings()
            .ok_or_else(|| ClientError::UnexpectedResponse {
                endpoint,
                reason: format!("expected a list of paths for {}", dir),
            })
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// First directory, depth-first from `start_dir` (default: the root),
    /// that directly contains at least one slide.
    ///
    /// A directory whose slides cannot be listed counts as empty and its
    /// subdirectories are still searched. Failing to list the root
    /// directories aborts the search.
    pub async fn get_first_non_empty_directory(
        &self,
        start_dir: Option<&str>,
        session_id: Option<&str>,
    ) -> Result<Option<String>, ClientError> {
        let session = self.session(session_id).await?;
        let start = start_dir.filter(|dir| !dir.is_empty()).unwrap_or(ROOT);

        if start == ROOT {
            match self.list(&session, "GetFiles", ROOT).await {
                Ok(slides) if !slides.is_empty() => return Ok(Some(ROOT.to_string())),
                Ok(_) => {}
                Err(e) => debug!("No slides listed at the root: {}", e),
            }

            for dir in self.root_directories(&session).await? {
                if let Some(found) = self.first_non_empty(&session, dir).await {
                    return Ok(Some(found));
                }
            }
            return Ok(None);
        }

        Ok(self.first_non_empty(&session, start.to_string()).await)
    }

    fn first_non_empty<'a>(
        &'a self,
        session: &'a Session,
        dir: String,
    ) -> BoxFuture<'a, Option<String>> {
        async move {
            match self.list(session, "GetFiles", &dir).await {
                Ok(slides) if !slides.is_empty() => return Some(dir),
                Ok(_) => {}
                Err(e) => warn!("Treating {} as empty: {}", dir, e),
            }

            let children = match self.list(session, "GetDirectories", &dir).await {
                Ok(children) => children,
                Err(e) => {
                    warn!("Skipping subdirectories of {}: {}", dir, e);
                    return None;
                }
            };

            for child in children {
                if let Some(found) = self.first_non_empty(session, child).await {
                    return Some(found);
                }
            }
            debug!("No slides below {}", dir);
            None
        }
        .boxed()
    }

    /// Slides below `start_dir` whose name matches `pattern`.
    ///
    /// Matching is done by the server.
    pub async fn search_slides(
        &self,
        start_dir: &str,
        pattern: &str,
        session_id: Option<&str>,
    ) -> Result<Vec<String>, ClientError> {
        let session = self.session(session_id).await?;
        let url = ApiUrl::new(&session.api_url(), "SearchSlides")
            .param("sessionID", session.id())
            .param("path", start_dir)
            .param("pattern", pattern);

        self.api_get(&session, "SearchSlides", pattern, url)
            .await?
            .into_strings()
            .ok_or_else(|| ClientError::UnexpectedResponse {
                endpoint: "SearchSlides",
                reason: "expected a list of paths".to_string(),
            })
    }
}
