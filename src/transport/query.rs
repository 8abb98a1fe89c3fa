//! URL construction for API calls.
//!
//! Servers expect query values percent-encoded with spaces as `%20`; the
//! `application/x-www-form-urlencoded` `+` form is not understood by all of
//! them, so queries are assembled by hand instead of through
//! `url::Url::query_pairs_mut`.

use std::borrow::Cow;

use crate::error::TransportError;

/// Percent-encode a query value (spaces become `%20`).
pub fn quote(value: &str) -> Cow<'_, str> {
    urlencoding::encode(value)
}

/// Join a base URL and a relative path with exactly one `/` between them.
pub fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{}/", base)
    } else {
        format!("{}/{}", base, path)
    }
}

/// Builder for a request URL with ordered query parameters.
///
/// ```
/// use wsi_client::transport::ApiUrl;
///
/// let url = ApiUrl::new("http://server/core/", "api/json/GetFiles")
///     .param("sessionID", "abc")
///     .param("path", "My Slides/Set 1")
///     .build()
///     .unwrap();
/// assert_eq!(
///     url,
///     "http://server/core/api/json/GetFiles?sessionID=abc&path=My%20Slides%2FSet%201"
/// );
/// ```
#[derive(Debug, Clone)]
pub struct ApiUrl {
    base: String,
    params: Vec<(String, String)>,
}

impl ApiUrl {
    /// Start a URL for `path` below `base`.
    pub fn new(base: &str, path: &str) -> Self {
        Self {
            base: join_url(base, path),
            params: Vec::new(),
        }
    }

    /// Append a query parameter.
    pub fn param(mut self, key: &str, value: impl ToString) -> Self {
        self.params.push((key.to_string(), value.to_string()));
        self
    }

    /// Append a query parameter only when a value is present.
    pub fn param_opt<V: ToString>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(value) => self.param(key, value),
            None => self,
        }
    }

    /// Assemble and validate the final URL.
    pub fn build(&self) -> Result<String, TransportError> {
        let mut url = self.base.clone();
        for (i, (key, value)) in self.params.iter().enumerate() {
            url.push(if i == 0 { '?' } else { '&' });
            url.push_str(&quote(key));
            url.push('=');
            url.push_str(&quote(value));
        }

        url::Url::parse(&url).map_err(|e| TransportError::InvalidUrl(format!("{}: {}", url, e)))?;
        Ok(url)
    }
}
