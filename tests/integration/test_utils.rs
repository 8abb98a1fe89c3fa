//! Test utilities for integration tests.
//!
//! This module provides a routed in-memory server implementing
//! [`Transport`], metadata fixtures and helpers for building clients
//! against it.

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use wsi_client::{Client, ClientConfig, Transport, TransportError};

/// Base URL of the remote server used throughout the tests.
pub const REMOTE: &str = "http://pathology.test/core/";

/// Base URL of a second remote server.
pub const OTHER_REMOTE: &str = "http://archive.test/core/";

/// Local viewer URL (the config default).
pub const LOCAL: &str = "http://localhost:54001/";

// =============================================================================
// Logging
// =============================================================================

/// Route `tracing` output to the test harness, filtered by `RUST_LOG`.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// =============================================================================
// Mock Server
// =============================================================================

/// A request as seen by a mock route.
#[derive(Debug, Clone)]
pub struct MockRequest {
    pub url: String,
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
}

impl MockRequest {
    fn parse(url: &str, body: Option<Value>) -> Self {
        let mut params = HashMap::new();
        if let Some((_, query)) = url.split_once('?') {
            for pair in query.split('&') {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let value = urlencoding::decode(value)
                    .map(|v| v.into_owned())
                    .unwrap_or_else(|_| value.to_string());
                params.insert(key.to_string(), value);
            }
        }
        Self {
            url: url.to_string(),
            params,
            body,
        }
    }

    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }
}

type Handler = Box<dyn Fn(&MockRequest) -> Result<Bytes, TransportError> + Send + Sync>;

/// An in-memory server that dispatches on the request path and records
/// every request it receives.
///
/// Unrouted paths fail like an unreachable host.
pub struct MockServer {
    routes: HashMap<String, Handler>,
    requests: Mutex<Vec<MockRequest>>,
    request_count: AtomicUsize,
    delay: Option<Duration>,
}

impl MockServer {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            requests: Mutex::new(Vec::new()),
            request_count: AtomicUsize::new(0),
            delay: None,
        }
    }

    /// Answer requests to `path` (an absolute URL without query).
    pub fn route<F>(mut self, path: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&MockRequest) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        self.routes.insert(path.into(), Box::new(handler));
        self
    }

    /// Answer `api/json/<endpoint>` below `base`.
    pub fn api<F>(self, base: &str, endpoint: &str, handler: F) -> Self
    where
        F: Fn(&MockRequest) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        self.route(format!("{}api/json/{}", base, endpoint), handler)
    }

    /// Answer `api/json/<endpoint>` below `base` with a fixed JSON value.
    pub fn api_json(self, base: &str, endpoint: &str, value: Value) -> Self {
        let body = value.to_string();
        self.api(base, endpoint, move |_| Ok(Bytes::from(body.clone())))
    }

    /// Accept logins on `base`, issuing `session_id`.
    pub fn with_login(self, base: &str, session_id: &str) -> Self {
        self.api_json(
            base,
            "authenticate",
            json!({"Success": true, "SessionId": session_id, "Username": "reader"}),
        )
    }

    /// Make the local viewer answer its liveness probe.
    pub fn with_local_viewer(self) -> Self {
        self.route(format!("{}api/xml/IsLite", LOCAL), |_| {
            text_body(r#"<?xml version="1.0" encoding="utf-8"?><boolean xmlns="http://tempuri.org/">true</boolean>"#)
        })
    }

    /// Serve `GetImageInfo` on `base` from a table of records keyed by
    /// path or UID.
    pub fn with_slides(self, base: &str, slides: Vec<Value>) -> Self {
        let mut table: HashMap<String, Value> = HashMap::new();
        for slide in slides {
            if let Some(uid) = slide.get("UID").and_then(Value::as_str) {
                table.insert(uid.to_string(), slide.clone());
            }
            if let Some(name) = slide.get("Filename").and_then(Value::as_str) {
                table.insert(name.to_string(), slide.clone());
            }
        }

        self.api(base, "GetImageInfo", move |req| {
            let key = req.param("pathOrUid").unwrap_or_default();
            match table.get(key) {
                Some(info) => json_body(&json!({ "d": info })),
                None => json_body(&fault(404, &format!("Slide {} not found", key))),
            }
        })
    }

    /// Serve a directory tree on `base`.
    ///
    /// `roots` are the root directories; each entry of `tree` is
    /// `(directory, subdirectories, slides)`. Directories missing from
    /// `tree` answer with a fault.
    pub fn with_tree(
        self,
        base: &str,
        roots: &[&str],
        tree: Vec<(&str, Vec<&str>, Vec<&str>)>,
    ) -> Self {
        let roots: Vec<String> = roots.iter().map(|r| r.to_string()).collect();
        let mut dirs: HashMap<String, Vec<String>> = HashMap::new();
        let mut files: HashMap<String, Vec<String>> = HashMap::new();
        for (dir, subdirs, slides) in tree {
            dirs.insert(dir.to_string(), subdirs.iter().map(|d| d.to_string()).collect());
            files.insert(dir.to_string(), slides.iter().map(|f| f.to_string()).collect());
        }

        self.api_json(base, "GetRootDirectories", json!({ "d": roots }))
            .api(base, "GetDirectories", move |req| listing(&dirs, req))
            .api(base, "GetFiles", move |req| listing(&files, req))
    }

    /// Delay every answer.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Total number of requests received.
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Requests received whose path ends with `suffix`.
    pub fn requests_to(&self, suffix: &str) -> Vec<MockRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|req| path_of(&req.url).ends_with(suffix))
            .cloned()
            .collect()
    }

    /// Number of requests whose path ends with `suffix`.
    pub fn count(&self, suffix: &str) -> usize {
        self.requests_to(suffix).len()
    }

    /// Every requested URL, in order.
    pub fn urls(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|req| req.url.clone())
            .collect()
    }

    async fn dispatch(&self, url: &str, body: Option<Value>) -> Result<Bytes, TransportError> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        let request = MockRequest::parse(url, body);
        self.requests.lock().unwrap().push(request.clone());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.routes.get(path_of(url)) {
            Some(handler) => handler(&request),
            None => Err(TransportError::Connection(format!("{}: connection refused", url))),
        }
    }
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockServer {
    async fn get(&self, url: &str) -> Result<Bytes, TransportError> {
        self.dispatch(url, None).await
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Bytes, TransportError> {
        self.dispatch(url, Some(body.clone())).await
    }
}

fn listing(
    table: &HashMap<String, Vec<String>>,
    req: &MockRequest,
) -> Result<Bytes, TransportError> {
    let path = req.param("path").unwrap_or_default();
    match table.get(path) {
        Some(entries) => json_body(&json!({ "d": entries })),
        None => json_body(&fault(404, &format!("Directory {} not found", path))),
    }
}

fn path_of(url: &str) -> &str {
    url.split_once('?').map(|(path, _)| path).unwrap_or(url)
}

// =============================================================================
// Fixtures
// =============================================================================

/// Serialize a JSON value as a response body.
pub fn json_body(value: &Value) -> Result<Bytes, TransportError> {
    Ok(Bytes::from(value.to_string()))
}

/// A plain-text (or XML) response body.
pub fn text_body(text: &str) -> Result<Bytes, TransportError> {
    Ok(Bytes::from(text.to_string()))
}

/// A structured server fault.
pub fn fault(code: i64, message: &str) -> Value {
    json!({"Code": code, "Message": message})
}

/// A metadata record with a single time frame, layer and channel.
pub fn slide_info(filename: &str, uid: &str, width: u64, height: u64, zoom_levels: u32) -> Value {
    json!({
        "Filename": filename,
        "UID": uid,
        "Width": width,
        "Height": height,
        "TileSize": 512,
        "MicrometresPerPixelX": 0.25,
        "MicrometresPerPixelY": 0.25,
        "NumberOfZoomLevels": zoom_levels,
        "TimeFrames": [{
            "Layers": [{"Channels": [{"Name": "RGB"}]}]
        }]
    })
}

/// Client settings pointing at the test local viewer URL.
pub fn test_config() -> ClientConfig {
    ClientConfig {
        local_url: LOCAL.to_string(),
        ..ClientConfig::default()
    }
}

/// A client on top of `server`, sharing it with the test.
pub fn test_client(server: &Arc<MockServer>) -> Client<Arc<MockServer>> {
    init_test_logging();
    Client::with_transport(server.clone(), test_config())
}

/// A client already logged into [`REMOTE`].
///
/// `server` must accept logins (see [`MockServer::with_login`]).
pub async fn connected_client(
    server: &Arc<MockServer>,
) -> (Client<Arc<MockServer>>, String) {
    let client = test_client(server);
    let session = client
        .connect(REMOTE, "reader", "secret")
        .await
        .expect("login should succeed");
    (client, session)
}
