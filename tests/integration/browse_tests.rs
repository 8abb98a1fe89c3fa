//! Directory and slide enumeration integration tests.
//!
//! Tests verify:
//! - Recursion depth for directory and slide listings
//! - Depth-first search for the first directory holding slides
//! - Failure tolerance below the root
//! - Query encoding of paths

use std::sync::Arc;

use serde_json::json;
use wsi_client::Recursion;

use super::test_utils::{connected_client, fault, json_body, MockServer, REMOTE};

fn server() -> Arc<MockServer> {
    Arc::new(
        MockServer::new()
            .with_login(REMOTE, "sess-1")
            .with_tree(
                REMOTE,
                &["Lab", "Shared"],
                vec![
                    ("Lab", vec!["Lab/A", "Lab/B"], vec!["Lab/x.svs"]),
                    ("Lab/A", vec!["Lab/A/A1"], vec!["Lab/A/a.svs"]),
                    ("Lab/A/A1", vec!["Lab/A/A1/deep"], vec![]),
                    ("Lab/A/A1/deep", vec![], vec!["Lab/A/A1/deep/d.svs"]),
                    ("Lab/B", vec![], vec![]),
                    ("Shared", vec!["Shared/broken", "Shared/ok"], vec![]),
                    ("Shared/ok", vec![], vec!["Shared/ok/s.svs"]),
                    ("My Slides", vec![], vec!["My Slides/m.svs"]),
                ],
            )
            .api_json(REMOTE, "SearchSlides", json!({"d": ["Lab/x.svs"]})),
    )
}

// =============================================================================
// Directories
// =============================================================================

#[tokio::test]
async fn test_root_directories() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    assert_eq!(
        client.get_root_directories(Some(&session)).await.unwrap(),
        vec!["Lab", "Shared"]
    );
}

#[tokio::test]
async fn test_directories_without_recursion() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let dirs = client
        .get_directories("Lab", Some(&session), 0u32)
        .await
        .unwrap();
    assert_eq!(dirs, vec!["Lab/A", "Lab/B"]);

    let dirs = client
        .get_directories("Lab", Some(&session), false)
        .await
        .unwrap();
    assert_eq!(dirs, vec!["Lab/A", "Lab/B"]);
    assert_eq!(server.count("GetDirectories"), 2);
}

#[tokio::test]
async fn test_directories_depth_one() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let dirs = client
        .get_directories("Lab", Some(&session), 1u32)
        .await
        .unwrap();
    assert_eq!(dirs, vec!["Lab/A", "Lab/B", "Lab/A/A1"]);
}

#[tokio::test]
async fn test_directories_depth_two() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let dirs = client
        .get_directories("Lab", Some(&session), Recursion::Depth(2))
        .await
        .unwrap();
    assert_eq!(dirs, vec!["Lab/A", "Lab/B", "Lab/A/A1", "Lab/A/A1/deep"]);
}

#[tokio::test]
async fn test_directories_unlimited() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let dirs = client
        .get_directories("Lab", Some(&session), true)
        .await
        .unwrap();
    assert_eq!(dirs, vec!["Lab/A", "Lab/B", "Lab/A/A1", "Lab/A/A1/deep"]);

    // One listing per directory visited, each issued once
    let paths: Vec<String> = server
        .requests_to("GetDirectories")
        .iter()
        .map(|r| r.param("path").unwrap().to_string())
        .collect();
    assert_eq!(paths, vec!["Lab", "Lab/A", "Lab/A/A1", "Lab/A/A1/deep", "Lab/B"]);
}

#[tokio::test]
async fn test_directory_fault_propagates() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    assert!(client
        .get_directories("Nope", Some(&session), false)
        .await
        .is_err());
}

// =============================================================================
// Slides
// =============================================================================

#[tokio::test]
async fn test_slides_recursion() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    assert_eq!(
        client.get_slides("Lab", Some(&session), false).await.unwrap(),
        vec!["Lab/x.svs"]
    );
    assert_eq!(
        client.get_slides("Lab", Some(&session), 1u32).await.unwrap(),
        vec!["Lab/x.svs", "Lab/A/a.svs"]
    );
    assert_eq!(
        client.get_slides("Lab", Some(&session), true).await.unwrap(),
        vec!["Lab/x.svs", "Lab/A/a.svs", "Lab/A/A1/deep/d.svs"]
    );
}

#[tokio::test]
async fn test_paths_are_percent_encoded() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let slides = client
        .get_slides("My Slides", Some(&session), false)
        .await
        .unwrap();
    assert_eq!(slides, vec!["My Slides/m.svs"]);

    let url = server
        .urls()
        .into_iter()
        .find(|url| url.contains("GetFiles"))
        .unwrap();
    assert!(url.contains("path=My%20Slides"));
    assert!(!url.contains('+'));
}

#[tokio::test]
async fn test_search_slides() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let found = client
        .search_slides("Lab", "x*", Some(&session))
        .await
        .unwrap();
    assert_eq!(found, vec!["Lab/x.svs"]);

    let request = &server.requests_to("SearchSlides")[0];
    assert_eq!(request.param("path"), Some("Lab"));
    assert_eq!(request.param("pattern"), Some("x*"));
}

// =============================================================================
// First non-empty directory
// =============================================================================

#[tokio::test]
async fn test_first_non_empty_from_root() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let dir = client
        .get_first_non_empty_directory(None, Some(&session))
        .await
        .unwrap();
    assert_eq!(dir.as_deref(), Some("Lab"));
}

#[tokio::test]
async fn test_first_non_empty_descends() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let dir = client
        .get_first_non_empty_directory(Some("Lab/A/A1"), Some(&session))
        .await
        .unwrap();
    assert_eq!(dir.as_deref(), Some("Lab/A/A1/deep"));

    let dir = client
        .get_first_non_empty_directory(Some("Lab/B"), Some(&session))
        .await
        .unwrap();
    assert_eq!(dir, None);
}

#[tokio::test]
async fn test_first_non_empty_skips_broken_directories() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let dir = client
        .get_first_non_empty_directory(Some("Shared"), Some(&session))
        .await
        .unwrap();
    assert_eq!(dir.as_deref(), Some("Shared/ok"));
}

#[tokio::test]
async fn test_first_non_empty_root_failure_is_fatal() {
    let server = Arc::new(MockServer::new().with_login(REMOTE, "sess-1"));
    let (client, session) = connected_client(&server).await;

    assert!(client
        .get_first_non_empty_directory(None, Some(&session))
        .await
        .is_err());
}

#[tokio::test]
async fn test_first_non_empty_searches_below_unlistable_directory() {
    let server = Arc::new(
        MockServer::new()
            .with_login(REMOTE, "sess-1")
            .api_json(REMOTE, "GetRootDirectories", json!({"d": ["Top"]}))
            .api(REMOTE, "GetFiles", |req| match req.param("path") {
                Some("Top/child") => json_body(&json!({"d": ["Top/child/s.svs"]})),
                Some("Top") => json_body(&fault(403, "Access denied")),
                _ => json_body(&json!({"d": []})),
            })
            .api(REMOTE, "GetDirectories", |req| match req.param("path") {
                Some("Top") => json_body(&json!({"d": ["Top/child"]})),
                _ => json_body(&json!({"d": []})),
            }),
    );
    let (client, session) = connected_client(&server).await;

    let dir = client
        .get_first_non_empty_directory(None, Some(&session))
        .await
        .unwrap();
    assert_eq!(dir.as_deref(), Some("Top/child"));

    let dir = client
        .get_first_non_empty_directory(Some("Top"), Some(&session))
        .await
        .unwrap();
    assert_eq!(dir.as_deref(), Some("Top/child"));
}

#[tokio::test]
async fn test_first_non_empty_checks_root_slides_first() {
    let server = Arc::new(
        MockServer::new()
            .with_login(REMOTE, "sess-1")
            .with_tree(
                REMOTE,
                &["Lab"],
                vec![
                    ("/", vec!["Lab"], vec!["loose.svs"]),
                    ("Lab", vec![], vec!["Lab/x.svs"]),
                ],
            ),
    );
    let (client, session) = connected_client(&server).await;

    let dir = client
        .get_first_non_empty_directory(None, Some(&session))
        .await
        .unwrap();
    assert_eq!(dir.as_deref(), Some("/"));
    assert_eq!(server.count("GetRootDirectories"), 0);
}
