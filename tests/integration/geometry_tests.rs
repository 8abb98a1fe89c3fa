//! Pyramid geometry integration tests.
//!
//! Tests verify:
//! - Tile counts and pixel dimensions per zoom level
//! - Resolution and magnification per zoom level
//! - Zoom level enumeration with filtering
//! - Tile size sampling and channel/layer derived flags

use std::sync::Arc;

use serde_json::json;
use wsi_client::TileCount;

use super::test_utils::{connected_client, slide_info, MockServer, REMOTE};

fn server() -> Arc<MockServer> {
    Arc::new(
        MockServer::new()
            .with_login(REMOTE, "sess-1")
            .with_slides(
                REMOTE,
                vec![
                    slide_info("Reference/a.svs", "UID-A", 10000, 5000, 6),
                    json!({
                        "Filename": "Fluo/multi.czi",
                        "UID": "UID-F",
                        "Width": 4096,
                        "Height": 4096,
                        "TileSize": 512,
                        "MicrometresPerPixelX": 0.5,
                        "MicrometresPerPixelY": 0.5,
                        "MaxZoomLevel": "garbage",
                        "TimeFrames": [{
                            "Layers": [
                                {"Channels": [{"Name": "DAPI"}, {"Name": "FITC"}, {"Name": "TRITC"}]},
                                {"Channels": [{"Name": "DAPI"}]}
                            ]
                        }]
                    }),
                ],
            )
            .with_tree(
                REMOTE,
                &["Empty", "Reference"],
                vec![
                    ("Empty", vec![], vec![]),
                    ("Reference", vec![], vec!["Reference/a.svs"]),
                ],
            ),
    )
}

#[tokio::test]
async fn test_tiles_at_max_zoom_level() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let max = client
        .max_zoom_level("Reference/a.svs", Some(&session))
        .await
        .unwrap();
    assert_eq!(max, 6);

    let expected = TileCount {
        x: 20,
        y: 10,
        total: 200,
    };
    assert_eq!(
        client
            .number_of_tiles("Reference/a.svs", Some(max), Some(&session))
            .await
            .unwrap(),
        expected
    );
    assert_eq!(
        client
            .number_of_tiles("Reference/a.svs", None, Some(&session))
            .await
            .unwrap(),
        expected
    );

    // Everything above came from a single metadata fetch
    assert_eq!(server.count("GetImageInfo"), 1);
}

#[tokio::test]
async fn test_pixel_dimensions_per_level() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    for k in 0..=6u32 {
        let dims = client
            .pixel_dimensions("Reference/a.svs", Some(6 - k), Some(&session))
            .await
            .unwrap();
        assert_eq!(dims, (10000 / 2u64.pow(k), 5000 / 2u64.pow(k)));
    }
}

#[tokio::test]
async fn test_resolution_and_magnification() {
    let server = server();
    let (client, session) = connected_client(&server).await;
    let slide = "Reference/a.svs";

    assert_eq!(
        client.microns_per_pixel(slide, None, Some(&session)).await.unwrap(),
        (0.25, 0.25)
    );
    assert_eq!(
        client
            .microns_per_pixel(slide, Some(5), Some(&session))
            .await
            .unwrap(),
        (0.5, 0.5)
    );

    assert_eq!(
        client.magnification(slide, None, false, Some(&session)).await.unwrap(),
        40.0
    );
    assert_eq!(
        client
            .magnification(slide, Some(5), false, Some(&session))
            .await
            .unwrap(),
        20.0
    );
    assert_eq!(
        client
            .magnification(slide, Some(4), true, Some(&session))
            .await
            .unwrap(),
        10.0
    );

    assert_eq!(
        client.physical_dimensions(slide, Some(&session)).await.unwrap(),
        (2500.0, 1250.0)
    );
}

#[tokio::test]
async fn test_zoom_levels() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let all = client
        .zoom_levels("Reference/a.svs", 0, Some(&session))
        .await
        .unwrap();
    assert_eq!(all.keys().copied().collect::<Vec<_>>(), (0..=6u32).collect::<Vec<_>>());
    assert_eq!(all[&6].total, 200);
    // 10000 / 64 = 156 px wide, 78 px high: one tile
    assert_eq!(all[&0].total, 1);

    // Level 6: 20x10, level 5: 10x5, level 4: 5x3, level 3: 3x2
    let busy = client
        .zoom_levels("Reference/a.svs", 10, Some(&session))
        .await
        .unwrap();
    assert_eq!(busy.keys().copied().collect::<Vec<_>>(), vec![4, 5, 6]);
    assert_eq!(busy[&4].total, 15);
}

#[tokio::test]
async fn test_unusable_zoom_level_degrades_to_zero() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    let max = client
        .max_zoom_level("Fluo/multi.czi", Some(&session))
        .await
        .unwrap();
    assert_eq!(max, 0);

    // With max level 0 every query is at native resolution
    assert_eq!(
        client
            .pixel_dimensions("Fluo/multi.czi", None, Some(&session))
            .await
            .unwrap(),
        (4096, 4096)
    );
}

#[tokio::test]
async fn test_channels_and_layers() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    assert_eq!(
        client.channel_count("Fluo/multi.czi", Some(&session)).await.unwrap(),
        3
    );
    assert_eq!(
        client.layer_count("Fluo/multi.czi", Some(&session)).await.unwrap(),
        2
    );
    assert!(client.is_fluorescent("Fluo/multi.czi", Some(&session)).await.unwrap());
    assert!(client.is_z_stack("Fluo/multi.czi", Some(&session)).await.unwrap());
    assert!(client.is_multi_layer("Fluo/multi.czi", Some(&session)).await.unwrap());

    assert!(!client.is_fluorescent("Reference/a.svs", Some(&session)).await.unwrap());
    assert!(!client.is_z_stack("Reference/a.svs", Some(&session)).await.unwrap());
}

#[tokio::test]
async fn test_tile_size_from_first_non_empty_directory() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    assert_eq!(client.tile_size(Some(&session)).await.unwrap(), (512, 512));

    let files = server.requests_to("GetFiles");
    let paths: Vec<_> = files.iter().map(|r| r.param("path").unwrap()).collect();
    // The root itself is checked before its directories
    assert_eq!(paths, vec!["/", "Empty", "Reference", "Reference"]);
    assert_eq!(
        server.requests_to("GetImageInfo")[0].param("pathOrUid"),
        Some("Reference/a.svs")
    );

    // Sampled from the cache afterwards
    client.tile_size(Some(&session)).await.unwrap();
    assert_eq!(server.count("GetImageInfo"), 1);
}

#[tokio::test]
async fn test_geometry_of_unknown_slide_fails() {
    let server = server();
    let (client, session) = connected_client(&server).await;

    assert!(client
        .number_of_tiles("Reference/missing.svs", None, Some(&session))
        .await
        .is_err());
}
