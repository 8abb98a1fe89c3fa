//! Slide metadata and pyramid geometry.
//!
//! Metadata records are fetched from the server once per session and kept
//! in the session's [`MetadataCache`]. Geometry operations read those
//! records and never talk to the server themselves.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   Client geometry operations            │
//! │   (zoom levels, tiles, magnification)   │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   Pyramid (pure arithmetic)             │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   MetadataCache (per session)           │
//! │   keyed by path and UID, fetch-once     │
//! └────────────────────┬────────────────────┘
//!                      │ miss
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   GetImageInfo / GetImagesInfo          │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use wsi_client::{Client, ClientConfig};
//!
//! let client = Client::new(ClientConfig::default())?;
//! let session = client.connect("https://server/core/", "user", "secret").await;
//!
//! let info = client.get_slide_info("Reference/CMU-1.svs", session.as_deref()).await?;
//! let tiles = client
//!     .number_of_tiles("Reference/CMU-1.svs", None, session.as_deref())
//!     .await?;
//! println!("{} tiles at native resolution", tiles.total);
//! ```

mod cache;
mod geometry;
mod info;
mod metadata;

pub use cache::MetadataCache;
pub use geometry::{Pyramid, TileCount};
pub use info::{SlideInfo, MAX_ZOOM_LEVEL};
pub use metadata::normalize_slide_ref;
