//! # WSI Client
//!
//! An async client for whole-slide image servers: the local viewer running
//! on the workstation and any number of remote servers.
//!
//! ## Features
//!
//! - **Sessions**: authenticate against remote servers, fall back to the
//!   local viewer when no session is given, per-session download accounting
//! - **Metadata cache**: slide metadata is fetched once per session and
//!   shared between concurrent callers
//! - **Pyramid geometry**: pixel dimensions, tile counts, resolution and
//!   magnification per zoom level
//! - **Browsing**: root directories, recursive directory and slide listings,
//!   search
//! - **Tiles**: lazy column-major tile sequences, thumbnails, label and
//!   barcode images
//!
//! ## Architecture
//!
//! - [`client`] - the [`Client`], session resolution and request plumbing
//! - [`session`] - sessions and the insertion-ordered registry
//! - [`slide`] - metadata records, the metadata cache and pyramid geometry
//! - [`browse`] - directory and slide enumeration
//! - [`tile`] - tile sequences and image downloads
//! - [`forms`] - forms and annotations
//! - [`transport`] - the [`Transport`] trait, the HTTP implementation, URL
//!   building and response classification
//! - [`config`] - client configuration
//!
//! ## Example
//!
//! ```rust,no_run
//! use wsi_client::{Client, ClientConfig, TileRange};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), wsi_client::ClientError> {
//!     let client = Client::new(ClientConfig::default())?;
//!     let session = client
//!         .connect("https://slides.example.org/core/", "reader", "secret")
//!         .await;
//!
//!     for dir in client.get_root_directories(session.as_deref()).await? {
//!         println!("{}", dir);
//!     }
//!
//!     let mut tiles = client
//!         .get_tiles("Reference/CMU-1.svs", TileRange::rect(0, 0, 1, 2), session.as_deref())
//!         .await?;
//!     while let Some(tile) = tiles.next_tile().await {
//!         println!("({}, {}): {:?} bytes", tile.x, tile.y, tile.data.map(|d| d.len()));
//!     }
//!
//!     client.disconnect(session.as_deref()).await;
//!     Ok(())
//! }
//! ```

pub mod browse;
pub mod client;
pub mod config;
pub mod error;
pub mod forms;
pub mod session;
pub mod slide;
pub mod tile;
pub mod transport;

// Re-export commonly used types
pub use browse::Recursion;
pub use client::Client;
pub use config::ClientConfig;
pub use error::{ClientError, TransportError};
pub use session::{Session, SessionRegistry};
pub use slide::{normalize_slide_ref, MetadataCache, Pyramid, SlideInfo, TileCount};
pub use tile::{
    ImageFormat, ThumbnailSize, Tile, TileCoords, TileOptions, TileRange, TileSequence,
};
pub use transport::{HttpTransport, Transport};
