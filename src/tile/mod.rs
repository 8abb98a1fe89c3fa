//! Tile and image downloads.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │   TileRange / TileOptions               │
//! │   (named optional parameters)           │
//! └────────────────────┬────────────────────┘
//!                      │ Client::get_tiles
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   TileSequence                          │
//! │   TileCoords (column-major) +           │
//! │   one fetch per pulled element          │
//! └────────────────────┬────────────────────┘
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │   tile / thumbnail / barcode / label    │
//! │   endpoints (raw encoded bytes)         │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileOptions`]: zoom level, z-stack layer, format and quality
//! - [`TileRange`]: inclusive rectangle of tiles, open-ended on request
//! - [`TileCoords`]: column-major coordinate iterator
//! - [`TileSequence`]: lazy download of a [`TileRange`], also usable as a
//!   `futures::Stream`
//!
//! # Example
//!
//! ```
//! use wsi_client::tile::{TileCoords, TileOptions, TileRange};
//!
//! let range = TileRange::rect(0, 0, 1, 2).options(TileOptions::new().quality(80));
//! assert_eq!(range.options.quality, 80);
//!
//! let order: Vec<_> = TileCoords::new(0, 0, 1, 2).collect();
//! assert_eq!(order[..3], [(0, 0), (0, 1), (0, 2)]);
//! ```

mod media;
mod request;
mod sequence;

pub use request::{
    is_valid_quality, ImageFormat, ThumbnailSize, TileOptions, TileRange, DEFAULT_QUALITY,
    MAX_QUALITY, MIN_QUALITY,
};
pub use sequence::{Tile, TileCoords, TileSequence};
