//! Lazy tile sequences.
//!
//! A [`TileSequence`] walks an inclusive rectangle of tile coordinates in
//! column-major order (for each `x`, every `y` before advancing `x`) and
//! downloads one tile per step, only when the caller pulls it. Nothing is
//! prefetched and the sequence cannot be restarted.
//!
//! ```text
//!        x=0    x=1
//! y=0     1      4
//! y=1     2      5
//! y=2     3      6
//! ```

use std::iter::FusedIterator;
use std::sync::Arc;

use bytes::Bytes;
use futures::stream::{self, Stream};
use tracing::{debug, warn};

use super::request::{TileOptions, TileRange};
use crate::client::Client;
use crate::error::ClientError;
use crate::session::Session;
use crate::slide::normalize_slide_ref;
use crate::transport::Transport;

// =============================================================================
// Coordinates
// =============================================================================

/// Column-major iterator over the inclusive rectangle
/// `[from_x, to_x] x [from_y, to_y]`.
#[derive(Debug, Clone)]
pub struct TileCoords {
    from_y: u64,
    to_y: u64,
    x: u64,
    y: u64,
    remaining: u64,
}

impl TileCoords {
    /// Coordinates of the rectangle; empty when a lower bound exceeds its
    /// upper bound.
    pub fn new(from_x: u64, from_y: u64, to_x: u64, to_y: u64) -> Self {
        let remaining = if from_x > to_x || from_y > to_y {
            0
        } else {
            (to_x - from_x + 1).saturating_mul(to_y - from_y + 1)
        };

        Self {
            from_y,
            to_y,
            x: from_x,
            y: from_y,
            remaining,
        }
    }

    /// An empty sequence of coordinates.
    pub fn empty() -> Self {
        Self {
            from_y: 0,
            to_y: 0,
            x: 0,
            y: 0,
            remaining: 0,
        }
    }
}

impl Iterator for TileCoords {
    type Item = (u64, u64);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let item = (self.x, self.y);
        self.remaining -= 1;
        if self.remaining > 0 {
            if self.y == self.to_y {
                self.y = self.from_y;
                self.x += 1;
            } else {
                self.y += 1;
            }
        }
        Some(item)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = usize::try_from(self.remaining).unwrap_or(usize::MAX);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TileCoords {}

impl FusedIterator for TileCoords {}

// =============================================================================
// Tile Sequence
// =============================================================================

/// One element of a tile sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tile {
    pub x: u64,
    pub y: u64,
    pub zoom_level: u32,
    /// Encoded image, or `None` if this tile could not be downloaded
    pub data: Option<Bytes>,
}

/// Single-pass, pull-driven sequence of tiles.
pub struct TileSequence<'a, T: Transport> {
    client: &'a Client<T>,
    session: Arc<Session>,
    slide: String,
    zoom_level: u32,
    options: TileOptions,
    coords: TileCoords,
}

impl<'a, T: Transport> TileSequence<'a, T> {
    /// Zoom level every tile is fetched at.
    pub fn zoom_level(&self) -> u32 {
        self.zoom_level
    }

    /// Tiles not yet pulled.
    pub fn remaining(&self) -> usize {
        self.coords.len()
    }

    /// Download the next tile.
    ///
    /// A failed download yields a [`Tile`] without data instead of ending
    /// the sequence. Returns `None` once every coordinate has been visited.
    pub async fn next_tile(&mut self) -> Option<Tile> {
        let (x, y) = self.coords.next()?;

        let data = match self
            .client
            .fetch_tile(&self.session, &self.slide, x, y, self.zoom_level, &self.options)
            .await
        {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(
                    "Tile ({}, {}) of {} at zoom {} unavailable: {}",
                    x, y, self.slide, self.zoom_level, e
                );
                None
            }
        };

        Some(Tile {
            x,
            y,
            zoom_level: self.zoom_level,
            data,
        })
    }

    /// Turn the sequence into a [`Stream`] with the same lazy semantics.
    pub fn into_stream(self) -> impl Stream<Item = Tile> + 'a {
        stream::unfold(self, |mut sequence| async move {
            let tile = sequence.next_tile().await?;
            Some((tile, sequence))
        })
    }
}

impl<T: Transport> Client<T> {
    /// Lazy sequence of the tiles in `range`.
    ///
    /// Missing upper bounds are set to the last tile index at the requested
    /// zoom level; a missing zoom level means the slide's max zoom level.
    /// Nothing is downloaded until the sequence is pulled.
    pub async fn get_tiles(
        &self,
        slide_ref: &str,
        range: TileRange,
        session_id: Option<&str>,
    ) -> Result<TileSequence<'_, T>, ClientError> {
        let options = range.options;
        options.validate().map_err(ClientError::InvalidParameter)?;
        let session = self.session(session_id).await?;

        let zoom_level = match options.zoom_level {
            Some(level) => level,
            None => self.max_zoom_level(slide_ref, Some(session.id())).await?,
        };

        let coords = match (range.to_x, range.to_y) {
            (Some(to_x), Some(to_y)) => TileCoords::new(range.from_x, range.from_y, to_x, to_y),
            (to_x, to_y) => {
                let count = self
                    .pyramid_for(&session, slide_ref)
                    .await?
                    .tile_count(Some(zoom_level));
                match (
                    to_x.or_else(|| count.x.checked_sub(1)),
                    to_y.or_else(|| count.y.checked_sub(1)),
                ) {
                    (Some(to_x), Some(to_y)) => {
                        TileCoords::new(range.from_x, range.from_y, to_x, to_y)
                    }
                    _ => TileCoords::empty(),
                }
            }
        };

        debug!(
            "Tile sequence over {} at zoom {}: {} tiles",
            slide_ref,
            zoom_level,
            coords.len()
        );

        Ok(TileSequence {
            client: self,
            session,
            slide: normalize_slide_ref(slide_ref).to_string(),
            zoom_level,
            options,
            coords,
        })
    }
}
