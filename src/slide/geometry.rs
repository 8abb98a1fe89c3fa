//! Pyramid geometry derived from slide metadata.
//!
//! Slides are served as a power-of-two resolution pyramid: zoom level
//! `max` is the native resolution and every level below halves both
//! dimensions. [`Pyramid`] holds the handful of numbers needed for that
//! arithmetic and performs no I/O; the [`Client`] methods at the bottom fetch
//! (or reuse) the cached metadata and delegate to it.
//!
//! ```text
//! zoom level:   0        1        2   ...   max
//! scale:      2^-max   2^(1-max)  ...        1
//! ```

use std::collections::BTreeMap;

use tracing::warn;

use super::info::{SlideInfo, MAX_ZOOM_LEVEL};
use super::metadata::normalize_slide_ref;
use crate::browse::Recursion;
use crate::client::Client;
use crate::error::ClientError;
use crate::session::Session;
use crate::transport::Transport;

/// Micrometres per pixel at which a slide counts as 40x.
const MICRONS_PER_PIXEL_AT_40X: f64 = 0.25;

/// Magnification at [`MICRONS_PER_PIXEL_AT_40X`].
const REFERENCE_MAGNIFICATION: f64 = 40.0;

// =============================================================================
// Tile Count
// =============================================================================

/// Number of tiles covering a slide at one zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCount {
    /// Tiles along X
    pub x: u64,
    /// Tiles along Y
    pub y: u64,
    /// `x * y`, saturating at `u64::MAX`
    pub total: u64,
}

impl TileCount {
    fn new(x: u64, y: u64) -> Self {
        Self {
            x,
            y,
            total: x.saturating_mul(y),
        }
    }
}

// =============================================================================
// Pyramid
// =============================================================================

/// Geometry of one slide's resolution pyramid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pyramid {
    /// Native width in pixels
    pub width: u64,
    /// Native height in pixels
    pub height: u64,
    /// Native micrometres per pixel (X, Y)
    pub microns_per_pixel: (f64, f64),
    /// Zoom level of the native resolution
    pub max_zoom_level: u32,
    /// Tile width and height in pixels
    pub tile_size: (u32, u32),
}

impl Pyramid {
    /// Build the geometry from a metadata record and the server's tile size.
    ///
    /// A missing or unusable zoom level count is treated as zero.
    pub fn from_info(info: &SlideInfo, tile_size: (u32, u32)) -> Result<Self, String> {
        let width = info.width().ok_or("Width missing or not numeric")?;
        let height = info.height().ok_or("Height missing or not numeric")?;
        let microns_per_pixel = info
            .microns_per_pixel()
            .ok_or("MicrometresPerPixelX/Y missing or not numeric")?;

        if tile_size.0 == 0 || tile_size.1 == 0 {
            return Err("tile size must be positive".to_string());
        }

        Ok(Self {
            width,
            height,
            microns_per_pixel,
            max_zoom_level: info.max_zoom_level().unwrap_or(0),
            tile_size,
        })
    }

    /// Scale of a zoom level relative to the native resolution.
    ///
    /// `None` (or the max level) is the native resolution. Levels above
    /// the max level scale up.
    pub fn scale(&self, zoom_level: Option<u32>) -> f64 {
        match zoom_level {
            Some(level) if level != self.max_zoom_level => {
                let exponent = i64::from(level) - i64::from(self.max_zoom_level);
                // Anything beyond +-1100 is already 0 or infinity in f64
                2f64.powi(exponent.clamp(-1100, 1100) as i32)
            }
            _ => 1.0,
        }
    }

    /// Pixel dimensions at a zoom level, truncated to whole pixels
    /// (saturating at `u64::MAX`).
    pub fn pixel_dimensions(&self, zoom_level: Option<u32>) -> (u64, u64) {
        let scale = self.scale(zoom_level);
        if scale == 1.0 {
            return (self.width, self.height);
        }
        (
            (self.width as f64 * scale) as u64,
            (self.height as f64 * scale) as u64,
        )
    }

    /// Micrometres covered by one pixel at a zoom level (X, Y).
    ///
    /// Every level below the native one doubles the value.
    pub fn microns_per_pixel_at(&self, zoom_level: Option<u32>) -> (f64, f64) {
        let scale = self.scale(zoom_level);
        let (x, y) = self.microns_per_pixel;
        (x / scale, y / scale)
    }

    /// Tiles needed to cover the slide at a zoom level.
    pub fn tile_count(&self, zoom_level: Option<u32>) -> TileCount {
        let (width, height) = self.pixel_dimensions(zoom_level);
        TileCount::new(
            width.div_ceil(self.tile_size.0 as u64),
            height.div_ceil(self.tile_size.1 as u64),
        )
    }

    /// Tile counts per zoom level, keeping only levels with more than
    /// `min_tiles` tiles.
    ///
    /// Dropped levels are assumed to be the coarsest ones: the retained
    /// counts are keyed by the top-most levels of `0..=max`, in order.
    pub fn zoom_levels(&self, min_tiles: u64) -> BTreeMap<u32, TileCount> {
        // Levels more than MAX_ZOOM_LEVEL halvings below native have no
        // pixels, hence no tiles, and are dropped by the filter anyway.
        let lowest = self.max_zoom_level.saturating_sub(MAX_ZOOM_LEVEL);
        let levels: Vec<u32> = (lowest..=self.max_zoom_level).collect();
        let retained: Vec<TileCount> = levels
            .iter()
            .map(|&level| self.tile_count(Some(level)))
            .filter(|count| count.total > min_tiles)
            .collect();

        let skip = levels.len() - retained.len();
        levels[skip..].iter().copied().zip(retained).collect()
    }

    /// Physical size in micrometres (X, Y) at native resolution.
    pub fn physical_dimensions(&self) -> (f64, f64) {
        let (width, height) = self.pixel_dimensions(None);
        let (mpp_x, mpp_y) = self.microns_per_pixel_at(None);
        (width as f64 * mpp_x, height as f64 * mpp_y)
    }

    /// Objective magnification equivalent of a zoom level.
    ///
    /// `exact` returns `40 / (mpp / 0.25)`. Otherwise the value is rounded
    /// down to a whole magnification (40x, 20x, 10x, ...). Non-positive
    /// resolutions yield `0`.
    pub fn magnification(&self, zoom_level: Option<u32>, exact: bool) -> f64 {
        let (mpp, _) = self.microns_per_pixel_at(zoom_level);
        if mpp <= 0.0 || !mpp.is_finite() {
            return 0.0;
        }

        let magnification = REFERENCE_MAGNIFICATION / (mpp / MICRONS_PER_PIXEL_AT_40X);
        if exact {
            magnification
        } else {
            magnification.floor()
        }
    }
}

// =============================================================================
// Client operations
// =============================================================================

impl<T: Transport> Client<T> {
    /// Highest zoom level of a slide.
    ///
    /// An unusable zoom level field, or an answer that is not a metadata
    /// record, is logged and reported as `0`.
    pub async fn max_zoom_level(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<u32, ClientError> {
        let session = self.session(session_id).await?;
        let Some(info) = self.slide_info_for(&session, slide_ref).await? else {
            warn!("No metadata for {}, assuming zoom level 0", slide_ref);
            return Ok(0);
        };
        Ok(max_zoom_or_zero(&info, slide_ref))
    }

    /// Tile size shared by all slides of a session's server.
    ///
    /// Sampled from any cached record; with an empty cache, the first slide
    /// of the first non-empty directory is fetched.
    pub async fn tile_size(&self, session_id: Option<&str>) -> Result<(u32, u32), ClientError> {
        let session = self.session(session_id).await?;
        self.tile_size_for(&session).await
    }

    async fn tile_size_for(&self, session: &Session) -> Result<(u32, u32), ClientError> {
        let info = match session.cache().any().await {
            Some(info) => info,
            None => {
                let dir = self
                    .get_first_non_empty_directory(None, Some(session.id()))
                    .await?
                    .ok_or_else(|| ClientError::NotFound {
                        endpoint: "GetFiles",
                        input: "/".to_string(),
                    })?;
                let slides = self
                    .get_slides(&dir, Some(session.id()), Recursion::None)
                    .await?;
                let first = slides.first().ok_or_else(|| ClientError::NotFound {
                    endpoint: "GetFiles",
                    input: dir.clone(),
                })?;
                self.slide_info_for(session, first)
                    .await?
                    .ok_or_else(|| ClientError::NotFound {
                        endpoint: "GetImageInfo",
                        input: first.clone(),
                    })?
            }
        };

        let size = info.tile_size().ok_or_else(|| ClientError::UnexpectedResponse {
            endpoint: "GetImageInfo",
            reason: "TileSize missing or not numeric".to_string(),
        })?;
        Ok((size, size))
    }

    /// Pyramid geometry of a slide.
    pub async fn pyramid(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<Pyramid, ClientError> {
        let session = self.session(session_id).await?;
        self.pyramid_for(&session, slide_ref).await
    }

    pub(crate) async fn pyramid_for(
        &self,
        session: &Session,
        slide_ref: &str,
    ) -> Result<Pyramid, ClientError> {
        let info = self.require_info(session, slide_ref).await?;
        let tile_size = self.tile_size_for(session).await?;

        let pyramid = Pyramid::from_info(&info, tile_size).map_err(|reason| {
            ClientError::UnexpectedResponse {
                endpoint: "GetImageInfo",
                reason: format!("{}: {}", normalize_slide_ref(slide_ref), reason),
            }
        })?;
        if let Err(reason) = info.max_zoom_level() {
            warn!("Unable to read zoom levels of {}: {}", slide_ref, reason);
        }
        Ok(pyramid)
    }

    /// Micrometres per pixel (X, Y) at a zoom level (native when `None`).
    pub async fn microns_per_pixel(
        &self,
        slide_ref: &str,
        zoom_level: Option<u32>,
        session_id: Option<&str>,
    ) -> Result<(f64, f64), ClientError> {
        let session = self.session(session_id).await?;
        let info = self.require_info(&session, slide_ref).await?;
        let (x, y) = info.microns_per_pixel().ok_or_else(|| ClientError::UnexpectedResponse {
            endpoint: "GetImageInfo",
            reason: "MicrometresPerPixelX/Y missing or not numeric".to_string(),
        })?;

        let pyramid = Pyramid {
            width: 0,
            height: 0,
            microns_per_pixel: (x, y),
            max_zoom_level: max_zoom_or_zero(&info, slide_ref),
            tile_size: (1, 1),
        };
        Ok(pyramid.microns_per_pixel_at(zoom_level))
    }

    /// Pixel dimensions at a zoom level (native when `None`).
    pub async fn pixel_dimensions(
        &self,
        slide_ref: &str,
        zoom_level: Option<u32>,
        session_id: Option<&str>,
    ) -> Result<(u64, u64), ClientError> {
        let session = self.session(session_id).await?;
        let info = self.require_info(&session, slide_ref).await?;
        let (Some(width), Some(height)) = (info.width(), info.height()) else {
            return Err(ClientError::UnexpectedResponse {
                endpoint: "GetImageInfo",
                reason: "Width/Height missing or not numeric".to_string(),
            });
        };

        let pyramid = Pyramid {
            width,
            height,
            microns_per_pixel: (0.0, 0.0),
            max_zoom_level: max_zoom_or_zero(&info, slide_ref),
            tile_size: (1, 1),
        };
        Ok(pyramid.pixel_dimensions(zoom_level))
    }

    /// Tile counts (X, Y, total) at a zoom level (native when `None`).
    pub async fn number_of_tiles(
        &self,
        slide_ref: &str,
        zoom_level: Option<u32>,
        session_id: Option<&str>,
    ) -> Result<TileCount, ClientError> {
        Ok(self
            .pyramid(slide_ref, session_id)
            .await?
            .tile_count(zoom_level))
    }

    /// Tile counts per zoom level above `min_tiles`, keyed per
    /// [`Pyramid::zoom_levels`].
    pub async fn zoom_levels(
        &self,
        slide_ref: &str,
        min_tiles: u64,
        session_id: Option<&str>,
    ) -> Result<BTreeMap<u32, TileCount>, ClientError> {
        Ok(self
            .pyramid(slide_ref, session_id)
            .await?
            .zoom_levels(min_tiles))
    }

    /// Physical size in micrometres (X, Y).
    pub async fn physical_dimensions(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<(f64, f64), ClientError> {
        let (width, height) = self.pixel_dimensions(slide_ref, None, session_id).await?;
        let (mpp_x, mpp_y) = self.microns_per_pixel(slide_ref, None, session_id).await?;
        Ok((width as f64 * mpp_x, height as f64 * mpp_y))
    }

    /// Magnification equivalent of a zoom level; see [`Pyramid::magnification`].
    pub async fn magnification(
        &self,
        slide_ref: &str,
        zoom_level: Option<u32>,
        exact: bool,
        session_id: Option<&str>,
    ) -> Result<f64, ClientError> {
        let (mpp, _) = self
            .microns_per_pixel(slide_ref, zoom_level, session_id)
            .await?;
        let pyramid = Pyramid {
            width: 0,
            height: 0,
            microns_per_pixel: (mpp, mpp),
            max_zoom_level: 0,
            tile_size: (1, 1),
        };
        Ok(pyramid.magnification(None, exact))
    }

    /// Number of channels of a slide.
    pub async fn channel_count(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<usize, ClientError> {
        let session = self.session(session_id).await?;
        Ok(self.require_info(&session, slide_ref).await?.channel_count())
    }

    /// Number of layers (z-stack planes) of a slide.
    pub async fn layer_count(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<usize, ClientError> {
        let session = self.session(session_id).await?;
        Ok(self.require_info(&session, slide_ref).await?.layer_count())
    }

    /// Whether a slide has more than one channel.
    pub async fn is_fluorescent(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<bool, ClientError> {
        Ok(self.channel_count(slide_ref, session_id).await? > 1)
    }

    /// Whether a slide has more than one layer.
    pub async fn is_z_stack(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<bool, ClientError> {
        Ok(self.layer_count(slide_ref, session_id).await? > 1)
    }

    /// Alias of [`Client::is_z_stack`].
    pub async fn is_multi_layer(
        &self,
        slide_ref: &str,
        session_id: Option<&str>,
    ) -> Result<bool, ClientError> {
        self.is_z_stack(slide_ref, session_id).await
    }

    async fn require_info(
        &self,
        session: &Session,
        slide_ref: &str,
    ) -> Result<std::sync::Arc<SlideInfo>, ClientError> {
        self.slide_info_for(session, slide_ref)
            .await?
            .ok_or_else(|| ClientError::NotFound {
                endpoint: "GetImageInfo",
                input: normalize_slide_ref(slide_ref).to_string(),
            })
    }
}

/// Zoom level count of a record, logging and falling back to `0` when unusable.
fn max_zoom_or_zero(info: &SlideInfo, slide_ref: &str) -> u32 {
    info.max_zoom_level().unwrap_or_else(|reason| {
        warn!("Unable to read zoom levels of {}: {}", slide_ref, reason);
        0
    })
}
