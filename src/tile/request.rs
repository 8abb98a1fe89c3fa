//! Named parameters for tile and image requests.

use std::fmt;

/// Default image quality (1-100).
pub const DEFAULT_QUALITY: u8 = 100;

/// Minimum allowed image quality.
pub const MIN_QUALITY: u8 = 1;

/// Maximum allowed image quality.
pub const MAX_QUALITY: u8 = 100;

/// Check if a quality value is within the valid range.
#[inline]
pub fn is_valid_quality(quality: u8) -> bool {
    (MIN_QUALITY..=MAX_QUALITY).contains(&quality)
}

// =============================================================================
// Image Format
// =============================================================================

/// Encoding of the images the server returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    /// Value of the `format` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Tile Options
// =============================================================================

/// Rendering options shared by every tile of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileOptions {
    /// Zoom level; `None` is the slide's max zoom level
    pub zoom_level: Option<u32>,

    /// Z-stack layer
    pub z_stack: u32,

    /// Output encoding
    pub format: ImageFormat,

    /// Output quality (1-100)
    pub quality: u8,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            zoom_level: None,
            z_stack: 0,
            format: ImageFormat::default(),
            quality: DEFAULT_QUALITY,
        }
    }
}

impl TileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn zoom_level(mut self, zoom_level: u32) -> Self {
        self.zoom_level = Some(zoom_level);
        self
    }

    pub fn z_stack(mut self, z_stack: u32) -> Self {
        self.z_stack = z_stack;
        self
    }

    pub fn format(mut self, format: ImageFormat) -> Self {
        self.format = format;
        self
    }

    pub fn quality(mut self, quality: u8) -> Self {
        self.quality = quality;
        self
    }

    /// Reject options the server cannot honor.
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_quality(self.quality) {
            return Err(format!(
                "quality must be between {} and {}, got {}",
                MIN_QUALITY, MAX_QUALITY, self.quality
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Tile Range
// =============================================================================

/// Inclusive rectangle of tile coordinates.
///
/// Omitted upper bounds extend to the last tile of the slide at the
/// requested zoom level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileRange {
    pub from_x: u64,
    pub from_y: u64,
    pub to_x: Option<u64>,
    pub to_y: Option<u64>,
    pub options: TileOptions,
}

impl TileRange {
    /// Range starting at `(from_x, from_y)` and extending to the slide's edge.
    pub fn starting_at(from_x: u64, from_y: u64) -> Self {
        Self {
            from_x,
            from_y,
            ..Self::default()
        }
    }

    /// Fixed rectangle `[from_x, to_x] x [from_y, to_y]`.
    pub fn rect(from_x: u64, from_y: u64, to_x: u64, to_y: u64) -> Self {
        Self {
            from_x,
            from_y,
            to_x: Some(to_x),
            to_y: Some(to_y),
            options: TileOptions::default(),
        }
    }

    pub fn to_x(mut self, to_x: u64) -> Self {
        self.to_x = Some(to_x);
        self
    }

    pub fn to_y(mut self, to_y: u64) -> Self {
        self.to_y = Some(to_y);
        self
    }

    pub fn options(mut self, options: TileOptions) -> Self {
        self.options = options;
        self
    }
}

// =============================================================================
// Thumbnail Size
// =============================================================================

/// Requested thumbnail bounds; zero lets the server choose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThumbnailSize {
    pub width: u32,
    pub height: u32,
}

impl ThumbnailSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}
