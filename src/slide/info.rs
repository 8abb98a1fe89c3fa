//! Slide metadata records.
//!
//! Servers return metadata as a loosely typed attribute map whose numeric
//! fields are sometimes encoded as strings. [`SlideInfo`] keeps the map
//! untouched and offers typed, tolerant accessors over it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Highest zoom level accepted from a server.
///
/// Pixel counts fit in 64 bits, so any level more than 64 halvings below
/// the native one is empty.
pub const MAX_ZOOM_LEVEL: u32 = 64;

/// Metadata record of one slide, as returned by `GetImageInfo`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlideInfo(Map<String, Value>);

impl SlideInfo {
    /// Wrap an attribute map.
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self(attributes)
    }

    /// Wrap a JSON value if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    /// Raw attribute lookup.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The full attribute map.
    pub fn attributes(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Path of the slide on the server.
    pub fn filename(&self) -> Option<&str> {
        self.get("Filename").and_then(Value::as_str)
    }

    /// Server-computed unique identifier.
    pub fn uid(&self) -> Option<&str> {
        self.get("UID")
            .and_then(Value::as_str)
            .filter(|uid| !uid.is_empty())
    }

    /// Native width in pixels.
    pub fn width(&self) -> Option<u64> {
        self.get("Width").and_then(as_u64)
    }

    /// Native height in pixels.
    pub fn height(&self) -> Option<u64> {
        self.get("Height").and_then(as_u64)
    }

    /// Edge length of the (square) tiles served for this slide.
    pub fn tile_size(&self) -> Option<u32> {
        self.get("TileSize")
            .and_then(as_u64)
            .and_then(|size| u32::try_from(size).ok())
    }

    /// Native micrometres per pixel along X and Y.
    pub fn microns_per_pixel(&self) -> Option<(f64, f64)> {
        let x = self.get("MicrometresPerPixelX").and_then(as_f64)?;
        let y = self.get("MicrometresPerPixelY").and_then(as_f64)?;
        Some((x, y))
    }

    /// Highest zoom level of the pyramid.
    ///
    /// `MaxZoomLevel` wins when present; otherwise `NumberOfZoomLevels` is
    /// used. Levels above [`MAX_ZOOM_LEVEL`] are rejected. The error
    /// describes the offending value.
    pub fn max_zoom_level(&self) -> Result<u32, String> {
        let (key, value) = match self.get("MaxZoomLevel") {
            Some(value) => ("MaxZoomLevel", value),
            None => match self.get("NumberOfZoomLevels") {
                Some(value) => ("NumberOfZoomLevels", value),
                None => return Err("neither MaxZoomLevel nor NumberOfZoomLevels present".into()),
            },
        };

        let level = as_u64(value)
            .and_then(|level| u32::try_from(level).ok())
            .ok_or_else(|| format!("{} has unusable value {}", key, value))?;
        if level > MAX_ZOOM_LEVEL {
            return Err(format!(
                "{} of {} exceeds the supported maximum of {}",
                key, level, MAX_ZOOM_LEVEL
            ));
        }
        Ok(level)
    }

    /// Time frames of the slide (each holding layers of channels).
    pub fn time_frames(&self) -> &[Value] {
        self.get("TimeFrames")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Layers (z-stack planes) of the first time frame.
    pub fn layers(&self) -> &[Value] {
        self.time_frames()
            .first()
            .and_then(|frame| frame.get("Layers"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Channels of the first layer of the first time frame.
    pub fn channels(&self) -> &[Value] {
        self.layers()
            .first()
            .and_then(|layer| layer.get("Channels"))
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Number of channels; more than one means a fluorescent slide.
    pub fn channel_count(&self) -> usize {
        self.channels().len()
    }

    /// Number of layers; more than one means a z-stack.
    pub fn layer_count(&self) -> usize {
        self.layers().len()
    }
}

impl From<Map<String, Value>> for SlideInfo {
    fn from(attributes: Map<String, Value>) -> Self {
        Self::new(attributes)
    }
}

/// Numeric value that may arrive as a JSON number or a numeric string.
fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
