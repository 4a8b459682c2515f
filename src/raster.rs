use crate::color::Rgba;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use std::sync::Arc;
use thiserror::Error;

const DATA_URL_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("failed to decode raster snapshot: {0}")]
    Decode(#[from] image::ImageError),

    #[error("invalid base64 raster data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("failed to encode raster snapshot: {0}")]
    Encode(image::ImageError),

    #[error("invalid raster size {width}x{height}")]
    InvalidSize { width: u32, height: u32 },
}

/// Encoded (PNG) pixel content of a layer.
///
/// Cheap to clone; the bytes are shared. Persisted as a `data:image/png;base64,` URL.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RasterSnapshot {
    png: Arc<[u8]>,
}

impl RasterSnapshot {
    /// Wraps already-encoded PNG bytes without validating them.
    pub fn from_png_bytes(png: impl Into<Arc<[u8]>>) -> Self {
        Self { png: png.into() }
    }

    pub fn encode(image: &RgbaImage) -> Result<Self, RasterError> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(RasterError::InvalidSize { width, height });
        }

        let mut bytes = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .map_err(RasterError::Encode)?;
        Ok(Self::from_png_bytes(bytes))
    }

    /// A `width`×`height` snapshot filled with one color.
    pub fn solid(width: u32, height: u32, color: Rgba) -> Result<Self, RasterError> {
        Self::encode(&RgbaImage::from_pixel(width, height, color.into()))
    }

    pub fn decode(&self) -> Result<RgbaImage, RasterError> {
        let image = image::load_from_memory_with_format(&self.png, ImageFormat::Png)?;
        Ok(image.to_rgba8())
    }

    pub fn png_bytes(&self) -> &[u8] {
        &self.png
    }

    pub fn to_data_url(&self) -> String {
        format!("{DATA_URL_PREFIX}{}", STANDARD.encode(&self.png))
    }

    /// Accepts a PNG data URL or a bare base64 payload.
    pub fn from_data_url(url: &str) -> Result<Self, RasterError> {
        let payload = match url.split_once(',') {
            Some((header, payload)) if header.starts_with("data:") => payload,
            _ => url,
        };
        Ok(Self::from_png_bytes(STANDARD.decode(payload.trim())?))
    }
}

impl std::fmt::Debug for RasterSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterSnapshot")
            .field("png", &format!("<{} bytes>", self.png.len()))
            .finish()
    }
}

impl TryFrom<String> for RasterSnapshot {
    type Error = RasterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_data_url(&value)
    }
}

impl From<RasterSnapshot> for String {
    fn from(snapshot: RasterSnapshot) -> Self {
        snapshot.to_data_url()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_snapshot_decodes_to_same_pixels() {
        let snapshot = RasterSnapshot::solid(3, 2, Rgba::WHITE).unwrap();
        let image = snapshot.decode().unwrap();
        assert_eq!(image.dimensions(), (3, 2));
        assert!(image.pixels().all(|p| p.0 == [255, 255, 255, 255]));
    }

    #[test]
    fn test_zero_size_is_rejected() {
        assert!(matches!(
            RasterSnapshot::solid(0, 4, Rgba::WHITE),
            Err(RasterError::InvalidSize { width: 0, height: 4 })
        ));
    }

    #[test]
    fn test_data_url_form() {
        let snapshot = RasterSnapshot::solid(1, 1, Rgba::BLACK).unwrap();
        let url = snapshot.to_data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(RasterSnapshot::from_data_url(&url).unwrap(), snapshot);
    }

    #[test]
    fn test_garbage_fails_to_decode() {
        let snapshot = RasterSnapshot::from_png_bytes(vec![1u8, 2, 3]);
        assert!(snapshot.decode().is_err());
        assert!(RasterSnapshot::from_data_url("data:image/png;base64,@@@").is_err());
    }
}
