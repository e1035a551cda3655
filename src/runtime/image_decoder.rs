//! Image-decoder capability: `decode(source) -> RasterImage`.
//!
//! The loader must decode to 8-bit sRGB, strip alpha explicitly rather
//! than leaving a 4-channel buffer mislabeled as 3-channel, and return
//! channel-order metadata matching the actual buffer (spec §6).

use std::path::{Path, PathBuf};

use crate::error::{OcrError, Result};
use crate::image_ops::{ChannelOrder, RasterImage};

/// An opaque source the decoder knows how to read from.
pub enum ImageSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<&Path> for ImageSource {
    fn from(p: &Path) -> Self {
        ImageSource::Path(p.to_path_buf())
    }
}

impl From<PathBuf> for ImageSource {
    fn from(p: PathBuf) -> Self {
        ImageSource::Path(p)
    }
}

impl From<Vec<u8>> for ImageSource {
    fn from(b: Vec<u8>) -> Self {
        ImageSource::Bytes(b)
    }
}

/// Capability for decoding raster images. The core never decodes image
/// files itself; it only consumes this trait (spec §6, §9).
pub trait ImageDecoder: Send + Sync {
    /// Decodes to an 8-bit RGB raster image (alpha stripped, if any).
    fn decode(&self, source: ImageSource) -> Result<RasterImage>;

    /// Decodes to an 8-bit grayscale raster image. Recommended for the
    /// recognition path so the recognizer never has to convert RGB on
    /// its own.
    fn decode_grayscale(&self, source: ImageSource) -> Result<RasterImage>;
}

/// Default decoder backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultImageDecoder;

impl DefaultImageDecoder {
    fn open(source: ImageSource) -> Result<image::DynamicImage> {
        match source {
            ImageSource::Path(path) => image::open(&path).map_err(|e| OcrError::BadInput {
                reason: format!("failed to decode image at {}: {e}", path.display()),
            }),
            ImageSource::Bytes(bytes) => image::load_from_memory(&bytes)
                .map_err(|e| OcrError::BadInput {
                    reason: format!("failed to decode image from bytes: {e}"),
                }),
        }
    }
}

impl ImageDecoder for DefaultImageDecoder {
    fn decode(&self, source: ImageSource) -> Result<RasterImage> {
        let img = Self::open(source)?;
        let rgb = img.to_rgb8();
        let (w, h) = rgb.dimensions();
        RasterImage::new(rgb.into_raw(), w, h, ChannelOrder::Rgb)
    }

    fn decode_grayscale(&self, source: ImageSource) -> Result<RasterImage> {
        let img = Self::open(source)?;
        let gray = img.to_luma8();
        let (w, h) = gray.dimensions();
        RasterImage::new(gray.into_raw(), w, h, ChannelOrder::Gray)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_rejects_garbage_bytes() {
        let decoder = DefaultImageDecoder;
        let result = decoder.decode(ImageSource::Bytes(vec![0, 1, 2, 3]));
        assert!(result.is_err());
    }
}
