pub mod jpeg;
pub mod png;

use crate::watermark::{OutputFormat, WatermarkError};
use image::{DynamicImage, ImageFormat};
use std::path::Path;

/// Detect a supported format from a leading byte prefix.
pub fn sniff(bytes: &[u8]) -> Option<OutputFormat> {
    match image::guess_format(bytes).ok()? {
        ImageFormat::Jpeg => Some(OutputFormat::Jpeg),
        ImageFormat::Png => Some(OutputFormat::Png),
        _ => None,
    }
}

/// Encode `image` to `path`. The extension of `path` is not consulted.
pub fn save(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: u8,
) -> Result<(), WatermarkError> {
    match format {
        OutputFormat::Jpeg => jpeg::save(image, path, quality),
        OutputFormat::Png => png::save(image, path),
    }
}
