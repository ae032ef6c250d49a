use image::{DynamicImage, ImageEncoder, codecs::jpeg::JpegEncoder};
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

use crate::watermark::WatermarkError;

/// Save image as JPEG at the given quality
pub fn save(image: &DynamicImage, path: &Path, quality: u8) -> Result<(), WatermarkError> {
    // JPEG doesn't support alpha channel, so convert to RGB
    let rgb_image = image.to_rgb8();
    let output = BufWriter::new(std::fs::File::create(path)?);

    let encoder = JpegEncoder::new_with_quality(output, quality);
    encoder.write_image(
        &rgb_image,
        rgb_image.width(),
        rgb_image.height(),
        image::ExtendedColorType::Rgb8,
    )?;

    debug!(
        "JPEG written to {:?} ({}x{}, quality {})",
        path,
        rgb_image.width(),
        rgb_image.height(),
        quality
    );
    Ok(())
}
