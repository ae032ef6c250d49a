// Image decode, encode and masking helpers used by the compositor
pub mod formats;
mod mask;

pub use formats::{save, sniff};
pub use mask::RoundedMask;

use super::ImageLoadError;
use super::OutputFormat;
use image::DynamicImage;
use std::io::Read;
use std::path::Path;
use tracing::{debug, error};

/// Read and decode a JPEG or PNG file. The format is sniffed from the file's
/// leading bytes, never from its extension.
pub fn decode_file(path: &Path) -> Result<DynamicImage, ImageLoadError> {
    if !path.exists() {
        return Err(ImageLoadError::NotFound(path.to_path_buf()));
    }

    let mut file = std::fs::File::open(path).map_err(|e| {
        error!("Failed to open {:?}: {}", path, e);
        ImageLoadError::NotOpenable {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes).map_err(|e| {
        error!("Failed to read {:?}: {}", path, e);
        ImageLoadError::NotReadable {
            path: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;

    let format = sniff(&bytes).ok_or_else(|| {
        error!("{:?} is not a supported image format", path);
        ImageLoadError::UnsupportedFormat(path.to_path_buf())
    })?;

    let image = image::load_from_memory_with_format(&bytes, format.image_format()).map_err(
        |e| ImageLoadError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        },
    )?;

    debug!(
        "Decoded {:?} as {:?} ({}x{})",
        path,
        format,
        image.width(),
        image.height()
    );
    Ok(image)
}

/// Persist `image`, creating the parent directory first.
pub fn save_to(
    image: &DynamicImage,
    path: &Path,
    format: OutputFormat,
    quality: u8,
) -> Result<(), super::WatermarkError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    save(image, path, format, quality)
}
