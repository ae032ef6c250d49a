use super::cache::CacheService;
use super::image_processing::{formats, sniff};
use super::{OutputFormat, WatermarkError};
use crate::LogoConfig;
use image::DynamicImage;
use image::imageops::{self, FilterType};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Logo assets for one camera make.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogoPaths {
    pub logo: PathBuf,
    /// Variant drawn on blurred backgrounds
    pub blur_logo: PathBuf,
}

pub trait LogoResolver: Send + Sync {
    fn resolve(&self, make: &str) -> Result<LogoPaths, WatermarkError>;
}

/// Table-driven resolver: the first entry whose id occurs in the make wins.
pub struct ConfiguredLogos {
    entries: Vec<LogoConfig>,
}

impl ConfiguredLogos {
    pub fn new(entries: Vec<LogoConfig>) -> Self {
        Self { entries }
    }
}

impl LogoResolver for ConfiguredLogos {
    fn resolve(&self, make: &str) -> Result<LogoPaths, WatermarkError> {
        self.entries
            .iter()
            .find(|entry| !entry.id.is_empty() && make.contains(&entry.id))
            .map(|entry| LogoPaths {
                logo: entry.path.clone(),
                blur_logo: entry.blur_path.clone(),
            })
            .ok_or_else(|| WatermarkError::LogoNotFound(make.to_string()))
    }
}

/// `dir/nikon.png` at 120x80 becomes `dir/nikon_120_80.png`.
pub fn sized_variant_path(path: &Path, width: u32, height: u32) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let name = match path.extension() {
        Some(ext) => format!("{}_{}_{}.{}", stem, width, height, ext.to_string_lossy()),
        None => format!("{}_{}_{}", stem, width, height),
    };
    path.with_file_name(name)
}

/// Load the `width` x `height` variant of a logo, generating it beside the
/// original asset the first time it is needed.
pub fn load_sized_logo(
    caches: &CacheService,
    path: &Path,
    width: u32,
    height: u32,
) -> Result<Arc<DynamicImage>, WatermarkError> {
    if width == 0 || height == 0 {
        return Err(WatermarkError::InvalidGeometry(format!(
            "logo size {}x{} for {:?}",
            width, height, path
        )));
    }

    let variant = sized_variant_path(path, width, height);
    if !variant.exists() {
        generate_variant(caches, path, &variant, width, height)?;
    }
    Ok(caches.images.load(&variant)?)
}

fn generate_variant(
    caches: &CacheService,
    path: &Path,
    variant: &Path,
    width: u32,
    height: u32,
) -> Result<(), WatermarkError> {
    let original = caches.images.load(path)?;
    let fitted = original.resize(width, height, FilterType::Lanczos3).to_rgba8();

    let mut canvas = (*caches.canvases.blank(path, width, height)).clone();
    let x = (width - fitted.width()) / 2;
    let y = (height - fitted.height()) / 2;
    imageops::overlay(&mut canvas, &fitted, x as i64, y as i64);

    // keep the original's encoding so transparency survives for PNG logos
    let format = std::fs::read(path)
        .ok()
        .and_then(|bytes| sniff(&bytes))
        .unwrap_or(OutputFormat::Png);

    let tmp_name = format!(
        ".{}.{}.tmp",
        variant
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default(),
        uuid::Uuid::new_v4()
    );
    let tmp = variant.with_file_name(tmp_name);
    let result = formats::save(&DynamicImage::ImageRgba8(canvas), &tmp, format, 100)
        .and_then(|_| std::fs::rename(&tmp, variant).map_err(WatermarkError::from));
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp);
    }
    result?;

    info!("Generated logo variant {:?}", variant);
    debug!(
        "Variant {}x{} fitted from {}x{}",
        width,
        height,
        original.width(),
        original.height()
    );
    Ok(())
}
