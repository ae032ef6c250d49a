// Camera-metadata watermarking: templates, layout strategies, caches and the render pipeline
pub mod batch;
pub mod cache;
pub mod compositor;
mod error;
pub mod image_processing;
pub mod logo;
pub mod metadata;
pub mod orientation;
pub mod recolor;
pub mod strategy;
pub mod template;
pub mod text;
mod types;

pub use batch::{BatchDriver, BatchReport, WorkerPool, collect_images};
pub use cache::CacheService;
pub use compositor::{Compositor, CompositorOptions, RenderFailure, RenderStage};
pub use error::{ImageLoadError, MetadataError, WatermarkError};
pub use logo::{ConfiguredLogos, LogoPaths, LogoResolver};
pub use metadata::{MetadataProvider, MetadataRecord, provider_from_config};
pub use recolor::{RecolorOptions, recolor, recolor_file};
pub use template::{Template, TemplateRegistry};
pub use types::{Bounds, OutputFormat, RenderRequest, RenderResult, RgbaColor};

use crate::Config;
use std::sync::Arc;

/// Wire up caches, templates and logos from a loaded config.
pub fn compositor_from_config(config: &Config) -> Result<Compositor, WatermarkError> {
    let registry = TemplateRegistry::from_file(&config.paths.templates_file)?;
    let caches = CacheService::new(provider_from_config(&config.metadata));
    let logos = ConfiguredLogos::new(config.logos.clone());
    Ok(Compositor::new(
        Arc::new(registry),
        Arc::new(caches),
        Arc::new(logos),
        CompositorOptions {
            jpeg_quality: config.output.jpeg_quality,
            write_back_metadata: true,
        },
    ))
}
