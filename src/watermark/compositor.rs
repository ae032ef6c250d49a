use super::cache::CacheService;
use super::image_processing::save_to;
use super::logo::LogoResolver;
use super::orientation::apply_orientation;
use super::strategy::{RenderContext, SlotTexts};
use super::template::TemplateRegistry;
use super::{OutputFormat, RenderRequest, RenderResult, WatermarkError};
use image::DynamicImage;
use image::imageops::FilterType;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Progress of one render. Each stage is entered after the work it names
/// has succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderStage {
    Created,
    MetadataResolved,
    TemplateResolved,
    SourceLoaded,
    Composited,
    Saved,
}

impl fmt::Display for RenderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RenderStage::Created => "created",
            RenderStage::MetadataResolved => "metadata resolved",
            RenderStage::TemplateResolved => "template resolved",
            RenderStage::SourceLoaded => "source loaded",
            RenderStage::Composited => "composited",
            RenderStage::Saved => "saved",
        };
        f.write_str(name)
    }
}

/// A render that stopped after `stage`.
#[derive(Debug, Error)]
#[error("render failed after stage '{stage}': {error}")]
pub struct RenderFailure {
    pub stage: RenderStage,
    pub error: WatermarkError,
}

#[derive(Debug, Clone)]
pub struct CompositorOptions {
    pub jpeg_quality: u8,
    /// Copy resolution and orientation onto written files
    pub write_back_metadata: bool,
}

impl Default for CompositorOptions {
    fn default() -> Self {
        Self {
            jpeg_quality: 100,
            write_back_metadata: true,
        }
    }
}

/// Runs the watermark pipeline for single requests. Cheap to share behind
/// an `Arc`; all mutable state lives in the caches.
pub struct Compositor {
    registry: Arc<TemplateRegistry>,
    caches: Arc<CacheService>,
    logos: Arc<dyn LogoResolver>,
    options: CompositorOptions,
}

struct Run {
    stage: RenderStage,
}

impl Run {
    fn advance(&mut self, next: RenderStage) {
        debug!("Render stage {} -> {}", self.stage, next);
        self.stage = next;
    }

    fn fail(&self, error: impl Into<WatermarkError>) -> RenderFailure {
        RenderFailure {
            stage: self.stage,
            error: error.into(),
        }
    }
}

impl Compositor {
    pub fn new(
        registry: Arc<TemplateRegistry>,
        caches: Arc<CacheService>,
        logos: Arc<dyn LogoResolver>,
        options: CompositorOptions,
    ) -> Self {
        Self {
            registry,
            caches,
            logos,
            options,
        }
    }

    pub fn caches(&self) -> &Arc<CacheService> {
        &self.caches
    }

    pub fn registry(&self) -> &Arc<TemplateRegistry> {
        &self.registry
    }

    /// Render one request into its result map. Failures are reported in the
    /// result, never raised.
    pub fn render(&self, request: &RenderRequest) -> RenderResult {
        match self.try_render(request) {
            Ok(result) => result,
            Err(failure) => {
                error!(
                    "Watermark for {:?} failed: {}",
                    request.source_path, failure
                );
                RenderResult::failure(&failure.error)
            }
        }
    }

    pub fn try_render(&self, request: &RenderRequest) -> Result<RenderResult, RenderFailure> {
        let mut run = Run {
            stage: RenderStage::Created,
        };
        request.validate().map_err(|e| run.fail(e))?;

        let metadata = self
            .caches
            .metadata
            .resolve(&request.source_path)
            .map_err(|e| run.fail(e))?;
        let logos = self.logos.resolve(&metadata.make).map_err(|e| run.fail(e))?;
        run.advance(RenderStage::MetadataResolved);

        let mut template = self
            .registry
            .find_by_id(&request.template_id)
            .and_then(|t| t.resolve())
            .map_err(|e| run.fail(e))?;
        run.advance(RenderStage::TemplateResolved);

        let source = self
            .caches
            .images
            .load(&request.source_path)
            .map_err(|e| run.fail(e))?;
        let source = apply_orientation(&source, metadata.orientation_degrees).to_rgba8();
        run.advance(RenderStage::SourceLoaded);

        if let Some(color) = request.border_color {
            template.border.color = color;
        }
        if let Some(only_bottom) = request.only_bottom_border {
            template.border.only_bottom = only_bottom;
        }
        if template.border.only_bottom {
            template.border.left = 0;
            template.border.right = 0;
            template.border.top = 0;
        }

        let texts = SlotTexts::resolve(&template.words, &metadata, &request.text_overrides);
        let mut ctx = RenderContext::new(template, source, &self.caches, logos, texts);
        ctx.compose().map_err(|e| run.fail(e))?;
        run.advance(RenderStage::Composited);

        let format = if ctx.save_lossless {
            OutputFormat::Png
        } else {
            OutputFormat::Jpeg
        };
        let border_color = ctx.template.border.color;
        save_to(
            &DynamicImage::ImageRgba8(ctx.canvas),
            &request.save_path,
            format,
            self.options.jpeg_quality,
        )
        .map_err(|e| run.fail(e))?;

        if self.options.write_back_metadata
            && let Err(e) = self
                .caches
                .metadata
                .provider()
                .write_back(&request.save_path, &metadata)
        {
            warn!(
                "Could not copy metadata onto {:?}: {}",
                request.save_path, e
            );
        }
        run.advance(RenderStage::Saved);

        info!(
            "Watermarked {:?} -> {:?} ({:?})",
            request.source_path, request.save_path, format
        );
        Ok(RenderResult::success(
            border_color,
            &request.save_path,
            &request.source_path,
        ))
    }

    /// Write a 1/`divisor` scale JPEG copy of `source` to `save_path`.
    pub fn small_preview(
        &self,
        source: &Path,
        save_path: &Path,
        divisor: u32,
    ) -> Result<PathBuf, WatermarkError> {
        let image = self.caches.images.load(source)?;
        let divisor = divisor.max(1);
        let width = (image.width() / divisor).max(1);
        let height = (image.height() / divisor).max(1);

        let small = image.resize_exact(width, height, FilterType::Lanczos3);
        save_to(&small, save_path, OutputFormat::Jpeg, self.options.jpeg_quality)?;
        debug!("Small preview {:?} ({}x{})", save_path, width, height);
        Ok(save_path.to_path_buf())
    }
}
