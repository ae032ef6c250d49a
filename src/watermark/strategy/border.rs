use super::{BorderStrategy, RenderContext};
use crate::watermark::WatermarkError;
use crate::watermark::image_processing::RoundedMask;
use image::RgbaImage;
use image::imageops::{self, FilterType};
use tracing::debug;

/// Share of the source edge used for auto-sized borders, split over two sides.
const AUTO_BORDER_RATIO: f64 = 0.05;

impl BorderStrategy {
    pub fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), WatermarkError> {
        match self {
            BorderStrategy::Flat => draw_flat(ctx),
            BorderStrategy::StackBlur => draw_stack_blur(ctx),
            BorderStrategy::FlatAuto => {
                derive_auto_border(ctx);
                draw_flat(ctx)
            }
            BorderStrategy::StackBlurAuto => {
                derive_auto_border(ctx);
                draw_stack_blur(ctx)
            }
        }
    }
}

fn derive_auto_border(ctx: &mut RenderContext<'_>) {
    let (width, height) = ctx.source.dimensions();
    let side_w = (width as f64 * AUTO_BORDER_RATIO / 2.0) as u32;
    let side_h = (height as f64 * AUTO_BORDER_RATIO / 2.0) as u32;
    let side = side_w.max(side_h);

    let border = &mut ctx.template.border;
    if border.only_bottom {
        border.left = 0;
        border.right = 0;
        border.top = 0;
    } else {
        border.left = side;
        border.right = side;
        border.top = side;
    }
    border.bottom = side * 3;
    debug!("Auto border for {}x{}: side {}", width, height, side);
}

fn draw_flat(ctx: &mut RenderContext<'_>) -> Result<(), WatermarkError> {
    let border = &ctx.template.border;
    let (source_w, source_h) = ctx.source.dimensions();
    let width = source_w + border.width();
    let height = source_h + border.height();

    let mut canvas = if border.is_round {
        ctx.save_lossless = true;
        RoundedMask::new(width, height, border.radius).fill(border.color.rgba())
    } else {
        RgbaImage::from_pixel(width, height, border.color.rgba())
    };
    imageops::overlay(
        &mut canvas,
        &ctx.source,
        border.left as i64,
        border.top as i64,
    );

    debug!("Flat border canvas {}x{}", width, height);
    ctx.canvas = canvas;
    Ok(())
}

fn draw_stack_blur(ctx: &mut RenderContext<'_>) -> Result<(), WatermarkError> {
    let border = ctx.template.border.clone();
    let (source_w, source_h) = ctx.source.dimensions();

    let inner_w = source_w as i64 - border.width() as i64;
    let inner_h = source_h as i64 - border.height() as i64;
    if inner_w <= 0 || inner_h <= 0 {
        return Err(WatermarkError::InvalidGeometry(format!(
            "border {}x{} leaves no room inside a {}x{} source",
            border.width(),
            border.height(),
            source_w,
            source_h
        )));
    }

    // stack blur radius r roughly matches a gaussian of sigma r/2
    let mut canvas = if ctx.template.blur_radius > 0 {
        imageops::fast_blur(&ctx.source, ctx.template.blur_radius as f32 / 2.0)
    } else {
        ctx.source.clone()
    };
    ctx.save_lossless = true;

    let mut inner = imageops::resize(
        &ctx.source,
        inner_w as u32,
        inner_h as u32,
        FilterType::Lanczos3,
    );

    if border.is_round {
        RoundedMask::new(source_w, source_h, border.radius).apply(&mut canvas);
        RoundedMask::new(inner.width(), inner.height(), border.radius).apply(&mut inner);
        imageops::overlay(&mut canvas, &inner, border.left as i64, border.top as i64);
    } else {
        imageops::replace(&mut canvas, &inner, border.left as i64, border.top as i64);
    }

    debug!(
        "Stack blur canvas {}x{}, inner {}x{}",
        source_w, source_h, inner_w, inner_h
    );
    ctx.canvas = canvas;
    Ok(())
}
