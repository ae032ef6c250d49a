use super::{Anchor, LogoStrategy, RenderContext};
use crate::watermark::WatermarkError;
use crate::watermark::logo::load_sized_logo;
use crate::watermark::types::Bounds;
use image::imageops;
use tracing::debug;

impl LogoStrategy {
    pub fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), WatermarkError> {
        match *self {
            LogoStrategy::Fixed(anchor) => draw_logo(ctx, anchor),
            LogoStrategy::AutoSized(anchor) => {
                let side = ctx.template.border.bottom;
                ctx.template.logo.width = side;
                ctx.template.logo.height = side;
                draw_logo(ctx, anchor)
            }
        }
    }
}

fn draw_logo(ctx: &mut RenderContext<'_>, anchor: Anchor) -> Result<(), WatermarkError> {
    let logo_t = ctx.template.logo.clone();
    let border = &ctx.template.border;
    let (w, h) = (logo_t.width as i64, logo_t.height as i64);
    let canvas_w = ctx.canvas_width();
    let canvas_h = ctx.canvas_height();

    let (x, y) = match anchor {
        Anchor::Left => (border.left as i64, canvas_h - h - logo_t.margin_top as i64),
        Anchor::Center => (
            canvas_w - border.right as i64 - logo_t.margin_right as i64,
            canvas_h - h - logo_t.margin_top as i64,
        ),
        Anchor::Right => (
            canvas_w - border.right as i64 - w,
            canvas_h - h - logo_t.margin_top as i64,
        ),
        Anchor::StackBlur => (
            border.left as i64 + logo_t.margin_left as i64,
            canvas_h - border.bottom as i64 + logo_t.margin_top as i64,
        ),
    };

    let asset = if ctx.template.stack_blur {
        &ctx.logos.blur_logo
    } else {
        &ctx.logos.logo
    };
    let image = load_sized_logo(ctx.caches, asset, logo_t.width, logo_t.height)?;
    imageops::overlay(&mut ctx.canvas, &image.to_rgba8(), x, y);

    let bounds = Bounds::new(x, y, logo_t.width, logo_t.height);
    debug!("Logo {:?} drawn at {:?}", asset, bounds);
    ctx.layout.logo = Some(bounds);
    Ok(())
}
