use super::{Anchor, RenderContext, SeparatorStrategy};
use crate::watermark::WatermarkError;
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::rect::Rect;

impl SeparatorStrategy {
    /// Draw the vertical separator bar next to the logo. Both ends of the
    /// configured width and height are inclusive.
    pub fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), WatermarkError> {
        let sep = ctx.template.separator.clone();
        let logo_t = &ctx.template.logo;
        let logo = ctx.layout.logo.ok_or_else(|| {
            WatermarkError::InvalidGeometry("separator drawn before the logo".to_string())
        })?;

        let x = match self.anchor {
            Anchor::Left | Anchor::Center | Anchor::StackBlur => logo.right() + sep.margin_left as i64,
            Anchor::Right => logo.x - logo_t.margin_left as i64 - sep.margin_right as i64,
        };
        let y = ctx.band_top() + sep.margin_top as i64;

        draw_filled_rect_mut(
            &mut ctx.canvas,
            Rect::at(x as i32, y as i32).of_size(sep.width + 1, sep.height + 1),
            sep.color.rgba(),
        );
        Ok(())
    }
}
