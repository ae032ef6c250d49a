use super::cache::FontCache;
use super::{RgbaColor, WatermarkError};
use ab_glyph::{Font, FontVec, PxScale, ScaleFont};
use image::RgbaImage;
use imageproc::drawing::{draw_text_mut, text_size};
use std::path::Path;
use std::sync::Arc;

/// A loaded font at a fixed size and color.
pub struct TextBrush {
    font: Arc<FontVec>,
    scale: PxScale,
    color: RgbaColor,
}

impl TextBrush {
    pub fn load(
        fonts: &FontCache,
        font_path: &Path,
        size: f32,
        color: RgbaColor,
    ) -> Result<Self, WatermarkError> {
        let font = fonts.load(font_path).map_err(|message| WatermarkError::Font {
            path: font_path.to_path_buf(),
            message,
        })?;
        Ok(Self {
            font,
            scale: PxScale::from(size),
            color,
        })
    }

    /// Rendered width of `text` in pixels.
    pub fn width(&self, text: &str) -> u32 {
        text_size(self.scale, &*self.font, text).0
    }

    /// Draw `text` with its baseline starting at (x, baseline).
    pub fn draw(&self, canvas: &mut RgbaImage, x: i64, baseline: i64, text: &str) {
        if text.is_empty() {
            return;
        }
        let ascent = self.font.as_scaled(self.scale).ascent();
        let top = baseline - ascent.round() as i64;
        draw_text_mut(
            canvas,
            self.color.rgba(),
            x as i32,
            top as i32,
            self.scale,
            &*self.font,
            text,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const SYSTEM_FONT: &str = "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf";

    #[test]
    fn test_missing_font_is_reported() {
        let fonts = FontCache::new();
        let err = TextBrush::load(&fonts, Path::new("nope/missing.ttf"), 12.0, RgbaColor::BLACK)
            .err()
            .unwrap();
        assert!(matches!(err, WatermarkError::Font { .. }));
    }

    #[test]
    fn test_draw_text() {
        // Skip test if no system font is installed
        let font_path = Path::new(SYSTEM_FONT);
        if !font_path.exists() {
            return;
        }

        let fonts = FontCache::new();
        let brush = TextBrush::load(&fonts, font_path, 24.0, RgbaColor::BLACK).unwrap();
        assert!(brush.width("NIKON Z 6_2") > brush.width("Z"));

        let mut canvas = RgbaImage::from_pixel(200, 60, Rgba([255, 255, 255, 255]));
        brush.draw(&mut canvas, 5, 40, "Hello");
        assert!(canvas.pixels().any(|p| p[0] < 128));
    }
}
