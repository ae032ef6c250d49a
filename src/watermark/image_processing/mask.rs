use image::{Rgba, RgbaImage};

/// Binary alpha mask with quarter-circle corners of `radius` cut out of a
/// `width` x `height` rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundedMask {
    pub width: u32,
    pub height: u32,
    pub radius: u32,
}

impl RoundedMask {
    pub fn new(width: u32, height: u32, radius: u32) -> Self {
        Self {
            width,
            height,
            radius,
        }
    }

    /// Whether the pixel at (x, y) survives the mask.
    pub fn is_opaque(&self, x: u32, y: u32) -> bool {
        if self.radius == 0 {
            return true;
        }
        let (x, y) = (x as f64, y as f64);
        let r = self.radius as f64;
        let right = self.width as f64 - r;
        let bottom = self.height as f64 - r;

        // later corners win where corner squares overlap
        let mut offset = None;
        if x <= r && y <= r {
            offset = Some((r - x + 0.5, y - r + 0.5));
        }
        if x >= right && y <= r {
            offset = Some((x - right + 0.5, y - r + 0.5));
        }
        if x <= r && y >= bottom {
            offset = Some((r - x + 0.5, y - bottom + 0.5));
        }
        if x >= right && y >= bottom {
            offset = Some((x - right + 0.5, y - bottom + 0.5));
        }

        match offset {
            Some((dx, dy)) => dx * dx + dy * dy < r * r,
            None => true,
        }
    }

    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        if self.is_opaque(x, y) { 255 } else { 0 }
    }

    /// Clear the alpha of every masked-out pixel of `image`.
    pub fn apply(&self, image: &mut RgbaImage) {
        for (x, y, pixel) in image.enumerate_pixels_mut() {
            if !self.is_opaque(x, y) {
                pixel[3] = 0;
            }
        }
    }

    /// A canvas of the mask's size filled with `color` inside the mask and
    /// fully transparent outside it.
    pub fn fill(&self, color: Rgba<u8>) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            if self.is_opaque(x, y) {
                color
            } else {
                Rgba([0, 0, 0, 0])
            }
        })
    }
}
