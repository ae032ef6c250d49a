use super::image_processing::{decode_file, save_to};
use super::{OutputFormat, RgbaColor, WatermarkError};
use image::imageops::{self, FilterType};
use image::{DynamicImage, Rgba, RgbaImage};
use std::path::Path;
use tracing::{debug, info};

/// Distance at which two colors count as completely different.
const MAX_DISTANCE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecolorOptions {
    pub old_color: RgbaColor,
    pub new_color: RgbaColor,
    /// Minimum similarity, out of 255, for a pixel to be touched
    pub tolerance: u8,
    /// Supersampling factor, clamped to 1..=4
    pub anti_alias: u32,
}

impl RecolorOptions {
    pub fn new(old_color: RgbaColor, new_color: RgbaColor) -> Self {
        Self {
            old_color,
            new_color,
            tolerance: 30,
            anti_alias: 2,
        }
    }
}

/// Replace `old_color` with `new_color`, blending near matches by their
/// similarity and smoothing the edges. The alpha channel of `source` is
/// copied to the output unchanged.
pub fn recolor(source: &DynamicImage, options: &RecolorOptions) -> RgbaImage {
    let original = source.to_rgba8();
    let (width, height) = original.dimensions();
    if width == 0 || height == 0 {
        return original;
    }
    let level = options.anti_alias.clamp(1, 4);

    let mut work = imageops::resize(&original, width * level, height * level, FilterType::Lanczos3);
    replace_color(&mut work, options);
    let blurred = imageops::blur(&work, level as f32 * 0.8);
    let downsampled = imageops::resize(&blurred, width, height, FilterType::CatmullRom);
    let mut output = imageops::unsharpen(&downsampled, 1.0, 0);

    for (out, src) in output.pixels_mut().zip(original.pixels()) {
        out[3] = src[3];
    }
    debug!(
        "Recolored {}x{} image at anti-alias level {}",
        width, height, level
    );
    output
}

fn replace_color(image: &mut RgbaImage, options: &RecolorOptions) {
    let old = options.old_color.rgba();
    let new = options.new_color.rgba();
    for pixel in image.pixels_mut() {
        let ratio = similarity(*pixel, old, options.tolerance);
        if ratio == 0.0 {
            continue;
        }
        for channel in 0..3 {
            pixel[channel] = mix(pixel[channel], new[channel], ratio);
        }
    }
}

/// Luma plus two channel differences. Not CIE Lab: the differences wrap like
/// 8-bit arithmetic.
fn pseudo_lab(color: Rgba<u8>) -> (f64, f64, f64) {
    let [r, g, b, _] = color.0;
    let l = 0.2126 * r as f64 + 0.7152 * g as f64 + 0.0722 * b as f64;
    (l, r.wrapping_sub(g) as f64, g.wrapping_sub(b) as f64)
}

fn similarity(a: Rgba<u8>, b: Rgba<u8>, tolerance: u8) -> f64 {
    let (l1, a1, b1) = pseudo_lab(a);
    let (l2, a2, b2) = pseudo_lab(b);
    let distance = ((l1 - l2).powi(2) + (a1 - a2).powi(2) + (b1 - b2).powi(2)).sqrt();
    let similarity = 1.0 - (distance / MAX_DISTANCE).min(1.0);
    if similarity < tolerance as f64 / 255.0 {
        0.0
    } else {
        similarity.sqrt()
    }
}

fn mix(old: u8, new: u8, ratio: f64) -> u8 {
    (old as f64 * (1.0 - ratio) + new as f64 * ratio) as u8
}

/// Recolor an image file and write the result as PNG.
pub fn recolor_file(
    source: &Path,
    destination: &Path,
    options: &RecolorOptions,
) -> Result<(), WatermarkError> {
    let image = decode_file(source)?;
    let output = recolor(&image, options);
    save_to(
        &DynamicImage::ImageRgba8(output),
        destination,
        OutputFormat::Png,
        100,
    )?;
    info!(
        "Recolored {:?} ({} -> {}) into {:?}",
        source, options.old_color, options.new_color, destination
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: u8, b: u8) -> bool {
        (a as i16 - b as i16).abs() <= 2
    }

    #[test]
    fn test_similarity_bounds() {
        let red = Rgba([255, 0, 0, 255]);
        assert_eq!(similarity(red, red, 30), 1.0);
        assert_eq!(similarity(red, Rgba([0, 0, 255, 255]), 30), 0.0);
    }

    #[test]
    fn test_pseudo_lab_wraps() {
        let (_, a, b) = pseudo_lab(Rgba([0, 10, 5, 255]));
        assert_eq!(a, 246.0);
        assert_eq!(b, 5.0);
    }

    #[test]
    fn test_mix_extremes() {
        assert_eq!(mix(10, 200, 0.0), 10);
        assert_eq!(mix(10, 200, 1.0), 200);
    }

    #[test]
    fn test_same_color_keeps_pixels_and_alpha() {
        let teal = Rgba([0, 128, 128, 255]);
        let orange = Rgba([255, 128, 0, 255]);
        let mut img = RgbaImage::new(32, 32);
        for (x, y, p) in img.enumerate_pixels_mut() {
            let mut c = if x < 16 { teal } else { orange };
            c[3] = (160 + (x + y) % 64) as u8;
            *p = c;
        }
        let source = DynamicImage::ImageRgba8(img.clone());
        let options = RecolorOptions::new(RgbaColor(teal), RgbaColor(teal));
        let out = recolor(&source, &options);

        for (x, y, p) in out.enumerate_pixels() {
            assert_eq!(p[3], img.get_pixel(x, y)[3]);
        }
        // away from the seam the colors are untouched
        for y in 4..28 {
            for x in (1..6).chain(26..31) {
                let expected = img.get_pixel(x, y);
                let got = out.get_pixel(x, y);
                for c in 0..3 {
                    assert!(close(got[c], expected[c]), "({},{}) {:?} vs {:?}", x, y, got, expected);
                }
            }
        }
    }

    #[test]
    fn test_replaces_matching_color() {
        let white = Rgba([255, 255, 255, 255]);
        let img = RgbaImage::from_pixel(16, 16, white);
        let options = RecolorOptions::new(RgbaColor::WHITE, RgbaColor::BLACK);
        let out = recolor(&DynamicImage::ImageRgba8(img), &options);
        let center = out.get_pixel(8, 8);
        assert!(center[0] <= 5 && center[1] <= 5 && center[2] <= 5);
        assert_eq!(center[3], 255);
    }

    #[test]
    fn test_recolor_file_writes_png() {
        let dir = tempfile::TempDir::new().unwrap();
        let src = dir.path().join("logo.png");
        let dst = dir.path().join("logo_dark.png");
        RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 128]))
            .save(&src)
            .unwrap();
        recolor_file(&src, &dst, &RecolorOptions::new(RgbaColor::WHITE, RgbaColor::BLACK)).unwrap();
        let out = image::open(&dst).unwrap().to_rgba8();
        assert_eq!(out.get_pixel(4, 4)[3], 128);
    }
}
