use image::DynamicImage;

/// Counter-clockwise rotation, in degrees, described by an orientation text
/// such as `"Rotate 90 CW"`.
///
/// Clockwise rotations are converted with `360 - N` and no modulo, so
/// `"Rotate 720 CW"` yields `-360`. Callers only act on 90, 180 and 270.
pub fn orientation_degrees(description: &str) -> i32 {
    if description.contains("Horizontal") || description.contains("normal") {
        return 0;
    }
    if !description.contains("Rotate") {
        return 0;
    }
    if description.contains("CCW") {
        return first_number(description).unwrap_or(0);
    }
    if description.contains("CW") {
        return first_number(description).map(|n| 360 - n).unwrap_or(0);
    }
    0
}

fn first_number(text: &str) -> Option<i32> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .find_map(|run| run.parse::<i32>().ok())
}

/// Rotate `image` counter-clockwise by `degrees`. Anything other than
/// 90, 180 or 270 leaves the image untouched.
pub fn apply_orientation(image: &DynamicImage, degrees: i32) -> DynamicImage {
    match degrees {
        // the image crate rotates clockwise
        90 => image.rotate270(),
        180 => image.rotate180(),
        270 => image.rotate90(),
        _ => image.clone(),
    }
}
