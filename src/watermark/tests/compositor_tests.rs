use super::fixtures::{Fixture, SOURCE_COLOR, camera_record};
use crate::watermark::image_processing::{decode_file, sniff};
use crate::watermark::{
    OutputFormat, RenderRequest, RenderStage, RgbaColor, WatermarkError,
};
use image::{Rgba, RgbaImage};
use std::path::Path;

fn render_ok(fixture: &Fixture, template_id: &str, output: &str) -> RgbaImage {
    let request = RenderRequest::new(&fixture.source, fixture.output(output), template_id);
    let result = fixture.compositor.render(&request);
    assert!(result.is_success(), "render failed: {:?}", result.error);
    decode_file(&request.save_path).unwrap().to_rgba8()
}

fn near(pixel: &Rgba<u8>, expected: [u8; 3], tolerance: i16) -> bool {
    (0..3).all(|c| (pixel[c] as i16 - expected[c] as i16).abs() <= tolerance)
}

fn format_of(path: &Path) -> Option<OutputFormat> {
    sniff(&std::fs::read(path).unwrap())
}

#[test]
fn test_bottom_logo_left_adds_border() {
    let fixture = Fixture::camera();
    let request = RenderRequest::new(&fixture.source, fixture.output("a.jpg"), "left");
    let result = fixture.compositor.render(&request);

    assert!(result.is_success());
    let map = result.to_map();
    assert_eq!(map["BorderColors"], "255,255,255,255");
    assert_eq!(map["SaveImgPath"], request.save_path.to_string_lossy());
    assert_eq!(map["SourceImgPath"], fixture.source.to_string_lossy());

    let out = decode_file(&request.save_path).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (820, 640));
    assert_eq!(format_of(&request.save_path), Some(OutputFormat::Jpeg));

    assert!(near(out.get_pixel(3, 3), [255, 255, 255], 4));
    assert!(near(out.get_pixel(400, 300), SOURCE_COLOR, 6));
    // logo sits on the left edge of the bottom band
    assert!(near(out.get_pixel(20, 625), [220, 0, 0], 30));
    assert!(fixture.dir.path().join("logo_20_20.png").exists());
}

#[test]
fn test_metadata_written_back_once_per_render() {
    let fixture = Fixture::camera();
    render_ok(&fixture, "left", "a.jpg");
    render_ok(&fixture, "left", "b.jpg");
    assert_eq!(fixture.provider.write_backs(), 2);
    // metadata comes from the cache the second time
    assert_eq!(fixture.provider.calls(), 1);
}

#[test]
fn test_right_anchor_places_logo_on_right() {
    let fixture = Fixture::camera();
    let out = render_ok(&fixture, "right", "right.jpg");
    assert_eq!(out.dimensions(), (820, 640));
    assert!(near(out.get_pixel(800, 625), [220, 0, 0], 30));
    assert!(near(out.get_pixel(20, 625), [255, 255, 255], 8));
}

#[test]
fn test_separator_drawn_after_logo() {
    let fixture = Fixture::camera();
    let out = render_ok(&fixture, "left-sep", "sep.jpg");
    // logo ends at x=30, separator starts 5px later on row 620
    let bar = out.get_pixel(36, 625);
    assert!(bar[0] < 80 && bar[1] < 80 && bar[2] < 80, "{:?}", bar);
    assert!(near(out.get_pixel(36, 612), [255, 255, 255], 20));
}

#[test]
fn test_round_border_forces_png() {
    let fixture = Fixture::camera();
    let out = render_ok(&fixture, "round", "round.jpg");

    assert_eq!(format_of(&fixture.output("round.jpg")), Some(OutputFormat::Png));
    assert_eq!(out.dimensions(), (820, 640));
    assert_eq!(out.get_pixel(0, 0)[3], 0);
    assert_eq!(out.get_pixel(819, 639)[3], 0);
    assert_eq!(out.get_pixel(410, 320)[3], 255);
}

#[test]
fn test_stack_blur_keeps_source_size() {
    let fixture = Fixture::camera();
    let out = render_ok(&fixture, "blur", "blur.jpg");

    assert_eq!(out.dimensions(), (800, 600));
    assert_eq!(format_of(&fixture.output("blur.jpg")), Some(OutputFormat::Png));
    // the blur logo is drawn inside the band
    assert_eq!(out.get_pixel(25, 585), &Rgba([255, 255, 255, 255]));
    assert!(near(out.get_pixel(400, 300), SOURCE_COLOR, 6));
}

#[test]
fn test_auto_border_scales_with_source() {
    let fixture = Fixture::camera();
    let out = render_ok(&fixture, "auto", "auto.jpg");

    assert_eq!(out.dimensions(), (840, 680));
    assert!(fixture.dir.path().join("logo_60_60.png").exists());
    assert!(near(out.get_pixel(50, 650), [220, 0, 0], 30));
}

#[test]
fn test_orientation_rotates_before_layout() {
    let fixture = Fixture::new(Some(camera_record("Rotate 90 CW")));
    let out = render_ok(&fixture, "left", "rotated.jpg");
    assert_eq!(out.dimensions(), (620, 840));
}

#[test]
fn test_request_overrides_do_not_touch_registry() {
    let fixture = Fixture::camera();
    let mut request = RenderRequest::new(&fixture.source, fixture.output("o.jpg"), "left");
    request.border_color = Some(RgbaColor::new(0, 0, 0, 255));
    request.only_bottom_border = Some(true);

    let result = fixture.compositor.render(&request);
    assert!(result.is_success());
    assert_eq!(result.border_colors, "0,0,0,255");

    let out = decode_file(&request.save_path).unwrap().to_rgba8();
    assert_eq!(out.dimensions(), (800, 630));
    assert!(near(out.get_pixel(400, 628), [0, 0, 0], 8));

    let stored = fixture.registry.find_by_id("left").unwrap();
    let border = stored.border.unwrap();
    assert_eq!(border.color, RgbaColor::WHITE);
    assert!(!border.only_bottom);
    assert_eq!(border.left, 10);
}

#[test]
fn test_incomplete_template_reports_missing_section() {
    let fixture = Fixture::camera();
    let request = RenderRequest::new(&fixture.source, fixture.output("x.jpg"), "incomplete");

    let failure = fixture.compositor.try_render(&request).unwrap_err();
    assert_eq!(failure.stage, RenderStage::MetadataResolved);
    assert!(matches!(
        failure.error,
        WatermarkError::TemplateIncomplete { missing: "separator", .. }
    ));

    let result = fixture.compositor.render(&request);
    let map = result.to_map();
    assert_eq!(map["SaveImgPath"], "");
    assert_eq!(map["SourceImgPath"], "");
    assert!(map["error"].contains("separator"));
    assert!(!request.save_path.exists());
}

#[test]
fn test_unknown_layout_type() {
    let fixture = Fixture::camera();
    let request = RenderRequest::new(&fixture.source, fixture.output("x.jpg"), "diagonal");
    let failure = fixture.compositor.try_render(&request).unwrap_err();
    assert!(matches!(failure.error, WatermarkError::LayoutTypeNotFound(ref t) if t == "DIAGONAL"));
}

#[test]
fn test_unknown_template_id() {
    let fixture = Fixture::camera();
    let request = RenderRequest::new(&fixture.source, fixture.output("x.jpg"), "nope");
    let result = fixture.compositor.render(&request);
    assert_eq!(result.error.as_deref(), Some("nope: template not found"));
}

#[test]
fn test_unknown_camera_make_fails_before_template() {
    let mut record = camera_record("");
    record.make = "Hasselblad".to_string();
    let fixture = Fixture::new(Some(record));
    let request = RenderRequest::new(&fixture.source, fixture.output("x.jpg"), "left");

    let failure = fixture.compositor.try_render(&request).unwrap_err();
    assert_eq!(failure.stage, RenderStage::Created);
    assert!(matches!(failure.error, WatermarkError::LogoNotFound(_)));
}

#[test]
fn test_metadata_failure_is_reported() {
    let fixture = Fixture::new(None);
    let request = RenderRequest::new(&fixture.source, fixture.output("x.jpg"), "left");

    let failure = fixture.compositor.try_render(&request).unwrap_err();
    assert_eq!(failure.stage, RenderStage::Created);
    assert!(matches!(failure.error, WatermarkError::Metadata(_)));
    // the failure is cached along with successes
    fixture.compositor.render(&request);
    assert_eq!(fixture.provider.calls(), 1);
}

#[test]
fn test_missing_source_fails_at_template_stage() {
    let fixture = Fixture::camera();
    let missing = fixture.dir.path().join("gone.jpg");
    let request = RenderRequest::new(&missing, fixture.output("x.jpg"), "left");

    let failure = fixture.compositor.try_render(&request).unwrap_err();
    assert_eq!(failure.stage, RenderStage::TemplateResolved);
    assert!(matches!(failure.error, WatermarkError::ImageLoad(_)));
}

#[test]
fn test_invalid_request_rejected() {
    let fixture = Fixture::camera();
    let request = RenderRequest::new(&fixture.source, "", "left");
    let failure = fixture.compositor.try_render(&request).unwrap_err();
    assert!(matches!(failure.error, WatermarkError::InvalidRequest(_)));
    assert_eq!(fixture.provider.calls(), 0);
}

#[test]
fn test_small_preview_scales_down() {
    let fixture = Fixture::camera();
    let target = fixture.dir.path().join("small").join("photo.jpg");
    let written = fixture
        .compositor
        .small_preview(&fixture.source, &target, 10)
        .unwrap();

    assert_eq!(written, target);
    let small = decode_file(&target).unwrap();
    assert_eq!((small.width(), small.height()), (80, 60));
}

#[test]
fn test_preview_request_writes_into_preview_dir() {
    let fixture = Fixture::camera();
    let preview_dir = fixture.dir.path().join("preview");
    let request = RenderRequest::preview(&fixture.source, &preview_dir, "left").unwrap();
    let result = fixture.compositor.render(&request);

    assert!(result.is_success());
    assert!(preview_dir.join("photo.jpg").exists());
}
