use super::{MetadataProvider, MetadataRecord, leading_number};
use crate::watermark::MetadataError;
use std::path::Path;
use tracing::{debug, trace};

/// In-process EXIF reader. Needs no external tool but only understands the
/// standard EXIF tags, so maker-note shutter counts stay zero.
pub struct RexifProvider;

impl MetadataProvider for RexifProvider {
    fn name(&self) -> &'static str {
        "rexif"
    }

    fn extract(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
        if !path.exists() {
            return Err(MetadataError::Extract {
                path: path.to_path_buf(),
                message: "file does not exist".to_string(),
            });
        }

        let exif = rexif::parse_file(path).map_err(|e| {
            trace!("No EXIF data for {}: {}", path.display(), e);
            MetadataError::Extract {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;

        let mut record = MetadataRecord::default();
        let mut date_original = None;
        let mut date_fallback = None;

        for entry in &exif.entries {
            let readable = entry.value_more_readable.trim();
            match entry.tag {
                rexif::ExifTag::Make => record.make = readable.to_string(),
                rexif::ExifTag::Model => record.model = readable.to_string(),
                rexif::ExifTag::LensModel => record.lens_model = readable.to_string(),
                rexif::ExifTag::ExposureTime => {
                    record.exposure_time = readable.trim_end_matches(" s").to_string()
                }
                rexif::ExifTag::FocalLength => record.focal_length = readable.to_string(),
                rexif::ExifTag::FNumber => {
                    record.f_number =
                        leading_number(readable.trim_start_matches("f/")).unwrap_or_default()
                }
                rexif::ExifTag::ISOSpeedRatings => {
                    record.iso = leading_number(readable).unwrap_or_default() as u32
                }
                rexif::ExifTag::XResolution => {
                    record.x_resolution = leading_number(readable).unwrap_or_default() as u32
                }
                rexif::ExifTag::YResolution => {
                    record.y_resolution = leading_number(readable).unwrap_or_default() as u32
                }
                rexif::ExifTag::Orientation => {
                    if let rexif::TagValue::U16(values) = &entry.value {
                        if let Some(code) = values.first() {
                            record.orientation = describe_exif_orientation(*code).to_string();
                        }
                    }
                }
                rexif::ExifTag::DateTimeOriginal => date_original = Some(readable.to_string()),
                rexif::ExifTag::DateTime | rexif::ExifTag::DateTimeDigitized => {
                    date_fallback.get_or_insert_with(|| readable.to_string());
                }
                _ => {}
            }
        }

        record.create_date = date_original.or(date_fallback).unwrap_or_default();
        debug!(
            "Read EXIF for {}: make={:?} model={:?}",
            path.display(),
            record.make,
            record.model
        );
        Ok(record.finish())
    }
}

/// Text form of the numeric EXIF orientation tag, as exiftool prints it.
pub fn describe_exif_orientation(code: u16) -> &'static str {
    match code {
        1 => "Horizontal (normal)",
        2 => "Mirror horizontal",
        3 => "Rotate 180",
        4 => "Mirror vertical",
        5 => "Mirror horizontal and rotate 270 CW",
        6 => "Rotate 90 CW",
        7 => "Mirror horizontal and rotate 90 CW",
        8 => "Rotate 270 CW",
        _ => "",
    }
}
