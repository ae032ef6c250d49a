// Photo metadata: the record consumed by templates and the providers that produce it
mod exiftool;
mod rexif_provider;

pub use exiftool::ExifToolProvider;
pub use rexif_provider::{RexifProvider, describe_exif_orientation};

use super::MetadataError;
use super::orientation::orientation_degrees;
use crate::{MetadataConfig, MetadataProviderKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// Camera metadata needed to lay out a watermark.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataRecord {
    pub iso: u32,
    pub x_resolution: u32,
    pub y_resolution: u32,
    pub shutter_count: u32,
    pub mechanical_shutter_count: u32,
    pub f_number: f64,
    pub make: String,
    pub model: String,
    pub lens_model: String,
    pub exposure_time: String,
    pub focal_length: String,
    pub create_date: String,
    /// Free-text orientation, e.g. "Rotate 90 CW"
    pub orientation: String,
    /// Counter-clockwise correction derived from `orientation`
    pub orientation_degrees: i32,
}

impl MetadataRecord {
    /// Recompute derived fields after the raw fields are filled in.
    pub fn finish(mut self) -> Self {
        self.orientation_degrees = orientation_degrees(&self.orientation);
        self
    }

    pub fn f_number_str(&self) -> String {
        format!("{:.1}", self.f_number)
    }

    pub fn iso_str(&self) -> String {
        self.iso.to_string()
    }

    pub fn capture_date(&self) -> Option<NaiveDateTime> {
        let raw = self.create_date.trim();
        // exiftool may append a timezone or sub-seconds
        let raw = raw.get(..19).unwrap_or(raw);
        ["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
    }

    /// Look up a field by its exiftool tag name, as used in word templates.
    pub fn field(&self, name: &str) -> Option<String> {
        let value = match name {
            "Make" => self.make.clone(),
            "Model" => self.model.clone(),
            "LensModel" => self.lens_model.clone(),
            "CreateDate" => self.create_date.clone(),
            "CaptureDate" => self
                .capture_date()
                .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            "ExposureTime" => self.exposure_time.clone(),
            "FNumber" => self.f_number.to_string(),
            "FNumberStr" => self.f_number_str(),
            "ISO" => self.iso.to_string(),
            "ISOStr" => self.iso_str(),
            "FocalLength" => self.focal_length.clone(),
            "XResolution" => self.x_resolution.to_string(),
            "YResolution" => self.y_resolution.to_string(),
            "ShutterCount" => self.shutter_count.to_string(),
            "MechanicalShutterCount" => self.mechanical_shutter_count.to_string(),
            "Orientation" => self.orientation.clone(),
            _ => return None,
        };
        Some(value)
    }
}

/// Source of [`MetadataRecord`]s for image files.
pub trait MetadataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn extract(&self, path: &Path) -> Result<MetadataRecord, MetadataError>;

    /// Re-apply resolution and orientation to a freshly written output file.
    fn write_back(&self, _path: &Path, _record: &MetadataRecord) -> Result<(), MetadataError> {
        Ok(())
    }
}

pub fn provider_from_config(config: &MetadataConfig) -> Arc<dyn MetadataProvider> {
    match config.provider {
        MetadataProviderKind::ExifTool => {
            Arc::new(ExifToolProvider::new(config.exiftool_path.clone()))
        }
        MetadataProviderKind::Rexif => Arc::new(RexifProvider),
    }
}

/// Parse the leading number of strings like `"72 pixels per inch"`.
pub(crate) fn leading_number(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    let end = trimmed
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map(|(i, _)| i)
        .unwrap_or(trimmed.len());
    trimmed[..end].parse::<f64>().ok()
}
