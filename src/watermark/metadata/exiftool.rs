use super::{MetadataProvider, MetadataRecord, leading_number};
use crate::watermark::MetadataError;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Tags requested from exiftool; the JSON keys come back under the same names.
const TAGS: &[&str] = &[
    "Make",
    "Model",
    "CreateDate",
    "LensModel",
    "ExposureTime",
    "FNumber",
    "ISO",
    "FocalLength",
    "XResolution",
    "YResolution",
    "MechanicalShutterCount",
    "ShutterCount",
    "Orientation",
];

/// Reads metadata by running the external `exiftool` binary with `-j`.
pub struct ExifToolProvider {
    binary: PathBuf,
}

impl ExifToolProvider {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    fn run(&self, args: &[String], path: &Path) -> Result<String, MetadataError> {
        let output = Command::new(&self.binary)
            .args(args)
            .arg(path)
            .output()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => {
                    MetadataError::ToolNotInstalled(self.binary.display().to_string())
                }
                _ => MetadataError::ToolInit(format!("{}: {}", self.binary.display(), e)),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            return Err(MetadataError::Extract {
                path: path.to_path_buf(),
                message: if stderr.is_empty() {
                    format!("exiftool exited with {}", output.status)
                } else {
                    stderr
                },
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl MetadataProvider for ExifToolProvider {
    fn name(&self) -> &'static str {
        "exiftool"
    }

    fn extract(&self, path: &Path) -> Result<MetadataRecord, MetadataError> {
        let mut args = vec!["-j".to_string()];
        args.extend(TAGS.iter().map(|tag| format!("-{}", tag)));

        debug!("Running exiftool on {:?}", path);
        let stdout = self.run(&args, path)?;
        parse_exiftool_json(path, &stdout)
    }

    fn write_back(&self, path: &Path, record: &MetadataRecord) -> Result<(), MetadataError> {
        let mut args = vec!["-overwrite_original".to_string(), "-q".to_string()];
        if record.x_resolution > 0 {
            args.push(format!("-XResolution={}", record.x_resolution));
        }
        if record.y_resolution > 0 {
            args.push(format!("-YResolution={}", record.y_resolution));
        }
        // pixels were rotated during layout
        args.push("-Orientation#=1".to_string());

        self.run(&args, path)?;
        debug!("Wrote metadata back to {:?}", path);
        Ok(())
    }
}

/// Parse `exiftool -j` output, which is a JSON array with one object per file.
pub(crate) fn parse_exiftool_json(path: &Path, json: &str) -> Result<MetadataRecord, MetadataError> {
    let parsed: Vec<Map<String, Value>> =
        serde_json::from_str(json).map_err(|e| MetadataError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    let item = parsed
        .into_iter()
        .next()
        .ok_or_else(|| MetadataError::Empty(path.to_path_buf()))?;

    let record = MetadataRecord {
        iso: as_u32(item.get("ISO")),
        x_resolution: as_u32(item.get("XResolution")),
        y_resolution: as_u32(item.get("YResolution")),
        shutter_count: as_u32(item.get("ShutterCount")),
        mechanical_shutter_count: as_u32(item.get("MechanicalShutterCount")),
        f_number: as_f64(item.get("FNumber")),
        make: as_string(item.get("Make")),
        model: as_string(item.get("Model")),
        lens_model: as_string(item.get("LensModel")),
        exposure_time: as_string(item.get("ExposureTime")),
        focal_length: as_string(item.get("FocalLength")),
        create_date: as_string(item.get("CreateDate")),
        orientation: as_string(item.get("Orientation")),
        orientation_degrees: 0,
    };

    Ok(record.finish())
}

fn as_string(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

fn as_f64(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => leading_number(s).unwrap_or_default(),
        _ => 0.0,
    }
}

fn as_u32(value: Option<&Value>) -> u32 {
    as_f64(value).max(0.0) as u32
}
