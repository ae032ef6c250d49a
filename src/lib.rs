use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub mod startup_checks;
pub mod watermark;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub app: AppConfig,
    pub paths: PathsConfig,
    pub metadata: MetadataConfig,
    pub output: OutputConfig,
    pub batch: BatchConfig,
    #[serde(default)]
    pub logos: Vec<LogoConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PathsConfig {
    pub templates_file: PathBuf,
    pub output_directory: PathBuf,
    pub preview_directory: PathBuf,
    pub small_preview_directory: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetadataProviderKind {
    ExifTool,
    Rexif,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetadataConfig {
    pub provider: MetadataProviderKind,
    #[serde(default = "default_exiftool_path")]
    pub exiftool_path: PathBuf,
}

fn default_exiftool_path() -> PathBuf {
    PathBuf::from("exiftool")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    pub jpeg_quality: u8,
    #[serde(default = "default_small_preview_divisor")]
    pub small_preview_divisor: u32,
}

fn default_small_preview_divisor() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BatchConfig {
    pub max_workers: usize,
}

/// One entry of the camera-make to logo table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LogoConfig {
    /// Matched as a substring of the metadata `Make` field
    pub id: String,
    pub path: PathBuf,
    /// Logo used by stack-blur templates, usually a light variant
    pub blur_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app: AppConfig {
                name: "Framemark".to_string(),
                log_level: "info".to_string(),
            },
            paths: PathsConfig {
                templates_file: PathBuf::from("config/templates.toml"),
                output_directory: PathBuf::from("output"),
                preview_directory: PathBuf::from("tmp/preview"),
                small_preview_directory: PathBuf::from("tmp/small"),
            },
            metadata: MetadataConfig {
                provider: MetadataProviderKind::ExifTool,
                exiftool_path: default_exiftool_path(),
            },
            output: OutputConfig {
                jpeg_quality: 100,
                small_preview_divisor: default_small_preview_divisor(),
            },
            batch: BatchConfig { max_workers: 3 },
            logos: Vec::new(),
        }
    }
}

impl Config {
    /// Read a TOML config file, or fall back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, watermark::WatermarkError> {
        if !path.exists() {
            tracing::info!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        toml_edit::de::from_str::<Config>(&content)
            .map_err(|e| watermark::WatermarkError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.output.jpeg_quality, 100);
        assert_eq!(config.batch.max_workers, 3);
        assert_eq!(config.metadata.provider, MetadataProviderKind::ExifTool);
        assert!(config.logos.is_empty());
    }

    #[test]
    fn test_config_parses_toml() {
        let toml = r#"
[app]
name = "Frames"
log_level = "debug"

[paths]
templates_file = "tpl.toml"
output_directory = "out"
preview_directory = "tmp/p"
small_preview_directory = "tmp/s"

[metadata]
provider = "rexif"

[output]
jpeg_quality = 90

[batch]
max_workers = 8

[[logos]]
id = "NIKON"
path = "logos/nikon.png"
blur_path = "logos/nikon_white.png"
"#;
        let config: Config = toml_edit::de::from_str(toml).unwrap();
        assert_eq!(config.app.name, "Frames");
        assert_eq!(config.metadata.provider, MetadataProviderKind::Rexif);
        assert_eq!(config.metadata.exiftool_path, PathBuf::from("exiftool"));
        assert_eq!(config.output.small_preview_divisor, 10);
        assert_eq!(config.batch.max_workers, 8);
        assert_eq!(config.logos.len(), 1);
        assert_eq!(config.logos[0].id, "NIKON");
    }

    #[test]
    fn test_missing_config_file_uses_defaults() {
        let config = Config::load(Path::new("/definitely/not/here.toml")).unwrap();
        assert_eq!(config.app.name, "Framemark");
    }
}
