use std::path::PathBuf;
use thiserror::Error;

/// Failures of the metadata provider. Cloneable so the metadata cache can
/// hand out the same failure on every lookup.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum MetadataError {
    #[error("Metadata tool not installed: {0}")]
    ToolNotInstalled(String),

    #[error("Metadata tool failed to start: {0}")]
    ToolInit(String),

    #[error("Metadata extraction failed for {path}: {message}")]
    Extract { path: PathBuf, message: String },

    #[error("Metadata output for {path} could not be parsed: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("No metadata returned for {0}")]
    Empty(PathBuf),
}

/// Failures of the decode collaborator.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ImageLoadError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),

    #[error("File could not be opened: {path}: {message}")]
    NotOpenable { path: PathBuf, message: String },

    #[error("File could not be read: {path}: {message}")]
    NotReadable { path: PathBuf, message: String },

    #[error("Unsupported image format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("Decode failed for {path}: {message}")]
    Decode { path: PathBuf, message: String },
}

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image error: {0}")]
    ImageError(#[from] image::ImageError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    ImageLoad(#[from] ImageLoadError),

    #[error("{0}: template not found")]
    TemplateNotFound(String),

    #[error("Template {id} is incomplete: missing {missing} template")]
    TemplateIncomplete { id: String, missing: &'static str },

    #[error("Layout type not found: {0}")]
    LayoutTypeNotFound(String),

    #[error("No logo configured for camera make '{0}'")]
    LogoNotFound(String),

    #[error("Font {path} could not be loaded: {message}")]
    Font { path: PathBuf, message: String },

    #[error("Invalid color '{0}', expected R,G,B,A")]
    InvalidColor(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid render request: {0}")]
    InvalidRequest(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Worker task failed: {0}")]
    Task(String),
}
