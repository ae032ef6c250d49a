use crate::{Config, MetadataProviderKind};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Templates file does not exist: {0}")]
    TemplatesFileMissing(PathBuf),

    #[error("Failed to create directory {path:?}: {source}")]
    DirectoryCreationFailed {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Logo for '{id}' does not exist: {path:?}")]
    LogoMissing { id: String, path: PathBuf },

    #[error("Font file does not exist: {0}")]
    FontMissing(PathBuf),

    #[error("exiftool is not available at {0:?}")]
    ExifToolUnavailable(PathBuf),
}

async fn ensure_directory(path: &Path, errors: &mut Vec<StartupCheckError>) {
    if path.exists() {
        info!("Directory exists: {:?}", path);
        return;
    }
    info!("Directory does not exist, creating: {:?}", path);
    if let Err(e) = tokio::fs::create_dir_all(path).await {
        error!("Failed to create directory {:?}: {}", path, e);
        errors.push(StartupCheckError::DirectoryCreationFailed {
            path: path.to_path_buf(),
            source: e,
        });
    }
}

async fn exiftool_available(binary: &Path) -> bool {
    tokio::process::Command::new(binary)
        .arg("-ver")
        .output()
        .await
        .map(|out| out.status.success())
        .unwrap_or(false)
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    for dir in [
        &config.paths.output_directory,
        &config.paths.preview_directory,
        &config.paths.small_preview_directory,
    ] {
        ensure_directory(dir, &mut errors).await;
    }

    let templates_file = &config.paths.templates_file;
    if !templates_file.exists() {
        error!("Templates file does not exist: {:?}", templates_file);
        errors.push(StartupCheckError::TemplatesFileMissing(
            templates_file.clone(),
        ));
    } else {
        // font paths live in the templates
        match crate::watermark::TemplateRegistry::from_file(templates_file) {
            Ok(registry) => {
                for template in registry.list().iter() {
                    let Some(words) = &template.words else {
                        continue;
                    };
                    for font in [&words.first.font_file, &words.second.font_file] {
                        if !font.as_os_str().is_empty() && !font.exists() {
                            warn!("Template '{}' uses missing font {:?}", template.id, font);
                            errors.push(StartupCheckError::FontMissing(font.clone()));
                        }
                    }
                }
            }
            Err(e) => warn!("Templates file {:?} could not be parsed: {}", templates_file, e),
        }
    }

    if config.logos.is_empty() {
        warn!("No logos configured; every render will fail to find a logo");
    }
    for logo in &config.logos {
        for path in [&logo.path, &logo.blur_path] {
            if path.exists() {
                info!("Logo for '{}' found: {:?}", logo.id, path);
            } else {
                error!("Logo for '{}' missing: {:?}", logo.id, path);
                errors.push(StartupCheckError::LogoMissing {
                    id: logo.id.clone(),
                    path: path.clone(),
                });
            }
        }
    }

    if config.metadata.provider == MetadataProviderKind::ExifTool {
        if exiftool_available(&config.metadata.exiftool_path).await {
            info!("exiftool is available");
        } else {
            error!(
                "exiftool not found at {:?}; install it or use the rexif provider",
                config.metadata.exiftool_path
            );
            errors.push(StartupCheckError::ExifToolUnavailable(
                config.metadata.exiftool_path.clone(),
            ));
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
