use super::strategy::{StrategySet, strategies_for};
use super::{RgbaColor, WatermarkError};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Border widths around the source image. Configured as total width and
/// height: the width splits evenly left/right (extra pixel to the right),
/// the height splits a quarter to the top and the rest to the bottom.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "BorderSpec")]
pub struct BorderTemplate {
    pub left: u32,
    pub right: u32,
    pub top: u32,
    pub bottom: u32,
    pub only_bottom: bool,
    pub is_round: bool,
    pub radius: u32,
    pub color: RgbaColor,
}

#[derive(Debug, Deserialize)]
struct BorderSpec {
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
    #[serde(default)]
    only_bottom: bool,
    #[serde(default)]
    is_round: bool,
    #[serde(default)]
    radius: u32,
    #[serde(default)]
    color: RgbaColor,
}

impl From<BorderSpec> for BorderTemplate {
    fn from(spec: BorderSpec) -> Self {
        let mut border = BorderTemplate::new(spec.width, spec.height, spec.color);
        border.only_bottom = spec.only_bottom;
        border.is_round = spec.is_round;
        border.radius = spec.radius;
        border
    }
}

impl BorderTemplate {
    pub fn new(width: u32, height: u32, color: RgbaColor) -> Self {
        let left = width / 2;
        let top = height / 4;
        Self {
            left,
            right: width - left,
            top,
            bottom: height - top,
            only_bottom: false,
            is_round: false,
            radius: 0,
            color,
        }
    }

    pub fn width(&self) -> u32 {
        self.left + self.right
    }

    pub fn height(&self) -> u32 {
        self.top + self.bottom
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogoTemplate {
    pub width: u32,
    pub height: u32,
    pub margin_top: i32,
    pub margin_left: i32,
    pub margin_right: i32,
}

/// Font settings of one text row.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WordRow {
    pub font_file: PathBuf,
    pub font_size: u32,
    pub color: RgbaColor,
    pub margin_top: i32,
    pub margin_left: i32,
    pub margin_right: i32,
}

/// Two rows by two columns of text. Each slot holds comma-separated
/// metadata field names: `one` and `three` use the first row, `two` and
/// `four` the second.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct WordsTemplate {
    pub one: String,
    pub two: String,
    pub three: String,
    pub four: String,
    pub first: WordRow,
    pub second: WordRow,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeparatorTemplate {
    pub exist: bool,
    pub width: u32,
    pub height: u32,
    pub margin_top: i32,
    pub margin_left: i32,
    pub margin_right: i32,
    pub color: RgbaColor,
}

/// A template as configured. Sub-templates are optional here so that an
/// incomplete definition can be loaded, listed and then rejected at render
/// time with a precise error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Template {
    pub id: String,
    #[serde(rename = "type")]
    pub layout_type: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub stack_blur: bool,
    #[serde(default)]
    pub blur_radius: u32,
    pub border: Option<BorderTemplate>,
    pub logo: Option<LogoTemplate>,
    pub words: Option<WordsTemplate>,
    pub separator: Option<SeparatorTemplate>,
}

/// A validated private copy of a [`Template`] plus the strategies its type
/// tag selects. Strategies may rewrite the sub-templates while rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTemplate {
    pub id: String,
    pub stack_blur: bool,
    pub blur_radius: u32,
    pub border: BorderTemplate,
    pub logo: LogoTemplate,
    pub words: WordsTemplate,
    pub separator: SeparatorTemplate,
    pub strategies: StrategySet,
}

impl Template {
    pub fn resolve(&self) -> Result<ResolvedTemplate, WatermarkError> {
        let missing = |name: &'static str| WatermarkError::TemplateIncomplete {
            id: self.id.clone(),
            missing: name,
        };
        let border = self.border.clone().ok_or_else(|| missing("border"))?;
        let logo = self.logo.clone().ok_or_else(|| missing("logo"))?;
        let words = self.words.clone().ok_or_else(|| missing("words"))?;
        let separator = self.separator.clone().ok_or_else(|| missing("separator"))?;
        let strategies = strategies_for(&self.layout_type)?;

        Ok(ResolvedTemplate {
            id: self.id.clone(),
            stack_blur: self.stack_blur,
            blur_radius: self.blur_radius,
            border,
            logo,
            words,
            separator,
            strategies,
        })
    }
}

/// Summary row for listings.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub layout_type: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
struct TemplateFile {
    #[serde(default)]
    templates: Vec<Template>,
}

/// Holds the loaded templates. Reloads swap the whole list at once and
/// lookups return owned copies, so a render never sees a reload midway.
pub struct TemplateRegistry {
    templates: RwLock<Arc<Vec<Template>>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self {
            templates: RwLock::new(Arc::new(Vec::new())),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self, WatermarkError> {
        let registry = Self::new();
        registry.load_from_file(path)?;
        Ok(registry)
    }

    pub fn load_from_file(&self, path: &Path) -> Result<usize, WatermarkError> {
        let content = std::fs::read_to_string(path)?;
        let count = self.load_from_str(&content)?;
        info!("Loaded {} templates from {:?}", count, path);
        Ok(count)
    }

    pub fn load_from_str(&self, content: &str) -> Result<usize, WatermarkError> {
        let file: TemplateFile = toml_edit::de::from_str(content)
            .map_err(|e| WatermarkError::Config(format!("template file: {}", e)))?;
        let count = file.templates.len();
        self.replace(file.templates);
        Ok(count)
    }

    pub fn replace(&self, templates: Vec<Template>) {
        debug!("Replacing template list ({} templates)", templates.len());
        *self.templates.write() = Arc::new(templates);
    }

    /// Snapshot of the current list in configuration order.
    pub fn list(&self) -> Arc<Vec<Template>> {
        self.templates.read().clone()
    }

    pub fn summaries(&self) -> Vec<TemplateSummary> {
        self.list()
            .iter()
            .map(|t| TemplateSummary {
                id: t.id.clone(),
                layout_type: t.layout_type.clone(),
                description: t.description.clone(),
            })
            .collect()
    }

    pub fn find_by_id(&self, id: &str) -> Result<Template, WatermarkError> {
        self.list()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| WatermarkError::TemplateNotFound(id.to_string()))
    }
}

impl Default for TemplateRegistry {
    fn default() -> Self {
        Self::new()
    }
}
