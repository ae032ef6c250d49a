use super::WatermarkError;
use image::{ImageFormat, Rgba};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// An RGBA color written as `"R,G,B,A"` in templates, requests and results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RgbaColor(pub Rgba<u8>);

impl RgbaColor {
    pub const WHITE: RgbaColor = RgbaColor(Rgba([255, 255, 255, 255]));
    pub const BLACK: RgbaColor = RgbaColor(Rgba([0, 0, 0, 255]));

    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(Rgba([r, g, b, a]))
    }

    pub fn rgba(&self) -> Rgba<u8> {
        self.0
    }
}

impl Default for RgbaColor {
    fn default() -> Self {
        Self::WHITE
    }
}

impl FromStr for RgbaColor {
    type Err = WatermarkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts = s
            .split(',')
            .map(|p| p.trim().parse::<u8>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|_| WatermarkError::InvalidColor(s.to_string()))?;

        match parts.as_slice() {
            [r, g, b, a] => Ok(Self::new(*r, *g, *b, *a)),
            [r, g, b] => Ok(Self::new(*r, *g, *b, 255)),
            _ => Err(WatermarkError::InvalidColor(s.to_string())),
        }
    }
}

impl fmt::Display for RgbaColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0.0;
        write!(f, "{},{},{},{}", r, g, b, a)
    }
}

impl TryFrom<String> for RgbaColor {
    type Error = WatermarkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RgbaColor> for String {
    fn from(color: RgbaColor) -> Self {
        color.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Jpeg,
    Png,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpg",
            OutputFormat::Png => "png",
        }
    }

    pub fn image_format(&self) -> ImageFormat {
        match self {
            OutputFormat::Jpeg => ImageFormat::Jpeg,
            OutputFormat::Png => ImageFormat::Png,
        }
    }
}

/// Pixel rectangle on the output canvas. Offsets may be negative when a
/// template pushes an element past the left or top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl Bounds {
    pub fn new(x: i64, y: i64, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> i64 {
        self.x + self.width as i64
    }

    pub fn bottom(&self) -> i64 {
        self.y + self.height as i64
    }
}

/// One watermark job. Construct with [`RenderRequest::new`] and set the
/// optional overrides as plain fields; the compositor only borrows it.
#[derive(Debug, Clone, Default)]
pub struct RenderRequest {
    pub source_path: PathBuf,
    pub save_path: PathBuf,
    pub template_id: String,
    /// Replaces the template's border color
    pub border_color: Option<RgbaColor>,
    /// Forces the template's only-bottom-border flag on or off
    pub only_bottom_border: Option<bool>,
    /// Metadata field name -> replacement text
    pub text_overrides: HashMap<String, String>,
}

impl RenderRequest {
    pub fn new(
        source_path: impl Into<PathBuf>,
        save_path: impl Into<PathBuf>,
        template_id: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            save_path: save_path.into(),
            template_id: template_id.into(),
            ..Default::default()
        }
    }

    /// A request that writes into `preview_dir` under the source's file name.
    pub fn preview(
        source_path: impl Into<PathBuf>,
        preview_dir: &Path,
        template_id: impl Into<String>,
    ) -> Result<Self, WatermarkError> {
        let source_path = source_path.into();
        let file_name = source_path.file_name().ok_or_else(|| {
            WatermarkError::InvalidRequest(format!("{:?} has no file name", source_path))
        })?;
        let save_path = preview_dir.join(file_name);
        Ok(Self::new(source_path, save_path, template_id))
    }

    pub fn validate(&self) -> Result<(), WatermarkError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(WatermarkError::InvalidRequest("source path is empty".into()));
        }
        if self.save_path.as_os_str().is_empty() {
            return Err(WatermarkError::InvalidRequest("save path is empty".into()));
        }
        if self.template_id.trim().is_empty() {
            return Err(WatermarkError::InvalidRequest("template id is empty".into()));
        }
        Ok(())
    }
}

/// Exported outcome of one render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderResult {
    #[serde(rename = "BorderColors")]
    pub border_colors: String,
    #[serde(rename = "SaveImgPath")]
    pub save_path: String,
    #[serde(rename = "SourceImgPath")]
    pub source_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderResult {
    pub fn success(border_color: RgbaColor, save_path: &Path, source_path: &Path) -> Self {
        Self {
            border_colors: border_color.to_string(),
            save_path: save_path.to_string_lossy().to_string(),
            source_path: source_path.to_string_lossy().to_string(),
            error: None,
        }
    }

    pub fn failure(error: impl fmt::Display) -> Self {
        Self {
            border_colors: String::new(),
            save_path: String::new(),
            source_path: String::new(),
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn to_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("BorderColors".to_string(), self.border_colors.clone());
        map.insert("SaveImgPath".to_string(), self.save_path.clone());
        map.insert("SourceImgPath".to_string(), self.source_path.clone());
        if let Some(error) = &self.error {
            map.insert("error".to_string(), error.clone());
        }
        map
    }
}
