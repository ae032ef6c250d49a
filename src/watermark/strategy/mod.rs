// Layout strategies for the four drawing passes, selected by a template's type tag
mod border;
mod logo;
mod separator;
mod words;

pub use words::SlotTexts;

use super::WatermarkError;
use super::cache::CacheService;
use super::logo::LogoPaths;
use super::template::ResolvedTemplate;
use super::types::Bounds;
use image::RgbaImage;
use tracing::debug;

/// Which region of the bottom band governs placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor {
    Left,
    Center,
    Right,
    StackBlur,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BorderStrategy {
    /// Solid fill around the source
    Flat,
    /// Blurred source as background, source shrunk into it
    StackBlur,
    FlatAuto,
    StackBlurAuto,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoStrategy {
    Fixed(Anchor),
    /// Logo becomes a square as tall as the bottom border
    AutoSized(Anchor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeparatorStrategy {
    pub anchor: Anchor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordStrategy {
    Fixed(Anchor),
    /// Font sizes and margins derived from the bottom border
    AutoSized(Anchor),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StrategySet {
    pub border: BorderStrategy,
    pub logo: LogoStrategy,
    pub separator: SeparatorStrategy,
    pub words: WordStrategy,
}

impl StrategySet {
    const fn fixed(border: BorderStrategy, anchor: Anchor) -> Self {
        Self {
            border,
            logo: LogoStrategy::Fixed(anchor),
            separator: SeparatorStrategy { anchor },
            words: WordStrategy::Fixed(anchor),
        }
    }

    const fn auto(border: BorderStrategy, anchor: Anchor) -> Self {
        Self {
            border,
            logo: LogoStrategy::AutoSized(anchor),
            separator: SeparatorStrategy { anchor },
            words: WordStrategy::AutoSized(anchor),
        }
    }
}

static LAYOUTS: &[(&str, StrategySet)] = &[
    ("BOTTOM_LOGO_LEFT", StrategySet::fixed(BorderStrategy::Flat, Anchor::Left)),
    ("BOTTOM_LOGO_CENTER", StrategySet::fixed(BorderStrategy::Flat, Anchor::Center)),
    ("BOTTOM_LOGO_RIGHT", StrategySet::fixed(BorderStrategy::Flat, Anchor::Right)),
    ("STACK_BLUR", StrategySet::fixed(BorderStrategy::StackBlur, Anchor::StackBlur)),
    ("BOTTOM_LOGO_LEFT_AUTO", StrategySet::auto(BorderStrategy::FlatAuto, Anchor::Left)),
    ("BOTTOM_LOGO_CENTER_AUTO", StrategySet::auto(BorderStrategy::FlatAuto, Anchor::Center)),
    ("BOTTOM_LOGO_RIGHT_AUTO", StrategySet::auto(BorderStrategy::FlatAuto, Anchor::Right)),
    ("STACK_BLUR_AUTO", StrategySet::auto(BorderStrategy::StackBlurAuto, Anchor::StackBlur)),
];

/// Look up the strategies for a template type tag.
pub fn strategies_for(layout_type: &str) -> Result<StrategySet, WatermarkError> {
    LAYOUTS
        .iter()
        .find(|(tag, _)| *tag == layout_type)
        .map(|(_, set)| *set)
        .ok_or_else(|| WatermarkError::LayoutTypeNotFound(layout_type.to_string()))
}

pub fn layout_types() -> impl Iterator<Item = &'static str> {
    LAYOUTS.iter().map(|(tag, _)| *tag)
}

/// Geometry produced by earlier passes for later ones.
#[derive(Debug, Clone, Default)]
pub struct LayoutState {
    pub logo: Option<Bounds>,
}

/// Everything one render's strategies read and write.
pub struct RenderContext<'a> {
    pub template: ResolvedTemplate,
    /// Orientation-corrected source
    pub source: RgbaImage,
    pub canvas: RgbaImage,
    pub layout: LayoutState,
    /// Set when the output needs an alpha-capable lossless format
    pub save_lossless: bool,
    pub caches: &'a CacheService,
    pub logos: LogoPaths,
    pub texts: SlotTexts,
}

impl<'a> RenderContext<'a> {
    pub fn new(
        template: ResolvedTemplate,
        source: RgbaImage,
        caches: &'a CacheService,
        logos: LogoPaths,
        texts: SlotTexts,
    ) -> Self {
        Self {
            template,
            source,
            canvas: RgbaImage::new(0, 0),
            layout: LayoutState::default(),
            save_lossless: false,
            caches,
            logos,
            texts,
        }
    }

    pub fn canvas_width(&self) -> i64 {
        self.canvas.width() as i64
    }

    pub fn canvas_height(&self) -> i64 {
        self.canvas.height() as i64
    }

    /// Top edge of the bottom border band.
    pub fn band_top(&self) -> i64 {
        self.canvas_height() - self.template.border.bottom as i64
    }

    /// Run all passes in order. The separator only runs when it exists.
    pub fn compose(&mut self) -> Result<(), WatermarkError> {
        let strategies = self.template.strategies;
        debug!("Composing template {} with {:?}", self.template.id, strategies);

        strategies.border.render(self)?;
        strategies.logo.render(self)?;
        if self.template.separator.exist {
            strategies.separator.render(self)?;
        }
        strategies.words.render(self)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_tag_resolves() {
        assert_eq!(layout_types().count(), 8);
        for tag in layout_types() {
            assert!(strategies_for(tag).is_ok(), "{}", tag);
        }
    }

    #[test]
    fn test_mapping_table() {
        let set = strategies_for("BOTTOM_LOGO_RIGHT").unwrap();
        assert_eq!(set.border, BorderStrategy::Flat);
        assert_eq!(set.logo, LogoStrategy::Fixed(Anchor::Right));
        assert_eq!(set.words, WordStrategy::Fixed(Anchor::Right));

        let set = strategies_for("STACK_BLUR_AUTO").unwrap();
        assert_eq!(set.border, BorderStrategy::StackBlurAuto);
        assert_eq!(set.logo, LogoStrategy::AutoSized(Anchor::StackBlur));
    }

    #[test]
    fn test_unknown_tag() {
        assert!(matches!(
            strategies_for("bottom_logo_left"),
            Err(WatermarkError::LayoutTypeNotFound(_))
        ));
    }
}
