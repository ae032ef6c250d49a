use super::{Anchor, RenderContext, WordStrategy};
use crate::watermark::WatermarkError;
use crate::watermark::metadata::MetadataRecord;
use crate::watermark::template::{WordRow, WordsTemplate};
use crate::watermark::text::TextBrush;
use std::collections::HashMap;
use tracing::{debug, trace};

/// Resolved text of the four word slots.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotTexts {
    pub one: String,
    pub two: String,
    pub three: String,
    pub four: String,
}

impl SlotTexts {
    pub fn resolve(
        words: &WordsTemplate,
        metadata: &MetadataRecord,
        overrides: &HashMap<String, String>,
    ) -> Self {
        Self {
            one: slot_text(&words.one, metadata, overrides),
            two: slot_text(&words.two, metadata, overrides),
            three: slot_text(&words.three, metadata, overrides),
            four: slot_text(&words.four, metadata, overrides),
        }
    }
}

/// Join the values of a comma-separated field list with single spaces.
fn slot_text(
    fields: &str,
    metadata: &MetadataRecord,
    overrides: &HashMap<String, String>,
) -> String {
    fields
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .filter_map(|name| {
            let value = overrides
                .get(name)
                .cloned()
                .or_else(|| metadata.field(name));
            if value.is_none() {
                debug!("Unknown word field {:?} skipped", name);
            }
            value
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone, Copy)]
enum Row {
    First,
    Second,
}

impl WordStrategy {
    pub fn render(&self, ctx: &mut RenderContext<'_>) -> Result<(), WatermarkError> {
        match *self {
            WordStrategy::Fixed(anchor) => draw_words(ctx, anchor),
            WordStrategy::AutoSized(anchor) => {
                derive_auto_words(ctx, anchor)?;
                draw_words(ctx, anchor)
            }
        }
    }
}

fn row_of(words: &WordsTemplate, row: Row) -> &WordRow {
    match row {
        Row::First => &words.first,
        Row::Second => &words.second,
    }
}

fn brush(ctx: &RenderContext<'_>, row: Row) -> Result<TextBrush, WatermarkError> {
    let settings = row_of(&ctx.template.words, row);
    TextBrush::load(
        &ctx.caches.fonts,
        &settings.font_file,
        settings.font_size as f32,
        settings.color,
    )
}

fn measure(ctx: &RenderContext<'_>, row: Row, text: &str) -> Result<u32, WatermarkError> {
    if text.is_empty() {
        return Ok(0);
    }
    Ok(brush(ctx, row)?.width(text))
}

fn derive_auto_words(ctx: &mut RenderContext<'_>, anchor: Anchor) -> Result<(), WatermarkError> {
    let bottom = ctx.template.border.bottom;
    let font_size = bottom / 4;
    let first_top = (bottom as f64 / 2.5) as i32;
    let second_top = first_top + (font_size as f64 * 1.5) as i32;
    let margin_left = (font_size / 2) as i32;

    {
        let words = &mut ctx.template.words;
        words.first.font_size = font_size;
        words.second.font_size = font_size;
        words.first.margin_top = first_top;
        words.second.margin_top = second_top;
        words.first.margin_left = margin_left;
        words.second.margin_left = margin_left;
    }

    let widest = measure(ctx, Row::First, &ctx.texts.three)?
        .max(measure(ctx, Row::Second, &ctx.texts.four)?);
    let one_width = if anchor == Anchor::StackBlur {
        measure(ctx, Row::First, &ctx.texts.one)?
    } else {
        0
    };

    let words = &mut ctx.template.words;
    words.first.margin_right = widest as i32;
    words.second.margin_right = widest as i32;
    if anchor == Anchor::StackBlur {
        // both slots share a baseline, so the second follows the first
        words.second.margin_left = margin_left + one_width as i32 + margin_left;
    }
    debug!(
        "Auto words: font {} tops {}/{} right margin {}",
        font_size, first_top, second_top, widest
    );
    Ok(())
}

fn draw_words(ctx: &mut RenderContext<'_>, anchor: Anchor) -> Result<(), WatermarkError> {
    let words = ctx.template.words.clone();
    let logo = ctx.template.logo.clone();
    let sep = &ctx.template.separator;
    let border = &ctx.template.border;

    let left = border.left as i64;
    let right_edge = ctx.canvas_width() - border.right as i64;
    let band_top = ctx.band_top();
    let shift = if sep.exist {
        sep.width as i64 + sep.margin_left as i64 + sep.margin_right as i64
    } else {
        0
    };
    let first_y = band_top + words.first.margin_top as i64;
    let second_y = band_top + words.second.margin_top as i64;
    let (logo_w, logo_ml, logo_mr) = (
        logo.width as i64,
        logo.margin_left as i64,
        logo.margin_right as i64,
    );

    let texts = ctx.texts.clone();
    let placements: Vec<(Row, i64, i64, &str)> = match anchor {
        Anchor::Left => vec![
            (Row::First, left + logo_w + words.first.margin_left as i64 + shift, first_y, texts.one.as_str()),
            (Row::Second, left + logo_w + words.second.margin_left as i64 + shift, second_y, texts.two.as_str()),
            (Row::First, right_edge - words.first.margin_right as i64, first_y, texts.three.as_str()),
            (Row::Second, right_edge - words.second.margin_right as i64, second_y, texts.four.as_str()),
        ],
        Anchor::Center => {
            let column = right_edge - logo_mr + logo_w + shift;
            vec![
                (Row::First, left + words.first.margin_left as i64, first_y, texts.one.as_str()),
                (Row::Second, left + words.second.margin_left as i64, second_y, texts.two.as_str()),
                (Row::First, column, first_y, texts.three.as_str()),
                (Row::Second, column, second_y, texts.four.as_str()),
            ]
        }
        Anchor::Right => {
            let column = right_edge - logo_w - logo_ml - shift;
            vec![
                (Row::First, left + words.first.margin_left as i64, first_y, texts.one.as_str()),
                (Row::Second, left + words.second.margin_left as i64, second_y, texts.two.as_str()),
                (Row::First, column - words.first.margin_right as i64, first_y, texts.three.as_str()),
                (Row::Second, column - words.second.margin_right as i64, second_y, texts.four.as_str()),
            ]
        }
        Anchor::StackBlur => {
            let after_logo = left + logo_ml + logo_w + logo_mr;
            vec![
                (Row::First, after_logo + words.first.margin_left as i64, first_y, texts.one.as_str()),
                (
                    Row::Second,
                    after_logo + words.second.margin_left as i64 + shift,
                    first_y,
                    texts.two.as_str(),
                ),
            ]
        }
    };

    for (row, x, y, text) in placements {
        if text.is_empty() {
            continue;
        }
        let pen = brush(ctx, row)?;
        trace!("Drawing {:?} at ({}, {})", text, x, y);
        pen.draw(&mut ctx.canvas, x, y, text);
    }
    Ok(())
}
