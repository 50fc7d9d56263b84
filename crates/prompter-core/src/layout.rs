//! Anchor resolution: where a token sits, in pixels from the top of the
//! scrollable content.
//!
//! Rendering is not owned by the core, so resolution is a trait. A renderer
//! that measures its own layout hands back [`FixedAnchors`]; without one the
//! session falls back to [`EstimatedLayout`], a line-wrap estimate.

use crate::tokenizer::{Script, ScriptToken};

pub trait AnchorResolver {
    /// Vertical offset of the token's line top, or `None` if the token has
    /// not been placed yet.
    fn offset_of(&self, token: &ScriptToken) -> Option<f32>;
}

/// Offsets measured by a renderer, indexed by token index.
#[derive(Debug, Clone, Default)]
pub struct FixedAnchors {
    offsets: Vec<f32>,
}

impl FixedAnchors {
    pub fn new(offsets: Vec<f32>) -> Self {
        Self { offsets }
    }
}

impl AnchorResolver for FixedAnchors {
    fn offset_of(&self, token: &ScriptToken) -> Option<f32> {
        self.offsets
            .get(token.index)
            .copied()
            .filter(|offset| offset.is_finite())
    }
}

/// Typography inputs for [`EstimatedLayout`].
#[derive(Debug, Clone, Copy)]
pub struct LayoutMetrics {
    pub font_size: f32,
    pub line_spacing: f32,
    pub content_width_px: f32,
    pub paragraph_gap_lines: f32,
    pub top_padding_px: f32,
}

impl LayoutMetrics {
    fn line_height_px(&self) -> f32 {
        (self.font_size.max(1.0) * self.line_spacing.max(0.8)).max(1.0)
    }

    fn glyph_width_px(&self) -> f32 {
        (self.font_size.max(1.0) * 0.55).max(1.0)
    }

    fn chars_per_row(&self) -> usize {
        (self.content_width_px / self.glyph_width_px()).max(8.0) as usize
    }
}

/// Estimated geometry for a script rendered as wrapped lines.
///
/// Every source line starts a new row; long lines wrap at a fixed character
/// budget derived from the font size and content width.
#[derive(Debug, Clone)]
pub struct EstimatedLayout {
    line_tops: Vec<f32>,
    line_height: f32,
    chars_per_row: usize,
    content_height: f32,
}

impl EstimatedLayout {
    pub fn new(script: &Script, metrics: LayoutMetrics) -> Self {
        let line_height = metrics.line_height_px();
        let chars_per_row = metrics.chars_per_row().max(1);
        let paragraph_gap = metrics.paragraph_gap_lines.max(0.0) * line_height;

        let mut line_tops = Vec::with_capacity(script.lines().len());
        let mut cursor = metrics.top_padding_px.max(0.0);
        let mut previous_paragraph = None;

        for line in script.lines() {
            if previous_paragraph.is_some_and(|prev| prev != line.paragraph) {
                cursor += paragraph_gap;
            }
            previous_paragraph = Some(line.paragraph);

            line_tops.push(cursor);
            let chars = line.text.chars().count().max(1);
            let rows = chars.div_ceil(chars_per_row);
            cursor += rows as f32 * line_height;
        }

        tracing::debug!(
            lines = line_tops.len(),
            line_height,
            chars_per_row,
            content_height = cursor,
            "Estimated script layout"
        );

        Self {
            line_tops,
            line_height,
            chars_per_row,
            content_height: cursor,
        }
    }

    pub fn content_height(&self) -> f32 {
        self.content_height
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }
}

impl AnchorResolver for EstimatedLayout {
    fn offset_of(&self, token: &ScriptToken) -> Option<f32> {
        let top = *self.line_tops.get(token.anchor.line)?;
        let row = token.anchor.column / self.chars_per_row;
        Some(top + row as f32 * self.line_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;
    use approx::assert_relative_eq;

    fn metrics() -> LayoutMetrics {
        LayoutMetrics {
            font_size: 20.0,
            line_spacing: 1.5,
            // ~11px glyphs -> 20 chars per row
            content_width_px: 225.0,
            paragraph_gap_lines: 1.0,
            top_padding_px: 10.0,
        }
    }

    #[test]
    fn rows_advance_by_line_height() {
        let script = tokenize("one\ntwo\nthree");
        let layout = EstimatedLayout::new(&script, metrics());
        let offsets: Vec<f32> = script
            .tokens()
            .iter()
            .map(|token| layout.offset_of(token).expect("placed"))
            .collect();
        assert_relative_eq!(offsets[0], 10.0);
        assert_relative_eq!(offsets[1], 40.0);
        assert_relative_eq!(offsets[2], 70.0);
        assert_relative_eq!(layout.content_height(), 100.0);
    }

    #[test]
    fn long_lines_wrap_and_paragraphs_add_gap() {
        let script = tokenize("aaaaaaaaaaaaaaaaaaaa bbbb\n\nccc");
        let layout = EstimatedLayout::new(&script, metrics());
        let tokens = script.tokens();
        // "bbbb" starts at column 21, second row of a two-row line.
        assert_relative_eq!(layout.offset_of(&tokens[1]).expect("placed"), 40.0);
        // two rows (60px) plus one gap line (30px) after the 10px padding.
        assert_relative_eq!(layout.offset_of(&tokens[2]).expect("placed"), 100.0);
    }

    #[test]
    fn offsets_never_decrease_along_the_script() {
        let text = (0..40)
            .map(|i| format!("Sentence {i} has several words that will wrap around."))
            .collect::<Vec<_>>()
            .join("\n");
        let script = tokenize(&text);
        let layout = EstimatedLayout::new(&script, metrics());
        let mut previous = f32::MIN;
        for token in script.tokens() {
            let offset = layout.offset_of(token).expect("placed");
            assert!(offset >= previous, "token {} moved backwards", token.index);
            previous = offset;
        }
    }

    #[test]
    fn fixed_anchors_ignore_unplaced_tokens() {
        let script = tokenize("alpha beta gamma");
        let anchors = FixedAnchors::new(vec![0.0, f32::NAN]);
        assert_eq!(anchors.offset_of(&script.tokens()[0]), Some(0.0));
        assert_eq!(anchors.offset_of(&script.tokens()[1]), None);
        assert_eq!(anchors.offset_of(&script.tokens()[2]), None);
    }
}
