//! Content-based position tracking.
//!
//! The last spoken word of each transcript fragment is probed forward from
//! the previous match inside a bounded window. The first exact match wins;
//! no match leaves everything as it was.

use crate::layout::AnchorResolver;
use crate::normalizer::spoken_words;
use crate::tokenizer::Script;
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy)]
pub struct AlignmentConfig {
    /// Tokens searched past the last match, inclusive of it.
    pub lookahead_tokens: usize,
    /// Viewport fraction (from the top) where the matched token is pinned.
    pub reading_line_fraction: f32,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            lookahead_tokens: 30,
            reading_line_fraction: 0.4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignmentMatch {
    pub index: usize,
    /// Scroll offset that places the token on the reading line.
    pub target_position: f32,
}

#[derive(Debug, Clone)]
pub struct TranscriptAligner {
    config: AlignmentConfig,
    last_matched: usize,
}

impl TranscriptAligner {
    pub fn new(config: AlignmentConfig) -> Self {
        Self {
            config,
            last_matched: 0,
        }
    }

    pub fn reset(&mut self) {
        self.last_matched = 0;
    }

    pub fn set_config(&mut self, config: AlignmentConfig) {
        self.config = config;
    }

    pub fn last_matched_index(&self) -> usize {
        self.last_matched
    }

    /// Align one transcript fragment. Returns the new match, or `None` when
    /// the fragment is empty, the probe is not in the window, or the matched
    /// token has no resolved anchor yet.
    pub fn on_transcript(
        &mut self,
        fragment: &str,
        script: &Script,
        anchors: &dyn AnchorResolver,
        viewport_height: f32,
    ) -> Option<AlignmentMatch> {
        let words = spoken_words(fragment);
        let probe = words.last()?;

        let Some(index) = self.find_forward(script, probe) else {
            trace!(
                probe = %probe,
                from = self.last_matched,
                window = self.config.lookahead_tokens,
                "No transcript match in window"
            );
            return None;
        };

        let token = script.token(index)?;
        let Some(anchor) = anchors.offset_of(token) else {
            debug!(index, "Matched token has no anchor yet; holding position");
            return None;
        };

        self.last_matched = index;
        let target_position = reading_line_target(
            anchor,
            viewport_height,
            self.config.reading_line_fraction,
        );
        debug!(
            index,
            word = %token.display,
            anchor,
            target_position,
            "Transcript anchored"
        );
        Some(AlignmentMatch {
            index,
            target_position,
        })
    }

    /// First token equal to `probe` in `[last, last + lookahead)`.
    pub fn find_forward(&self, script: &Script, probe: &str) -> Option<usize> {
        script
            .tokens()
            .iter()
            .skip(self.last_matched)
            .take(self.config.lookahead_tokens)
            .find(|token| token.normalized == probe)
            .map(|token| token.index)
    }
}

/// Scroll offset putting `anchor` at `fraction` of the viewport height.
pub fn reading_line_target(anchor: f32, viewport_height: f32, fraction: f32) -> f32 {
    let line = viewport_height.max(0.0) * fraction.clamp(0.0, 1.0);
    (anchor - line).max(0.0)
}
