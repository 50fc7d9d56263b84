//! Script tokenization.
//!
//! Splits authored text into paragraphs (blank-line separated), keeps every
//! source line for layout, and materializes one [`ScriptToken`] per word that
//! survives normalization. Tokenizing the same text twice yields the same
//! sequence, which is what lets alignment state outlive a settings change.

use crate::error::{PrompterError, Result};
use crate::normalizer::normalize;
use serde::Serialize;
use sha2::{Digest, Sha256};
use ts_rs::TS;

/// Structural location of a token in the authored text.
///
/// This is the placeholder anchor; an [`crate::layout::AnchorResolver`] turns
/// it into a pixel offset once the renderer knows where the word landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct TokenAnchor {
    pub paragraph: usize,
    /// Index into [`Script::lines`].
    pub line: usize,
    /// Character column of the word start within its line.
    pub column: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct ScriptToken {
    pub index: usize,
    pub normalized: String,
    /// Word as authored, punctuation included.
    pub display: String,
    pub anchor: TokenAnchor,
}

/// One source line, kept for rendering and layout estimates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub paragraph: usize,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Script {
    fingerprint: String,
    paragraph_count: usize,
    lines: Vec<ScriptLine>,
    tokens: Vec<ScriptToken>,
}

impl Script {
    /// Tokenize `raw`, refusing text that is empty after trimming.
    pub fn load(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(PrompterError::EmptyScript);
        }
        let script = tokenize(raw);
        tracing::info!(
            tokens = script.tokens.len(),
            paragraphs = script.paragraph_count,
            lines = script.lines.len(),
            "Tokenized script"
        );
        Ok(script)
    }

    pub fn tokens(&self) -> &[ScriptToken] {
        &self.tokens
    }

    pub fn token(&self, index: usize) -> Option<&ScriptToken> {
        self.tokens.get(index)
    }

    pub fn lines(&self) -> &[ScriptLine] {
        &self.lines
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraph_count
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// SHA-256 of the raw text the script was built from.
    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }
}

/// Tokenize raw authored text. Never fails; an empty input yields an empty
/// script.
pub fn tokenize(raw: &str) -> Script {
    let mut lines = Vec::new();
    let mut tokens = Vec::new();
    let mut paragraph = 0usize;
    let mut in_paragraph = false;

    for source_line in raw.lines() {
        if source_line.trim().is_empty() {
            if in_paragraph {
                paragraph += 1;
                in_paragraph = false;
            }
            continue;
        }
        in_paragraph = true;

        let line_idx = lines.len();
        for (column, word) in word_spans(source_line) {
            let normalized = normalize(word);
            if normalized.is_empty() {
                continue;
            }
            tokens.push(ScriptToken {
                index: tokens.len(),
                normalized,
                display: word.to_string(),
                anchor: TokenAnchor {
                    paragraph,
                    line: line_idx,
                    column,
                },
            });
        }
        lines.push(ScriptLine {
            paragraph,
            text: source_line.to_string(),
        });
    }

    let paragraph_count = if in_paragraph { paragraph + 1 } else { paragraph };

    Script {
        fingerprint: fingerprint(raw),
        paragraph_count,
        lines,
        tokens,
    }
}

/// Whitespace-separated words with their starting character column.
fn word_spans(line: &str) -> Vec<(usize, &str)> {
    let mut spans = Vec::new();
    let mut start: Option<(usize, usize)> = None;

    for (column, (byte_idx, ch)) in line.char_indices().enumerate() {
        if ch.is_whitespace() {
            if let Some((start_col, start_byte)) = start.take() {
                spans.push((start_col, &line[start_byte..byte_idx]));
            }
        } else if start.is_none() {
            start = Some((column, byte_idx));
        }
    }
    if let Some((start_col, start_byte)) = start {
        spans.push((start_col, &line[start_byte..]));
    }

    spans
}

fn fingerprint(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalized(script: &Script) -> Vec<&str> {
        script
            .tokens()
            .iter()
            .map(|token| token.normalized.as_str())
            .collect()
    }

    #[test]
    fn sentence_punctuation_is_stripped_from_tokens() {
        let script = tokenize("Hello world. Good morning.");
        assert_eq!(normalized(&script), vec!["hello", "world", "good", "morning"]);
        assert_eq!(script.tokens()[1].display, "world.");
        let indices: Vec<usize> = script.tokens().iter().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn punctuation_only_words_are_not_materialized() {
        let script = tokenize("Wait - what ... now");
        assert_eq!(normalized(&script), vec!["wait", "what", "now"]);
        assert_eq!(script.tokens()[2].index, 2);
    }

    #[test]
    fn paragraphs_and_lines_are_tracked() {
        let script = tokenize("First line\nsecond line\n\n\n  Next   para\n");
        assert_eq!(script.paragraph_count(), 2);
        assert_eq!(script.lines().len(), 3);
        let next = &script.tokens()[4];
        assert_eq!(next.normalized, "next");
        assert_eq!(
            next.anchor,
            TokenAnchor {
                paragraph: 1,
                line: 2,
                column: 2,
            }
        );
        let para = &script.tokens()[5];
        assert_eq!(para.anchor.column, 9);
    }

    #[test]
    fn columns_count_characters_not_bytes() {
        let script = tokenize("Café olé");
        assert_eq!(script.tokens()[1].anchor.column, 5);
    }

    #[test]
    fn retokenizing_is_deterministic() {
        let text = "Ünïcode text\n\nwith   two paragraphs!";
        let a = tokenize(text);
        let b = tokenize(text);
        assert_eq!(a.tokens(), b.tokens());
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), tokenize("other").fingerprint());
    }

    #[test]
    fn blank_script_is_rejected() {
        assert_eq!(Script::load("  \n\t ").unwrap_err(), PrompterError::EmptyScript);
        let script = Script::load("?!").expect("punctuation-only script still loads");
        assert!(script.is_empty());
    }
}
