//! Word normalization shared by the script tokenizer and the live
//! transcript path.
//!
//! Both sides must reduce a word to the same comparable form, otherwise an
//! accented script word could never match what the recognizer hears.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static RE_PUNCTUATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.,/#!$%^&*;:{}=\-_`~()?¿¡"'«»“”‘’„…\[\]<>|\\@+–—]"#).unwrap()
});

/// Lower-case, strip combining diacritics, drop punctuation.
///
/// Pure and total: `normalize("Café!") == normalize("cafe")` and the empty
/// string maps to itself.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect();
    RE_PUNCTUATION.replace_all(&folded, "").into_owned()
}

/// Split a transcript fragment into normalized spoken words, dropping any
/// word that normalizes to nothing.
pub fn spoken_words(fragment: &str) -> Vec<String> {
    fragment
        .split_whitespace()
        .map(normalize)
        .filter(|word| !word.is_empty())
        .collect()
}
