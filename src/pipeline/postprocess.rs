//! Post-processing: reduce raw engine output to at most one symbol.
//!
//! Tesseract in single-character mode still prints a trailing newline and
//! form feed, and occasionally a stray quote or dot picked up from noise
//! next to the glyph. These rules strip that down to one alphabet character
//! or nothing.

use once_cell::sync::Lazy;
use regex::Regex;

static RE_NOISE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// Clean raw engine output into a single character of `alphabet`.
///
/// Rules (applied in order):
/// 1. Drop whitespace, form feeds and punctuation
/// 2. Fold to uppercase when the alphabet has no lowercase letters
/// 3. Keep the first character that belongs to the alphabet
pub fn clean_symbol(raw: &str, alphabet: &str) -> Option<char> {
    let stripped = strip_noise(raw);
    let folded = if alphabet.chars().any(char::is_lowercase) {
        stripped
    } else {
        stripped.to_uppercase()
    };
    folded.chars().find(|c| alphabet.contains(*c))
}

fn strip_noise(raw: &str) -> String {
    RE_NOISE.replace_all(raw, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_ALPHABET;

    #[test]
    fn strips_trailing_newline_and_form_feed() {
        assert_eq!(clean_symbol("K\n\x0c", DEFAULT_ALPHABET), Some('K'));
    }

    #[test]
    fn empty_output_is_none() {
        assert_eq!(clean_symbol("", DEFAULT_ALPHABET), None);
        assert_eq!(clean_symbol(" \n\x0c", DEFAULT_ALPHABET), None);
    }

    #[test]
    fn punctuation_is_ignored() {
        assert_eq!(clean_symbol("'T.", DEFAULT_ALPHABET), Some('T'));
    }

    #[test]
    fn lowercase_folds_for_uppercase_alphabet() {
        assert_eq!(clean_symbol("w", DEFAULT_ALPHABET), Some('W'));
        assert_eq!(clean_symbol("w", "abcw"), Some('w'));
    }

    #[test]
    fn excluded_letters_are_skipped() {
        // O and I are not in the default alphabet.
        assert_eq!(clean_symbol("O", DEFAULT_ALPHABET), None);
        assert_eq!(clean_symbol("IX", DEFAULT_ALPHABET), Some('X'));
    }
}
