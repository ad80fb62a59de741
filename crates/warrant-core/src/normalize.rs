//! Normal forms of free text.
//!
//! The normal form is what equivalence is decided on: two propositions whose
//! texts differ only in case, accents, punctuation, or spacing are the same
//! proposition. It is derived data and is recomputed wherever the source
//! text is written.

use unicode_normalization::{UnicodeNormalization as _, char::is_combining_mark};

/// Case-fold, strip accents, strip punctuation, and collapse whitespace.
///
/// ```
/// use warrant_core::normalize::normalize_text;
/// assert_eq!(normalize_text("  The  Café, naïvely!  "), "the cafe naively");
/// ```
pub fn normalize_text(text: &str) -> String {
  let folded: String = text
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .flat_map(char::to_lowercase)
    .filter(|c| is_word_char(*c) || c.is_whitespace())
    .collect();
  clean_whitespace(&folded)
}

/// Sanitise a free-text search query for the full-text index: drop
/// everything that is neither a word character nor whitespace, then collapse
/// whitespace. Case is left alone; the index folds it.
pub fn normalize_search_text(text: &str) -> String {
  let kept: String = text
    .chars()
    .filter(|c| is_word_char(*c) || c.is_whitespace())
    .collect();
  clean_whitespace(&kept)
}

/// Collapse runs of whitespace to a single space and trim both ends.
pub fn clean_whitespace(text: &str) -> String {
  text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalise optional text, mapping blank input to `None`.
pub fn normalize_optional(text: Option<&str>) -> Option<String> {
  text.map(normalize_text).filter(|t| !t.is_empty())
}

fn is_word_char(c: char) -> bool { c.is_alphanumeric() || c == '_' }

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn normal_text_folds_case_and_punctuation() {
    assert_eq!(normalize_text("The  text  Quote."), "the text quote");
  }

  #[test]
  fn normal_text_strips_accents() {
    assert_eq!(normalize_text("Éléphant à Zürich"), "elephant a zurich");
  }

  #[test]
  fn normal_text_keeps_digits_and_underscores() {
    assert_eq!(normalize_text("Room_101 is (not) 42%"), "room_101 is not 42");
  }

  #[test]
  fn normal_text_collapses_newlines_and_tabs() {
    assert_eq!(normalize_text("a\n\tb   c\r\n"), "a b c");
  }

  #[test]
  fn punctuation_only_normalizes_to_empty() {
    assert_eq!(normalize_text("?!… --"), "");
  }

  #[test]
  fn equivalent_texts_share_a_normal_form() {
    assert_eq!(
      normalize_text("Socrates is mortal."),
      normalize_text("socrates IS   mortal")
    );
  }

  #[test]
  fn search_text_keeps_case() {
    assert_eq!(normalize_search_text("Hello,   World!"), "Hello World");
  }

  #[test]
  fn search_text_of_symbols_is_empty() {
    assert_eq!(normalize_search_text("\"*:()"), "");
  }

  #[test]
  fn optional_blank_is_none() {
    assert_eq!(normalize_optional(Some(" . ")), None);
    assert_eq!(normalize_optional(Some("p. 12")), Some("p 12".to_owned()));
    assert_eq!(normalize_optional(None), None);
  }
}
