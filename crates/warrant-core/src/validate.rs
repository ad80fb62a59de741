//! Structural validation of proposed entities.
//!
//! Validation runs before any store round-trip. Errors are keyed by a
//! dotted field path relative to the entity being resolved, e.g.
//! `target.entity.text` or `locators.url_locators.0.url.url`.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

/// Field-path-keyed validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
  pub fn new() -> Self { Self::default() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
    self.0.entry(path.into()).or_default().push(message.into());
  }

  /// Messages recorded for `path`, if any.
  pub fn get(&self, path: &str) -> Option<&[String]> {
    self.0.get(path).map(Vec::as_slice)
  }

  pub fn paths(&self) -> impl Iterator<Item = &str> {
    self.0.keys().map(String::as_str)
  }

  /// Merge `other` under `prefix`.
  pub fn nest(&mut self, prefix: &str, other: ValidationErrors) {
    for (path, messages) in other.0 {
      let key = if path.is_empty() {
        prefix.to_owned()
      } else {
        format!("{prefix}.{path}")
      };
      self.0.entry(key).or_default().extend(messages);
    }
  }

  /// `Ok(())` when nothing was recorded.
  pub fn into_result(self) -> Result<(), Self> {
    if self.is_empty() { Ok(()) } else { Err(self) }
  }
}

impl fmt::Display for ValidationErrors {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut first = true;
    for (path, messages) in &self.0 {
      for message in messages {
        if !first {
          f.write_str("; ")?;
        }
        first = false;
        write!(f, "{path}: {message}")?;
      }
    }
    Ok(())
  }
}

/// Implemented by every proposed-entity type.
pub trait Validate {
  /// Record problems into `errors`. Paths are relative to `self`.
  fn validate_into(&self, errors: &mut ValidationErrors);

  fn validate(&self) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    self.validate_into(&mut errors);
    errors.into_result()
  }
}

impl<T: Validate> Validate for crate::entity::Proposed<T> {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    if let Self::New(inner) = self {
      inner.validate_into(errors);
    }
  }
}

/// Record an error at `path` when `value` is empty after whitespace cleaning.
pub(crate) fn require_text(errors: &mut ValidationErrors, path: &str, value: &str) {
  if value.trim().is_empty() {
    errors.add(path, "must contain at least 1 non-whitespace character");
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn nest_prefixes_paths() {
    let mut inner = ValidationErrors::new();
    inner.add("text", "required");
    let mut outer = ValidationErrors::new();
    outer.nest("target.entity", inner);

    assert_eq!(outer.get("target.entity.text"), Some(&["required".to_owned()][..]));
  }

  #[test]
  fn empty_errors_are_ok() {
    assert!(ValidationErrors::new().into_result().is_ok());
  }

  #[test]
  fn display_joins_messages() {
    let mut errors = ValidationErrors::new();
    errors.add("a", "one");
    errors.add("b", "two");
    assert_eq!(errors.to_string(), "a: one; b: two");
  }
}
