//! Propositions and the persons/organizations ("persorgs") who speak them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  normalize::{clean_whitespace, normalize_text},
  validate::{Validate, ValidationErrors, require_text},
};

// ─── Proposition ─────────────────────────────────────────────────────────────

/// A claim, independent of who makes it. Two propositions are equivalent
/// exactly when their `normal_text`s are equal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposition {
  pub proposition_id:  Uuid,
  pub text:            String,
  /// Derived from `text`; recomputed whenever `text` is written.
  pub normal_text:     String,
  pub created_at:      DateTime<Utc>,
  pub creator_user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProposition {
  pub text: String,
}

impl NewProposition {
  pub fn new(text: impl Into<String>) -> Self { Self { text: text.into() } }

  /// The display text as it will be stored.
  pub fn text(&self) -> String { clean_whitespace(&self.text) }

  /// The equivalence key.
  pub fn normal_text(&self) -> String { normalize_text(&self.text) }
}

impl Validate for NewProposition {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    require_text(errors, "text", &self.text);
    if !self.text.trim().is_empty() && self.normal_text().is_empty() {
      errors.add("text", "must contain at least one word");
    }
  }
}

// ─── Persorg ─────────────────────────────────────────────────────────────────

/// A person or organization to whom statements are attributed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persorg {
  pub persorg_id:      Uuid,
  pub name:            String,
  pub normal_name:     String,
  pub is_organization: bool,
  pub known_for:       Option<String>,
  pub website_url:     Option<String>,
  pub created_at:      DateTime<Utc>,
  pub creator_user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPersorg {
  pub name:            String,
  #[serde(default)]
  pub is_organization: bool,
  #[serde(default)]
  pub known_for:       Option<String>,
  #[serde(default)]
  pub website_url:     Option<String>,
}

impl NewPersorg {
  pub fn person(name: impl Into<String>) -> Self {
    Self {
      name:            name.into(),
      is_organization: false,
      known_for:       None,
      website_url:     None,
    }
  }

  pub fn name(&self) -> String { clean_whitespace(&self.name) }

  pub fn normal_name(&self) -> String { normalize_text(&self.name) }
}

impl Validate for NewPersorg {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    require_text(errors, "name", &self.name);
    if let Some(website) = &self.website_url
      && url::Url::parse(website).is_err()
    {
      errors.add("website_url", "must be an absolute URL");
    }
  }
}
