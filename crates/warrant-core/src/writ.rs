//! Writs (written works) and quotes from them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  entity::Proposed,
  media::{NewUrl, Url},
  normalize::{clean_whitespace, normalize_text},
  proposition::NewProposition,
  validate::{Validate, ValidationErrors, require_text},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Writ {
  pub writ_id:         Uuid,
  pub title:           String,
  pub normal_title:    String,
  pub created_at:      DateTime<Utc>,
  pub creator_user_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWrit {
  pub title: String,
}

impl NewWrit {
  pub fn title(&self) -> String { clean_whitespace(&self.title) }

  pub fn normal_title(&self) -> String { normalize_text(&self.title) }
}

impl Validate for NewWrit {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    require_text(errors, "title", &self.title);
  }
}

/// A quote from a writ. Equivalent quotes share a writ and a normal quote
/// text; URLs accumulate on the stored quote.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WritQuote {
  pub writ_quote_id:     Uuid,
  pub quote_text:        String,
  pub normal_quote_text: String,
  pub writ:              Writ,
  pub urls:              Vec<Url>,
  pub created_at:        DateTime<Utc>,
  pub creator_user_id:   Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewWritQuote {
  pub quote_text: String,
  pub writ:       Proposed<NewWrit>,
  #[serde(default)]
  pub urls:       Vec<Proposed<NewUrl>>,
}

impl Validate for NewWritQuote {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    require_text(errors, "quote_text", &self.quote_text);
    let mut writ_errors = ValidationErrors::new();
    self.writ.validate_into(&mut writ_errors);
    errors.nest("writ", writ_errors);
    for (i, url) in self.urls.iter().enumerate() {
      let mut e = ValidationErrors::new();
      url.validate_into(&mut e);
      errors.nest(&format!("urls.{i}"), e);
    }
  }
}

/// Key of a writ quote after its writ is resolved.
#[derive(Debug, Clone)]
pub struct WritQuoteKey {
  pub writ_id:           Uuid,
  pub quote_text:        String,
  pub normal_quote_text: String,
}

impl WritQuoteKey {
  pub fn new(writ_id: Uuid, quote_text: &str) -> Self {
    Self {
      writ_id,
      quote_text: clean_whitespace(quote_text),
      normal_quote_text: normalize_text(quote_text),
    }
  }
}

/// A proposition paraphrasing a source excerpt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceExcerptParaphrase {
  pub source_excerpt_paraphrase_id: Uuid,
  pub paraphrasing_proposition_id:  Uuid,
  pub writ_quote_id:                Uuid,
  pub created_at:                   DateTime<Utc>,
  pub creator_user_id:              Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSourceExcerptParaphrase {
  pub paraphrasing_proposition: Proposed<NewProposition>,
  pub source_excerpt:           Proposed<NewWritQuote>,
}

impl Validate for NewSourceExcerptParaphrase {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    let mut p = ValidationErrors::new();
    self.paraphrasing_proposition.validate_into(&mut p);
    errors.nest("paraphrasing_proposition", p);
    let mut s = ValidationErrors::new();
    self.source_excerpt.validate_into(&mut s);
    errors.nest("source_excerpt", s);
  }
}
