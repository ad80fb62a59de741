//! Media excerpts: quoted, located excerpts of external sources.
//!
//! A [`MediaExcerpt`] is anchored to zero or more URLs through
//! [`UrlLocator`]s (each optionally carrying highlighted [`DomAnchor`]s) and
//! cited to zero or more [`Source`]s.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  entity::Proposed,
  normalize::{clean_whitespace, normalize_optional, normalize_text},
  proposition::{NewPersorg, Persorg},
  validate::{Validate, ValidationErrors, require_text},
};

// ─── Url ─────────────────────────────────────────────────────────────────────

/// A stored URL. `canonical_url` comes from the page itself (e.g. a
/// `<link rel="canonical">`) and is never computed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Url {
  pub url_id:          Uuid,
  pub url:             String,
  pub canonical_url:   Option<String>,
  pub created_at:      DateTime<Utc>,
  pub creator_user_id: Uuid,
}

/// Input for a URL. Read-or-create matches on the literal `url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUrl {
  pub url:           String,
  #[serde(default)]
  pub canonical_url: Option<String>,
}

impl NewUrl {
  pub fn new(url: impl Into<String>) -> Self {
    Self { url: url.into(), canonical_url: None }
  }
}

impl Validate for NewUrl {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    validate_url(errors, "url", &self.url);
    if let Some(canonical) = &self.canonical_url {
      validate_url(errors, "canonical_url", canonical);
    }
  }
}

/// Matching compares hosts, so a URL without one (`mailto:`, `data:`) is
/// rejected along with relative ones.
fn validate_url(errors: &mut ValidationErrors, field: &str, raw: &str) {
  match url::Url::parse(raw) {
    Err(e) => errors.add(field, format!("must be an absolute URL ({e})")),
    Ok(parsed) if parsed.host_str().is_none_or(str::is_empty) => {
      errors.add(field, "must have a host");
    }
    Ok(_) => {}
  }
}

// ─── Locators ────────────────────────────────────────────────────────────────

/// A text-offset reference locating an excerpt within a rendered page.
///
/// Field order matters: the derived `Ord` is used to compare anchor sets.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DomAnchor {
  pub exact_text:   String,
  pub prefix_text:  String,
  pub suffix_text:  String,
  pub start_offset: i64,
  pub end_offset:   i64,
}

impl Validate for DomAnchor {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    require_text(errors, "exact_text", &self.exact_text);
    if self.start_offset < 0 {
      errors.add("start_offset", "must not be negative");
    }
    if self.end_offset < self.start_offset {
      errors.add("end_offset", "must not precede start_offset");
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UrlLocator {
  pub url_locator_id:   Uuid,
  pub media_excerpt_id: Uuid,
  pub url:              Url,
  pub anchors:          Vec<DomAnchor>,
  pub created_at:       DateTime<Utc>,
  pub creator_user_id:  Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewUrlLocator {
  pub url:     Proposed<NewUrl>,
  #[serde(default)]
  pub anchors: Vec<DomAnchor>,
}

impl Validate for NewUrlLocator {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    let mut url_errors = ValidationErrors::new();
    self.url.validate_into(&mut url_errors);
    errors.nest("url", url_errors);
    for (i, anchor) in self.anchors.iter().enumerate() {
      let mut anchor_errors = ValidationErrors::new();
      anchor.validate_into(&mut anchor_errors);
      errors.nest(&format!("anchors.{i}"), anchor_errors);
    }
  }
}

/// A UrlLocator whose URL has been resolved to a stored row.
#[derive(Debug, Clone)]
pub struct ResolvedUrlLocator {
  pub url:     Url,
  pub anchors: Vec<DomAnchor>,
}

// ─── Sources & citations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
  pub source_id:          Uuid,
  pub description:        String,
  pub normal_description: String,
  pub created_at:         DateTime<Utc>,
  pub creator_user_id:    Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSource {
  pub description: String,
}

impl NewSource {
  pub fn description(&self) -> String { clean_whitespace(&self.description) }

  pub fn normal_description(&self) -> String { normalize_text(&self.description) }
}

impl Validate for NewSource {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    require_text(errors, "description", &self.description);
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
  pub media_excerpt_id: Uuid,
  pub source:           Source,
  pub pincite:          Option<String>,
  pub normal_pincite:   Option<String>,
  pub created_at:       DateTime<Utc>,
  pub creator_user_id:  Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCitation {
  pub source:  Proposed<NewSource>,
  #[serde(default)]
  pub pincite: Option<String>,
}

impl NewCitation {
  pub fn normal_pincite(&self) -> Option<String> {
    normalize_optional(self.pincite.as_deref())
  }
}

impl Validate for NewCitation {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    let mut source_errors = ValidationErrors::new();
    self.source.validate_into(&mut source_errors);
    errors.nest("source", source_errors);
  }
}

// ─── MediaExcerpt ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalRep {
  pub quotation:        String,
  pub normal_quotation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MediaExcerptLocators {
  pub url_locators: Vec<UrlLocator>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaExcerpt {
  pub media_excerpt_id: Uuid,
  pub local_rep:        LocalRep,
  pub locators:         MediaExcerptLocators,
  pub citations:        Vec<Citation>,
  pub speakers:         Vec<Persorg>,
  pub created_at:       DateTime<Utc>,
  pub creator_user_id:  Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLocalRep {
  pub quotation: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewMediaExcerptLocators {
  #[serde(default)]
  pub url_locators: Vec<NewUrlLocator>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMediaExcerpt {
  pub local_rep: NewLocalRep,
  #[serde(default)]
  pub locators:  NewMediaExcerptLocators,
  #[serde(default)]
  pub citations: Vec<NewCitation>,
  #[serde(default)]
  pub speakers:  Vec<Proposed<NewPersorg>>,
}

impl NewMediaExcerpt {
  /// A quotation-only excerpt.
  pub fn quotation(quotation: impl Into<String>) -> Self {
    Self {
      local_rep: NewLocalRep { quotation: quotation.into() },
      locators:  NewMediaExcerptLocators::default(),
      citations: Vec::new(),
      speakers:  Vec::new(),
    }
  }

  pub fn with_url(mut self, url: impl Into<String>) -> Self {
    self.locators.url_locators.push(NewUrlLocator {
      url:     NewUrl::new(url).into(),
      anchors: Vec::new(),
    });
    self
  }

  pub fn with_source(mut self, description: impl Into<String>) -> Self {
    self.citations.push(NewCitation {
      source:  NewSource { description: description.into() }.into(),
      pincite: None,
    });
    self
  }
}

impl Validate for NewMediaExcerpt {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    require_text(errors, "local_rep.quotation", &self.local_rep.quotation);
    for (i, locator) in self.locators.url_locators.iter().enumerate() {
      let mut e = ValidationErrors::new();
      locator.validate_into(&mut e);
      errors.nest(&format!("locators.url_locators.{i}"), e);
    }
    for (i, citation) in self.citations.iter().enumerate() {
      let mut e = ValidationErrors::new();
      citation.validate_into(&mut e);
      errors.nest(&format!("citations.{i}"), e);
    }
    for (i, speaker) in self.speakers.iter().enumerate() {
      let mut e = ValidationErrors::new();
      speaker.validate_into(&mut e);
      errors.nest(&format!("speakers.{i}"), e);
    }
  }
}

/// The equivalence key of a media excerpt, computed after its URLs and
/// sources have been resolved to stored rows.
#[derive(Debug, Clone)]
pub struct MediaExcerptKey {
  pub quotation:        String,
  pub normal_quotation: String,
  /// Resolved URLs of the proposed locators. Empty means "any".
  pub urls:             Vec<Url>,
  /// Resolved source ids of the proposed citations. Empty means "any".
  pub source_ids:       Vec<Uuid>,
}

impl MediaExcerptKey {
  pub fn new(local_rep: &NewLocalRep, urls: Vec<Url>, source_ids: Vec<Uuid>) -> Self {
    Self {
      quotation: clean_whitespace(&local_rep.quotation),
      normal_quotation: normalize_text(&local_rep.quotation),
      urls,
      source_ids,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn quotation_is_required() {
    let errors = NewMediaExcerpt::quotation("   ").validate().unwrap_err();
    assert!(errors.get("local_rep.quotation").is_some());
  }

  #[test]
  fn relative_urls_are_rejected_with_a_nested_path() {
    let errors = NewMediaExcerpt::quotation("q")
      .with_url("/relative/path")
      .validate()
      .unwrap_err();
    assert!(errors.get("locators.url_locators.0.url.url").is_some());
  }

  #[test]
  fn host_less_urls_are_rejected() {
    let errors = NewUrl::new("mailto:someone@example.com").validate().unwrap_err();
    assert_eq!(errors.get("url").map(|e| e.len()), Some(1));

    let mut url = NewUrl::new("https://example.com/a");
    url.canonical_url = Some("data:text/plain,hi".into());
    let errors = url.validate().unwrap_err();
    assert!(errors.get("url").is_none());
    assert!(errors.get("canonical_url").is_some());
  }

  #[test]
  fn inverted_anchor_offsets_are_rejected() {
    let mut excerpt = NewMediaExcerpt::quotation("q").with_url("https://example.com");
    excerpt.locators.url_locators[0].anchors.push(DomAnchor {
      exact_text:   "q".into(),
      prefix_text:  String::new(),
      suffix_text:  String::new(),
      start_offset: 5,
      end_offset:   2,
    });
    let errors = excerpt.validate().unwrap_err();
    assert!(errors.get("locators.url_locators.0.anchors.0.end_offset").is_some());
  }

  #[test]
  fn key_normalizes_quotation() {
    let key = MediaExcerptKey::new(
      &NewLocalRep { quotation: "The  text  Quote.".into() },
      vec![],
      vec![],
    );
    assert_eq!(key.quotation, "The text Quote.");
    assert_eq!(key.normal_quotation, "the text quote");
  }

  #[test]
  fn deserializes_reference_and_new_sources() {
    let json = serde_json::json!({
      "local_rep": { "quotation": "q" },
      "citations": [
        { "source": { "id": "00000000-0000-0000-0000-000000000001" } },
        { "source": { "description": "A book" }, "pincite": "p. 4" }
      ]
    });
    let excerpt: NewMediaExcerpt = serde_json::from_value(json).unwrap();
    assert!(matches!(excerpt.citations[0].source, Proposed::Existing(_)));
    assert!(matches!(excerpt.citations[1].source, Proposed::New(_)));
    assert_eq!(excerpt.citations[1].normal_pincite().as_deref(), Some("p 4"));
  }
}
