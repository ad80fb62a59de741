//! Justifications and counter-justifications.
//!
//! A justification supports or opposes a target using a basis. When the
//! target is itself a justification, the new one is a counter-justification.
//! Every justification also records its root target (the proposition or
//! statement at the base of the tree) and its root polarity: whether, all
//! counters considered, it speaks for or against that root.

pub mod tree;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  entity::Proposed,
  media::NewMediaExcerpt,
  proposition::NewProposition,
  statement::NewStatement,
  validate::{Validate, ValidationErrors},
  vote::VotePolarity,
  writ::{NewSourceExcerptParaphrase, NewWritQuote},
};

pub use tree::{JustificationNode, JustificationTree};

// ─── Discriminants ───────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Polarity {
  Positive,
  Negative,
}

impl Polarity {
  pub fn negate(self) -> Self {
    match self {
      Self::Positive => Self::Negative,
      Self::Negative => Self::Positive,
    }
  }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JustificationTargetType {
  Proposition,
  Statement,
  Justification,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JustificationRootTargetType {
  Proposition,
  Statement,
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JustificationBasisType {
  PropositionCompound,
  WritQuote,
  JustificationBasisCompound,
  MediaExcerpt,
}

// ─── References ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum JustificationTarget {
  Proposition(Uuid),
  Statement(Uuid),
  Justification(Uuid),
}

impl JustificationTarget {
  pub fn from_parts(target_type: JustificationTargetType, id: Uuid) -> Self {
    match target_type {
      JustificationTargetType::Proposition => Self::Proposition(id),
      JustificationTargetType::Statement => Self::Statement(id),
      JustificationTargetType::Justification => Self::Justification(id),
    }
  }

  pub fn target_type(&self) -> JustificationTargetType {
    match self {
      Self::Proposition(_) => JustificationTargetType::Proposition,
      Self::Statement(_) => JustificationTargetType::Statement,
      Self::Justification(_) => JustificationTargetType::Justification,
    }
  }

  pub fn id(&self) -> Uuid {
    match self {
      Self::Proposition(id) | Self::Statement(id) | Self::Justification(id) => *id,
    }
  }
}

impl From<JustificationRootTarget> for JustificationTarget {
  fn from(root: JustificationRootTarget) -> Self {
    match root {
      JustificationRootTarget::Proposition(id) => Self::Proposition(id),
      JustificationRootTarget::Statement(id) => Self::Statement(id),
    }
  }
}

/// The proposition or statement at the base of a justification tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum JustificationRootTarget {
  Proposition(Uuid),
  Statement(Uuid),
}

impl JustificationRootTarget {
  pub fn from_parts(root_type: JustificationRootTargetType, id: Uuid) -> Self {
    match root_type {
      JustificationRootTargetType::Proposition => Self::Proposition(id),
      JustificationRootTargetType::Statement => Self::Statement(id),
    }
  }

  pub fn root_type(&self) -> JustificationRootTargetType {
    match self {
      Self::Proposition(_) => JustificationRootTargetType::Proposition,
      Self::Statement(_) => JustificationRootTargetType::Statement,
    }
  }

  pub fn id(&self) -> Uuid {
    match self {
      Self::Proposition(id) | Self::Statement(id) => *id,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum JustificationBasis {
  PropositionCompound(Uuid),
  WritQuote(Uuid),
  JustificationBasisCompound(Uuid),
  MediaExcerpt(Uuid),
}

impl JustificationBasis {
  pub fn from_parts(basis_type: JustificationBasisType, id: Uuid) -> Self {
    match basis_type {
      JustificationBasisType::PropositionCompound => Self::PropositionCompound(id),
      JustificationBasisType::WritQuote => Self::WritQuote(id),
      JustificationBasisType::JustificationBasisCompound => {
        Self::JustificationBasisCompound(id)
      }
      JustificationBasisType::MediaExcerpt => Self::MediaExcerpt(id),
    }
  }

  pub fn basis_type(&self) -> JustificationBasisType {
    match self {
      Self::PropositionCompound(_) => JustificationBasisType::PropositionCompound,
      Self::WritQuote(_) => JustificationBasisType::WritQuote,
      Self::JustificationBasisCompound(_) => {
        JustificationBasisType::JustificationBasisCompound
      }
      Self::MediaExcerpt(_) => JustificationBasisType::MediaExcerpt,
    }
  }

  pub fn id(&self) -> Uuid {
    match self {
      Self::PropositionCompound(id)
      | Self::WritQuote(id)
      | Self::JustificationBasisCompound(id)
      | Self::MediaExcerpt(id) => *id,
    }
  }
}

// ─── Stored ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Justification {
  pub justification_id: Uuid,
  pub target:           JustificationTarget,
  pub basis:            JustificationBasis,
  pub polarity:         Polarity,
  pub root_target:      JustificationRootTarget,
  /// Stored at creation; the negation of the countered justification's root
  /// polarity for counters.
  pub root_polarity:    Polarity,
  /// Maintained by vote tallying.
  pub score:            i64,
  /// The requesting user's vote, when read on behalf of a user.
  pub current_vote:     Option<VotePolarity>,
  pub created_at:       DateTime<Utc>,
  pub creator_user_id:  Uuid,
}

impl Justification {
  pub fn is_counter(&self) -> bool {
    matches!(self.target, JustificationTarget::Justification(_))
  }
}

/// The fully-resolved equivalence key plus derived root fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JustificationKey {
  pub target:        JustificationTarget,
  pub basis:         JustificationBasis,
  pub polarity:      Polarity,
  pub root_target:   JustificationRootTarget,
  pub root_polarity: Polarity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropositionCompound {
  pub proposition_compound_id: Uuid,
  /// Atom proposition ids, in order.
  pub atoms:                   Vec<Uuid>,
  pub created_at:              DateTime<Utc>,
  pub creator_user_id:         Uuid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum JustificationBasisCompoundAtom {
  Proposition(Uuid),
  SourceExcerptParaphrase(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JustificationBasisCompound {
  pub justification_basis_compound_id: Uuid,
  pub atoms:                           Vec<JustificationBasisCompoundAtom>,
  pub created_at:                      DateTime<Utc>,
  pub creator_user_id:                 Uuid,
}

/// What [`crate::store::ArgumentStore::delete_justification`] removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedJustification {
  pub justification_id:           Uuid,
  pub counter_justification_ids: Vec<Uuid>,
}

// ─── Proposed ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJustification {
  pub target:   NewJustificationTarget,
  pub basis:    NewJustificationBasis,
  pub polarity: Polarity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity", rename_all = "snake_case")]
pub enum NewJustificationTarget {
  Proposition(Proposed<NewProposition>),
  Statement(Proposed<NewStatement>),
  Justification(Box<Proposed<NewJustification>>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity", rename_all = "snake_case")]
pub enum NewJustificationBasis {
  PropositionCompound(Proposed<NewPropositionCompound>),
  WritQuote(Proposed<NewWritQuote>),
  JustificationBasisCompound(Proposed<NewJustificationBasisCompound>),
  MediaExcerpt(Proposed<NewMediaExcerpt>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPropositionCompoundAtom {
  pub entity: Proposed<NewProposition>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPropositionCompound {
  pub atoms: Vec<NewPropositionCompoundAtom>,
}

impl NewPropositionCompound {
  pub fn of_texts<I, S>(texts: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      atoms: texts
        .into_iter()
        .map(|t| NewPropositionCompoundAtom {
          entity: NewProposition::new(t).into(),
        })
        .collect(),
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity", rename_all = "snake_case")]
pub enum NewJustificationBasisCompoundAtom {
  Proposition(Proposed<NewProposition>),
  SourceExcerptParaphrase(Proposed<NewSourceExcerptParaphrase>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJustificationBasisCompound {
  pub atoms: Vec<NewJustificationBasisCompoundAtom>,
}

impl NewJustification {
  /// A counter-justification of `countered`. Counters always oppose.
  pub fn counter(
    countered: impl Into<Proposed<NewJustification>>,
    basis: NewJustificationBasis,
  ) -> Self {
    Self {
      target: NewJustificationTarget::Justification(Box::new(countered.into())),
      basis,
      polarity: Polarity::Negative,
    }
  }
}

/// Where a chain of proposed counter-justifications bottoms out.
#[derive(Debug, Clone, Copy)]
pub enum TargetBase<'a> {
  /// A root target: the first collected justification targets it directly.
  Root(&'a NewJustificationTarget),
  /// An already-stored justification that the deepest collected
  /// justification counters.
  Justification(Uuid),
}

/// Flatten nested new counter-justification targets, outermost first.
pub fn collect_justifications(
  head: &NewJustification,
) -> (Vec<&NewJustification>, TargetBase<'_>) {
  let mut justifications = vec![head];
  let mut current = head;
  loop {
    match &current.target {
      NewJustificationTarget::Justification(inner) => match inner.as_ref() {
        Proposed::Existing(r) => return (justifications, TargetBase::Justification(r.id)),
        Proposed::New(j) => {
          justifications.push(j);
          current = j;
        }
      },
      root => return (justifications, TargetBase::Root(root)),
    }
  }
}

impl Validate for NewJustificationBasis {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    match self {
      Self::PropositionCompound(compound) => compound.validate_into(errors),
      Self::WritQuote(quote) => quote.validate_into(errors),
      Self::JustificationBasisCompound(compound) => compound.validate_into(errors),
      Self::MediaExcerpt(excerpt) => excerpt.validate_into(errors),
    }
  }
}

impl Validate for NewPropositionCompound {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    if self.atoms.is_empty() {
      errors.add("atoms", "must contain at least one atom");
    }
    for (i, atom) in self.atoms.iter().enumerate() {
      let mut e = ValidationErrors::new();
      atom.entity.validate_into(&mut e);
      errors.nest(&format!("atoms.{i}.entity"), e);
    }
  }
}

impl Validate for NewJustificationBasisCompound {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    if self.atoms.is_empty() {
      errors.add("atoms", "must contain at least one atom");
    }
    for (i, atom) in self.atoms.iter().enumerate() {
      let mut e = ValidationErrors::new();
      match atom {
        NewJustificationBasisCompoundAtom::Proposition(p) => p.validate_into(&mut e),
        NewJustificationBasisCompoundAtom::SourceExcerptParaphrase(s) => {
          s.validate_into(&mut e)
        }
      }
      errors.nest(&format!("atoms.{i}.entity"), e);
    }
  }
}

impl Validate for NewJustification {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    let (justifications, base) = collect_justifications(self);
    let mut prefix = String::new();
    for justification in &justifications {
      if justification.is_counter() && justification.polarity != Polarity::Negative {
        errors.add(format!("{prefix}polarity"), "counter-justifications must be NEGATIVE");
      }
      let mut e = ValidationErrors::new();
      justification.basis.validate_into(&mut e);
      errors.nest(&format!("{prefix}basis.entity"), e);
      prefix.push_str("target.entity.");
    }
    if let TargetBase::Root(root) = base {
      let mut e = ValidationErrors::new();
      match root {
        NewJustificationTarget::Proposition(p) => p.validate_into(&mut e),
        NewJustificationTarget::Statement(s) => s.validate_into(&mut e),
        NewJustificationTarget::Justification(_) => {}
      }
      errors.nest(prefix.trim_end_matches('.'), e);
    }
  }
}

impl NewJustification {
  pub fn is_counter(&self) -> bool {
    matches!(self.target, NewJustificationTarget::Justification(_))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn socrates() -> NewJustification {
    NewJustification {
      target:   NewJustificationTarget::Proposition(NewProposition::new("Socrates is mortal.").into()),
      basis:    NewJustificationBasis::PropositionCompound(
        NewPropositionCompound::of_texts(["Socrates is a man", "All men are mortal"]).into(),
      ),
      polarity: Polarity::Positive,
    }
  }

  #[test]
  fn negation_is_an_involution() {
    assert_eq!(Polarity::Positive.negate(), Polarity::Negative);
    assert_eq!(Polarity::Positive.negate().negate(), Polarity::Positive);
  }

  #[test]
  fn empty_target_text_is_reported_under_target_entity() {
    let mut j = socrates();
    j.target = NewJustificationTarget::Proposition(NewProposition::new("").into());
    let errors = j.validate().unwrap_err();
    assert!(errors.get("target.entity.text").is_some(), "{errors}");
  }

  #[test]
  fn positive_counter_is_rejected() {
    let mut counter = NewJustification::counter(
      Proposed::<NewJustification>::existing(Uuid::new_v4()),
      NewJustificationBasis::PropositionCompound(NewPropositionCompound::of_texts(["x"]).into()),
    );
    counter.polarity = Polarity::Positive;
    let errors = counter.validate().unwrap_err();
    assert!(errors.get("polarity").is_some());
  }

  #[test]
  fn empty_compound_is_rejected() {
    let mut j = socrates();
    j.basis = NewJustificationBasis::PropositionCompound(NewPropositionCompound { atoms: vec![] }.into());
    let errors = j.validate().unwrap_err();
    assert!(errors.get("basis.entity.atoms").is_some());
  }

  #[test]
  fn collects_nested_counters_outermost_first() {
    let base = socrates();
    let counter = NewJustification::counter(
      base,
      NewJustificationBasis::PropositionCompound(NewPropositionCompound::of_texts(["a"]).into()),
    );
    let counter_counter = NewJustification::counter(
      counter,
      NewJustificationBasis::PropositionCompound(NewPropositionCompound::of_texts(["b"]).into()),
    );
    let (justifications, base) = collect_justifications(&counter_counter);
    assert_eq!(justifications.len(), 3);
    assert!(!justifications[2].is_counter());
    assert!(matches!(base, TargetBase::Root(NewJustificationTarget::Proposition(_))));
  }

  #[test]
  fn discriminants_parse_and_reject_unknowns() {
    assert_eq!(
      "JUSTIFICATION_BASIS_COMPOUND".parse::<JustificationBasisType>().unwrap(),
      JustificationBasisType::JustificationBasisCompound
    );
    assert!("PIC_REGION".parse::<JustificationBasisType>().is_err());
    assert!("JUSTIFICATION".parse::<JustificationRootTargetType>().is_err());
  }

  #[test]
  fn deserializes_tagged_json() {
    let json = serde_json::json!({
      "target": { "type": "proposition", "entity": { "text": "Socrates is mortal." } },
      "basis": {
        "type": "proposition_compound",
        "entity": { "atoms": [ { "entity": { "text": "Socrates is a man" } } ] }
      },
      "polarity": "POSITIVE"
    });
    let j: NewJustification = serde_json::from_value(json).unwrap();
    assert!(j.validate().is_ok());
  }
}
