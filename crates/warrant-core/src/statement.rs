//! Statements: attributions of a sentence to a speaker.
//!
//! A statement's sentence is either a proposition or another statement, so
//! "Alice said that Bob said that P" is a chain of two statements ending in
//! the proposition P. Stored statements reference their sentence by id
//! ([`SentenceRef`]); the chain is never held as nested owned values.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  entity::Proposed,
  proposition::{NewPersorg, NewProposition, Persorg, Proposition},
  validate::{Validate, ValidationErrors},
};

// ─── Stored ──────────────────────────────────────────────────────────────────

/// The `sentence_type` discriminant.
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
pub enum SentenceType {
  Statement,
  Proposition,
}

/// What a statement says: a reference to the next link of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum SentenceRef {
  Proposition(Uuid),
  Statement(Uuid),
}

impl SentenceRef {
  pub fn from_parts(sentence_type: SentenceType, id: Uuid) -> Self {
    match sentence_type {
      SentenceType::Proposition => Self::Proposition(id),
      SentenceType::Statement => Self::Statement(id),
    }
  }

  pub fn sentence_type(&self) -> SentenceType {
    match self {
      Self::Proposition(_) => SentenceType::Proposition,
      Self::Statement(_) => SentenceType::Statement,
    }
  }

  pub fn id(&self) -> Uuid {
    match self {
      Self::Proposition(id) | Self::Statement(id) => *id,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
  pub statement_id:        Uuid,
  pub sentence:            SentenceRef,
  pub speaker_persorg_id:  Uuid,
  /// The proposition at the end of the chain, denormalised for O(1) lookup.
  pub root_proposition_id: Uuid,
  pub created_at:          DateTime<Utc>,
  pub creator_user_id:     Uuid,
}

/// The equivalence key of a statement, once its speaker and sentence are
/// resolved: `(speaker, sentence_type, sentence_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementKey {
  pub speaker_persorg_id:  Uuid,
  pub sentence:            SentenceRef,
  pub root_proposition_id: Uuid,
}

/// One statement of a chain together with its speaker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementLink {
  pub statement: Statement,
  pub speaker:   Persorg,
}

/// A fully-read sentence chain, flat: `links[0]` is the head statement,
/// each subsequent link is the sentence of the one before it, and the last
/// link's sentence is `proposition`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatementChain {
  pub links:       Vec<StatementLink>,
  pub proposition: Proposition,
}

impl StatementChain {
  /// The head statement.
  ///
  /// Chains always hold at least one link; an empty chain is never
  /// constructed by the resolver or the store.
  pub fn head(&self) -> &Statement { &self.links[0].statement }

  pub fn depth(&self) -> usize { self.links.len() }
}

// ─── Proposed ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStatement {
  pub speaker:  Proposed<NewPersorg>,
  pub sentence: NewSentence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "entity", rename_all = "snake_case")]
pub enum NewSentence {
  Proposition(Proposed<NewProposition>),
  Statement(Box<Proposed<NewStatement>>),
}

impl NewStatement {
  pub fn new(speaker: impl Into<Proposed<NewPersorg>>, sentence: NewSentence) -> Self {
    Self { speaker: speaker.into(), sentence }
  }

  /// `speaker` says that `proposition`.
  pub fn of_proposition(
    speaker: impl Into<Proposed<NewPersorg>>,
    proposition: impl Into<Proposed<NewProposition>>,
  ) -> Self {
    Self::new(speaker, NewSentence::Proposition(proposition.into()))
  }

  /// `speaker` says that `statement`.
  pub fn of_statement(
    speaker: impl Into<Proposed<NewPersorg>>,
    statement: impl Into<Proposed<NewStatement>>,
  ) -> Self {
    Self::new(speaker, NewSentence::Statement(Box::new(statement.into())))
  }
}

/// Where a proposed chain bottoms out.
#[derive(Debug, Clone, Copy)]
pub enum ChainBase<'a> {
  /// The chain ends in a proposition, new or referenced.
  Proposition(&'a Proposed<NewProposition>),
  /// The chain continues into an already-stored statement.
  Statement(Uuid),
}

/// Flatten a proposed chain into its new statements, head first, plus the
/// base it rests on.
pub fn collect_sentences(head: &NewStatement) -> (Vec<&NewStatement>, ChainBase<'_>) {
  let mut statements = vec![head];
  let mut current = head;
  loop {
    match &current.sentence {
      NewSentence::Proposition(proposition) => {
        return (statements, ChainBase::Proposition(proposition));
      }
      NewSentence::Statement(inner) => match inner.as_ref() {
        Proposed::Existing(r) => return (statements, ChainBase::Statement(r.id)),
        Proposed::New(statement) => {
          statements.push(statement);
          current = statement;
        }
      },
    }
  }
}

impl Validate for NewStatement {
  fn validate_into(&self, errors: &mut ValidationErrors) {
    let (statements, base) = collect_sentences(self);
    let mut prefix = String::new();
    for statement in &statements {
      let mut speaker_errors = ValidationErrors::new();
      statement.speaker.validate_into(&mut speaker_errors);
      errors.nest(&format!("{prefix}speaker"), speaker_errors);
      prefix.push_str("sentence.entity.");
    }
    if let ChainBase::Proposition(proposition) = base {
      let mut e = ValidationErrors::new();
      proposition.validate_into(&mut e);
      errors.nest(prefix.trim_end_matches('.'), e);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn chain(depth: usize) -> NewStatement {
    let mut statement = NewStatement::of_proposition(
      NewPersorg::person("Speaker 0"),
      NewProposition::new("The sky is blue"),
    );
    for i in 1..depth {
      statement = NewStatement::of_statement(NewPersorg::person(format!("Speaker {i}")), statement);
    }
    statement
  }

  #[test]
  fn collects_head_first() {
    let head = chain(3);
    let (statements, base) = collect_sentences(&head);
    assert_eq!(statements.len(), 3);
    assert!(matches!(&statements[0].speaker, Proposed::New(p) if p.name == "Speaker 2"));
    assert!(matches!(&statements[2].speaker, Proposed::New(p) if p.name == "Speaker 0"));
    assert!(matches!(base, ChainBase::Proposition(Proposed::New(p)) if p.text == "The sky is blue"));
  }

  #[test]
  fn stops_at_existing_statement() {
    let id = Uuid::new_v4();
    let head = NewStatement::of_statement(
      NewPersorg::person("Alice"),
      Proposed::<NewStatement>::existing(id),
    );
    let (statements, base) = collect_sentences(&head);
    assert_eq!(statements.len(), 1);
    assert!(matches!(base, ChainBase::Statement(found) if found == id));
  }

  #[test]
  fn validation_paths_follow_the_chain() {
    let head = NewStatement::of_statement(
      NewPersorg::person("Alice"),
      NewStatement::of_proposition(NewPersorg::person(""), NewProposition::new("")),
    );
    let errors = head.validate().unwrap_err();
    assert!(errors.get("sentence.entity.speaker.name").is_some());
    assert!(errors.get("sentence.entity.sentence.entity.text").is_some());
  }

  #[test]
  fn sentence_type_round_trips_through_strings() {
    assert_eq!(SentenceType::Statement.to_string(), "STATEMENT");
    assert_eq!("PROPOSITION".parse::<SentenceType>().unwrap(), SentenceType::Proposition);
    assert!("QUOTE".parse::<SentenceType>().is_err());
  }

  #[test]
  fn deserializes_nested_chain() {
    let json = serde_json::json!({
      "speaker": { "name": "Alice" },
      "sentence": {
        "type": "statement",
        "entity": {
          "speaker": { "id": "00000000-0000-0000-0000-000000000002" },
          "sentence": { "type": "proposition", "entity": { "text": "P" } }
        }
      }
    });
    let statement: NewStatement = serde_json::from_value(json).unwrap();
    let (statements, _) = collect_sentences(&statement);
    assert_eq!(statements.len(), 2);
    assert!(matches!(statements[1].speaker, Proposed::Existing(_)));
  }
}
