//! Shared envelopes for proposed and resolved entities.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Every kind of entity the resolver can read or create.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
  Proposition,
  Persorg,
  Statement,
  Justification,
  PropositionCompound,
  JustificationBasisCompound,
  SourceExcerptParaphrase,
  Writ,
  WritQuote,
  MediaExcerpt,
  UrlLocator,
  Url,
  Source,
  Citation,
  Vote,
}

/// A reference to an entity that must already exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
  pub id: Uuid,
}

/// An entity as handed to the resolver: either a reference to a stored row
/// or the fields of a new one.
///
/// Deserialises untagged; any object carrying an `id` is a reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Proposed<T> {
  Existing(EntityRef),
  New(T),
}

impl<T> Proposed<T> {
  pub fn existing(id: Uuid) -> Self { Self::Existing(EntityRef { id }) }

  pub fn id(&self) -> Option<Uuid> {
    match self {
      Self::Existing(r) => Some(r.id),
      Self::New(_) => None,
    }
  }
}

impl<T> From<T> for Proposed<T> {
  fn from(value: T) -> Self { Self::New(value) }
}

/// The result of a read-or-create: the stored entity and whether it already
/// existed before the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadOrCreate<T> {
  pub entity:    T,
  pub is_extant: bool,
}

impl<T> ReadOrCreate<T> {
  pub fn extant(entity: T) -> Self { Self { entity, is_extant: true } }

  pub fn created(entity: T) -> Self { Self { entity, is_extant: false } }

  pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ReadOrCreate<U> {
    ReadOrCreate { entity: f(self.entity), is_extant: self.is_extant }
  }
}
