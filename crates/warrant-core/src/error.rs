//! Error types for `warrant-core`.
//!
//! Validation and not-found errors are user-facing and recoverable: the
//! caller fixes the input and retries. Consistency faults mean the stored
//! graph is corrupt or a discriminant has no matching variant; they are
//! never swallowed and surface as generic failures at the boundary.

use thiserror::Error;
use uuid::Uuid;

use crate::{entity::EntityType, validate::ValidationErrors};

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid {entity_type}: {errors}")]
  Validation {
    entity_type: EntityType,
    errors:      ValidationErrors,
  },

  #[error("{entity_type} not found: {id}")]
  NotFound { entity_type: EntityType, id: Uuid },

  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownDiscriminant { kind: &'static str, value: String },

  #[error("consistency fault: {0}")]
  Consistency(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }

  /// `true` for corrupt-state and missing-case errors, which must not be
  /// reported to users as something they can fix.
  pub fn is_fault(&self) -> bool {
    matches!(self, Self::UnknownDiscriminant { .. } | Self::Consistency(_))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
