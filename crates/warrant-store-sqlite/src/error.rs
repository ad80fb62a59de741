//! Error type for `warrant-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] warrant_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A discriminant column held a value with no matching variant.
  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownDiscriminant { kind: &'static str, value: String },

  #[error("url parse error: {0}")]
  Url(#[from] url::ParseError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Core errors and corrupt discriminants keep their identity; everything else
/// is a backend failure.
impl From<Error> for warrant_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(core) => core,
      Error::UnknownDiscriminant { kind, value } => {
        warrant_core::Error::UnknownDiscriminant { kind, value }
      }
      other => warrant_core::Error::store(other),
    }
  }
}
