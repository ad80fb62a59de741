//! Votes. Soft-deleted, never hard-deleted; tallying happens elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

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
pub enum VoteTargetType {
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
pub enum VotePolarity {
  Positive,
  Negative,
}

impl VotePolarity {
  pub fn negate(self) -> Self {
    match self {
      Self::Positive => Self::Negative,
      Self::Negative => Self::Positive,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
  pub vote_id:     Uuid,
  pub user_id:     Uuid,
  pub target_type: VoteTargetType,
  pub target_id:   Uuid,
  pub polarity:    VotePolarity,
  pub created_at:  DateTime<Utc>,
  pub deleted_at:  Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NewVote {
  pub target_type: VoteTargetType,
  pub target_id:   Uuid,
  pub polarity:    VotePolarity,
}
