//! The `ArgumentStore` trait.
//!
//! The trait is implemented by storage backends (e.g. `warrant-store-sqlite`).
//! It exposes per-entity primitives only: reading by id, and an atomic
//! read-or-create for each entity whose references are already resolved to
//! ids. Orchestration across entities (chains, counters, media excerpts with
//! their locators) lives in [`crate::resolve::Resolver`].
//!
//! Every read excludes soft-deleted rows.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  entity::ReadOrCreate,
  justification::{
    DeletedJustification, Justification, JustificationBasisCompound,
    JustificationBasisCompoundAtom, JustificationKey, JustificationRootTarget,
    PropositionCompound,
  },
  media::{
    Citation, MediaExcerpt, MediaExcerptKey, NewSource, NewUrl, ResolvedUrlLocator, Source,
    Url, UrlLocator,
  },
  proposition::{NewPersorg, NewProposition, Persorg, Proposition},
  statement::{Statement, StatementKey},
  vote::{NewVote, Vote},
  writ::{NewWrit, SourceExcerptParaphrase, Writ, WritQuote, WritQuoteKey},
};

/// Who is creating, and when. Passed to every read-or-create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Creation {
  pub creator_user_id: Uuid,
  pub now:             DateTime<Utc>,
}

impl Creation {
  pub fn new(creator_user_id: Uuid, now: DateTime<Utc>) -> Self {
    Self { creator_user_id, now }
  }
}

/// Abstraction over a justification-graph store backend.
///
/// Each `read_or_create_*` method must perform its equivalence check and
/// insert atomically with respect to other calls on the same store.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait ArgumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads by id ───────────────────────────────────────────────────────

  fn read_proposition(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Proposition>, Self::Error>> + Send + '_;

  fn read_persorg(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Persorg>, Self::Error>> + Send + '_;

  fn read_statement(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Statement>, Self::Error>> + Send + '_;

  /// Read a justification. `current_vote` is always `None`.
  fn read_justification(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Justification>, Self::Error>> + Send + '_;

  fn read_writ(&self, id: Uuid)
  -> impl Future<Output = Result<Option<Writ>, Self::Error>> + Send + '_;

  fn read_writ_quote(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<WritQuote>, Self::Error>> + Send + '_;

  fn read_source(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Source>, Self::Error>> + Send + '_;

  fn read_url(&self, id: Uuid) -> impl Future<Output = Result<Option<Url>, Self::Error>> + Send + '_;

  fn read_proposition_compound(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<PropositionCompound>, Self::Error>> + Send + '_;

  fn read_justification_basis_compound(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<JustificationBasisCompound>, Self::Error>> + Send + '_;

  fn read_source_excerpt_paraphrase(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<SourceExcerptParaphrase>, Self::Error>> + Send + '_;

  /// Read a media excerpt with its locators, citations and speakers.
  fn read_media_excerpt(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<MediaExcerpt>, Self::Error>> + Send + '_;

  // ── Read-or-create ────────────────────────────────────────────────────

  /// Key: `normal_text`.
  fn read_or_create_proposition(
    &self,
    proposition: NewProposition,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Proposition>, Self::Error>> + Send + '_;

  /// Key: `normal_name`.
  fn read_or_create_persorg(
    &self,
    persorg: NewPersorg,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Persorg>, Self::Error>> + Send + '_;

  /// Key: `normal_description`.
  fn read_or_create_source(
    &self,
    source: NewSource,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Source>, Self::Error>> + Send + '_;

  /// Key: the literal `url`.
  fn read_or_create_url(
    &self,
    url: NewUrl,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Url>, Self::Error>> + Send + '_;

  /// Key: `normal_title`.
  fn read_or_create_writ(
    &self,
    writ: NewWrit,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Writ>, Self::Error>> + Send + '_;

  /// Key: `(writ_id, normal_quote_text)`. `url_ids` are linked to the quote
  /// whether it was found or created.
  fn read_or_create_writ_quote(
    &self,
    key: WritQuoteKey,
    url_ids: Vec<Uuid>,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<WritQuote>, Self::Error>> + Send + '_;

  /// Key: the ordered atom proposition ids.
  fn read_or_create_proposition_compound(
    &self,
    atom_proposition_ids: Vec<Uuid>,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<PropositionCompound>, Self::Error>> + Send + '_;

  /// Key: `(paraphrasing_proposition_id, writ_quote_id)`.
  fn read_or_create_source_excerpt_paraphrase(
    &self,
    paraphrasing_proposition_id: Uuid,
    writ_quote_id: Uuid,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<SourceExcerptParaphrase>, Self::Error>> + Send + '_;

  /// Key: the ordered atoms.
  fn read_or_create_justification_basis_compound(
    &self,
    atoms: Vec<JustificationBasisCompoundAtom>,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<JustificationBasisCompound>, Self::Error>> + Send + '_;

  /// Key: `(speaker_persorg_id, sentence_type, sentence_id)`.
  fn read_or_create_statement(
    &self,
    key: StatementKey,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Statement>, Self::Error>> + Send + '_;

  /// Find an excerpt with the key's normal quotation that also has a
  /// locator URL equivalent to one of `key.urls` (when non-empty) and a
  /// citation of one of `key.source_ids` (when non-empty); otherwise create
  /// a bare excerpt. Returns the excerpt id.
  fn read_or_create_media_excerpt(
    &self,
    key: MediaExcerptKey,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Uuid>, Self::Error>> + Send + '_;

  /// Key: an equivalent URL and an equivalent anchor set within the excerpt.
  fn read_or_create_url_locator(
    &self,
    media_excerpt_id: Uuid,
    locator: ResolvedUrlLocator,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<UrlLocator>, Self::Error>> + Send + '_;

  /// Key: `(media_excerpt_id, source_id, normal_pincite)`.
  fn read_or_create_citation(
    &self,
    media_excerpt_id: Uuid,
    source: Source,
    pincite: Option<String>,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Citation>, Self::Error>> + Send + '_;

  /// Attribute the excerpt to a speaker. Linking twice is a no-op.
  fn link_media_excerpt_speaker(
    &self,
    media_excerpt_id: Uuid,
    persorg_id: Uuid,
    creation: Creation,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Key: `(target_type, target_id, basis_type, basis_id, polarity)`.
  fn read_or_create_justification(
    &self,
    key: JustificationKey,
    creation: Creation,
  ) -> impl Future<Output = Result<ReadOrCreate<Justification>, Self::Error>> + Send + '_;

  // ── Graph reads ───────────────────────────────────────────────────────

  /// Every justification whose root target is `root`, including counters at
  /// any depth. When `user_id` is given, `current_vote` carries that user's
  /// vote on each row.
  fn read_justifications_for_root_target(
    &self,
    root: JustificationRootTarget,
    user_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<Justification>, Self::Error>> + Send + '_;

  /// Excerpts with a locator whose URL (or canonical URL) path-matches `url`.
  fn read_media_excerpts_matching_url(
    &self,
    url: String,
  ) -> impl Future<Output = Result<Vec<MediaExcerpt>, Self::Error>> + Send + '_;

  /// Excerpts with a locator whose URL host is `domain` or a subdomain.
  fn read_media_excerpts_matching_domain(
    &self,
    domain: String,
  ) -> impl Future<Output = Result<Vec<MediaExcerpt>, Self::Error>> + Send + '_;

  // ── Search ────────────────────────────────────────────────────────────

  fn search_propositions(
    &self,
    text: String,
  ) -> impl Future<Output = Result<Vec<Proposition>, Self::Error>> + Send + '_;

  fn search_media_excerpts(
    &self,
    text: String,
  ) -> impl Future<Output = Result<Vec<MediaExcerpt>, Self::Error>> + Send + '_;

  fn search_sources(
    &self,
    text: String,
  ) -> impl Future<Output = Result<Vec<Source>, Self::Error>> + Send + '_;

  fn search_persorgs(
    &self,
    text: String,
  ) -> impl Future<Output = Result<Vec<Persorg>, Self::Error>> + Send + '_;

  fn search_writs(
    &self,
    text: String,
  ) -> impl Future<Output = Result<Vec<Writ>, Self::Error>> + Send + '_;

  fn search_writ_quotes(
    &self,
    text: String,
  ) -> impl Future<Output = Result<Vec<WritQuote>, Self::Error>> + Send + '_;

  /// Writ quotes with a URL containing `text` literally, oldest quote first.
  fn read_writ_quotes_having_url_containing(
    &self,
    text: String,
  ) -> impl Future<Output = Result<Vec<WritQuote>, Self::Error>> + Send + '_;

  // ── Votes ─────────────────────────────────────────────────────────────

  /// Soft-delete the user's opposing vote on the target, then read or
  /// create the equivalent vote.
  fn record_vote(
    &self,
    user_id: Uuid,
    vote: NewVote,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<ReadOrCreate<Vote>, Self::Error>> + Send + '_;

  /// Soft-delete the user's equivalent votes. Returns their ids.
  fn delete_vote(
    &self,
    user_id: Uuid,
    vote: NewVote,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + '_;

  // ── Deletion ──────────────────────────────────────────────────────────

  /// Soft-delete a proposition. Returns `false` if it was not found.
  fn delete_proposition(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Soft-delete a justification and, transitively, every counter of it.
  /// Returns `None` if it was not found.
  fn delete_justification(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<DeletedJustification>, Self::Error>> + Send + '_;

  /// Soft-delete a media excerpt with its locators and citations.
  fn delete_media_excerpt(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}
