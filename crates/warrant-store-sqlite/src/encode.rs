//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings and UUIDs as hyphenated
//! lowercase strings. Discriminants are stored in SCREAMING_SNAKE_CASE.
//! Anchor lists are stored as compact, sorted JSON.
//!
//! Each `Raw*` type holds the undecoded strings of one row. Rows are read
//! inside `conn.call` closures, where only rusqlite errors can be raised, and
//! decoded afterwards.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::Row;
use uuid::Uuid;
use warrant_core::{
  justification::{
    Justification, JustificationBasis, JustificationBasisCompound,
    JustificationBasisCompoundAtom, JustificationBasisType, JustificationRootTarget,
    JustificationRootTargetType, JustificationTarget, JustificationTargetType, Polarity,
    PropositionCompound,
  },
  media::{
    Citation, DomAnchor, LocalRep, MediaExcerpt, MediaExcerptLocators, Source, Url, UrlLocator,
  },
  proposition::{Persorg, Proposition},
  statement::{SentenceRef, SentenceType, Statement},
  vote::{Vote, VotePolarity, VoteTargetType},
  writ::{SourceExcerptParaphrase, Writ, WritQuote},
};

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Decode a discriminant column into its enum.
pub fn decode_discriminant<T: FromStr>(kind: &'static str, s: &str) -> Result<T> {
  s.parse()
    .map_err(|_| Error::UnknownDiscriminant { kind, value: s.to_owned() })
}

// ─── Anchors ─────────────────────────────────────────────────────────────────

/// Sorted, so equal anchor sets always encode identically.
pub fn encode_anchors(anchors: &[DomAnchor]) -> Result<String> {
  let mut sorted: Vec<&DomAnchor> = anchors.iter().collect();
  sorted.sort();
  Ok(serde_json::to_string(&sorted)?)
}

pub fn decode_anchors(s: &str) -> serde_json::Result<Vec<DomAnchor>> { serde_json::from_str(s) }

// ─── Compound keys ───────────────────────────────────────────────────────────

pub fn encode_basis_atom(atom: &JustificationBasisCompoundAtom) -> (&'static str, String) {
  match atom {
    JustificationBasisCompoundAtom::Proposition(id) => ("PROPOSITION", encode_uuid(*id)),
    JustificationBasisCompoundAtom::SourceExcerptParaphrase(id) => {
      ("SOURCE_EXCERPT_PARAPHRASE", encode_uuid(*id))
    }
  }
}

pub fn decode_basis_atom(entity_type: &str, entity_id: &str) -> Result<JustificationBasisCompoundAtom> {
  let id = decode_uuid(entity_id)?;
  match entity_type {
    "PROPOSITION" => Ok(JustificationBasisCompoundAtom::Proposition(id)),
    "SOURCE_EXCERPT_PARAPHRASE" => Ok(JustificationBasisCompoundAtom::SourceExcerptParaphrase(id)),
    other => Err(Error::UnknownDiscriminant {
      kind:  "justification basis compound atom",
      value: other.to_owned(),
    }),
  }
}

/// The ordered atom list as a single comparable column value.
pub fn atoms_key<I, S>(atoms: I) -> String
where
  I: IntoIterator<Item = S>,
  S: AsRef<str>,
{
  atoms
    .into_iter()
    .map(|a| a.as_ref().to_owned())
    .collect::<Vec<_>>()
    .join(",")
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `propositions` row (alias `p`).
pub struct RawProposition {
  pub proposition_id:  String,
  pub text:            String,
  pub normal_text:     String,
  pub created_at:      String,
  pub creator_user_id: String,
}

impl RawProposition {
  pub const COLUMNS: &str = "p.proposition_id, p.text, p.normal_text, p.created_at, p.creator_user_id";

  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      proposition_id:  row.get(at)?,
      text:            row.get(at + 1)?,
      normal_text:     row.get(at + 2)?,
      created_at:      row.get(at + 3)?,
      creator_user_id: row.get(at + 4)?,
    })
  }

  pub fn into_proposition(self) -> Result<Proposition> {
    Ok(Proposition {
      proposition_id:  decode_uuid(&self.proposition_id)?,
      text:            self.text,
      normal_text:     self.normal_text,
      created_at:      decode_dt(&self.created_at)?,
      creator_user_id: decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `persorgs` row (alias `po`).
pub struct RawPersorg {
  pub persorg_id:      String,
  pub name:            String,
  pub normal_name:     String,
  pub is_organization: bool,
  pub known_for:       Option<String>,
  pub website_url:     Option<String>,
  pub created_at:      String,
  pub creator_user_id: String,
}

impl RawPersorg {
  pub const COLUMNS: &str = "po.persorg_id, po.name, po.normal_name, po.is_organization, \
                             po.known_for, po.website_url, po.created_at, po.creator_user_id";

  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      persorg_id:      row.get(at)?,
      name:            row.get(at + 1)?,
      normal_name:     row.get(at + 2)?,
      is_organization: row.get(at + 3)?,
      known_for:       row.get(at + 4)?,
      website_url:     row.get(at + 5)?,
      created_at:      row.get(at + 6)?,
      creator_user_id: row.get(at + 7)?,
    })
  }

  pub fn into_persorg(self) -> Result<Persorg> {
    Ok(Persorg {
      persorg_id:      decode_uuid(&self.persorg_id)?,
      name:            self.name,
      normal_name:     self.normal_name,
      is_organization: self.is_organization,
      known_for:       self.known_for,
      website_url:     self.website_url,
      created_at:      decode_dt(&self.created_at)?,
      creator_user_id: decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `statements` row (alias `s`).
pub struct RawStatement {
  pub statement_id:        String,
  pub sentence_type:       String,
  pub sentence_id:         String,
  pub speaker_persorg_id:  String,
  pub root_proposition_id: String,
  pub created_at:          String,
  pub creator_user_id:     String,
}

impl RawStatement {
  pub const COLUMNS: &str = "s.statement_id, s.sentence_type, s.sentence_id, \
                             s.speaker_persorg_id, s.root_proposition_id, s.created_at, \
                             s.creator_user_id";

  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      statement_id:        row.get(at)?,
      sentence_type:       row.get(at + 1)?,
      sentence_id:         row.get(at + 2)?,
      speaker_persorg_id:  row.get(at + 3)?,
      root_proposition_id: row.get(at + 4)?,
      created_at:          row.get(at + 5)?,
      creator_user_id:     row.get(at + 6)?,
    })
  }

  pub fn into_statement(self) -> Result<Statement> {
    let sentence_type: SentenceType = decode_discriminant("sentence_type", &self.sentence_type)?;
    Ok(Statement {
      statement_id:        decode_uuid(&self.statement_id)?,
      sentence:            SentenceRef::from_parts(sentence_type, decode_uuid(&self.sentence_id)?),
      speaker_persorg_id:  decode_uuid(&self.speaker_persorg_id)?,
      root_proposition_id: decode_uuid(&self.root_proposition_id)?,
      created_at:          decode_dt(&self.created_at)?,
      creator_user_id:     decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `writs` row (alias `w`).
pub struct RawWrit {
  pub writ_id:         String,
  pub title:           String,
  pub normal_title:    String,
  pub created_at:      String,
  pub creator_user_id: String,
}

impl RawWrit {
  pub const COLUMNS: &str = "w.writ_id, w.title, w.normal_title, w.created_at, w.creator_user_id";

  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      writ_id:         row.get(at)?,
      title:           row.get(at + 1)?,
      normal_title:    row.get(at + 2)?,
      created_at:      row.get(at + 3)?,
      creator_user_id: row.get(at + 4)?,
    })
  }

  pub fn into_writ(self) -> Result<Writ> {
    Ok(Writ {
      writ_id:         decode_uuid(&self.writ_id)?,
      title:           self.title,
      normal_title:    self.normal_title,
      created_at:      decode_dt(&self.created_at)?,
      creator_user_id: decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `urls` row (alias `u`).
pub struct RawUrl {
  pub url_id:          String,
  pub url:             String,
  pub canonical_url:   Option<String>,
  pub created_at:      String,
  pub creator_user_id: String,
}

impl RawUrl {
  pub const COLUMNS: &str = "u.url_id, u.url, u.canonical_url, u.created_at, u.creator_user_id";
  pub const WIDTH: usize = 5;

  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      url_id:          row.get(at)?,
      url:             row.get(at + 1)?,
      canonical_url:   row.get(at + 2)?,
      created_at:      row.get(at + 3)?,
      creator_user_id: row.get(at + 4)?,
    })
  }

  pub fn into_url(self) -> Result<Url> {
    Ok(Url {
      url_id:          decode_uuid(&self.url_id)?,
      url:             self.url,
      canonical_url:   self.canonical_url,
      created_at:      decode_dt(&self.created_at)?,
      creator_user_id: decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `writ_quotes` row (alias `wq`) with its writ and linked URLs.
pub struct RawWritQuote {
  pub writ_quote_id:     String,
  pub quote_text:        String,
  pub normal_quote_text: String,
  pub created_at:        String,
  pub creator_user_id:   String,
  pub writ:              RawWrit,
  pub urls:              Vec<RawUrl>,
}

impl RawWritQuote {
  /// Quote columns followed by [`RawWrit::COLUMNS`].
  pub const COLUMNS: &str = "wq.writ_quote_id, wq.quote_text, wq.normal_quote_text, \
                             wq.created_at, wq.creator_user_id, \
                             w.writ_id, w.title, w.normal_title, w.created_at, w.creator_user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      writ_quote_id:     row.get(0)?,
      quote_text:        row.get(1)?,
      normal_quote_text: row.get(2)?,
      created_at:        row.get(3)?,
      creator_user_id:   row.get(4)?,
      writ:              RawWrit::from_row(row, 5)?,
      urls:              Vec::new(),
    })
  }

  pub fn into_writ_quote(self) -> Result<WritQuote> {
    Ok(WritQuote {
      writ_quote_id:     decode_uuid(&self.writ_quote_id)?,
      quote_text:        self.quote_text,
      normal_quote_text: self.normal_quote_text,
      writ:              self.writ.into_writ()?,
      urls:              self.urls.into_iter().map(RawUrl::into_url).collect::<Result<_>>()?,
      created_at:        decode_dt(&self.created_at)?,
      creator_user_id:   decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `source_excerpt_paraphrases` row (alias `sep`).
pub struct RawSourceExcerptParaphrase {
  pub source_excerpt_paraphrase_id: String,
  pub paraphrasing_proposition_id:  String,
  pub writ_quote_id:                String,
  pub created_at:                   String,
  pub creator_user_id:              String,
}

impl RawSourceExcerptParaphrase {
  pub const COLUMNS: &str = "sep.source_excerpt_paraphrase_id, sep.paraphrasing_proposition_id, \
                             sep.writ_quote_id, sep.created_at, sep.creator_user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      source_excerpt_paraphrase_id: row.get(0)?,
      paraphrasing_proposition_id:  row.get(1)?,
      writ_quote_id:                row.get(2)?,
      created_at:                   row.get(3)?,
      creator_user_id:              row.get(4)?,
    })
  }

  pub fn into_source_excerpt_paraphrase(self) -> Result<SourceExcerptParaphrase> {
    Ok(SourceExcerptParaphrase {
      source_excerpt_paraphrase_id: decode_uuid(&self.source_excerpt_paraphrase_id)?,
      paraphrasing_proposition_id:  decode_uuid(&self.paraphrasing_proposition_id)?,
      writ_quote_id:                decode_uuid(&self.writ_quote_id)?,
      created_at:                   decode_dt(&self.created_at)?,
      creator_user_id:              decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `sources` row (alias `so`).
pub struct RawSource {
  pub source_id:          String,
  pub description:        String,
  pub normal_description: String,
  pub created_at:         String,
  pub creator_user_id:    String,
}

impl RawSource {
  pub const COLUMNS: &str = "so.source_id, so.description, so.normal_description, \
                             so.created_at, so.creator_user_id";

  pub fn from_row(row: &Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      source_id:          row.get(at)?,
      description:        row.get(at + 1)?,
      normal_description: row.get(at + 2)?,
      created_at:         row.get(at + 3)?,
      creator_user_id:    row.get(at + 4)?,
    })
  }

  pub fn into_source(self) -> Result<Source> {
    Ok(Source {
      source_id:          decode_uuid(&self.source_id)?,
      description:        self.description,
      normal_description: self.normal_description,
      created_at:         decode_dt(&self.created_at)?,
      creator_user_id:    decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `proposition_compounds` row (alias `pc`) with its ordered atoms.
pub struct RawPropositionCompound {
  pub proposition_compound_id: String,
  pub created_at:              String,
  pub creator_user_id:         String,
  pub atoms:                   Vec<String>,
}

impl RawPropositionCompound {
  pub const COLUMNS: &str = "pc.proposition_compound_id, pc.created_at, pc.creator_user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      proposition_compound_id: row.get(0)?,
      created_at:              row.get(1)?,
      creator_user_id:         row.get(2)?,
      atoms:                   Vec::new(),
    })
  }

  pub fn into_proposition_compound(self) -> Result<PropositionCompound> {
    Ok(PropositionCompound {
      proposition_compound_id: decode_uuid(&self.proposition_compound_id)?,
      atoms:                   self
        .atoms
        .iter()
        .map(|a| decode_uuid(a))
        .collect::<Result<_>>()?,
      created_at:              decode_dt(&self.created_at)?,
      creator_user_id:         decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `justification_basis_compounds` row (alias `jbc`) with its ordered
/// `(entity_type, entity_id)` atoms.
pub struct RawJustificationBasisCompound {
  pub justification_basis_compound_id: String,
  pub created_at:                      String,
  pub creator_user_id:                 String,
  pub atoms:                           Vec<(String, String)>,
}

impl RawJustificationBasisCompound {
  pub const COLUMNS: &str =
    "jbc.justification_basis_compound_id, jbc.created_at, jbc.creator_user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      justification_basis_compound_id: row.get(0)?,
      created_at:                      row.get(1)?,
      creator_user_id:                 row.get(2)?,
      atoms:                           Vec::new(),
    })
  }

  pub fn into_justification_basis_compound(self) -> Result<JustificationBasisCompound> {
    Ok(JustificationBasisCompound {
      justification_basis_compound_id: decode_uuid(&self.justification_basis_compound_id)?,
      atoms:                           self
        .atoms
        .iter()
        .map(|(t, id)| decode_basis_atom(t, id))
        .collect::<Result<_>>()?,
      created_at:                      decode_dt(&self.created_at)?,
      creator_user_id:                 decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `justifications` row (alias `j`) plus the requesting user's vote
/// polarity, if any.
pub struct RawJustification {
  pub justification_id: String,
  pub target_type:      String,
  pub target_id:        String,
  pub basis_type:       String,
  pub basis_id:         String,
  pub polarity:         String,
  pub root_target_type: String,
  pub root_target_id:   String,
  pub root_polarity:    String,
  pub score:            i64,
  pub created_at:       String,
  pub creator_user_id:  String,
  pub current_vote:     Option<String>,
}

impl RawJustification {
  /// Row columns; callers append one more column for the vote polarity
  /// (`NULL` when reading without a user).
  pub const COLUMNS: &str = "j.justification_id, j.target_type, j.target_id, j.basis_type, \
                             j.basis_id, j.polarity, j.root_target_type, j.root_target_id, \
                             j.root_polarity, j.score, j.created_at, j.creator_user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      justification_id: row.get(0)?,
      target_type:      row.get(1)?,
      target_id:        row.get(2)?,
      basis_type:       row.get(3)?,
      basis_id:         row.get(4)?,
      polarity:         row.get(5)?,
      root_target_type: row.get(6)?,
      root_target_id:   row.get(7)?,
      root_polarity:    row.get(8)?,
      score:            row.get(9)?,
      created_at:       row.get(10)?,
      creator_user_id:  row.get(11)?,
      current_vote:     row.get(12)?,
    })
  }

  pub fn into_justification(self) -> Result<Justification> {
    let target_type: JustificationTargetType =
      decode_discriminant("justification target_type", &self.target_type)?;
    let basis_type: JustificationBasisType =
      decode_discriminant("justification basis_type", &self.basis_type)?;
    let root_type: JustificationRootTargetType =
      decode_discriminant("justification root_target_type", &self.root_target_type)?;
    Ok(Justification {
      justification_id: decode_uuid(&self.justification_id)?,
      target:           JustificationTarget::from_parts(target_type, decode_uuid(&self.target_id)?),
      basis:            JustificationBasis::from_parts(basis_type, decode_uuid(&self.basis_id)?),
      polarity:         decode_discriminant::<Polarity>("polarity", &self.polarity)?,
      root_target:      JustificationRootTarget::from_parts(
        root_type,
        decode_uuid(&self.root_target_id)?,
      ),
      root_polarity:    decode_discriminant::<Polarity>("polarity", &self.root_polarity)?,
      score:            self.score,
      current_vote:     self
        .current_vote
        .as_deref()
        .map(|v| decode_discriminant::<VotePolarity>("vote polarity", v))
        .transpose()?,
      created_at:       decode_dt(&self.created_at)?,
      creator_user_id:  decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `url_locators` row (alias `l`) joined with its URL.
pub struct RawUrlLocator {
  pub url_locator_id:   String,
  pub media_excerpt_id: String,
  pub anchors:          String,
  pub created_at:       String,
  pub creator_user_id:  String,
  pub url:              RawUrl,
}

impl RawUrlLocator {
  /// Locator columns followed by [`RawUrl::COLUMNS`].
  pub const COLUMNS: &str = "l.url_locator_id, l.media_excerpt_id, l.anchors, l.created_at, \
                             l.creator_user_id, \
                             u.url_id, u.url, u.canonical_url, u.created_at, u.creator_user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      url_locator_id:   row.get(0)?,
      media_excerpt_id: row.get(1)?,
      anchors:          row.get(2)?,
      created_at:       row.get(3)?,
      creator_user_id:  row.get(4)?,
      url:              RawUrl::from_row(row, 5)?,
    })
  }

  pub fn into_url_locator(self) -> Result<UrlLocator> {
    Ok(UrlLocator {
      url_locator_id:   decode_uuid(&self.url_locator_id)?,
      media_excerpt_id: decode_uuid(&self.media_excerpt_id)?,
      url:              self.url.into_url()?,
      anchors:          decode_anchors(&self.anchors)?,
      created_at:       decode_dt(&self.created_at)?,
      creator_user_id:  decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `citations` row (alias `c`) joined with its source.
pub struct RawCitation {
  pub media_excerpt_id: String,
  pub pincite:          Option<String>,
  pub normal_pincite:   Option<String>,
  pub created_at:       String,
  pub creator_user_id:  String,
  pub source:           RawSource,
}

impl RawCitation {
  /// Citation columns followed by [`RawSource::COLUMNS`].
  pub const COLUMNS: &str = "c.media_excerpt_id, c.pincite, c.normal_pincite, c.created_at, \
                             c.creator_user_id, \
                             so.source_id, so.description, so.normal_description, \
                             so.created_at, so.creator_user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      media_excerpt_id: row.get(0)?,
      pincite:          row.get(1)?,
      normal_pincite:   row.get(2)?,
      created_at:       row.get(3)?,
      creator_user_id:  row.get(4)?,
      source:           RawSource::from_row(row, 5)?,
    })
  }

  pub fn into_citation(self) -> Result<Citation> {
    Ok(Citation {
      media_excerpt_id: decode_uuid(&self.media_excerpt_id)?,
      source:           self.source.into_source()?,
      pincite:          self.pincite,
      normal_pincite:   self.normal_pincite,
      created_at:       decode_dt(&self.created_at)?,
      creator_user_id:  decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `media_excerpts` row (alias `me`) with everything hanging off it.
pub struct RawMediaExcerpt {
  pub media_excerpt_id: String,
  pub quotation:        String,
  pub normal_quotation: String,
  pub created_at:       String,
  pub creator_user_id:  String,
  pub locators:         Vec<RawUrlLocator>,
  pub citations:        Vec<RawCitation>,
  pub speakers:         Vec<RawPersorg>,
}

impl RawMediaExcerpt {
  pub const COLUMNS: &str = "me.media_excerpt_id, me.quotation, me.normal_quotation, \
                             me.created_at, me.creator_user_id";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      media_excerpt_id: row.get(0)?,
      quotation:        row.get(1)?,
      normal_quotation: row.get(2)?,
      created_at:       row.get(3)?,
      creator_user_id:  row.get(4)?,
      locators:         Vec::new(),
      citations:        Vec::new(),
      speakers:         Vec::new(),
    })
  }

  pub fn into_media_excerpt(self) -> Result<MediaExcerpt> {
    Ok(MediaExcerpt {
      media_excerpt_id: decode_uuid(&self.media_excerpt_id)?,
      local_rep:        LocalRep {
        quotation:        self.quotation,
        normal_quotation: self.normal_quotation,
      },
      locators:         MediaExcerptLocators {
        url_locators: self
          .locators
          .into_iter()
          .map(RawUrlLocator::into_url_locator)
          .collect::<Result<_>>()?,
      },
      citations:        self
        .citations
        .into_iter()
        .map(RawCitation::into_citation)
        .collect::<Result<_>>()?,
      speakers:         self
        .speakers
        .into_iter()
        .map(RawPersorg::into_persorg)
        .collect::<Result<_>>()?,
      created_at:       decode_dt(&self.created_at)?,
      creator_user_id:  decode_uuid(&self.creator_user_id)?,
    })
  }
}

/// A `votes` row (alias `v`).
pub struct RawVote {
  pub vote_id:     String,
  pub user_id:     String,
  pub target_type: String,
  pub target_id:   String,
  pub polarity:    String,
  pub created_at:  String,
  pub deleted_at:  Option<String>,
}

impl RawVote {
  pub const COLUMNS: &str =
    "v.vote_id, v.user_id, v.target_type, v.target_id, v.polarity, v.created_at, v.deleted_at";

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      vote_id:     row.get(0)?,
      user_id:     row.get(1)?,
      target_type: row.get(2)?,
      target_id:   row.get(3)?,
      polarity:    row.get(4)?,
      created_at:  row.get(5)?,
      deleted_at:  row.get(6)?,
    })
  }

  pub fn into_vote(self) -> Result<Vote> {
    Ok(Vote {
      vote_id:     decode_uuid(&self.vote_id)?,
      user_id:     decode_uuid(&self.user_id)?,
      target_type: decode_discriminant::<VoteTargetType>("vote target_type", &self.target_type)?,
      target_id:   decode_uuid(&self.target_id)?,
      polarity:    decode_discriminant::<VotePolarity>("vote polarity", &self.polarity)?,
      created_at:  decode_dt(&self.created_at)?,
      deleted_at:  self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn anchor(exact: &str, start: i64) -> DomAnchor {
    DomAnchor {
      exact_text:   exact.into(),
      prefix_text:  String::new(),
      suffix_text:  String::new(),
      start_offset: start,
      end_offset:   start + 1,
    }
  }

  #[test]
  fn anchor_encoding_ignores_order() {
    let a = encode_anchors(&[anchor("a", 1), anchor("b", 2)]).unwrap();
    let b = encode_anchors(&[anchor("b", 2), anchor("a", 1)]).unwrap();
    assert_eq!(a, b);
    assert_eq!(decode_anchors(&a).unwrap().len(), 2);
  }

  #[test]
  fn unknown_discriminant_is_reported() {
    let err = decode_discriminant::<SentenceType>("sentence_type", "QUOTE").unwrap_err();
    assert!(matches!(
      err,
      Error::UnknownDiscriminant { kind: "sentence_type", ref value } if value == "QUOTE"
    ));
  }

  #[test]
  fn basis_atoms_round_trip_through_columns() {
    let id = Uuid::new_v4();
    let atom = JustificationBasisCompoundAtom::SourceExcerptParaphrase(id);
    let (t, s) = encode_basis_atom(&atom);
    assert_eq!(decode_basis_atom(t, &s).unwrap(), atom);
    assert!(decode_basis_atom("PIC_REGION", &s).is_err());
  }
}
