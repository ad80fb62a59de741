//! Synchronous row readers, run inside `conn.call` closures.
//!
//! Every reader goes through [`Select::extant`], so a soft-deleted row reads
//! as absent. Ids are passed already encoded.

use rusqlite::{Connection, ErrorCode, OptionalExtension as _, ToSql, types::FromSql};
use warrant_core::ReadOrCreate;

use crate::{
  encode::{
    RawCitation, RawJustification, RawJustificationBasisCompound, RawMediaExcerpt, RawPersorg,
    RawProposition, RawPropositionCompound, RawSource, RawSourceExcerptParaphrase,
    RawStatement, RawUrl, RawUrlLocator, RawVote, RawWrit, RawWritQuote,
  },
  query::Select,
};

/// Turn a missing row that must exist into an error.
pub fn required<T>(row: Option<T>) -> rusqlite::Result<T> {
  row.ok_or(rusqlite::Error::QueryReturnedNoRows)
}

/// Read the key of an equivalent row, or insert one.
///
/// `select` must produce a single key column. Equivalents are read oldest
/// first; if there is more than one the oldest wins. An insert that trips a
/// unique index means another writer got there first, so the winner is
/// re-read and reported as extant.
pub fn read_or_insert<K, I>(
  conn: &Connection,
  entity: &'static str,
  select: &Select,
  params: &[&dyn ToSql],
  insert: I,
) -> rusqlite::Result<ReadOrCreate<K>>
where
  K: FromSql,
  I: FnOnce(&Connection) -> rusqlite::Result<K>,
{
  let sql = select.sql();
  let read = |conn: &Connection| -> rusqlite::Result<Vec<K>> {
    let mut stmt = conn.prepare_cached(&sql)?;
    let keys = stmt
      .query_map(params, |row| row.get(0))?
      .collect::<rusqlite::Result<Vec<K>>>()?;
    Ok(keys)
  };

  let mut existing = read(conn)?;
  if existing.len() > 1 {
    tracing::warn!(entity, count = existing.len(), "multiple equivalent rows; using the oldest");
  }
  if !existing.is_empty() {
    return Ok(ReadOrCreate::extant(existing.swap_remove(0)));
  }

  match insert(conn) {
    Ok(key) => Ok(ReadOrCreate::created(key)),
    Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
      tracing::debug!(entity, "equivalent row inserted concurrently; re-reading");
      let mut winners = read(conn)?;
      if winners.is_empty() {
        return Err(rusqlite::Error::SqliteFailure(e, None));
      }
      Ok(ReadOrCreate::extant(winners.swap_remove(0)))
    }
    Err(e) => Err(e),
  }
}

/// Replace a read-or-create key with the row it names.
pub fn reread<K, T, F>(key: ReadOrCreate<K>, fetch: F) -> rusqlite::Result<ReadOrCreate<T>>
where
  F: FnOnce(&K) -> rusqlite::Result<Option<T>>,
{
  let ReadOrCreate { entity, is_extant } = key;
  Ok(ReadOrCreate { entity: required(fetch(&entity)?)?, is_extant })
}

/// `?, ?, ?` for `n` positional parameters.
pub fn placeholders(n: usize) -> String { vec!["?"; n].join(", ") }

// ─── Single entities ─────────────────────────────────────────────────────────

pub fn proposition(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawProposition>> {
  let select =
    Select::extant("propositions", "p", RawProposition::COLUMNS).filter("p.proposition_id = ?1");
  conn
    .query_row(&select.sql(), [id], |row| RawProposition::from_row(row, 0))
    .optional()
}

pub fn persorg(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawPersorg>> {
  let select = Select::extant("persorgs", "po", RawPersorg::COLUMNS).filter("po.persorg_id = ?1");
  conn
    .query_row(&select.sql(), [id], |row| RawPersorg::from_row(row, 0))
    .optional()
}

pub fn statement(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawStatement>> {
  let select =
    Select::extant("statements", "s", RawStatement::COLUMNS).filter("s.statement_id = ?1");
  conn
    .query_row(&select.sql(), [id], |row| RawStatement::from_row(row, 0))
    .optional()
}

pub fn writ(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawWrit>> {
  let select = Select::extant("writs", "w", RawWrit::COLUMNS).filter("w.writ_id = ?1");
  conn
    .query_row(&select.sql(), [id], |row| RawWrit::from_row(row, 0))
    .optional()
}

pub fn url(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawUrl>> {
  let select = Select::extant("urls", "u", RawUrl::COLUMNS).filter("u.url_id = ?1");
  conn
    .query_row(&select.sql(), [id], |row| RawUrl::from_row(row, 0))
    .optional()
}

pub fn source(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawSource>> {
  let select = Select::extant("sources", "so", RawSource::COLUMNS).filter("so.source_id = ?1");
  conn
    .query_row(&select.sql(), [id], |row| RawSource::from_row(row, 0))
    .optional()
}

pub fn source_excerpt_paraphrase(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<Option<RawSourceExcerptParaphrase>> {
  let select =
    Select::extant("source_excerpt_paraphrases", "sep", RawSourceExcerptParaphrase::COLUMNS)
      .filter("sep.source_excerpt_paraphrase_id = ?1");
  conn
    .query_row(&select.sql(), [id], RawSourceExcerptParaphrase::from_row)
    .optional()
}

/// A justification without any user's vote.
pub fn justification(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawJustification>> {
  let select = Select::extant(
    "justifications",
    "j",
    &format!("{}, NULL", RawJustification::COLUMNS),
  )
  .filter("j.justification_id = ?1");
  conn
    .query_row(&select.sql(), [id], RawJustification::from_row)
    .optional()
}

pub fn writ_quote(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawWritQuote>> {
  let select = Select::extant("writ_quotes", "wq", RawWritQuote::COLUMNS)
    .join_extant("writs", "w", "w.writ_id = wq.writ_id")
    .filter("wq.writ_quote_id = ?1");
  let Some(mut quote) = conn
    .query_row(&select.sql(), [id], RawWritQuote::from_row)
    .optional()?
  else {
    return Ok(None);
  };

  let urls = Select::extant("urls", "u", RawUrl::COLUMNS)
    .join("JOIN writ_quote_urls wqu ON wqu.url_id = u.url_id")
    .filter("wqu.writ_quote_id = ?1")
    .order_by("wqu.created_at, u.url");
  quote.urls = query_all(conn, &urls, id, |row| RawUrl::from_row(row, 0))?;
  Ok(Some(quote))
}

pub fn proposition_compound(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<Option<RawPropositionCompound>> {
  let select = Select::extant("proposition_compounds", "pc", RawPropositionCompound::COLUMNS)
    .filter("pc.proposition_compound_id = ?1");
  let Some(mut compound) = conn
    .query_row(&select.sql(), [id], RawPropositionCompound::from_row)
    .optional()?
  else {
    return Ok(None);
  };

  let mut stmt = conn.prepare_cached(
    "SELECT proposition_id FROM proposition_compound_atoms
     WHERE proposition_compound_id = ?1 ORDER BY position",
  )?;
  compound.atoms = stmt
    .query_map([id], |row| row.get(0))?
    .collect::<rusqlite::Result<_>>()?;
  Ok(Some(compound))
}

pub fn justification_basis_compound(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<Option<RawJustificationBasisCompound>> {
  let select =
    Select::extant("justification_basis_compounds", "jbc", RawJustificationBasisCompound::COLUMNS)
      .filter("jbc.justification_basis_compound_id = ?1");
  let Some(mut compound) = conn
    .query_row(&select.sql(), [id], RawJustificationBasisCompound::from_row)
    .optional()?
  else {
    return Ok(None);
  };

  let mut stmt = conn.prepare_cached(
    "SELECT entity_type, entity_id FROM justification_basis_compound_atoms
     WHERE justification_basis_compound_id = ?1 ORDER BY position",
  )?;
  compound.atoms = stmt
    .query_map([id], |row| Ok((row.get(0)?, row.get(1)?)))?
    .collect::<rusqlite::Result<_>>()?;
  Ok(Some(compound))
}

pub fn url_locator(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawUrlLocator>> {
  let select = Select::extant("url_locators", "l", RawUrlLocator::COLUMNS)
    .join_extant("urls", "u", "u.url_id = l.url_id")
    .filter("l.url_locator_id = ?1");
  conn
    .query_row(&select.sql(), [id], RawUrlLocator::from_row)
    .optional()
}

/// A live vote.
pub fn vote(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawVote>> {
  let select = Select::extant("votes", "v", RawVote::COLUMNS).filter("v.vote_id = ?1");
  conn.query_row(&select.sql(), [id], RawVote::from_row).optional()
}

/// Citations have no id of their own; they are addressed by rowid.
pub fn citation(conn: &Connection, rowid: i64) -> rusqlite::Result<Option<RawCitation>> {
  let select = Select::extant("citations", "c", RawCitation::COLUMNS)
    .join_extant("sources", "so", "so.source_id = c.source_id")
    .filter("c.rowid = ?1");
  conn
    .query_row(&select.sql(), [rowid], RawCitation::from_row)
    .optional()
}

/// A media excerpt with its live locators, citations and speakers.
pub fn media_excerpt(conn: &Connection, id: &str) -> rusqlite::Result<Option<RawMediaExcerpt>> {
  let select = Select::extant("media_excerpts", "me", RawMediaExcerpt::COLUMNS)
    .filter("me.media_excerpt_id = ?1");
  let Some(mut excerpt) = conn
    .query_row(&select.sql(), [id], RawMediaExcerpt::from_row)
    .optional()?
  else {
    return Ok(None);
  };

  let locators = Select::extant("url_locators", "l", RawUrlLocator::COLUMNS)
    .join_extant("urls", "u", "u.url_id = l.url_id")
    .filter("l.media_excerpt_id = ?1")
    .order_by("l.created_at, l.url_locator_id");
  excerpt.locators = query_all(conn, &locators, id, RawUrlLocator::from_row)?;

  let citations = Select::extant("citations", "c", RawCitation::COLUMNS)
    .join_extant("sources", "so", "so.source_id = c.source_id")
    .filter("c.media_excerpt_id = ?1")
    .order_by("c.created_at, c.rowid");
  excerpt.citations = query_all(conn, &citations, id, RawCitation::from_row)?;

  let speakers = Select::extant("media_excerpt_speakers", "mes", RawPersorg::COLUMNS)
    .join_extant("persorgs", "po", "po.persorg_id = mes.persorg_id")
    .filter("mes.media_excerpt_id = ?1")
    .order_by("mes.created_at, po.normal_name");
  excerpt.speakers = query_all(conn, &speakers, id, |row| RawPersorg::from_row(row, 0))?;

  Ok(Some(excerpt))
}

fn query_all<T, F>(conn: &Connection, select: &Select, id: &str, f: F) -> rusqlite::Result<Vec<T>>
where
  F: FnMut(&rusqlite::Row<'_>) -> rusqlite::Result<T>,
{
  let mut stmt = conn.prepare_cached(&select.sql())?;
  let rows = stmt.query_map([id], f)?.collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}
