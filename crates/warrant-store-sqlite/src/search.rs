//! Full-text search over the FTS5 indexes declared in the schema.
//!
//! [`FtsSource`] answers one [`SearchStrategy`] at a time for one
//! [`SearchTable`]; the merge across strategies happens in
//! [`warrant_core::search::TextSearcher`]. Rows are entity ids.

use uuid::Uuid;
use warrant_core::{
  normalize::normalize_text,
  search::{SearchSource, SearchStrategy, SearchTerms},
};

use crate::{
  Error, Result,
  encode::decode_uuid,
  query::{Select, escape_like, fts_match},
};

/// The searchable entity tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum SearchTable {
  Propositions,
  MediaExcerpts,
  Sources,
  Persorgs,
  Writs,
  WritQuotes,
}

impl SearchTable {
  fn table(self) -> &'static str {
    match self {
      Self::Propositions => "propositions",
      Self::MediaExcerpts => "media_excerpts",
      Self::Sources => "sources",
      Self::Persorgs => "persorgs",
      Self::Writs => "writs",
      Self::WritQuotes => "writ_quotes",
    }
  }

  fn alias(self) -> &'static str {
    match self {
      Self::Propositions => "p",
      Self::MediaExcerpts => "me",
      Self::Sources => "so",
      Self::Persorgs => "po",
      Self::Writs => "w",
      Self::WritQuotes => "wq",
    }
  }

  fn id_column(self) -> &'static str {
    match self {
      Self::Propositions => "proposition_id",
      Self::MediaExcerpts => "media_excerpt_id",
      Self::Sources => "source_id",
      Self::Persorgs => "persorg_id",
      Self::Writs => "writ_id",
      Self::WritQuotes => "writ_quote_id",
    }
  }

  /// The normal-form column that containment is checked against.
  fn normal_column(self) -> &'static str {
    match self {
      Self::Propositions => "normal_text",
      Self::MediaExcerpts => "normal_quotation",
      Self::Sources => "normal_description",
      Self::Persorgs => "normal_name",
      Self::Writs => "normal_title",
      Self::WritQuotes => "normal_quote_text",
    }
  }

  fn fts_table(self) -> String { format!("{}_fts", self.table()) }

  fn select(self) -> Select {
    let alias = self.alias();
    Select::extant(self.table(), alias, &format!("{alias}.{}", self.id_column()))
  }

  /// Ranked by bm25; ties go to the older row.
  fn fts_select(self) -> Select {
    let alias = self.alias();
    let fts = self.fts_table();
    self
      .select()
      .join(&format!("JOIN {fts} ON {fts}.rowid = {alias}.rowid"))
      .filter(&format!("{fts} MATCH ?1"))
      .order_by(&format!("bm25({fts}), {alias}.created_at"))
  }

  /// Shorter matches first: the needle is a larger share of them.
  fn containing_select(self) -> Select {
    let alias = self.alias();
    let column = format!("{alias}.{}", self.normal_column());
    self
      .select()
      .filter(&format!("{column} LIKE '%' || ?1 || '%' ESCAPE '\\'"))
      .order_by(&format!("length({column}), {alias}.created_at"))
  }
}

/// One [`SearchTable`] as a [`SearchSource`].
pub struct FtsSource {
  conn:  tokio_rusqlite::Connection,
  table: SearchTable,
}

impl FtsSource {
  pub fn new(conn: tokio_rusqlite::Connection, table: SearchTable) -> Self { Self { conn, table } }
}

impl SearchSource for FtsSource {
  type Error = Error;
  type Key = Uuid;
  type Row = Uuid;

  async fn query(&self, strategy: SearchStrategy, terms: &SearchTerms) -> Result<Vec<Uuid>> {
    let (sql, needle) = match fts_match(strategy, &terms.words) {
      Some(expr) => (self.table.fts_select().sql(), expr),
      None => (
        self.table.containing_select().sql(),
        escape_like(&normalize_text(&terms.text)),
      ),
    };

    let ids: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&sql)?;
        let ids = stmt
          .query_map([needle], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(ids)
      })
      .await?;

    ids.iter().map(|id| decode_uuid(id)).collect()
  }

  fn dedup_key(row: &Uuid) -> Uuid { *row }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fts_queries_join_back_and_filter_deleted() {
    let sql = SearchTable::Propositions.fts_select().sql();
    assert_eq!(
      sql,
      "SELECT p.proposition_id FROM propositions p \
       JOIN propositions_fts ON propositions_fts.rowid = p.rowid \
       WHERE p.deleted_at IS NULL AND propositions_fts MATCH ?1 \
       ORDER BY bm25(propositions_fts), p.created_at"
    );
  }

  #[test]
  fn containment_uses_the_normal_column() {
    let sql = SearchTable::Persorgs.containing_select().sql();
    assert!(sql.contains("po.normal_name LIKE '%' || ?1 || '%' ESCAPE '\\'"));
    assert!(sql.contains("po.deleted_at IS NULL"));
  }

  #[test]
  fn writ_quotes_search_their_quote_text() {
    let sql = SearchTable::WritQuotes.fts_select().sql();
    assert!(sql.starts_with("SELECT wq.writ_quote_id FROM writ_quotes wq"));
    assert!(sql.contains("JOIN writ_quotes_fts ON writ_quotes_fts.rowid = wq.rowid"));
    let sql = SearchTable::Writs.containing_select().sql();
    assert!(sql.contains("w.normal_title LIKE '%' || ?1 || '%' ESCAPE '\\'"));
  }

  #[test]
  fn tables_parse_from_cli_names() {
    assert_eq!("media-excerpts".parse::<SearchTable>().ok(), Some(SearchTable::MediaExcerpts));
    assert_eq!("writ-quotes".parse::<SearchTable>().ok(), Some(SearchTable::WritQuotes));
  }
}
