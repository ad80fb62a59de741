//! A minimal SELECT builder that makes the soft-deletion filter explicit.
//!
//! Every read of an entity table starts from [`Select::extant`], which adds
//! `deleted_at IS NULL` for the base table, or from
//! [`Select::including_deleted`], which must be asked for by name. Joined
//! entity tables go through [`Select::join_extant`] for the same reason.

use warrant_core::search::SearchStrategy;

#[derive(Debug, Clone)]
pub struct Select {
  columns:    String,
  from:       String,
  joins:      Vec<String>,
  conditions: Vec<String>,
  order_by:   Option<String>,
}

impl Select {
  /// Select non-deleted rows of `table`, aliased as `alias`.
  pub fn extant(table: &str, alias: &str, columns: &str) -> Self {
    Self::including_deleted(table, alias, columns).filter(&format!("{alias}.deleted_at IS NULL"))
  }

  /// Select every row of `table`, soft-deleted or not.
  pub fn including_deleted(table: &str, alias: &str, columns: &str) -> Self {
    Self {
      columns:    columns.to_owned(),
      from:       format!("{table} {alias}"),
      joins:      Vec::new(),
      conditions: Vec::new(),
      order_by:   None,
    }
  }

  /// Inner-join non-deleted rows of another entity table.
  pub fn join_extant(mut self, table: &str, alias: &str, on: &str) -> Self {
    self
      .joins
      .push(format!("JOIN {table} {alias} ON {on} AND {alias}.deleted_at IS NULL"));
    self
  }

  /// Join a table with no lifecycle of its own (link tables, FTS indexes).
  pub fn join(mut self, join: &str) -> Self {
    self.joins.push(join.to_owned());
    self
  }

  pub fn filter(mut self, condition: &str) -> Self {
    self.conditions.push(condition.to_owned());
    self
  }

  pub fn order_by(mut self, order: &str) -> Self {
    self.order_by = Some(order.to_owned());
    self
  }

  pub fn sql(&self) -> String {
    let mut sql = format!("SELECT {} FROM {}", self.columns, self.from);
    for join in &self.joins {
      sql.push(' ');
      sql.push_str(join);
    }
    if !self.conditions.is_empty() {
      sql.push_str(" WHERE ");
      sql.push_str(&self.conditions.join(" AND "));
    }
    if let Some(order) = &self.order_by {
      sql.push_str(" ORDER BY ");
      sql.push_str(order);
    }
    sql
  }
}

/// Escape `%`, `_` and the escape character itself for use in
/// `LIKE ... ESCAPE '\'`.
pub fn escape_like(text: &str) -> String {
  let mut escaped = String::with_capacity(text.len());
  for c in text.chars() {
    if matches!(c, '%' | '_' | '\\') {
      escaped.push('\\');
    }
    escaped.push(c);
  }
  escaped
}

/// The FTS5 MATCH expression for an indexed strategy, or `None` for
/// [`SearchStrategy::Containing`], which is answered with `LIKE`.
///
/// Words are already stripped of everything but word characters, so quoting
/// them is enough to keep FTS5 operators out.
pub fn fts_match(strategy: SearchStrategy, words: &[String]) -> Option<String> {
  let quoted = || words.iter().map(|w| format!("\"{w}\""));
  match strategy {
    SearchStrategy::Phrase => Some(format!("\"{}\"", words.join(" "))),
    SearchStrategy::AllWords => Some(quoted().collect::<Vec<_>>().join(" ")),
    SearchStrategy::AnyWord => Some(quoted().collect::<Vec<_>>().join(" OR ")),
    SearchStrategy::Containing => None,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn extant_always_filters_deleted() {
    let sql = Select::extant("propositions", "p", "p.proposition_id")
      .filter("p.normal_text = ?1")
      .sql();
    assert_eq!(
      sql,
      "SELECT p.proposition_id FROM propositions p \
       WHERE p.deleted_at IS NULL AND p.normal_text = ?1"
    );
  }

  #[test]
  fn including_deleted_has_no_filter() {
    let sql = Select::including_deleted("votes", "v", "v.vote_id").sql();
    assert_eq!(sql, "SELECT v.vote_id FROM votes v");
  }

  #[test]
  fn joined_entities_are_filtered_too() {
    let sql = Select::extant("url_locators", "l", "u.url")
      .join_extant("urls", "u", "u.url_id = l.url_id")
      .order_by("l.created_at")
      .sql();
    assert!(sql.contains("JOIN urls u ON u.url_id = l.url_id AND u.deleted_at IS NULL"));
    assert!(sql.ends_with("ORDER BY l.created_at"));
  }

  #[test]
  fn like_wildcards_are_escaped() {
    assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
  }

  #[test]
  fn match_expressions_per_strategy() {
    let words = vec!["tallest".to_owned(), "man".to_owned()];
    assert_eq!(
      fts_match(SearchStrategy::Phrase, &words).as_deref(),
      Some("\"tallest man\"")
    );
    assert_eq!(
      fts_match(SearchStrategy::AllWords, &words).as_deref(),
      Some("\"tallest\" \"man\"")
    );
    assert_eq!(
      fts_match(SearchStrategy::AnyWord, &words).as_deref(),
      Some("\"tallest\" OR \"man\"")
    );
    assert_eq!(fts_match(SearchStrategy::Containing, &words), None);
  }
}
