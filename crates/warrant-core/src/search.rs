//! Multi-strategy text search.
//!
//! A search issues four independently ranked queries against the same
//! sanitised text and merges them by strategy priority, then by rank within
//! a strategy. A row already emitted by a higher-priority strategy is
//! dropped. The merged rows then pass through a caller-supplied async
//! transform; rows it maps to `None` are filtered out.

use std::{collections::HashSet, future::Future, hash::Hash};

use futures::future::join_all;

use crate::normalize::normalize_search_text;

/// The four query forms, in priority order.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum SearchStrategy {
  /// All words, adjacent and in order.
  Phrase,
  /// All words, anywhere, in any order.
  AllWords,
  /// Any word.
  AnyWord,
  /// The sanitised text as a substring. Catches partial words.
  Containing,
}

impl SearchStrategy {
  pub const PRIORITY: [Self; 4] = [Self::Phrase, Self::AllWords, Self::AnyWord, Self::Containing];
}

/// A sanitised search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
  /// The query with punctuation stripped and whitespace collapsed.
  pub text:  String,
  pub words: Vec<String>,
}

impl SearchTerms {
  /// `None` if nothing searchable is left after sanitising.
  pub fn parse(text: &str) -> Option<Self> {
    let text = normalize_search_text(text);
    if text.is_empty() {
      return None;
    }
    let words = text.split(' ').map(str::to_owned).collect();
    Some(Self { text, words })
  }
}

/// A backend able to run each [`SearchStrategy`] over one searchable column.
pub trait SearchSource: Send + Sync {
  type Row: Send;
  /// A stable identity for deduplicating rows across strategies.
  type Key: Eq + Hash;
  type Error: std::error::Error + Send + Sync + 'static;

  /// Rows matching `terms` under `strategy`, best match first. Soft-deleted
  /// rows must never be returned.
  fn query(
    &self,
    strategy: SearchStrategy,
    terms: &SearchTerms,
  ) -> impl Future<Output = Result<Vec<Self::Row>, Self::Error>> + Send;

  fn dedup_key(row: &Self::Row) -> Self::Key;
}

/// Merge per-strategy result lists, given in priority order, keeping the
/// first occurrence of each key.
pub fn merge_ranked<R, K, F>(ranked: impl IntoIterator<Item = Vec<R>>, key: F) -> Vec<R>
where
  K: Eq + Hash,
  F: Fn(&R) -> K,
{
  let mut seen = HashSet::new();
  ranked
    .into_iter()
    .flatten()
    .filter(|row| seen.insert(key(row)))
    .collect()
}

pub struct TextSearcher<S> {
  source: S,
}

impl<S: SearchSource> TextSearcher<S> {
  pub fn new(source: S) -> Self { Self { source } }

  /// Search and map each merged row through `transform`.
  ///
  /// Empty text, or text with nothing searchable in it, yields no rows and
  /// issues no queries. Each call re-issues all four queries.
  pub async fn search<T, F, Fut>(&self, text: &str, transform: F) -> Result<Vec<T>, S::Error>
  where
    F: FnMut(S::Row) -> Fut,
    Fut: Future<Output = Option<T>>,
  {
    let Some(terms) = SearchTerms::parse(text) else {
      return Ok(Vec::new());
    };

    let [phrase, all_words, any_word, containing] = SearchStrategy::PRIORITY;
    let (phrase, all_words, any_word, containing) = futures::try_join!(
      self.source.query(phrase, &terms),
      self.source.query(all_words, &terms),
      self.source.query(any_word, &terms),
      self.source.query(containing, &terms),
    )?;
    tracing::debug!(
      text = %terms.text,
      phrase = phrase.len(),
      all_words = all_words.len(),
      any_word = any_word.len(),
      containing = containing.len(),
      "search strategies returned"
    );

    let merged = merge_ranked([phrase, all_words, any_word, containing], S::dedup_key);
    let transformed = join_all(merged.into_iter().map(transform)).await;
    Ok(transformed.into_iter().flatten().collect())
  }

  /// Search without transforming rows.
  pub async fn search_rows(&self, text: &str) -> Result<Vec<S::Row>, S::Error> {
    self.search(text, |row| async move { Some(row) }).await
  }
}
