//! [`SqliteStore`]: the SQLite implementation of [`ArgumentStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::{Connection, TransactionBehavior, types::Type};
use uuid::Uuid;

use warrant_core::{
  ReadOrCreate,
  justification::{
    DeletedJustification, Justification, JustificationBasisCompound,
    JustificationBasisCompoundAtom, JustificationKey, JustificationRootTarget,
    PropositionCompound,
  },
  media::{
    Citation, MediaExcerpt, MediaExcerptKey, NewSource, NewUrl, ResolvedUrlLocator, Source, Url,
    UrlLocator,
  },
  normalize::normalize_optional,
  proposition::{NewPersorg, NewProposition, Persorg, Proposition},
  search::TextSearcher,
  statement::{Statement, StatementKey},
  store::{ArgumentStore, Creation},
  url_match::{anchors_equivalent, domain_host, url_host, url_matches_domain, urls_match_path},
  vote::{NewVote, Vote, VoteTargetType},
  writ::{NewWrit, SourceExcerptParaphrase, Writ, WritQuote, WritQuoteKey},
};

use crate::{
  Error, Result,
  encode::{
    RawCitation, RawJustification, RawJustificationBasisCompound, RawMediaExcerpt, RawPersorg,
    RawProposition, RawPropositionCompound, RawSource, RawSourceExcerptParaphrase,
    RawStatement, RawUrl, RawUrlLocator, RawVote, RawWrit, RawWritQuote, atoms_key,
    decode_anchors, decode_uuid, encode_anchors, encode_basis_atom, encode_dt, encode_uuid,
  },
  fetch::{self, placeholders, read_or_insert, reread},
  query::{Select, escape_like},
  schema::SCHEMA,
  search::{FtsSource, SearchTable},
};

/// A row reader run on the database thread.
type Fetch<R> = fn(&Connection, &str) -> rusqlite::Result<Option<R>>;

/// `(created_at, creator_user_id)` column values.
fn stamp(creation: Creation) -> (String, String) {
  (encode_dt(creation.now), encode_uuid(creation.creator_user_id))
}

fn decoded<T, U>(row: ReadOrCreate<T>, decode: impl FnOnce(T) -> Result<U>) -> Result<ReadOrCreate<U>> {
  let ReadOrCreate { entity, is_extant } = row;
  Ok(ReadOrCreate { entity: decode(entity)?, is_extant })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A warrant justification-graph store backed by a single SQLite file.
///
/// Clones share one connection.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run `f` on the database thread inside an immediate transaction, so no
  /// other writer can interleave between its reads and its inserts.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
  {
    let value = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
      })
      .await?;
    Ok(value)
  }

  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
  {
    Ok(self.conn.call(move |conn| Ok(f(conn)?)).await?)
  }

  async fn read_one<R, T>(&self, id: Uuid, fetch: Fetch<R>, decode: fn(R) -> Result<T>) -> Result<Option<T>>
  where
    R: Send + 'static,
  {
    let id = encode_uuid(id);
    let raw = self.read(move |conn| fetch(conn, &id)).await?;
    raw.map(decode).transpose()
  }

  async fn read_many<R, T>(
    &self,
    ids: Vec<String>,
    fetch: Fetch<R>,
    decode: fn(R) -> Result<T>,
  ) -> Result<Vec<T>>
  where
    R: Send + 'static,
  {
    let raws = self
      .read(move |conn| {
        ids
          .iter()
          .map(|id| fetch(conn, id))
          .collect::<rusqlite::Result<Vec<_>>>()
      })
      .await?;
    raws.into_iter().flatten().map(decode).collect()
  }

  async fn search<R, T>(
    &self,
    table: SearchTable,
    text: &str,
    fetch: Fetch<R>,
    decode: fn(R) -> Result<T>,
  ) -> Result<Vec<T>>
  where
    R: Send + 'static,
  {
    let searcher = TextSearcher::new(FtsSource::new(self.conn.clone(), table));
    let rows = searcher
      .search(text, |id| async move { self.read_one(id, fetch, decode).await.transpose() })
      .await?;
    rows.into_iter().collect()
  }

  /// `(media_excerpt_id, url, canonical_url)` for every live locator whose
  /// URL passes `host_filter`, oldest excerpt first. In the filter `?1` is
  /// the ASCII host and `?2` the same host escaped for LIKE.
  async fn locator_urls_on_host(
    &self,
    host: String,
    host_filter: &str,
  ) -> Result<Vec<(String, String, Option<String>)>> {
    let select = Select::extant("url_locators", "l", "l.media_excerpt_id, u.url, u.canonical_url")
      .join_extant("urls", "u", "u.url_id = l.url_id")
      .join_extant("media_excerpts", "me", "me.media_excerpt_id = l.media_excerpt_id")
      .filter(host_filter)
      .order_by("me.created_at, l.created_at");
    let escaped = escape_like(&host);
    self
      .read(move |conn| {
        let mut stmt = conn.prepare_cached(&select.sql())?;
        let rows = stmt
          .query_map([host, escaped], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
  }

  /// Every vote the user has cast on the target, soft-deleted ones included,
  /// oldest first.
  pub async fn read_vote_history(
    &self,
    user_id: Uuid,
    target_type: VoteTargetType,
    target_id: Uuid,
  ) -> Result<Vec<Vote>> {
    let user = encode_uuid(user_id);
    let kind = target_type.to_string();
    let target = encode_uuid(target_id);
    let select = Select::including_deleted("votes", "v", RawVote::COLUMNS)
      .filter("v.user_id = ?1 AND v.target_type = ?2 AND v.target_id = ?3")
      .order_by("v.created_at, v.rowid");
    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare_cached(&select.sql())?;
        let rows = stmt
          .query_map(rusqlite::params![user, kind, target], RawVote::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(RawVote::into_vote).collect()
  }
}

/// Dedupe excerpt ids, keeping first occurrences.
fn distinct_ids(rows: impl IntoIterator<Item = String>) -> Vec<String> {
  let mut seen = HashSet::new();
  rows.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

// ─── ArgumentStore impl ──────────────────────────────────────────────────────

impl ArgumentStore for SqliteStore {
  type Error = Error;

  // ── Reads by id ───────────────────────────────────────────────────────────

  async fn read_proposition(&self, id: Uuid) -> Result<Option<Proposition>> {
    self.read_one(id, fetch::proposition, RawProposition::into_proposition).await
  }

  async fn read_persorg(&self, id: Uuid) -> Result<Option<Persorg>> {
    self.read_one(id, fetch::persorg, RawPersorg::into_persorg).await
  }

  async fn read_statement(&self, id: Uuid) -> Result<Option<Statement>> {
    self.read_one(id, fetch::statement, RawStatement::into_statement).await
  }

  async fn read_justification(&self, id: Uuid) -> Result<Option<Justification>> {
    self
      .read_one(id, fetch::justification, RawJustification::into_justification)
      .await
  }

  async fn read_writ(&self, id: Uuid) -> Result<Option<Writ>> {
    self.read_one(id, fetch::writ, RawWrit::into_writ).await
  }

  async fn read_writ_quote(&self, id: Uuid) -> Result<Option<WritQuote>> {
    self
      .read_one(id, fetch::writ_quote, RawWritQuote::into_writ_quote)
      .await
  }

  async fn read_source(&self, id: Uuid) -> Result<Option<Source>> {
    self.read_one(id, fetch::source, RawSource::into_source).await
  }

  async fn read_url(&self, id: Uuid) -> Result<Option<Url>> {
    self.read_one(id, fetch::url, RawUrl::into_url).await
  }

  async fn read_proposition_compound(&self, id: Uuid) -> Result<Option<PropositionCompound>> {
    self
      .read_one(
        id,
        fetch::proposition_compound,
        RawPropositionCompound::into_proposition_compound,
      )
      .await
  }

  async fn read_justification_basis_compound(
    &self,
    id: Uuid,
  ) -> Result<Option<JustificationBasisCompound>> {
    self
      .read_one(
        id,
        fetch::justification_basis_compound,
        RawJustificationBasisCompound::into_justification_basis_compound,
      )
      .await
  }

  async fn read_source_excerpt_paraphrase(
    &self,
    id: Uuid,
  ) -> Result<Option<SourceExcerptParaphrase>> {
    self
      .read_one(
        id,
        fetch::source_excerpt_paraphrase,
        RawSourceExcerptParaphrase::into_source_excerpt_paraphrase,
      )
      .await
  }

  async fn read_media_excerpt(&self, id: Uuid) -> Result<Option<MediaExcerpt>> {
    self
      .read_one(id, fetch::media_excerpt, RawMediaExcerpt::into_media_excerpt)
      .await
  }

  // ── Read-or-create ────────────────────────────────────────────────────────

  async fn read_or_create_proposition(
    &self,
    proposition: NewProposition,
    creation: Creation,
  ) -> Result<ReadOrCreate<Proposition>> {
    let text = proposition.text();
    let normal_text = proposition.normal_text();
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("propositions", "p", "p.proposition_id")
          .filter("p.normal_text = ?1")
          .order_by("p.created_at");
        let id = read_or_insert(tx, "proposition", &select, rusqlite::params![normal_text], |tx| {
          let id = encode_uuid(Uuid::new_v4());
          tx.execute(
            "INSERT INTO propositions (proposition_id, text, normal_text, created_at, creator_user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, text, normal_text, at, by],
          )?;
          Ok(id)
        })?;
        reread(id, |id: &String| fetch::proposition(tx, id))
      })
      .await?;

    decoded(raw, RawProposition::into_proposition)
  }

  async fn read_or_create_persorg(
    &self,
    persorg: NewPersorg,
    creation: Creation,
  ) -> Result<ReadOrCreate<Persorg>> {
    let name = persorg.name();
    let normal_name = persorg.normal_name();
    let NewPersorg { is_organization, known_for, website_url, .. } = persorg;
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("persorgs", "po", "po.persorg_id")
          .filter("po.normal_name = ?1")
          .order_by("po.created_at");
        let id = read_or_insert(tx, "persorg", &select, rusqlite::params![normal_name], |tx| {
          let id = encode_uuid(Uuid::new_v4());
          tx.execute(
            "INSERT INTO persorgs (
               persorg_id, name, normal_name, is_organization, known_for, website_url,
               created_at, creator_user_id
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
              id,
              name,
              normal_name,
              is_organization,
              known_for,
              website_url,
              at,
              by,
            ],
          )?;
          Ok(id)
        })?;
        reread(id, |id: &String| fetch::persorg(tx, id))
      })
      .await?;

    decoded(raw, RawPersorg::into_persorg)
  }

  async fn read_or_create_source(
    &self,
    source: NewSource,
    creation: Creation,
  ) -> Result<ReadOrCreate<Source>> {
    let description = source.description();
    let normal_description = source.normal_description();
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("sources", "so", "so.source_id")
          .filter("so.normal_description = ?1")
          .order_by("so.created_at");
        let id =
          read_or_insert(tx, "source", &select, rusqlite::params![normal_description], |tx| {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO sources (source_id, description, normal_description, created_at, creator_user_id)
               VALUES (?1, ?2, ?3, ?4, ?5)",
              rusqlite::params![id, description, normal_description, at, by],
            )?;
            Ok(id)
          })?;
        reread(id, |id: &String| fetch::source(tx, id))
      })
      .await?;

    decoded(raw, RawSource::into_source)
  }

  async fn read_or_create_url(&self, url: NewUrl, creation: Creation) -> Result<ReadOrCreate<Url>> {
    let NewUrl { url, canonical_url } = url;
    let host = url_host(&url);
    let canonical_host = canonical_url.as_deref().and_then(url_host);
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("urls", "u", "u.url_id")
          .filter("u.url = ?1")
          .order_by("u.created_at");
        let id = read_or_insert(tx, "url", &select, rusqlite::params![url], |tx| {
          let id = encode_uuid(Uuid::new_v4());
          tx.execute(
            "INSERT INTO urls
               (url_id, url, canonical_url, host, canonical_host, created_at, creator_user_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            rusqlite::params![id, url, canonical_url, host, canonical_host, at, by],
          )?;
          Ok(id)
        })?;
        reread(id, |id: &String| fetch::url(tx, id))
      })
      .await?;

    decoded(raw, RawUrl::into_url)
  }

  async fn read_or_create_writ(&self, writ: NewWrit, creation: Creation) -> Result<ReadOrCreate<Writ>> {
    let title = writ.title();
    let normal_title = writ.normal_title();
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("writs", "w", "w.writ_id")
          .filter("w.normal_title = ?1")
          .order_by("w.created_at");
        let id = read_or_insert(tx, "writ", &select, rusqlite::params![normal_title], |tx| {
          let id = encode_uuid(Uuid::new_v4());
          tx.execute(
            "INSERT INTO writs (writ_id, title, normal_title, created_at, creator_user_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, title, normal_title, at, by],
          )?;
          Ok(id)
        })?;
        reread(id, |id: &String| fetch::writ(tx, id))
      })
      .await?;

    decoded(raw, RawWrit::into_writ)
  }

  async fn read_or_create_writ_quote(
    &self,
    key: WritQuoteKey,
    url_ids: Vec<Uuid>,
    creation: Creation,
  ) -> Result<ReadOrCreate<WritQuote>> {
    let writ_id = encode_uuid(key.writ_id);
    let WritQuoteKey { quote_text, normal_quote_text, .. } = key;
    let url_ids: Vec<String> = url_ids.into_iter().map(encode_uuid).collect();
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("writ_quotes", "wq", "wq.writ_quote_id")
          .filter("wq.writ_id = ?1 AND wq.normal_quote_text = ?2")
          .order_by("wq.created_at");
        let id = read_or_insert(
          tx,
          "writ quote",
          &select,
          rusqlite::params![writ_id, normal_quote_text],
          |tx| {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO writ_quotes (
                 writ_quote_id, writ_id, quote_text, normal_quote_text, created_at, creator_user_id
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![id, writ_id, quote_text, normal_quote_text, at, by],
            )?;
            Ok(id)
          },
        )?;

        for url_id in &url_ids {
          tx.execute(
            "INSERT OR IGNORE INTO writ_quote_urls (writ_quote_id, url_id, created_at, creator_user_id)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id.entity, url_id, at, by],
          )?;
        }
        reread(id, |id: &String| fetch::writ_quote(tx, id))
      })
      .await?;

    decoded(raw, RawWritQuote::into_writ_quote)
  }

  async fn read_or_create_proposition_compound(
    &self,
    atom_proposition_ids: Vec<Uuid>,
    creation: Creation,
  ) -> Result<ReadOrCreate<PropositionCompound>> {
    let atoms: Vec<String> = atom_proposition_ids.into_iter().map(encode_uuid).collect();
    let key = atoms_key(&atoms);
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("proposition_compounds", "pc", "pc.proposition_compound_id")
          .filter("pc.atoms_key = ?1")
          .order_by("pc.created_at");
        let id =
          read_or_insert(tx, "proposition compound", &select, rusqlite::params![key], |tx| {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO proposition_compounds (
                 proposition_compound_id, atoms_key, created_at, creator_user_id
               ) VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![id, key, at, by],
            )?;
            for (position, proposition_id) in atoms.iter().enumerate() {
              tx.execute(
                "INSERT INTO proposition_compound_atoms (
                   proposition_compound_id, position, proposition_id
                 ) VALUES (?1, ?2, ?3)",
                rusqlite::params![id, position as i64, proposition_id],
              )?;
            }
            Ok(id)
          })?;
        reread(id, |id: &String| fetch::proposition_compound(tx, id))
      })
      .await?;

    decoded(raw, RawPropositionCompound::into_proposition_compound)
  }

  async fn read_or_create_source_excerpt_paraphrase(
    &self,
    paraphrasing_proposition_id: Uuid,
    writ_quote_id: Uuid,
    creation: Creation,
  ) -> Result<ReadOrCreate<SourceExcerptParaphrase>> {
    let proposition_id = encode_uuid(paraphrasing_proposition_id);
    let writ_quote_id = encode_uuid(writ_quote_id);
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select =
          Select::extant("source_excerpt_paraphrases", "sep", "sep.source_excerpt_paraphrase_id")
            .filter("sep.paraphrasing_proposition_id = ?1 AND sep.writ_quote_id = ?2")
            .order_by("sep.created_at");
        let id = read_or_insert(
          tx,
          "source excerpt paraphrase",
          &select,
          rusqlite::params![proposition_id, writ_quote_id],
          |tx| {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO source_excerpt_paraphrases (
                 source_excerpt_paraphrase_id, paraphrasing_proposition_id, writ_quote_id,
                 created_at, creator_user_id
               ) VALUES (?1, ?2, ?3, ?4, ?5)",
              rusqlite::params![id, proposition_id, writ_quote_id, at, by],
            )?;
            Ok(id)
          },
        )?;
        reread(id, |id: &String| fetch::source_excerpt_paraphrase(tx, id))
      })
      .await?;

    decoded(raw, RawSourceExcerptParaphrase::into_source_excerpt_paraphrase)
  }

  async fn read_or_create_justification_basis_compound(
    &self,
    atoms: Vec<JustificationBasisCompoundAtom>,
    creation: Creation,
  ) -> Result<ReadOrCreate<JustificationBasisCompound>> {
    let atoms: Vec<(&'static str, String)> = atoms.iter().map(encode_basis_atom).collect();
    let key = atoms_key(atoms.iter().map(|(t, id)| format!("{t}:{id}")));
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant(
          "justification_basis_compounds",
          "jbc",
          "jbc.justification_basis_compound_id",
        )
        .filter("jbc.atoms_key = ?1")
        .order_by("jbc.created_at");
        let id = read_or_insert(
          tx,
          "justification basis compound",
          &select,
          rusqlite::params![key],
          |tx| {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO justification_basis_compounds (
                 justification_basis_compound_id, atoms_key, created_at, creator_user_id
               ) VALUES (?1, ?2, ?3, ?4)",
              rusqlite::params![id, key, at, by],
            )?;
            for (position, (entity_type, entity_id)) in atoms.iter().enumerate() {
              tx.execute(
                "INSERT INTO justification_basis_compound_atoms (
                   justification_basis_compound_id, position, entity_type, entity_id
                 ) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![id, position as i64, entity_type, entity_id],
              )?;
            }
            Ok(id)
          },
        )?;
        reread(id, |id: &String| fetch::justification_basis_compound(tx, id))
      })
      .await?;

    decoded(raw, RawJustificationBasisCompound::into_justification_basis_compound)
  }

  async fn read_or_create_statement(
    &self,
    key: StatementKey,
    creation: Creation,
  ) -> Result<ReadOrCreate<Statement>> {
    let speaker_id = encode_uuid(key.speaker_persorg_id);
    let sentence_type = key.sentence.sentence_type().to_string();
    let sentence_id = encode_uuid(key.sentence.id());
    let root_proposition_id = encode_uuid(key.root_proposition_id);
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("statements", "s", "s.statement_id")
          .filter("s.speaker_persorg_id = ?1 AND s.sentence_type = ?2 AND s.sentence_id = ?3")
          .order_by("s.created_at");
        let id = read_or_insert(
          tx,
          "statement",
          &select,
          rusqlite::params![speaker_id, sentence_type, sentence_id],
          |tx| {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO statements (
                 statement_id, sentence_type, sentence_id, speaker_persorg_id,
                 root_proposition_id, created_at, creator_user_id
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
              rusqlite::params![
                id,
                sentence_type,
                sentence_id,
                speaker_id,
                root_proposition_id,
                at,
                by,
              ],
            )?;
            Ok(id)
          },
        )?;
        reread(id, |id: &String| fetch::statement(tx, id))
      })
      .await?;

    decoded(raw, RawStatement::into_statement)
  }

  async fn read_or_create_media_excerpt(
    &self,
    key: MediaExcerptKey,
    creation: Creation,
  ) -> Result<ReadOrCreate<Uuid>> {
    let url_ids: Vec<String> = key.urls.iter().map(|u| encode_uuid(u.url_id)).collect();
    let canonicals: Vec<String> = key
      .urls
      .iter()
      .filter_map(|u| u.canonical_url.clone())
      .collect();
    let source_ids: Vec<String> = key.source_ids.iter().copied().map(encode_uuid).collect();
    let MediaExcerptKey { quotation, normal_quotation, .. } = key;
    let (at, by) = stamp(creation);

    let mut select = Select::extant("media_excerpts", "me", "me.media_excerpt_id")
      .filter("me.normal_quotation = ?")
      .order_by("me.created_at");
    let mut values = vec![normal_quotation.clone()];
    if !url_ids.is_empty() {
      let mut equivalent = format!("u.url_id IN ({})", placeholders(url_ids.len()));
      if !canonicals.is_empty() {
        equivalent.push_str(&format!(" OR u.canonical_url IN ({})", placeholders(canonicals.len())));
      }
      select = select.filter(&format!(
        "EXISTS (SELECT 1 FROM url_locators l \
         JOIN urls u ON u.url_id = l.url_id AND u.deleted_at IS NULL \
         WHERE l.media_excerpt_id = me.media_excerpt_id AND l.deleted_at IS NULL \
         AND ({equivalent}))"
      ));
      values.extend(url_ids);
      values.extend(canonicals);
    }
    if !source_ids.is_empty() {
      select = select.filter(&format!(
        "EXISTS (SELECT 1 FROM citations c \
         WHERE c.media_excerpt_id = me.media_excerpt_id AND c.deleted_at IS NULL \
         AND c.source_id IN ({}))",
        placeholders(source_ids.len())
      ));
      values.extend(source_ids);
    }

    let id = self
      .write(move |tx| {
        let params: Vec<&dyn rusqlite::ToSql> =
          values.iter().map(|v| v as &dyn rusqlite::ToSql).collect();
        read_or_insert(tx, "media excerpt", &select, &params, |tx| {
          let id = encode_uuid(Uuid::new_v4());
          tx.execute(
            "INSERT INTO media_excerpts (
               media_excerpt_id, quotation, normal_quotation, created_at, creator_user_id
             ) VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, quotation, normal_quotation, at, by],
          )?;
          Ok(id)
        })
      })
      .await?;

    decoded(id, |id: String| decode_uuid(&id))
  }

  async fn read_or_create_url_locator(
    &self,
    media_excerpt_id: Uuid,
    locator: ResolvedUrlLocator,
    creation: Creation,
  ) -> Result<ReadOrCreate<UrlLocator>> {
    let excerpt_id = encode_uuid(media_excerpt_id);
    let url_id = encode_uuid(locator.url.url_id);
    let canonical_url = locator.url.canonical_url.clone();
    let anchors_json = encode_anchors(&locator.anchors)?;
    let anchors = locator.anchors;
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("url_locators", "l", "l.url_locator_id, l.anchors")
          .join_extant("urls", "u", "u.url_id = l.url_id")
          .filter("l.media_excerpt_id = ?1")
          .filter("(u.url_id = ?2 OR (u.canonical_url IS NOT NULL AND u.canonical_url = ?3))")
          .order_by("l.created_at");
        let candidates: Vec<(String, String)> = {
          let mut stmt = tx.prepare_cached(&select.sql())?;
          stmt
            .query_map(rusqlite::params![excerpt_id, url_id, canonical_url], |row| {
              Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<rusqlite::Result<_>>()?
        };

        let mut found = None;
        for (id, stored) in candidates {
          let stored = decode_anchors(&stored)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(1, Type::Text, Box::new(e)))?;
          if anchors_equivalent(&anchors, &stored) {
            found = Some(id);
            break;
          }
        }

        let id = match found {
          Some(id) => ReadOrCreate::extant(id),
          None => {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO url_locators (
                 url_locator_id, media_excerpt_id, url_id, anchors, created_at, creator_user_id
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![id, excerpt_id, url_id, anchors_json, at, by],
            )?;
            ReadOrCreate::created(id)
          }
        };
        reread(id, |id: &String| fetch::url_locator(tx, id))
      })
      .await?;

    decoded(raw, RawUrlLocator::into_url_locator)
  }

  async fn read_or_create_citation(
    &self,
    media_excerpt_id: Uuid,
    source: Source,
    pincite: Option<String>,
    creation: Creation,
  ) -> Result<ReadOrCreate<Citation>> {
    let excerpt_id = encode_uuid(media_excerpt_id);
    let source_id = encode_uuid(source.source_id);
    let normal_pincite = normalize_optional(pincite.as_deref());
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("citations", "c", "c.rowid")
          .filter("c.media_excerpt_id = ?1 AND c.source_id = ?2")
          .filter("COALESCE(c.normal_pincite, '') = COALESCE(?3, '')")
          .order_by("c.created_at");
        let rowid = read_or_insert(
          tx,
          "citation",
          &select,
          rusqlite::params![excerpt_id, source_id, normal_pincite],
          |tx| {
            tx.execute(
              "INSERT INTO citations (
                 media_excerpt_id, source_id, pincite, normal_pincite, created_at, creator_user_id
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![excerpt_id, source_id, pincite, normal_pincite, at, by],
            )?;
            Ok(tx.last_insert_rowid())
          },
        )?;
        reread(rowid, |rowid: &i64| fetch::citation(tx, *rowid))
      })
      .await?;

    decoded(raw, RawCitation::into_citation)
  }

  async fn link_media_excerpt_speaker(
    &self,
    media_excerpt_id: Uuid,
    persorg_id: Uuid,
    creation: Creation,
  ) -> Result<()> {
    let excerpt_id = encode_uuid(media_excerpt_id);
    let persorg_id = encode_uuid(persorg_id);
    let (at, by) = stamp(creation);

    self
      .write(move |tx| {
        tx.execute(
          "INSERT INTO media_excerpt_speakers (media_excerpt_id, persorg_id, created_at, creator_user_id)
           SELECT ?1, ?2, ?3, ?4
           WHERE NOT EXISTS (
             SELECT 1 FROM media_excerpt_speakers
             WHERE media_excerpt_id = ?1 AND persorg_id = ?2 AND deleted_at IS NULL
           )",
          rusqlite::params![excerpt_id, persorg_id, at, by],
        )?;
        Ok(())
      })
      .await
  }

  async fn read_or_create_justification(
    &self,
    key: JustificationKey,
    creation: Creation,
  ) -> Result<ReadOrCreate<Justification>> {
    let target_type = key.target.target_type().to_string();
    let target_id = encode_uuid(key.target.id());
    let basis_type = key.basis.basis_type().to_string();
    let basis_id = encode_uuid(key.basis.id());
    let polarity = key.polarity.to_string();
    let root_target_type = key.root_target.root_type().to_string();
    let root_target_id = encode_uuid(key.root_target.id());
    let root_polarity = key.root_polarity.to_string();
    let (at, by) = stamp(creation);

    let raw = self
      .write(move |tx| {
        let select = Select::extant("justifications", "j", "j.justification_id")
          .filter("j.target_type = ?1 AND j.target_id = ?2")
          .filter("j.basis_type = ?3 AND j.basis_id = ?4 AND j.polarity = ?5")
          .order_by("j.created_at");
        let id = read_or_insert(
          tx,
          "justification",
          &select,
          rusqlite::params![target_type, target_id, basis_type, basis_id, polarity],
          |tx| {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO justifications (
                 justification_id, target_type, target_id, basis_type, basis_id, polarity,
                 root_target_type, root_target_id, root_polarity, created_at, creator_user_id
               ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
              rusqlite::params![
                id,
                target_type,
                target_id,
                basis_type,
                basis_id,
                polarity,
                root_target_type,
                root_target_id,
                root_polarity,
                at,
                by,
              ],
            )?;
            Ok(id)
          },
        )?;
        reread(id, |id: &String| fetch::justification(tx, id))
      })
      .await?;

    decoded(raw, RawJustification::into_justification)
  }

  // ── Graph reads ───────────────────────────────────────────────────────────

  async fn read_justifications_for_root_target(
    &self,
    root: JustificationRootTarget,
    user_id: Option<Uuid>,
  ) -> Result<Vec<Justification>> {
    let root_type = root.root_type().to_string();
    let root_id = encode_uuid(root.id());
    let user_id = user_id.map(encode_uuid);
    let select = Select::extant(
      "justifications",
      "j",
      &format!("{}, v.polarity", RawJustification::COLUMNS),
    )
    .join(
      "LEFT JOIN votes v ON v.target_type = 'JUSTIFICATION' \
       AND v.target_id = j.justification_id AND v.user_id = ?3 AND v.deleted_at IS NULL",
    )
    .filter("j.root_target_type = ?1 AND j.root_target_id = ?2")
    .order_by("j.created_at, j.justification_id");

    let raws = self
      .read(move |conn| {
        let mut stmt = conn.prepare_cached(&select.sql())?;
        let rows = stmt
          .query_map(
            rusqlite::params![root_type, root_id, user_id],
            RawJustification::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawJustification::into_justification).collect()
  }

  async fn read_media_excerpts_matching_url(&self, url: String) -> Result<Vec<MediaExcerpt>> {
    let Some(host) = url_host(&url) else {
      return Err(url::ParseError::EmptyHost.into());
    };

    let rows = self
      .locator_urls_on_host(host, "(u.host = ?1 OR u.canonical_host = ?1)")
      .await?;
    let ids = distinct_ids(rows.into_iter().filter_map(|(id, stored, canonical)| {
      let matched = urls_match_path(&stored, &url)
        || canonical.is_some_and(|c| urls_match_path(&c, &url));
      matched.then_some(id)
    }));

    self
      .read_many(ids, fetch::media_excerpt, RawMediaExcerpt::into_media_excerpt)
      .await
  }

  async fn read_media_excerpts_matching_domain(&self, domain: String) -> Result<Vec<MediaExcerpt>> {
    let Some(host) = domain_host(&domain) else {
      return Ok(Vec::new());
    };

    let rows = self
      .locator_urls_on_host(host, "(u.host = ?1 OR u.host LIKE '%.' || ?2 ESCAPE '\\')")
      .await?;
    let ids = distinct_ids(
      rows
        .into_iter()
        .filter_map(|(id, stored, _)| url_matches_domain(&stored, &domain).then_some(id)),
    );

    self
      .read_many(ids, fetch::media_excerpt, RawMediaExcerpt::into_media_excerpt)
      .await
  }

  // ── Search ────────────────────────────────────────────────────────────────

  async fn search_propositions(&self, text: String) -> Result<Vec<Proposition>> {
    self
      .search(
        SearchTable::Propositions,
        &text,
        fetch::proposition,
        RawProposition::into_proposition,
      )
      .await
  }

  async fn search_media_excerpts(&self, text: String) -> Result<Vec<MediaExcerpt>> {
    self
      .search(
        SearchTable::MediaExcerpts,
        &text,
        fetch::media_excerpt,
        RawMediaExcerpt::into_media_excerpt,
      )
      .await
  }

  async fn search_sources(&self, text: String) -> Result<Vec<Source>> {
    self
      .search(SearchTable::Sources, &text, fetch::source, RawSource::into_source)
      .await
  }

  async fn search_persorgs(&self, text: String) -> Result<Vec<Persorg>> {
    self
      .search(SearchTable::Persorgs, &text, fetch::persorg, RawPersorg::into_persorg)
      .await
  }

  async fn search_writs(&self, text: String) -> Result<Vec<Writ>> {
    self
      .search(SearchTable::Writs, &text, fetch::writ, RawWrit::into_writ)
      .await
  }

  async fn search_writ_quotes(&self, text: String) -> Result<Vec<WritQuote>> {
    self
      .search(SearchTable::WritQuotes, &text, fetch::writ_quote, RawWritQuote::into_writ_quote)
      .await
  }

  async fn read_writ_quotes_having_url_containing(&self, text: String) -> Result<Vec<WritQuote>> {
    let select = Select::extant("writ_quotes", "wq", "wq.writ_quote_id")
      .join("JOIN writ_quote_urls wqu ON wqu.writ_quote_id = wq.writ_quote_id")
      .join_extant("urls", "u", "u.url_id = wqu.url_id")
      .filter("u.url LIKE '%' || ?1 || '%' ESCAPE '\\'")
      .order_by("wq.created_at, wq.rowid, wqu.created_at");
    let needle = escape_like(&text);
    let rows: Vec<String> = self
      .read(move |conn| {
        let mut stmt = conn.prepare_cached(&select.sql())?;
        let rows = stmt
          .query_map([needle], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    self
      .read_many(distinct_ids(rows), fetch::writ_quote, RawWritQuote::into_writ_quote)
      .await
  }

  // ── Votes ─────────────────────────────────────────────────────────────────

  async fn record_vote(
    &self,
    user_id: Uuid,
    vote: NewVote,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<Vote>> {
    let user = encode_uuid(user_id);
    let target_type = vote.target_type.to_string();
    let target_id = encode_uuid(vote.target_id);
    let polarity = vote.polarity.to_string();
    let opposing = vote.polarity.negate().to_string();
    let at = encode_dt(now);

    let raw = self
      .write(move |tx| {
        let withdrawn = tx.execute(
          "UPDATE votes SET deleted_at = ?1
           WHERE user_id = ?2 AND target_type = ?3 AND target_id = ?4 AND polarity = ?5
             AND deleted_at IS NULL",
          rusqlite::params![at, user, target_type, target_id, opposing],
        )?;
        if withdrawn > 0 {
          tracing::debug!(target_id = %target_id, "withdrew opposing vote");
        }

        let select = Select::extant("votes", "v", "v.vote_id")
          .filter("v.user_id = ?1 AND v.target_type = ?2 AND v.target_id = ?3 AND v.polarity = ?4")
          .order_by("v.created_at");
        let id = read_or_insert(
          tx,
          "vote",
          &select,
          rusqlite::params![user, target_type, target_id, polarity],
          |tx| {
            let id = encode_uuid(Uuid::new_v4());
            tx.execute(
              "INSERT INTO votes (vote_id, user_id, target_type, target_id, polarity, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
              rusqlite::params![id, user, target_type, target_id, polarity, at],
            )?;
            Ok(id)
          },
        )?;
        reread(id, |id: &String| fetch::vote(tx, id))
      })
      .await?;

    decoded(raw, RawVote::into_vote)
  }

  async fn delete_vote(&self, user_id: Uuid, vote: NewVote, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
    let user = encode_uuid(user_id);
    let target_type = vote.target_type.to_string();
    let target_id = encode_uuid(vote.target_id);
    let polarity = vote.polarity.to_string();
    let at = encode_dt(now);

    let ids = self
      .write(move |tx| {
        let select = Select::extant("votes", "v", "v.vote_id")
          .filter("v.user_id = ?1 AND v.target_type = ?2 AND v.target_id = ?3 AND v.polarity = ?4");
        let ids: Vec<String> = {
          let mut stmt = tx.prepare_cached(&select.sql())?;
          stmt
            .query_map(rusqlite::params![user, target_type, target_id, polarity], |row| {
              row.get(0)
            })?
            .collect::<rusqlite::Result<_>>()?
        };
        for id in &ids {
          tx.execute(
            "UPDATE votes SET deleted_at = ?1 WHERE vote_id = ?2",
            rusqlite::params![at, id],
          )?;
        }
        Ok(ids)
      })
      .await?;

    ids.iter().map(|id| decode_uuid(id)).collect()
  }

  // ── Deletion ──────────────────────────────────────────────────────────────

  async fn delete_proposition(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let id = encode_uuid(id);
    let at = encode_dt(now);
    self
      .write(move |tx| {
        let changed = tx.execute(
          "UPDATE propositions SET deleted_at = ?1 WHERE proposition_id = ?2 AND deleted_at IS NULL",
          rusqlite::params![at, id],
        )?;
        Ok(changed > 0)
      })
      .await
  }

  async fn delete_justification(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<Option<DeletedJustification>> {
    let root = encode_uuid(id);
    let at = encode_dt(now);

    let counters = self
      .write(move |tx| {
        if fetch::justification(tx, &root)?.is_none() {
          return Ok(None);
        }

        let select = Select::extant("justifications", "j", "j.justification_id")
          .filter("j.target_type = 'JUSTIFICATION' AND j.target_id = ?1")
          .order_by("j.created_at");
        let sql = select.sql();
        let mut counters: Vec<String> = Vec::new();
        let mut frontier = vec![root.clone()];
        while let Some(countered) = frontier.pop() {
          let mut stmt = tx.prepare_cached(&sql)?;
          let found = stmt
            .query_map([&countered], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          frontier.extend(found.iter().cloned());
          counters.extend(found);
        }

        for id in std::iter::once(&root).chain(&counters) {
          tx.execute(
            "UPDATE justifications SET deleted_at = ?1 WHERE justification_id = ?2",
            rusqlite::params![at, id],
          )?;
        }
        Ok(Some(counters))
      })
      .await?;

    let Some(counters) = counters else {
      return Ok(None);
    };
    Ok(Some(DeletedJustification {
      justification_id:          id,
      counter_justification_ids: counters
        .iter()
        .map(|c| decode_uuid(c))
        .collect::<Result<_>>()?,
    }))
  }

  async fn delete_media_excerpt(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool> {
    let id = encode_uuid(id);
    let at = encode_dt(now);
    self
      .write(move |tx| {
        let changed = tx.execute(
          "UPDATE media_excerpts SET deleted_at = ?1
           WHERE media_excerpt_id = ?2 AND deleted_at IS NULL",
          rusqlite::params![at, id],
        )?;
        if changed == 0 {
          return Ok(false);
        }
        for table in ["url_locators", "citations", "media_excerpt_speakers"] {
          tx.execute(
            &format!(
              "UPDATE {table} SET deleted_at = ?1 WHERE media_excerpt_id = ?2 AND deleted_at IS NULL"
            ),
            rusqlite::params![at, id],
          )?;
        }
        Ok(true)
      })
      .await
  }
}
