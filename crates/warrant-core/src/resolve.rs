//! Read-or-create orchestration over an [`ArgumentStore`].
//!
//! Every public `read_or_create_*` validates the whole proposed entity
//! before touching the store, then resolves it bottom-up: leaves first, so
//! that each equivalence check runs against ids that already exist.
//! Statement chains and nested counter-justifications are flattened and
//! walked in reverse rather than recursed into.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
  entity::{EntityType, Proposed, ReadOrCreate},
  error::{Error, Result},
  justification::{
    DeletedJustification, Justification, JustificationBasis, JustificationBasisCompoundAtom,
    JustificationKey, JustificationRootTarget, JustificationTarget, JustificationTree,
    NewJustification, NewJustificationBasis, NewJustificationBasisCompoundAtom,
    NewJustificationTarget, TargetBase, collect_justifications,
  },
  media::{
    MediaExcerpt, MediaExcerptKey, NewMediaExcerpt, NewSource, NewUrl, NewUrlLocator,
    ResolvedUrlLocator, Source, Url, UrlLocator,
  },
  proposition::{NewPersorg, NewProposition, Persorg, Proposition},
  statement::{
    ChainBase, NewStatement, SentenceRef, Statement, StatementChain, StatementKey, StatementLink,
    collect_sentences,
  },
  store::{ArgumentStore, Creation},
  validate::Validate,
  vote::{NewVote, Vote, VoteTargetType},
  writ::{NewSourceExcerptParaphrase, NewWrit, NewWritQuote, Writ, WritQuote, WritQuoteKey},
};

fn validated<T: Validate>(entity_type: EntityType, entity: &T) -> Result<()> {
  entity
    .validate()
    .map_err(|errors| Error::Validation { entity_type, errors })
}

fn found<T>(entity_type: EntityType, id: Uuid, entity: Option<T>) -> Result<T> {
  entity.ok_or(Error::NotFound { entity_type, id })
}

fn logged<T>(entity_type: EntityType, id: Uuid, resolved: ReadOrCreate<T>) -> ReadOrCreate<T> {
  if resolved.is_extant {
    tracing::debug!(%entity_type, %id, "found equivalent");
  } else {
    tracing::debug!(%entity_type, %id, "created");
  }
  resolved
}

/// Everything [`Resolver::main_search`] finds, one list per search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MainSearchResults {
  pub propositions:       Vec<Proposition>,
  pub writs:              Vec<Writ>,
  pub writ_quotes:        Vec<WritQuote>,
  pub writ_quotes_by_url: Vec<WritQuote>,
}

/// Resolves proposed entities to stored ones.
#[derive(Debug, Clone)]
pub struct Resolver<S> {
  store: S,
}

impl<S> Resolver<S>
where
  S: ArgumentStore,
  Error: From<S::Error>,
{
  pub fn new(store: S) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }

  // ─── Reads ───────────────────────────────────────────────────────────────

  pub async fn read_proposition(&self, id: Uuid) -> Result<Proposition> {
    found(EntityType::Proposition, id, self.store.read_proposition(id).await?)
  }

  pub async fn read_statement(&self, id: Uuid) -> Result<Statement> {
    found(EntityType::Statement, id, self.store.read_statement(id).await?)
  }

  pub async fn read_justification(&self, id: Uuid) -> Result<Justification> {
    found(EntityType::Justification, id, self.store.read_justification(id).await?)
  }

  pub async fn read_media_excerpt(&self, id: Uuid) -> Result<MediaExcerpt> {
    found(EntityType::MediaExcerpt, id, self.store.read_media_excerpt(id).await?)
  }

  /// Read a stored statement and every link below it down to its
  /// proposition.
  pub async fn read_statement_chain(&self, id: Uuid) -> Result<StatementChain> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();
    let mut next = id;
    loop {
      if !seen.insert(next) {
        return Err(Error::Consistency(format!("statement chain through {next} is cyclic")));
      }
      let statement = self.read_statement(next).await?;
      let speaker_id = statement.speaker_persorg_id;
      let speaker = found(EntityType::Persorg, speaker_id, self.store.read_persorg(speaker_id).await?)?;
      let sentence = statement.sentence;
      links.push(StatementLink { statement, speaker });
      match sentence {
        SentenceRef::Statement(id) => next = id,
        SentenceRef::Proposition(id) => {
          let proposition = self.read_proposition(id).await?;
          return Ok(StatementChain { links, proposition });
        }
      }
    }
  }

  /// Read every justification rooted at `root_target` and assemble them into
  /// a sorted tree. `user_id` selects whose votes determine precedence.
  pub async fn read_justifications_for_root_target(
    &self,
    root_target: JustificationRootTarget,
    user_id: Option<Uuid>,
  ) -> Result<JustificationTree> {
    match root_target {
      JustificationRootTarget::Proposition(id) => {
        self.read_proposition(id).await?;
      }
      JustificationRootTarget::Statement(id) => {
        self.read_statement(id).await?;
      }
    }
    let rows = self
      .store
      .read_justifications_for_root_target(root_target, user_id)
      .await?;
    JustificationTree::build(root_target, rows)
  }

  pub async fn read_media_excerpts_matching_url(&self, url: &str) -> Result<Vec<MediaExcerpt>> {
    validated(EntityType::Url, &NewUrl::new(url))?;
    Ok(self.store.read_media_excerpts_matching_url(url.to_owned()).await?)
  }

  pub async fn read_media_excerpts_matching_domain(
    &self,
    domain: &str,
  ) -> Result<Vec<MediaExcerpt>> {
    Ok(
      self
        .store
        .read_media_excerpts_matching_domain(domain.trim().to_owned())
        .await?,
    )
  }

  // ─── Search ──────────────────────────────────────────────────────────────

  pub async fn search_propositions(&self, text: &str) -> Result<Vec<Proposition>> {
    Ok(self.store.search_propositions(text.to_owned()).await?)
  }

  pub async fn search_media_excerpts(&self, text: &str) -> Result<Vec<MediaExcerpt>> {
    Ok(self.store.search_media_excerpts(text.to_owned()).await?)
  }

  pub async fn search_sources(&self, text: &str) -> Result<Vec<Source>> {
    Ok(self.store.search_sources(text.to_owned()).await?)
  }

  pub async fn search_persorgs(&self, text: &str) -> Result<Vec<Persorg>> {
    Ok(self.store.search_persorgs(text.to_owned()).await?)
  }

  pub async fn search_writs(&self, text: &str) -> Result<Vec<Writ>> {
    Ok(self.store.search_writs(text.to_owned()).await?)
  }

  pub async fn search_writ_quotes(&self, text: &str) -> Result<Vec<WritQuote>> {
    Ok(self.store.search_writ_quotes(text.to_owned()).await?)
  }

  pub async fn read_writ_quotes_having_url_containing(&self, text: &str) -> Result<Vec<WritQuote>> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(Vec::new());
    }
    Ok(self.store.read_writ_quotes_having_url_containing(text.to_owned()).await?)
  }

  /// Proposition text, writ titles, quote text and quote URLs searched
  /// concurrently. The first failure fails the whole search.
  pub async fn main_search(&self, text: &str) -> Result<MainSearchResults> {
    let (propositions, writs, writ_quotes, writ_quotes_by_url) = futures::try_join!(
      self.search_propositions(text),
      self.search_writs(text),
      self.search_writ_quotes(text),
      self.read_writ_quotes_having_url_containing(text),
    )?;
    tracing::debug!(
      propositions = propositions.len(),
      writs = writs.len(),
      writ_quotes = writ_quotes.len(),
      writ_quotes_by_url = writ_quotes_by_url.len(),
      "main search"
    );
    Ok(MainSearchResults { propositions, writs, writ_quotes, writ_quotes_by_url })
  }

  // ─── Read-or-create ──────────────────────────────────────────────────────

  pub async fn read_or_create_proposition(
    &self,
    proposed: Proposed<NewProposition>,
    creator_user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<Proposition>> {
    validated(EntityType::Proposition, &proposed)?;
    self.proposition(&proposed, Creation::new(creator_user_id, now)).await
  }

  pub async fn read_or_create_persorg(
    &self,
    proposed: Proposed<NewPersorg>,
    creator_user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<Persorg>> {
    validated(EntityType::Persorg, &proposed)?;
    self.persorg(&proposed, Creation::new(creator_user_id, now)).await
  }

  pub async fn read_or_create_writ_quote(
    &self,
    proposed: Proposed<NewWritQuote>,
    creator_user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<WritQuote>> {
    validated(EntityType::WritQuote, &proposed)?;
    self.writ_quote(&proposed, Creation::new(creator_user_id, now)).await
  }

  /// Resolve a statement chain bottom-up. The result is extant only if
  /// every link of the chain already existed.
  pub async fn read_or_create_statement(
    &self,
    proposed: Proposed<NewStatement>,
    creator_user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<Statement>> {
    validated(EntityType::Statement, &proposed)?;
    self.statement(&proposed, Creation::new(creator_user_id, now)).await
  }

  /// Resolve a justification, resolving any nested counter-justification
  /// targets first. The result is extant only if every justification of the
  /// nesting already existed.
  pub async fn read_or_create_justification(
    &self,
    proposed: Proposed<NewJustification>,
    creator_user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<Justification>> {
    validated(EntityType::Justification, &proposed)?;
    let creation = Creation::new(creator_user_id, now);
    match &proposed {
      Proposed::Existing(r) => Ok(ReadOrCreate::extant(self.read_justification(r.id).await?)),
      Proposed::New(justification) => self.justification(justification, creation).await,
    }
  }

  /// Resolve a media excerpt, then read or create each of its locators and
  /// citations and link its speakers. `is_extant` reports whether the
  /// excerpt itself already existed.
  pub async fn read_or_create_media_excerpt(
    &self,
    proposed: Proposed<NewMediaExcerpt>,
    creator_user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<MediaExcerpt>> {
    validated(EntityType::MediaExcerpt, &proposed)?;
    self.media_excerpt(&proposed, Creation::new(creator_user_id, now)).await
  }

  /// Read or create a locator on an existing media excerpt.
  pub async fn read_or_create_url_locator(
    &self,
    media_excerpt_id: Uuid,
    proposed: NewUrlLocator,
    creator_user_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<UrlLocator>> {
    validated(EntityType::UrlLocator, &proposed)?;
    self.read_media_excerpt(media_excerpt_id).await?;
    let creation = Creation::new(creator_user_id, now);
    let locator = ResolvedUrlLocator {
      url:     self.url(&proposed.url, creation).await?,
      anchors: proposed.anchors,
    };
    let resolved = self
      .store
      .read_or_create_url_locator(media_excerpt_id, locator, creation)
      .await?;
    Ok(logged(EntityType::UrlLocator, resolved.entity.url_locator_id, resolved))
  }

  // ─── Votes & deletion ────────────────────────────────────────────────────

  pub async fn record_vote(
    &self,
    user_id: Uuid,
    vote: NewVote,
    now: DateTime<Utc>,
  ) -> Result<ReadOrCreate<Vote>> {
    self.require_vote_target(vote).await?;
    let resolved = self.store.record_vote(user_id, vote, now).await?;
    Ok(logged(EntityType::Vote, resolved.entity.vote_id, resolved))
  }

  pub async fn delete_vote(&self, user_id: Uuid, vote: NewVote, now: DateTime<Utc>) -> Result<Vec<Uuid>> {
    Ok(self.store.delete_vote(user_id, vote, now).await?)
  }

  pub async fn delete_proposition(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
    if !self.store.delete_proposition(id, now).await? {
      return Err(Error::NotFound { entity_type: EntityType::Proposition, id });
    }
    Ok(())
  }

  /// Soft-delete a justification and all of its counter-justifications.
  pub async fn delete_justification(
    &self,
    id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<DeletedJustification> {
    let deleted = found(
      EntityType::Justification,
      id,
      self.store.delete_justification(id, now).await?,
    )?;
    tracing::debug!(
      %id,
      counters = deleted.counter_justification_ids.len(),
      "deleted justification"
    );
    Ok(deleted)
  }

  pub async fn delete_media_excerpt(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
    if !self.store.delete_media_excerpt(id, now).await? {
      return Err(Error::NotFound { entity_type: EntityType::MediaExcerpt, id });
    }
    Ok(())
  }

  async fn require_vote_target(&self, vote: NewVote) -> Result<()> {
    let id = vote.target_id;
    match vote.target_type {
      VoteTargetType::Proposition => {
        self.read_proposition(id).await?;
      }
      VoteTargetType::Statement => {
        self.read_statement(id).await?;
      }
      VoteTargetType::Justification => {
        self.read_justification(id).await?;
      }
    }
    Ok(())
  }

  // ─── Leaves ──────────────────────────────────────────────────────────────
  //
  // Everything below assumes its input has been validated.

  async fn proposition(
    &self,
    proposed: &Proposed<NewProposition>,
    creation: Creation,
  ) -> Result<ReadOrCreate<Proposition>> {
    match proposed {
      Proposed::Existing(r) => Ok(ReadOrCreate::extant(self.read_proposition(r.id).await?)),
      Proposed::New(p) => {
        let resolved = self.store.read_or_create_proposition(p.clone(), creation).await?;
        Ok(logged(EntityType::Proposition, resolved.entity.proposition_id, resolved))
      }
    }
  }

  async fn persorg(
    &self,
    proposed: &Proposed<NewPersorg>,
    creation: Creation,
  ) -> Result<ReadOrCreate<Persorg>> {
    match proposed {
      Proposed::Existing(r) => {
        let persorg = found(EntityType::Persorg, r.id, self.store.read_persorg(r.id).await?)?;
        Ok(ReadOrCreate::extant(persorg))
      }
      Proposed::New(p) => {
        let resolved = self.store.read_or_create_persorg(p.clone(), creation).await?;
        Ok(logged(EntityType::Persorg, resolved.entity.persorg_id, resolved))
      }
    }
  }

  async fn source(&self, proposed: &Proposed<NewSource>, creation: Creation) -> Result<Source> {
    match proposed {
      Proposed::Existing(r) => found(EntityType::Source, r.id, self.store.read_source(r.id).await?),
      Proposed::New(s) => {
        let resolved = self.store.read_or_create_source(s.clone(), creation).await?;
        Ok(logged(EntityType::Source, resolved.entity.source_id, resolved).entity)
      }
    }
  }

  async fn url(&self, proposed: &Proposed<NewUrl>, creation: Creation) -> Result<Url> {
    match proposed {
      Proposed::Existing(r) => found(EntityType::Url, r.id, self.store.read_url(r.id).await?),
      Proposed::New(u) => {
        let resolved = self.store.read_or_create_url(u.clone(), creation).await?;
        Ok(logged(EntityType::Url, resolved.entity.url_id, resolved).entity)
      }
    }
  }

  async fn writ_id(&self, proposed: &Proposed<NewWrit>, creation: Creation) -> Result<Uuid> {
    match proposed {
      Proposed::Existing(r) => {
        found(EntityType::Writ, r.id, self.store.read_writ(r.id).await?).map(|w| w.writ_id)
      }
      Proposed::New(w) => {
        let resolved = self.store.read_or_create_writ(w.clone(), creation).await?;
        Ok(logged(EntityType::Writ, resolved.entity.writ_id, resolved).entity.writ_id)
      }
    }
  }

  async fn writ_quote(
    &self,
    proposed: &Proposed<NewWritQuote>,
    creation: Creation,
  ) -> Result<ReadOrCreate<WritQuote>> {
    let quote = match proposed {
      Proposed::Existing(r) => {
        let quote = found(EntityType::WritQuote, r.id, self.store.read_writ_quote(r.id).await?)?;
        return Ok(ReadOrCreate::extant(quote));
      }
      Proposed::New(quote) => quote,
    };
    let writ_id = self.writ_id(&quote.writ, creation).await?;
    let mut url_ids = Vec::with_capacity(quote.urls.len());
    for url in &quote.urls {
      url_ids.push(self.url(url, creation).await?.url_id);
    }
    let key = WritQuoteKey::new(writ_id, &quote.quote_text);
    let resolved = self.store.read_or_create_writ_quote(key, url_ids, creation).await?;
    Ok(logged(EntityType::WritQuote, resolved.entity.writ_quote_id, resolved))
  }

  // ─── Statement chains ────────────────────────────────────────────────────

  async fn statement(
    &self,
    proposed: &Proposed<NewStatement>,
    creation: Creation,
  ) -> Result<ReadOrCreate<Statement>> {
    let head = match proposed {
      Proposed::Existing(r) => return Ok(ReadOrCreate::extant(self.read_statement(r.id).await?)),
      Proposed::New(head) => head,
    };

    let (statements, base) = collect_sentences(head);
    let (mut sentence, root_proposition_id, mut is_extant) = match base {
      ChainBase::Proposition(proposition) => {
        let resolved = self.proposition(proposition, creation).await?;
        let id = resolved.entity.proposition_id;
        (SentenceRef::Proposition(id), id, resolved.is_extant)
      }
      ChainBase::Statement(id) => {
        let statement = self.read_statement(id).await?;
        (SentenceRef::Statement(id), statement.root_proposition_id, true)
      }
    };

    let mut resolved_head = None;
    for statement in statements.into_iter().rev() {
      let speaker = self.persorg(&statement.speaker, creation).await?;
      let key = StatementKey {
        speaker_persorg_id: speaker.entity.persorg_id,
        sentence,
        root_proposition_id,
      };
      let resolved = self.store.read_or_create_statement(key, creation).await?;
      let resolved = logged(EntityType::Statement, resolved.entity.statement_id, resolved);
      is_extant &= resolved.is_extant;
      sentence = SentenceRef::Statement(resolved.entity.statement_id);
      resolved_head = Some(resolved.entity);
    }

    let entity = resolved_head
      .ok_or_else(|| Error::Consistency("statement chain resolved no statements".to_owned()))?;
    Ok(ReadOrCreate { entity, is_extant })
  }

  // ─── Justifications ──────────────────────────────────────────────────────

  async fn justification(
    &self,
    head: &NewJustification,
    creation: Creation,
  ) -> Result<ReadOrCreate<Justification>> {
    let (justifications, base) = collect_justifications(head);

    // The countered justification's root polarity, once targets are
    // justifications.
    let (mut target, root_target, mut countered_root_polarity, mut is_extant) = match base {
      TargetBase::Root(NewJustificationTarget::Proposition(proposition)) => {
        let resolved = self.proposition(proposition, creation).await?;
        let id = resolved.entity.proposition_id;
        (
          JustificationTarget::Proposition(id),
          JustificationRootTarget::Proposition(id),
          None,
          resolved.is_extant,
        )
      }
      TargetBase::Root(NewJustificationTarget::Statement(statement)) => {
        let resolved = self.statement(statement, creation).await?;
        let id = resolved.entity.statement_id;
        (
          JustificationTarget::Statement(id),
          JustificationRootTarget::Statement(id),
          None,
          resolved.is_extant,
        )
      }
      TargetBase::Root(NewJustificationTarget::Justification(_)) => {
        return Err(Error::Consistency(
          "justification chain bottomed out at a justification target".to_owned(),
        ));
      }
      TargetBase::Justification(id) => {
        let countered = self.read_justification(id).await?;
        (
          JustificationTarget::Justification(id),
          countered.root_target,
          Some(countered.root_polarity),
          true,
        )
      }
    };

    let mut resolved_head = None;
    for justification in justifications.into_iter().rev() {
      let basis = self.basis(&justification.basis, creation).await?;
      let root_polarity = match countered_root_polarity {
        Some(countered) => countered.negate(),
        None => justification.polarity,
      };
      let key = JustificationKey {
        target,
        basis,
        polarity: justification.polarity,
        root_target,
        root_polarity,
      };
      let resolved = self.store.read_or_create_justification(key, creation).await?;
      let resolved = logged(EntityType::Justification, resolved.entity.justification_id, resolved);
      is_extant &= resolved.is_extant;
      target = JustificationTarget::Justification(resolved.entity.justification_id);
      countered_root_polarity = Some(resolved.entity.root_polarity);
      resolved_head = Some(resolved.entity);
    }

    let entity = resolved_head
      .ok_or_else(|| Error::Consistency("justification chain resolved nothing".to_owned()))?;
    Ok(ReadOrCreate { entity, is_extant })
  }

  async fn basis(
    &self,
    basis: &NewJustificationBasis,
    creation: Creation,
  ) -> Result<JustificationBasis> {
    match basis {
      NewJustificationBasis::PropositionCompound(Proposed::Existing(r)) => {
        let compound = found(
          EntityType::PropositionCompound,
          r.id,
          self.store.read_proposition_compound(r.id).await?,
        )?;
        Ok(JustificationBasis::PropositionCompound(compound.proposition_compound_id))
      }
      NewJustificationBasis::PropositionCompound(Proposed::New(compound)) => {
        let mut atom_ids = Vec::with_capacity(compound.atoms.len());
        for atom in &compound.atoms {
          atom_ids.push(self.proposition(&atom.entity, creation).await?.entity.proposition_id);
        }
        let resolved = self
          .store
          .read_or_create_proposition_compound(atom_ids, creation)
          .await?;
        let id = resolved.entity.proposition_compound_id;
        logged(EntityType::PropositionCompound, id, resolved);
        Ok(JustificationBasis::PropositionCompound(id))
      }
      NewJustificationBasis::WritQuote(quote) => {
        let resolved = self.writ_quote(quote, creation).await?;
        Ok(JustificationBasis::WritQuote(resolved.entity.writ_quote_id))
      }
      NewJustificationBasis::JustificationBasisCompound(Proposed::Existing(r)) => {
        let compound = found(
          EntityType::JustificationBasisCompound,
          r.id,
          self.store.read_justification_basis_compound(r.id).await?,
        )?;
        Ok(JustificationBasis::JustificationBasisCompound(
          compound.justification_basis_compound_id,
        ))
      }
      NewJustificationBasis::JustificationBasisCompound(Proposed::New(compound)) => {
        let mut atoms = Vec::with_capacity(compound.atoms.len());
        for atom in &compound.atoms {
          atoms.push(match atom {
            NewJustificationBasisCompoundAtom::Proposition(p) => {
              let resolved = self.proposition(p, creation).await?;
              JustificationBasisCompoundAtom::Proposition(resolved.entity.proposition_id)
            }
            NewJustificationBasisCompoundAtom::SourceExcerptParaphrase(s) => {
              JustificationBasisCompoundAtom::SourceExcerptParaphrase(
                self.source_excerpt_paraphrase(s, creation).await?,
              )
            }
          });
        }
        let resolved = self
          .store
          .read_or_create_justification_basis_compound(atoms, creation)
          .await?;
        let id = resolved.entity.justification_basis_compound_id;
        logged(EntityType::JustificationBasisCompound, id, resolved);
        Ok(JustificationBasis::JustificationBasisCompound(id))
      }
      NewJustificationBasis::MediaExcerpt(excerpt) => {
        let resolved = self.media_excerpt(excerpt, creation).await?;
        Ok(JustificationBasis::MediaExcerpt(resolved.entity.media_excerpt_id))
      }
    }
  }

  async fn source_excerpt_paraphrase(
    &self,
    proposed: &Proposed<NewSourceExcerptParaphrase>,
    creation: Creation,
  ) -> Result<Uuid> {
    let paraphrase = match proposed {
      Proposed::Existing(r) => {
        return found(
          EntityType::SourceExcerptParaphrase,
          r.id,
          self.store.read_source_excerpt_paraphrase(r.id).await?,
        )
        .map(|p| p.source_excerpt_paraphrase_id);
      }
      Proposed::New(paraphrase) => paraphrase,
    };
    let proposition = self
      .proposition(&paraphrase.paraphrasing_proposition, creation)
      .await?;
    let quote = self.writ_quote(&paraphrase.source_excerpt, creation).await?;
    let resolved = self
      .store
      .read_or_create_source_excerpt_paraphrase(
        proposition.entity.proposition_id,
        quote.entity.writ_quote_id,
        creation,
      )
      .await?;
    let id = resolved.entity.source_excerpt_paraphrase_id;
    logged(EntityType::SourceExcerptParaphrase, id, resolved);
    Ok(id)
  }

  // ─── Media excerpts ──────────────────────────────────────────────────────

  async fn media_excerpt(
    &self,
    proposed: &Proposed<NewMediaExcerpt>,
    creation: Creation,
  ) -> Result<ReadOrCreate<MediaExcerpt>> {
    let excerpt = match proposed {
      Proposed::Existing(r) => {
        return Ok(ReadOrCreate::extant(self.read_media_excerpt(r.id).await?));
      }
      Proposed::New(excerpt) => excerpt,
    };

    let mut locators = Vec::with_capacity(excerpt.locators.url_locators.len());
    for locator in &excerpt.locators.url_locators {
      locators.push(ResolvedUrlLocator {
        url:     self.url(&locator.url, creation).await?,
        anchors: locator.anchors.clone(),
      });
    }
    let mut sources = Vec::with_capacity(excerpt.citations.len());
    for citation in &excerpt.citations {
      sources.push(self.source(&citation.source, creation).await?);
    }

    let key = MediaExcerptKey::new(
      &excerpt.local_rep,
      locators.iter().map(|l| l.url.clone()).collect(),
      sources.iter().map(|s| s.source_id).collect(),
    );
    let resolved = self.store.read_or_create_media_excerpt(key, creation).await?;
    let id = resolved.entity;
    let is_extant = logged(EntityType::MediaExcerpt, id, resolved).is_extant;

    for locator in locators {
      let resolved = self.store.read_or_create_url_locator(id, locator, creation).await?;
      logged(EntityType::UrlLocator, resolved.entity.url_locator_id, resolved);
    }
    for (citation, source) in excerpt.citations.iter().zip(sources) {
      let resolved = self
        .store
        .read_or_create_citation(id, source, citation.pincite.clone(), creation)
        .await?;
      logged(EntityType::Citation, resolved.entity.source.source_id, resolved);
    }
    for speaker in &excerpt.speakers {
      let persorg = self.persorg(speaker, creation).await?;
      self
        .store
        .link_media_excerpt_speaker(id, persorg.entity.persorg_id, creation)
        .await?;
    }

    let entity = self.store.read_media_excerpt(id).await?.ok_or_else(|| {
      Error::Consistency(format!("media excerpt {id} vanished after read-or-create"))
    })?;
    Ok(ReadOrCreate { entity, is_extant })
  }
}

