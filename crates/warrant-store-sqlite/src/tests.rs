//! Integration tests for `SqliteStore` against an in-memory database, driven
//! through the core `Resolver`.

use chrono::Utc;
use uuid::Uuid;
use warrant_core::{
  EntityType, Error as CoreError, Proposed, Resolver,
  justification::{
    JustificationRootTarget, NewJustification, NewJustificationBasis,
    NewJustificationBasisCompound, NewJustificationBasisCompoundAtom, NewJustificationTarget,
    NewPropositionCompound, Polarity,
  },
  media::{DomAnchor, NewMediaExcerpt, NewUrl, NewUrlLocator},
  proposition::{NewPersorg, NewProposition},
  statement::NewStatement,
  store::ArgumentStore,
  vote::{NewVote, VotePolarity, VoteTargetType},
  writ::{NewSourceExcerptParaphrase, NewWrit, NewWritQuote},
};

use crate::SqliteStore;

async fn resolver() -> Resolver<SqliteStore> {
  Resolver::new(
    SqliteStore::open_in_memory()
      .await
      .expect("in-memory store"),
  )
}

fn user() -> Uuid { Uuid::from_u128(0x5eed) }

fn compound(texts: &[&str]) -> NewJustificationBasis {
  NewJustificationBasis::PropositionCompound(
    NewPropositionCompound::of_texts(texts.iter().copied()).into(),
  )
}

fn supports(proposition: &str, basis: &[&str]) -> NewJustification {
  NewJustification {
    target:   NewJustificationTarget::Proposition(NewProposition::new(proposition).into()),
    basis:    compound(basis),
    polarity: Polarity::Positive,
  }
}

fn countering(id: Uuid, basis: &[&str]) -> NewJustification {
  NewJustification::counter(Proposed::<NewJustification>::existing(id), compound(basis))
}

fn anchor(exact: &str, start: i64) -> DomAnchor {
  DomAnchor {
    exact_text:   exact.into(),
    prefix_text:  "before ".into(),
    suffix_text:  " after".into(),
    start_offset: start,
    end_offset:   start + exact.len() as i64,
  }
}

fn excerpt_at(quotation: &str, url: &str, anchors: Vec<DomAnchor>) -> NewMediaExcerpt {
  let mut excerpt = NewMediaExcerpt::quotation(quotation).with_url(url);
  excerpt.locators.url_locators[0].anchors = anchors;
  excerpt
}

// ─── Propositions ────────────────────────────────────────────────────────────

#[tokio::test]
async fn proposition_read_or_create_is_idempotent() {
  let r = resolver().await;

  let first = r
    .read_or_create_proposition(NewProposition::new("The tallest man.").into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!first.is_extant);
  assert_eq!(first.entity.normal_text, "the tallest man");

  let second = r
    .read_or_create_proposition(
      NewProposition::new("  the TALLEST   man ").into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(second.is_extant);
  assert_eq!(second.entity.proposition_id, first.entity.proposition_id);
  assert_eq!(second.entity.text, "The tallest man.");
}

#[tokio::test]
async fn missing_reference_is_not_found() {
  let r = resolver().await;
  let id = Uuid::new_v4();

  let err = r
    .read_or_create_proposition(Proposed::existing(id), user(), Utc::now())
    .await
    .unwrap_err();
  assert!(matches!(
    err,
    CoreError::NotFound { entity_type: EntityType::Proposition, id: missing } if missing == id
  ));
  assert!(!err.is_fault());
}

#[tokio::test]
async fn soft_deleted_proposition_is_invisible() {
  let r = resolver().await;
  let created = r
    .read_or_create_proposition(NewProposition::new("Water is wet").into(), user(), Utc::now())
    .await
    .unwrap();
  let id = created.entity.proposition_id;

  r.delete_proposition(id, Utc::now()).await.unwrap();

  assert!(matches!(
    r.read_proposition(id).await,
    Err(CoreError::NotFound { .. })
  ));
  assert!(r.search_propositions("water wet").await.unwrap().is_empty());

  let recreated = r
    .read_or_create_proposition(NewProposition::new("water is wet").into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!recreated.is_extant);
  assert_ne!(recreated.entity.proposition_id, id);

  assert!(matches!(
    r.delete_proposition(id, Utc::now()).await,
    Err(CoreError::NotFound { .. })
  ));
}

#[tokio::test]
async fn validation_fails_before_anything_is_written() {
  let r = resolver().await;
  let proposed = supports("   ", &["an entirely novel basis"]);

  let err = r
    .read_or_create_justification(proposed.into(), user(), Utc::now())
    .await
    .unwrap_err();
  let CoreError::Validation { entity_type, errors } = err else {
    panic!("expected a validation error, got {err:?}");
  };
  assert_eq!(entity_type, EntityType::Justification);
  assert!(errors.get("target.entity.text").is_some());

  assert!(
    r.search_propositions("entirely novel basis")
      .await
      .unwrap()
      .is_empty()
  );
}

// ─── Statements ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn statement_chain_reuses_existing_links() {
  let r = resolver().await;

  let inner = r
    .read_or_create_statement(
      NewStatement::of_proposition(NewPersorg::person("Carol"), NewProposition::new("P")).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(!inner.is_extant);

  let chain = || {
    NewStatement::of_statement(
      NewPersorg::person("Alice"),
      NewStatement::of_statement(
        NewPersorg::person("Bob"),
        NewStatement::of_proposition(NewPersorg::person("carol"), NewProposition::new("p.")),
      ),
    )
  };

  let head = r
    .read_or_create_statement(chain().into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!head.is_extant);
  assert_eq!(head.entity.root_proposition_id, inner.entity.root_proposition_id);

  let read = r.read_statement_chain(head.entity.statement_id).await.unwrap();
  assert_eq!(read.depth(), 3);
  assert_eq!(read.links[0].speaker.name, "Alice");
  assert_eq!(read.links[2].statement.statement_id, inner.entity.statement_id);
  assert_eq!(read.proposition.proposition_id, inner.entity.root_proposition_id);

  let again = r
    .read_or_create_statement(chain().into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(again.is_extant);
  assert_eq!(again.entity.statement_id, head.entity.statement_id);
}

#[tokio::test]
async fn statement_can_rest_on_a_stored_statement() {
  let r = resolver().await;
  let base = r
    .read_or_create_statement(
      NewStatement::of_proposition(NewPersorg::person("Dan"), NewProposition::new("Q")).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();

  let head = r
    .read_or_create_statement(
      NewStatement::of_statement(
        NewPersorg::person("Eve"),
        Proposed::<NewStatement>::existing(base.entity.statement_id),
      )
      .into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(!head.is_extant);
  assert_eq!(head.entity.root_proposition_id, base.entity.root_proposition_id);
}

// ─── Justifications ──────────────────────────────────────────────────────────

#[tokio::test]
async fn justification_equivalence_uses_resolved_basis() {
  let r = resolver().await;

  let first = r
    .read_or_create_justification(supports("Sky is blue", &["Rayleigh scattering"]).into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!first.is_extant);
  assert_eq!(first.entity.root_polarity, Polarity::Positive);

  let second = r
    .read_or_create_justification(supports("sky is blue!", &["rayleigh  scattering"]).into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(second.is_extant);
  assert_eq!(second.entity.justification_id, first.entity.justification_id);

  let reordered = r
    .read_or_create_justification(
      supports("Sky is blue", &["b", "a"]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  let ordered = r
    .read_or_create_justification(
      supports("Sky is blue", &["a", "b"]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(!ordered.is_extant);
  assert_ne!(ordered.entity.basis, reordered.entity.basis);
}

#[tokio::test]
async fn counter_root_polarity_alternates_down_the_chain() {
  let r = resolver().await;
  let root = r
    .read_or_create_justification(supports("Claim", &["Reason"]).into(), user(), Utc::now())
    .await
    .unwrap()
    .entity;

  let counter = r
    .read_or_create_justification(
      countering(root.justification_id, &["Objection"]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap()
    .entity;
  assert_eq!(counter.polarity, Polarity::Negative);
  assert_eq!(counter.root_polarity, Polarity::Negative);
  assert_eq!(counter.root_target, root.root_target);

  let rebuttal = r
    .read_or_create_justification(
      countering(counter.justification_id, &["Rebuttal"]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap()
    .entity;
  assert_eq!(rebuttal.root_polarity, Polarity::Positive);
  assert_eq!(rebuttal.root_target, root.root_target);
}

#[tokio::test]
async fn nested_counter_targets_resolve_bottom_up() {
  let r = resolver().await;
  let root = r
    .read_or_create_justification(supports("Claim", &["Reason"]).into(), user(), Utc::now())
    .await
    .unwrap()
    .entity;

  let nested = || {
    NewJustification::counter(
      countering(root.justification_id, &["Objection"]),
      compound(&["Rebuttal"]),
    )
  };
  let head = r
    .read_or_create_justification(nested().into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!head.is_extant);
  assert_eq!(head.entity.root_polarity, Polarity::Positive);

  let again = r
    .read_or_create_justification(nested().into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(again.is_extant);
  assert_eq!(again.entity.justification_id, head.entity.justification_id);

  let tree = r
    .read_justifications_for_root_target(root.root_target, None)
    .await
    .unwrap();
  assert_eq!(tree.len(), 3);
  let roots: Vec<_> = tree.roots().collect();
  assert_eq!(roots.len(), 1);
  let counters: Vec<_> = roots[0].counter_justifications().collect();
  assert_eq!(counters.len(), 1);
  let rebuttals: Vec<_> = counters[0].counter_justifications().collect();
  assert_eq!(rebuttals[0].justification().justification_id, head.entity.justification_id);
}

#[tokio::test]
async fn positive_counter_is_rejected() {
  let r = resolver().await;
  let mut counter = countering(Uuid::new_v4(), &["x"]);
  counter.polarity = Polarity::Positive;

  let err = r
    .read_or_create_justification(counter.into(), user(), Utc::now())
    .await
    .unwrap_err();
  let CoreError::Validation { errors, .. } = err else {
    panic!("expected a validation error, got {err:?}");
  };
  assert!(errors.get("polarity").is_some());
}

#[tokio::test]
async fn tree_for_missing_root_is_not_found() {
  let r = resolver().await;
  let err = r
    .read_justifications_for_root_target(JustificationRootTarget::Proposition(Uuid::new_v4()), None)
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::NotFound { entity_type: EntityType::Proposition, .. }));
}

#[tokio::test]
async fn verified_justifications_sort_first() {
  let r = resolver().await;
  let mut ids = Vec::new();
  for basis in ["First", "Second", "Third"] {
    let j = r
      .read_or_create_justification(supports("Sorted claim", &[basis]).into(), user(), Utc::now())
      .await
      .unwrap()
      .entity;
    ids.push(j.justification_id);
  }
  let root_target = r.read_justification(ids[0]).await.unwrap().root_target;

  let vote = |target_id, polarity| NewVote {
    target_type: VoteTargetType::Justification,
    target_id,
    polarity,
  };
  r.record_vote(user(), vote(ids[2], VotePolarity::Positive), Utc::now())
    .await
    .unwrap();
  r.record_vote(user(), vote(ids[0], VotePolarity::Negative), Utc::now())
    .await
    .unwrap();

  let tree = r
    .read_justifications_for_root_target(root_target, Some(user()))
    .await
    .unwrap();
  let order: Vec<Uuid> = tree.roots().map(|n| n.justification().justification_id).collect();
  assert_eq!(order, vec![ids[2], ids[1], ids[0]]);
  assert_eq!(
    tree.get(ids[2]).unwrap().justification().current_vote,
    Some(VotePolarity::Positive)
  );

  let anonymous = r
    .read_justifications_for_root_target(root_target, None)
    .await
    .unwrap();
  let order: Vec<Uuid> = anonymous.roots().map(|n| n.justification().justification_id).collect();
  assert_eq!(order, ids);

  let someone_else = r
    .read_justifications_for_root_target(root_target, Some(Uuid::new_v4()))
    .await
    .unwrap();
  assert!(someone_else.iter().all(|j| j.current_vote.is_none()));
}

#[tokio::test]
async fn opposing_vote_replaces_the_previous_one() {
  let r = resolver().await;
  let j = r
    .read_or_create_justification(supports("Voted claim", &["basis"]).into(), user(), Utc::now())
    .await
    .unwrap()
    .entity;
  let mut vote = NewVote {
    target_type: VoteTargetType::Justification,
    target_id:   j.justification_id,
    polarity:    VotePolarity::Negative,
  };

  let down = r.record_vote(user(), vote, Utc::now()).await.unwrap();
  assert!(!down.is_extant);
  let again = r.record_vote(user(), vote, Utc::now()).await.unwrap();
  assert!(again.is_extant);
  assert_eq!(again.entity.vote_id, down.entity.vote_id);

  vote.polarity = VotePolarity::Positive;
  let up = r.record_vote(user(), vote, Utc::now()).await.unwrap();
  assert!(!up.is_extant);

  let history = r
    .store()
    .read_vote_history(user(), VoteTargetType::Justification, j.justification_id)
    .await
    .unwrap();
  assert_eq!(history.len(), 2);
  assert!(history[0].deleted_at.is_some());
  assert_eq!(history[1].polarity, VotePolarity::Positive);
  assert!(history[1].deleted_at.is_none());

  let deleted = r.delete_vote(user(), vote, Utc::now()).await.unwrap();
  assert_eq!(deleted, vec![up.entity.vote_id]);
}

#[tokio::test]
async fn vote_on_missing_target_is_not_found() {
  let r = resolver().await;
  let vote = NewVote {
    target_type: VoteTargetType::Statement,
    target_id:   Uuid::new_v4(),
    polarity:    VotePolarity::Positive,
  };
  let err = r.record_vote(user(), vote, Utc::now()).await.unwrap_err();
  assert!(matches!(err, CoreError::NotFound { entity_type: EntityType::Statement, .. }));
}

#[tokio::test]
async fn deleting_a_justification_deletes_its_counters() {
  let r = resolver().await;
  let root = r
    .read_or_create_justification(supports("Doomed claim", &["basis"]).into(), user(), Utc::now())
    .await
    .unwrap()
    .entity;
  let counter = r
    .read_or_create_justification(
      countering(root.justification_id, &["no"]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap()
    .entity;
  let rebuttal = r
    .read_or_create_justification(
      countering(counter.justification_id, &["yes"]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap()
    .entity;

  let deleted = r.delete_justification(root.justification_id, Utc::now()).await.unwrap();
  assert_eq!(deleted.justification_id, root.justification_id);
  let mut counters = deleted.counter_justification_ids.clone();
  counters.sort();
  let mut expected = vec![counter.justification_id, rebuttal.justification_id];
  expected.sort();
  assert_eq!(counters, expected);

  assert!(matches!(
    r.read_justification(rebuttal.justification_id).await,
    Err(CoreError::NotFound { .. })
  ));
  let tree = r
    .read_justifications_for_root_target(root.root_target, None)
    .await
    .unwrap();
  assert!(tree.is_empty());

  assert!(matches!(
    r.delete_justification(root.justification_id, Utc::now()).await,
    Err(CoreError::NotFound { entity_type: EntityType::Justification, .. })
  ));
}

// ─── Writ quotes & compounds ─────────────────────────────────────────────────

#[tokio::test]
async fn writ_quote_urls_accumulate() {
  let r = resolver().await;
  let quote = |url: &str| NewWritQuote {
    quote_text: "It was the best of times.".into(),
    writ:       NewWrit { title: "A Tale of Two Cities".into() }.into(),
    urls:       vec![NewUrl::new(url).into()],
  };

  let first = r
    .read_or_create_writ_quote(quote("https://example.com/tale").into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!first.is_extant);

  let second = r
    .read_or_create_writ_quote(quote("https://books.example.org/tale").into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(second.is_extant);
  assert_eq!(second.entity.writ_quote_id, first.entity.writ_quote_id);
  assert_eq!(second.entity.urls.len(), 2);
  assert_eq!(second.entity.writ.title, "A Tale of Two Cities");
}

#[tokio::test]
async fn basis_compound_with_paraphrase_is_idempotent() {
  let r = resolver().await;
  let proposal = || NewJustification {
    target:   NewJustificationTarget::Proposition(NewProposition::new("Times were good").into()),
    basis:    NewJustificationBasis::JustificationBasisCompound(
      NewJustificationBasisCompound {
        atoms: vec![
          NewJustificationBasisCompoundAtom::Proposition(NewProposition::new("Dickens said so").into()),
          NewJustificationBasisCompoundAtom::SourceExcerptParaphrase(
            NewSourceExcerptParaphrase {
              paraphrasing_proposition: NewProposition::new("The times were the best").into(),
              source_excerpt:           NewWritQuote {
                quote_text: "It was the best of times".into(),
                writ:       NewWrit { title: "A Tale of Two Cities".into() }.into(),
                urls:       vec![],
              }
              .into(),
            }
            .into(),
          ),
        ],
      }
      .into(),
    ),
    polarity: Polarity::Positive,
  };

  let first = r
    .read_or_create_justification(proposal().into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!first.is_extant);
  let again = r
    .read_or_create_justification(proposal().into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(again.is_extant);

  let compound = r
    .store()
    .read_justification_basis_compound(first.entity.basis.id())
    .await
    .unwrap()
    .expect("stored compound");
  assert_eq!(compound.atoms.len(), 2);
}

// ─── Media excerpts ──────────────────────────────────────────────────────────

#[tokio::test]
async fn media_excerpt_is_idempotent() {
  let r = resolver().await;
  let proposal = || {
    excerpt_at("The quote.", "https://example.com/page", vec![anchor("quote", 4)])
      .with_source("The Book")
  };

  let first = r
    .read_or_create_media_excerpt(proposal().into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!first.is_extant);
  assert_eq!(first.entity.locators.url_locators.len(), 1);
  assert_eq!(first.entity.citations.len(), 1);

  let second = r
    .read_or_create_media_excerpt(proposal().into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(second.is_extant);
  assert_eq!(second.entity.media_excerpt_id, first.entity.media_excerpt_id);
  assert_eq!(second.entity.locators.url_locators.len(), 1);
  assert_eq!(second.entity.citations.len(), 1);
}

#[tokio::test]
async fn anchor_superset_or_changed_field_adds_a_locator() {
  let r = resolver().await;
  let url = "https://example.com/page";
  let first = r
    .read_or_create_media_excerpt(
      excerpt_at("Quoted", url, vec![anchor("Quoted", 10)]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();

  let superset = r
    .read_or_create_media_excerpt(
      excerpt_at("quoted", url, vec![anchor("Quoted", 10), anchor("Quoted", 90)]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(superset.is_extant);
  assert_eq!(superset.entity.media_excerpt_id, first.entity.media_excerpt_id);
  assert_eq!(superset.entity.locators.url_locators.len(), 2);

  let mut shifted = anchor("Quoted", 10);
  shifted.suffix_text = " elsewhere".into();
  let changed = r
    .read_or_create_media_excerpt(
      excerpt_at("Quoted", url, vec![shifted]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert_eq!(changed.entity.locators.url_locators.len(), 3);

  let same = r
    .read_or_create_url_locator(
      first.entity.media_excerpt_id,
      NewUrlLocator {
        url:     NewUrl::new(url).into(),
        anchors: vec![anchor("Quoted", 90), anchor("Quoted", 10)],
      },
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(same.is_extant);
}

#[tokio::test]
async fn different_url_means_a_different_excerpt() {
  let r = resolver().await;
  let first = r
    .read_or_create_media_excerpt(
      excerpt_at("Same words", "https://example.com/a", vec![]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  let other = r
    .read_or_create_media_excerpt(
      excerpt_at("Same words", "https://example.com/b", vec![]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(!other.is_extant);
  assert_ne!(other.entity.media_excerpt_id, first.entity.media_excerpt_id);

  let quotation_only = r
    .read_or_create_media_excerpt(NewMediaExcerpt::quotation("same words").into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(quotation_only.is_extant);
}

#[tokio::test]
async fn canonical_url_makes_locators_equivalent() {
  let r = resolver().await;
  let with_canonical = |url: &str| {
    let mut excerpt = NewMediaExcerpt::quotation("Canonical quote");
    excerpt.locators.url_locators.push(NewUrlLocator {
      url:     NewUrl {
        url:           url.into(),
        canonical_url: Some("https://example.com/story".into()),
      }
      .into(),
      anchors: vec![],
    });
    excerpt
  };

  let desktop = r
    .read_or_create_media_excerpt(
      with_canonical("https://example.com/story?utm_source=feed").into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  let mobile = r
    .read_or_create_media_excerpt(
      with_canonical("https://m.example.com/story").into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(mobile.is_extant);
  assert_eq!(mobile.entity.media_excerpt_id, desktop.entity.media_excerpt_id);
  assert_eq!(mobile.entity.locators.url_locators.len(), 1);
}

#[tokio::test]
async fn citation_source_participates_in_equivalence() {
  let r = resolver().await;
  let cited = |source: &str| NewMediaExcerpt::quotation("Cited words").with_source(source);

  let first = r
    .read_or_create_media_excerpt(cited("Collected Works, vol. 2").into(), user(), Utc::now())
    .await
    .unwrap();
  let same = r
    .read_or_create_media_excerpt(cited("collected works vol 2").into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(same.is_extant);
  assert_eq!(same.entity.citations.len(), 1);

  let other = r
    .read_or_create_media_excerpt(cited("Another Anthology").into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(!other.is_extant);
  assert_ne!(other.entity.media_excerpt_id, first.entity.media_excerpt_id);
}

#[tokio::test]
async fn speakers_are_linked_once() {
  let r = resolver().await;
  let mut proposal = NewMediaExcerpt::quotation("Spoken words");
  proposal.speakers.push(NewPersorg::person("Grace Hopper").into());
  proposal.speakers.push(NewPersorg::person("grace hopper").into());

  let excerpt = r
    .read_or_create_media_excerpt(proposal.into(), user(), Utc::now())
    .await
    .unwrap();
  assert_eq!(excerpt.entity.speakers.len(), 1);
  assert_eq!(excerpt.entity.speakers[0].name, "Grace Hopper");
}

#[tokio::test]
async fn deleted_media_excerpt_is_not_matched() {
  let r = resolver().await;
  let excerpt = r
    .read_or_create_media_excerpt(
      excerpt_at("Gone", "https://example.com/gone", vec![]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  r.delete_media_excerpt(excerpt.entity.media_excerpt_id, Utc::now())
    .await
    .unwrap();

  assert!(
    r.read_media_excerpts_matching_url("https://example.com/gone")
      .await
      .unwrap()
      .is_empty()
  );
  let recreated = r
    .read_or_create_media_excerpt(
      excerpt_at("Gone", "https://example.com/gone", vec![]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  assert!(!recreated.is_extant);
}

// ─── URL matching ────────────────────────────────────────────────────────────

#[tokio::test]
async fn url_matching_ignores_query_fragment_and_trailing_slash() {
  let r = resolver().await;
  let stored = r
    .read_or_create_media_excerpt(
      excerpt_at("Path quote", "https://example.com/path/page?ref=1#section", vec![]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  let id = stored.entity.media_excerpt_id;

  for (candidate, matches) in [
    ("https://example.com/path/page", true),
    ("https://example.com/path/page/", true),
    ("https://example.com/path/page?other=2", true),
    ("https://example.com/path/Page", false),
    ("https://example.com/path", false),
    ("http://example.com/path/page", false),
    ("https://other.com/path/page", false),
  ] {
    let found = r.read_media_excerpts_matching_url(candidate).await.unwrap();
    assert_eq!(
      found.iter().any(|e| e.media_excerpt_id == id),
      matches,
      "candidate {candidate}"
    );
  }
}

#[tokio::test]
async fn url_matching_checks_canonical_urls() {
  let r = resolver().await;
  let mut excerpt = NewMediaExcerpt::quotation("Canonically located");
  excerpt.locators.url_locators.push(NewUrlLocator {
    url:     NewUrl {
      url:           "https://amp.example.net/x/story".into(),
      canonical_url: Some("https://example.net/story".into()),
    }
    .into(),
    anchors: vec![],
  });
  r.read_or_create_media_excerpt(excerpt.into(), user(), Utc::now())
    .await
    .unwrap();

  let found = r
    .read_media_excerpts_matching_url("https://example.net/story/")
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
}

#[tokio::test]
async fn invalid_match_url_is_a_validation_error() {
  let r = resolver().await;
  let err = r
    .read_media_excerpts_matching_url("not a url")
    .await
    .unwrap_err();
  assert!(matches!(err, CoreError::Validation { .. }));
}

#[tokio::test]
async fn host_less_match_url_is_a_validation_error() {
  let r = resolver().await;
  for url in ["mailto:someone@example.com", "data:text/plain,hello"] {
    let err = r.read_media_excerpts_matching_url(url).await.unwrap_err();
    assert!(
      matches!(err, CoreError::Validation { entity_type: EntityType::Url, .. }),
      "{url}: {err:?}"
    );
  }
}

#[tokio::test]
async fn internationalized_hosts_match_in_either_spelling() {
  let r = resolver().await;
  let unicode = r
    .read_or_create_media_excerpt(
      excerpt_at("Umlaut", "https://bücher.example/kapitel", vec![]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();
  let ascii = r
    .read_or_create_media_excerpt(
      excerpt_at("Punycode", "https://www.xn--bcher-kva.example/regal", vec![]).into(),
      user(),
      Utc::now(),
    )
    .await
    .unwrap();

  let found = r
    .read_media_excerpts_matching_url("https://xn--bcher-kva.example/kapitel/")
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].media_excerpt_id, unicode.entity.media_excerpt_id);

  let found = r
    .read_media_excerpts_matching_url("https://www.bücher.example/regal")
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].media_excerpt_id, ascii.entity.media_excerpt_id);

  for domain in ["bücher.example", "xn--bcher-kva.example"] {
    let found: Vec<Uuid> = r
      .read_media_excerpts_matching_domain(domain)
      .await
      .unwrap()
      .into_iter()
      .map(|e| e.media_excerpt_id)
      .collect();
    assert_eq!(
      found,
      vec![unicode.entity.media_excerpt_id, ascii.entity.media_excerpt_id],
      "{domain}"
    );
  }
}

#[tokio::test]
async fn domain_matching_includes_subdomains_only() {
  let r = resolver().await;
  let mut ids = Vec::new();
  for (quote, url) in [
    ("News", "https://news.example.com/a"),
    ("Apex", "https://example.com/b"),
    ("Decoy", "https://notexample.com/c"),
  ] {
    let e = r
      .read_or_create_media_excerpt(excerpt_at(quote, url, vec![]).into(), user(), Utc::now())
      .await
      .unwrap();
    ids.push(e.entity.media_excerpt_id);
  }

  let found: Vec<Uuid> = r
    .read_media_excerpts_matching_domain("example.com")
    .await
    .unwrap()
    .into_iter()
    .map(|e| e.media_excerpt_id)
    .collect();
  assert_eq!(found, vec![ids[0], ids[1]]);
}

// ─── Search ──────────────────────────────────────────────────────────────────

async fn proposition(r: &Resolver<SqliteStore>, text: &str) -> Uuid {
  r.read_or_create_proposition(NewProposition::new(text).into(), user(), Utc::now())
    .await
    .unwrap()
    .entity
    .proposition_id
}

#[tokio::test]
async fn search_orders_by_strategy_and_deduplicates() {
  let r = resolver().await;
  let any_word = proposition(&r, "A man of means").await;
  let all_words = proposition(&r, "The man who is tallest").await;
  let phrase = proposition(&r, "The tallest man in the world").await;
  let containing = proposition(&r, "The tallest manatee").await;
  let decoy = proposition(&r, "Completely unrelated").await;
  let deleted = proposition(&r, "Tallest man ever").await;
  r.delete_proposition(deleted, Utc::now()).await.unwrap();

  let found: Vec<Uuid> = r
    .search_propositions("tallest, man!")
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.proposition_id)
    .collect();

  assert_eq!(found[0], phrase);
  assert_eq!(found[1], all_words);
  assert_eq!(found.len(), 4);
  assert!(found.contains(&any_word));
  assert!(found.contains(&containing));
  assert!(!found.contains(&decoy));
  assert!(!found.contains(&deleted));
}

#[tokio::test]
async fn punctuation_only_search_returns_nothing() {
  let r = resolver().await;
  r.read_or_create_proposition(NewProposition::new("Anything").into(), user(), Utc::now())
    .await
    .unwrap();
  assert!(r.search_propositions("?!…").await.unwrap().is_empty());
  assert!(r.search_propositions("").await.unwrap().is_empty());
}

#[tokio::test]
async fn search_finds_partial_words_by_containment() {
  let r = resolver().await;
  r.read_or_create_persorg(NewPersorg::person("Ada Lovelace").into(), user(), Utc::now())
    .await
    .unwrap();
  r.read_or_create_media_excerpt(
    NewMediaExcerpt::quotation("Numbers are the language of nature")
      .with_source("Notes on the Analytical Engine")
      .into(),
    user(),
    Utc::now(),
  )
  .await
  .unwrap();

  let persorgs = r.search_persorgs("lovel").await.unwrap();
  assert_eq!(persorgs.len(), 1);
  assert_eq!(persorgs[0].name, "Ada Lovelace");

  let sources = r.search_sources("analytical engine").await.unwrap();
  assert_eq!(sources.len(), 1);

  let excerpts = r.search_media_excerpts("language of nature").await.unwrap();
  assert_eq!(excerpts.len(), 1);
  assert_eq!(excerpts[0].citations.len(), 1);
}

async fn writ_quote(r: &Resolver<SqliteStore>, title: &str, text: &str, url: &str) -> Uuid {
  let quote = NewWritQuote {
    quote_text: text.into(),
    writ:       NewWrit { title: title.into() }.into(),
    urls:       vec![NewUrl::new(url).into()],
  };
  r.read_or_create_writ_quote(quote.into(), user(), Utc::now())
    .await
    .unwrap()
    .entity
    .writ_quote_id
}

#[tokio::test]
async fn writ_titles_and_quote_texts_are_searchable() {
  let r = resolver().await;
  let ambition = writ_quote(
    &r,
    "The Federalist Papers",
    "Ambition must be made to counteract ambition.",
    "https://example.com/federalist-51",
  )
  .await;
  let society = writ_quote(
    &r,
    "Common Sense",
    "Society in every state is a blessing.",
    "https://example.org/paine",
  )
  .await;

  let writs = r.search_writs("federalist").await.unwrap();
  assert_eq!(writs.len(), 1);
  assert_eq!(writs[0].title, "The Federalist Papers");

  let quotes = r.search_writ_quotes("ambition").await.unwrap();
  assert_eq!(quotes.len(), 1);
  assert_eq!(quotes[0].writ_quote_id, ambition);
  assert_eq!(quotes[0].urls.len(), 1);

  let quotes = r.search_writ_quotes("blessing society").await.unwrap();
  assert_eq!(quotes.len(), 1);
  assert_eq!(quotes[0].writ_quote_id, society);

  assert!(r.search_writs("bless").await.unwrap().is_empty());
}

#[tokio::test]
async fn writ_quote_url_containment_is_literal() {
  let r = resolver().await;
  let literal = writ_quote(&r, "Labels", "Pure as can be.", "https://example.com/100%_pure").await;
  let other = writ_quote(&r, "Labels", "Mostly pure.", "https://example.com/100ab-pure").await;

  let found: Vec<Uuid> = r
    .read_writ_quotes_having_url_containing("100%_")
    .await
    .unwrap()
    .into_iter()
    .map(|q| q.writ_quote_id)
    .collect();
  assert_eq!(found, vec![literal]);

  let found: Vec<Uuid> = r
    .read_writ_quotes_having_url_containing("example.com/100")
    .await
    .unwrap()
    .into_iter()
    .map(|q| q.writ_quote_id)
    .collect();
  assert_eq!(found, vec![literal, other]);

  assert!(r.read_writ_quotes_having_url_containing("  ").await.unwrap().is_empty());
}

#[tokio::test]
async fn main_search_gathers_every_search() {
  let r = resolver().await;
  let prop = proposition(&r, "Federalist arguments persuaded New York").await;
  let by_url = writ_quote(
    &r,
    "The Federalist Papers",
    "Ambition must be made to counteract ambition.",
    "https://example.com/federalist-51",
  )
  .await;
  writ_quote(&r, "Common Sense", "Society in every state is a blessing.", "https://example.org/paine")
    .await;

  let results = r.main_search("federalist").await.unwrap();
  assert_eq!(
    results.propositions.iter().map(|p| p.proposition_id).collect::<Vec<_>>(),
    vec![prop]
  );
  assert_eq!(results.writs.len(), 1);
  assert!(results.writ_quotes.is_empty());
  assert_eq!(
    results.writ_quotes_by_url.iter().map(|q| q.writ_quote_id).collect::<Vec<_>>(),
    vec![by_url]
  );

  let results = r.main_search("blessing").await.unwrap();
  assert!(results.propositions.is_empty());
  assert_eq!(results.writ_quotes.len(), 1);
}
