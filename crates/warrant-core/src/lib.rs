//! Core types and trait definitions for the warrant justification graph.
//!
//! This crate is deliberately free of database dependencies. It owns the
//! equivalence rules (what makes two proposed entities "the same"), the
//! bottom-up resolution of statement chains and counter-justification
//! targets, the justification tree builder, and the multi-strategy search
//! merge. Storage backends implement [`store::ArgumentStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod entity;
pub mod error;
pub mod justification;
pub mod media;
pub mod normalize;
pub mod proposition;
pub mod resolve;
pub mod search;
pub mod statement;
pub mod store;
pub mod url_match;
pub mod validate;
pub mod vote;
pub mod writ;

pub use entity::{EntityRef, EntityType, Proposed, ReadOrCreate};
pub use error::{Error, Result};
pub use resolve::{MainSearchResults, Resolver};
