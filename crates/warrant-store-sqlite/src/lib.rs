//! SQLite backend for the warrant justification graph.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. Every equivalence check and
//! its insert run together inside one immediate transaction.

mod encode;
mod fetch;
mod query;
mod schema;
mod search;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use search::SearchTable;
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
