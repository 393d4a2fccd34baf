//! In-memory implementation of the entity store.
//!
//! Useful for embedding the indexer, for tests and as the staging store of
//! small jobs whose result is exported as JSON lines on finalise.

mod store;

pub use store::InMemoryStore;
