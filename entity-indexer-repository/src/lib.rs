//! # Entity Indexer Repository
//!
//! This crate provides the storage side of the entity indexer: the abstract
//! [`EntityStore`] sink interface, the [`IndexingDestination`] wrapper the
//! orchestrator commits chunks through, an in-memory store implementation and
//! the [`EntityIdLedger`] recording which entities were actually committed.

pub mod config;
pub mod destination;
pub mod errors;
pub mod interfaces;
pub mod ledger;
pub mod memory;

pub use config::DestinationConfig;
pub use destination::IndexingDestination;
pub use errors::{LedgerError, StoreError};
pub use interfaces::EntityStore;
pub use ledger::EntityIdLedger;
pub use memory::InMemoryStore;
