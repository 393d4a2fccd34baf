//! Error types for the entity indexer repository.

mod ledger_error;
mod store_error;

pub use ledger_error::LedgerError;
pub use store_error::StoreError;
