//! Interface definitions for the storage sink.
//!
//! This module defines the abstract `EntityStore` trait that allows for
//! dependency injection and swappable storage backends.

mod entity_store;

pub use entity_store::EntityStore;
