//! Persistent chain storage backends for the ledger engine.

pub mod sled_store;

pub use sled_store::SledStore;
