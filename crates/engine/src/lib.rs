//! World state access and the two-level write cache.
//!
//! Transactions execute against a [`TxCache`] layered over a [`BatchCache`],
//! which in turn wraps the hosting ledger's [`WorldState`]. Nothing reaches
//! the world state until the whole batch commits.

mod cache;
mod error;
mod world_state;

pub use cache::{BatchCache, StateCache, StateCacheExt, TxCache};
pub use error::StorageError;
pub use world_state::{InMemoryWorldState, WorldState};
