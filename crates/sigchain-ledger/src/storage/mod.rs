//! World state abstraction
//!
//! The ledger sees its host store as a flat key-value map with two
//! operations. There is no delete and no range scan: records are written,
//! overwritten, and never removed.
//!
//! - [`MemoryStore`]: process-local map, the default backend
//! - [`StagedTransaction`]: write buffer over another store, published with
//!   [`StagedTransaction::commit`]

pub mod memory;
pub mod staged;

pub use memory::MemoryStore;
pub use staged::StagedTransaction;

use sigchain_core::SigChainError;
use std::fmt::Debug;

/// Error type for world state operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Lock poisoned: {0}")]
    Poisoned(String),

    #[error("Backend error: {0}")]
    Backend(String),
}

impl From<StoreError> for SigChainError {
    fn from(err: StoreError) -> Self {
        SigChainError::Storage(err.to_string())
    }
}

/// Key-value world state consumed by the graph engine and token ledger
///
/// Implementations must be thread-safe. Reads after writes within the same
/// handle observe the written value.
pub trait WorldState: Send + Sync + Debug {
    /// Bytes stored under `key`, or `None` if the key was never written
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Store `value` under `key`, replacing any previous value
    fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;

    /// Whether `key` holds a value
    fn contains(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.get_state(key)?.is_some())
    }
}

impl<S: WorldState + ?Sized> WorldState for &S {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get_state(key)
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put_state(key, value)
    }
}

impl<S: WorldState + ?Sized> WorldState for std::sync::Arc<S> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).get_state(key)
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        (**self).put_state(key, value)
    }
}
