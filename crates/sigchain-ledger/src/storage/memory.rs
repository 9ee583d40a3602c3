//! In-memory world state
//!
//! Default backend, a single map behind an `RwLock`. Suitable for tests and
//! single-instance deployments. Data is lost on restart.

use std::collections::HashMap;
use std::sync::RwLock;
use tracing::trace;

use super::{StoreError, WorldState};

/// In-memory world state
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys written so far
    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    /// Whether nothing has been written
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, for comparing states in tests and diagnostics
    pub fn snapshot(&self) -> Result<HashMap<String, Vec<u8>>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(entries.clone())
    }
}

impl WorldState for MemoryStore {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        trace!(key = %key, bytes = value.len(), "put_state");
        entries.insert(key.to_string(), value);
        Ok(())
    }
}
