//! Staged writes over a base store
//!
//! Reads see staged values first, then the base. Nothing reaches the base
//! until [`StagedTransaction::commit`]; dropping the transaction discards the
//! buffer. This is the atomicity an engine operation relies on when it writes
//! several keys.

use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

use super::{StoreError, WorldState};

/// Buffered transaction over `S`
#[derive(Debug)]
pub struct StagedTransaction<S: WorldState> {
    base: S,
    // BTreeMap so commit order is stable
    pending: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl<S: WorldState> StagedTransaction<S> {
    /// Start a transaction over `base`
    pub fn new(base: S) -> Self {
        Self {
            base,
            pending: Mutex::new(BTreeMap::new()),
        }
    }

    /// Keys written in this transaction
    pub fn pending_keys(&self) -> Result<Vec<String>, StoreError> {
        let pending = self
            .pending
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        Ok(pending.keys().cloned().collect())
    }

    /// Publish every staged write to the base store
    ///
    /// Returns the number of keys written.
    pub fn commit(self) -> Result<usize, StoreError> {
        let pending = self
            .pending
            .into_inner()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        let count = pending.len();
        for (key, value) in pending {
            self.base.put_state(&key, value)?;
        }
        debug!(keys = count, "Committed staged transaction");
        Ok(count)
    }
}

impl<S: WorldState> WorldState for StagedTransaction<S> {
    fn get_state(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        {
            let pending = self
                .pending
                .lock()
                .map_err(|e| StoreError::Poisoned(e.to_string()))?;
            if let Some(value) = pending.get(key) {
                return Ok(Some(value.clone()));
            }
        }
        self.base.get_state(key)
    }

    fn put_state(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|e| StoreError::Poisoned(e.to_string()))?;
        pending.insert(key.to_string(), value);
        Ok(())
    }
}
