//! Transaction context
//!
//! Every operation runs inside one host transaction. The context carries what
//! the host knows about it: an id for correlation and the transaction
//! timestamp, which is the only clock the ledger trusts.

use chrono::{DateTime, Duration, Utc};
use sigchain_core::{Result, SigChainError};
use tracing::warn;

/// Ambient data of the current transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    pub tx_id: String,
    pub timestamp: DateTime<Utc>,
}

impl TxContext {
    pub fn new(tx_id: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            tx_id: tx_id.into(),
            timestamp,
        }
    }

    /// Context stamped with the current wall clock
    pub fn now(tx_id: impl Into<String>) -> Self {
        Self::new(tx_id, Utc::now())
    }

    /// Fail with `TimestampSkew` if `supplied` is more than `max_skew_secs`
    /// away from the transaction timestamp, in either direction
    pub fn check_skew(&self, supplied: DateTime<Utc>, max_skew_secs: i64) -> Result<()> {
        let skew = (supplied - self.timestamp).abs();
        let window = Duration::try_seconds(max_skew_secs).unwrap_or(Duration::MAX);
        if skew > window {
            warn!(
                tx_id = %self.tx_id,
                supplied = %supplied,
                transaction = %self.timestamp,
                max_skew_secs,
                "Rejected timestamp outside allowed skew"
            );
            return Err(SigChainError::TimestampSkew {
                supplied: supplied.to_rfc3339(),
                transaction: self.timestamp.to_rfc3339(),
                max_skew_secs,
            });
        }
        Ok(())
    }
}
