//! Transaction Handler
//!
//! Runs one ledger function per request. Transactions are serialized: a
//! single lock is held from the first read to the commit. Mutating functions
//! run inside a [`StagedTransaction`] so a failure leaves no partial writes;
//! queries read the committed state directly.
//!
//! A client may propose the transaction timestamp. Operations that stamp
//! nodes with the transaction time (branch children) need it to know what to
//! sign.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use sigchain_core::SigChainError;

use crate::api::error::ApiError;
use crate::api::invocation::Invocation;
use crate::config::LedgerConfig;
use crate::context::TxContext;
use crate::storage::{MemoryStore, StagedTransaction};

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    /// Committed world state
    pub store: Arc<MemoryStore>,
    /// Server configuration
    pub config: LedgerConfig,
    /// Held for the duration of each transaction
    pub tx_lock: Mutex<()>,
}

impl AppState {
    pub fn new(store: Arc<MemoryStore>, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            tx_lock: Mutex::new(()),
        }
    }
}

/// Request body of `POST /v1/transactions`
#[derive(Debug, Deserialize)]
pub struct TransactionRequest {
    /// Ledger function name, e.g. `CreateNode`
    pub function: String,

    /// Function arguments
    #[serde(default)]
    pub args: Value,

    /// Client-proposed transaction time; the server clock when absent
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Response from a successful transaction
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    pub tx_id: String,
    pub result: Value,
}

/// Submit a transaction
///
/// POST /v1/transactions
pub async fn submit_transaction(
    State(state): State<Arc<AppState>>,
    Json(request): Json<TransactionRequest>,
) -> Result<Json<TransactionResponse>, ApiError> {
    if !Invocation::is_known(&request.function) {
        return Err(ApiError::UnknownFunction(request.function));
    }
    let invocation = Invocation::parse(&request.function, request.args).map_err(|e| {
        ApiError::BadRequest(format!("Invalid arguments for {}: {}", request.function, e))
    })?;

    let tx_id = uuid::Uuid::new_v4().to_string();
    let ctx = match request.timestamp {
        Some(proposed) => {
            // The proposal time becomes the transaction time only if it is
            // close to the server clock
            TxContext::now(tx_id.as_str())
                .check_skew(proposed, state.config.max_clock_skew_secs)?;
            TxContext::new(tx_id, proposed)
        }
        None => TxContext::now(tx_id),
    };

    let _guard = state.tx_lock.lock().await;
    let function = invocation.name();
    let max_skew = state.config.max_clock_skew_secs;
    let log_failure = |err: &SigChainError| {
        warn!(tx_id = %ctx.tx_id, function, code = err.code(), error = %err, "Transaction failed");
    };

    // Queries read committed state and write nothing
    if invocation.is_query() {
        let result = invocation
            .execute(state.store.as_ref(), &ctx, max_skew)
            .inspect_err(log_failure)?;
        debug!(tx_id = %ctx.tx_id, function, "Query evaluated");
        return Ok(Json(TransactionResponse {
            tx_id: ctx.tx_id,
            result,
        }));
    }

    let staged = StagedTransaction::new(state.store.as_ref());
    let result = invocation
        .execute(&staged, &ctx, max_skew)
        .inspect_err(log_failure)?;

    let keys = staged.pending_keys().map_err(SigChainError::from)?;
    debug!(tx_id = %ctx.tx_id, function, keys = ?keys, "Committing staged writes");
    let written = staged.commit().map_err(SigChainError::from)?;
    info!(tx_id = %ctx.tx_id, function, written, "Transaction committed");

    Ok(Json(TransactionResponse {
        tx_id: ctx.tx_id,
        result,
    }))
}
