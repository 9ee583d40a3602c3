//! SigChain Ledger
//!
//! Executes the signed provenance graph against a key-value world state:
//! - Graph engine: create, finalize, link, branch and transfer nodes
//! - Token ledger: create and consume single-use tokens
//! - Material contract: typed material payloads, including splits
//! - HTTP boundary that runs one named function per transaction
//!
//! ## Graph Invariants
//!
//! 1. **AUTHENTICITY**: every write carries an owner signature over the
//!    written state
//! 2. **IMMUTABILITY**: finalized nodes only accept reads
//! 3. **INSERT-ONLY**: ids are never reused
//! 4. **SINGLE CONSUMPTION**: a token is consumed at most once
//!
//! ## API Endpoints
//!
//! - `GET /health` - Liveness check
//! - `GET /ready` - Readiness check with node name
//! - `POST /v1/transactions` - Run one ledger function: `{"function", "args"}`

pub mod api;
pub mod config;
pub mod context;
pub mod graph;
pub mod material;
pub mod storage;
pub mod token;

pub use api::create_router;
pub use api::handlers::AppState;
pub use api::invocation::Invocation;
pub use config::LedgerConfig;
pub use context::TxContext;
pub use graph::{
    BranchOutcome, BranchRequest, GraphEngine, NewNode, TransferOutcome, TransferRequest,
};
pub use material::{MaterialContract, NewMaterial, SplitRequest};
pub use storage::{MemoryStore, StagedTransaction, StoreError, WorldState};
pub use token::{ConsumptionPolicy, PlaceholderPolicy, TokenLedger};
