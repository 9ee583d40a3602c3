//! API request handlers

pub mod transactions;

pub use transactions::{submit_transaction, AppState, TransactionRequest, TransactionResponse};
