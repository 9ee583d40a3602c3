//! SigChain Ledger Server Binary
//!
//! Runs the HTTP transaction boundary over an in-memory world state.

use std::process;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

use sigchain_ledger::{create_router, AppState, LedgerConfig, MemoryStore};

#[tokio::main]
async fn main() {
    let config = match LedgerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {}", e);
            process::exit(2);
        }
    };

    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        process::exit(1);
    }

    info!(
        node_name = %config.node_name,
        port = config.port,
        max_clock_skew_secs = config.max_clock_skew_secs,
        "Starting SigChain ledger"
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState::new(Arc::new(MemoryStore::new()), config));
    let app = create_router(state);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(addr = %addr, error = %e, "Failed to bind to address");
            process::exit(1);
        }
    };

    info!(addr = %addr, "SigChain ledger listening");

    if let Err(e) = axum::serve(listener, app).await {
        error!(error = %e, "Server error");
        process::exit(1);
    }
}
