//! # SigChain Core
//!
//! Data model and cryptographic primitives for a signed provenance graph.
//!
//! ## Key Concepts
//!
//! - **Node**: an owned record with a payload, hash links to predecessors and
//!   successors, and the owner's signature over its current state
//! - **Link hash**: SHA-512 of a node id; links never carry ids or payloads
//! - **Token**: a record that may be consumed by exactly one other token
//! - **Transition**: the unsigned post-state of a graph operation
//!
//! ## Graph Invariants
//!
//! 1. **Authenticity**: every stored node carries a signature that verifies
//!    over its canonical form under its owner key
//! 2. **Immutability**: a finalized node accepts no edges, transfers or edits
//! 3. **Insert-only**: creating an id that exists fails and changes nothing
//! 4. **Single consumption**: a token's consumer is set at most once
//!
//! This crate performs no I/O. World state access lives in `sigchain-ledger`.

pub mod crypto;
pub mod error;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod node;
pub mod payload;
pub mod token;
pub mod transition;

pub use crypto::{canonicalize, hash_id, token_id_from_seed, verify, KeyPair, LinkHash, PublicKey};
pub use error::{Result, SigChainError};
pub use node::{LinkSet, Node, NodeHeader};
pub use payload::{parse_quantity, Material, OpaquePayload, Payload, PayloadKind};
pub use token::{Token, ALWAYS_ACCEPT_ENDPOINT, ALWAYS_SEND_ENDPOINT};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version
pub fn version() -> &'static str {
    VERSION
}
