//! Error types for the signed provenance graph

use thiserror::Error;

/// Result type alias using SigChainError
pub type Result<T> = std::result::Result<T, SigChainError>;

/// Errors that can occur while reading or mutating the graph
#[derive(Error, Debug)]
pub enum SigChainError {
    /// Referenced id is absent from the world state
    #[error("Not found: {0}")]
    NotFound(String),

    /// Id collision on create
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Mutation attempted on a finalized node
    #[error("Node is already finalized: {0}")]
    AlreadyFinalized(String),

    /// Second consumption of a token
    #[error("Token already consumed: {0}")]
    AlreadyConsumed(String),

    /// Signature does not match the canonical node under the owner key
    #[error("Signature verification failed: {0}")]
    VerificationFailure(String),

    /// Parallel argument lists of different lengths
    #[error("Arity mismatch: {field} has {actual} entries, expected {expected}")]
    ArityMismatch {
        field: String,
        expected: usize,
        actual: usize,
    },

    /// Public key is not a usable RSA key encoding
    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    /// Token consumption was not approved
    #[error("Consumption refused: {0}")]
    ConsumptionRefused(String),

    /// Caller-supplied time too far from the transaction time
    #[error("Timestamp {supplied} differs from transaction time {transaction} by more than {max_skew_secs}s")]
    TimestampSkew {
        supplied: String,
        transaction: String,
        max_skew_secs: i64,
    },

    /// Payload has the wrong schema or fails domain validation
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Malformed request argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// World state read/write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Record encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl SigChainError {
    /// Stable machine-readable code for this error kind
    pub fn code(&self) -> &'static str {
        match self {
            SigChainError::NotFound(_) => "NOT_FOUND",
            SigChainError::AlreadyExists(_) => "ALREADY_EXISTS",
            SigChainError::AlreadyFinalized(_) => "ALREADY_FINALIZED",
            SigChainError::AlreadyConsumed(_) => "ALREADY_CONSUMED",
            SigChainError::VerificationFailure(_) => "VERIFICATION_FAILURE",
            SigChainError::ArityMismatch { .. } => "ARITY_MISMATCH",
            SigChainError::InvalidKeyFormat(_) => "INVALID_KEY_FORMAT",
            SigChainError::ConsumptionRefused(_) => "CONSUMPTION_REFUSED",
            SigChainError::TimestampSkew { .. } => "TIMESTAMP_SKEW",
            SigChainError::InvalidPayload(_) => "INVALID_PAYLOAD",
            SigChainError::InvalidArgument(_) => "INVALID_ARGUMENT",
            SigChainError::Storage(_) => "STORAGE_ERROR",
            SigChainError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }
}

impl From<serde_json::Error> for SigChainError {
    fn from(err: serde_json::Error) -> Self {
        SigChainError::Serialization(err.to_string())
    }
}

impl From<rsa::Error> for SigChainError {
    fn from(err: rsa::Error) -> Self {
        SigChainError::VerificationFailure(err.to_string())
    }
}
