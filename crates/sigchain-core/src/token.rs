//! Single-consumption tokens
//!
//! A token is created once from a secret seed and may be consumed by exactly
//! one other token. The counters are asymmetric: `consuming_token_id` is set at
//! most once, while `consumed_token_ids` grows each time this token consumes
//! another one.

use crate::crypto::token_id_from_seed;
use crate::error::{Result, SigChainError};
use serde::{Deserialize, Serialize};

/// Placeholder endpoint that approves every incoming consumption
pub const ALWAYS_ACCEPT_ENDPOINT: &str = "sc://always-accept";

/// Placeholder endpoint that approves every outgoing consumption
pub const ALWAYS_SEND_ENDPOINT: &str = "sc://always-send";

/// A token in the restricted single-consumption ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Lowercase hex SHA-512 of the creation seed
    #[serde(rename = "Id")]
    pub id: String,

    /// Id of the token that consumed this one; empty until consumed
    #[serde(rename = "ConsumingTokenId", default)]
    pub consuming_token_id: String,

    /// Ids this token has consumed, in consumption order
    #[serde(rename = "ConsumedTokenIds", default)]
    pub consumed_token_ids: Vec<String>,

    /// Endpoint asked to approve this token consuming another
    #[serde(rename = "RequestToAcceptUrl", default)]
    pub accept_policy_endpoint: String,

    /// Endpoint asked to approve this token being consumed
    #[serde(rename = "RequestToSendUrl", default)]
    pub send_policy_endpoint: String,

    #[serde(rename = "OwnerPublicKey")]
    pub owner_public_key: String,
}

impl Token {
    /// Fresh, unconsumed token whose id derives from `seed`
    pub fn from_seed(
        seed: &str,
        accept_policy_endpoint: impl Into<String>,
        send_policy_endpoint: impl Into<String>,
        owner_public_key: impl Into<String>,
    ) -> Self {
        Self {
            id: token_id_from_seed(seed),
            consuming_token_id: String::new(),
            consumed_token_ids: Vec::new(),
            accept_policy_endpoint: accept_policy_endpoint.into(),
            send_policy_endpoint: send_policy_endpoint.into(),
            owner_public_key: owner_public_key.into(),
        }
    }

    /// Whether another token has consumed this one
    pub fn is_consumed(&self) -> bool {
        !self.consuming_token_id.is_empty()
    }

    /// Serialize to the stored record
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(SigChainError::from)
    }

    /// Deserialize a stored record
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        serde_json::from_slice(bytes).map_err(SigChainError::from)
    }
}
