//! Node model
//!
//! A node is a [`NodeHeader`] plus a [`Payload`]. The header carries everything
//! the engine reasons about: identity, finalization, hash links to
//! predecessors and successors, the owner key and the owner's signature.
//! The payload is carried through hashing, signing and storage verbatim.
//!
//! Record field names are fixed so that records written by older versions of
//! the ledger stay readable.

use crate::crypto::{hash_id, LinkHash};
use crate::error::{Result, SigChainError};
use crate::payload::Payload;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Set of link hashes; ordered so the serialized form is deterministic
pub type LinkSet = BTreeSet<LinkHash>;

/// Header present in every node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeHeader {
    /// World state key of this node
    #[serde(rename = "Id")]
    pub id: String,

    /// Once true the node only accepts reads
    #[serde(rename = "IsFinalized")]
    pub is_finalized: bool,

    /// Hashes of predecessor ids
    #[serde(rename = "PreviousNodeHashedIds", default)]
    pub previous_links: LinkSet,

    /// Hashes of successor ids
    #[serde(rename = "NextNodeHashedIds", default)]
    pub next_links: LinkSet,

    /// Encoded RSA key allowed to sign the next mutation
    #[serde(rename = "OwnerPublicKey")]
    pub owner_public_key: String,

    /// Creation time, or time of the last ownership transfer
    #[serde(rename = "CreatedTime")]
    pub created_time: DateTime<Utc>,

    /// Owner signature over the canonical form of the current state
    #[serde(rename = "Signature", with = "serde_bytes_base64", default)]
    pub signature: Vec<u8>,
}

impl NodeHeader {
    /// Fresh unfinalized, unlinked, unsigned header
    pub fn new(
        id: impl Into<String>,
        owner_public_key: impl Into<String>,
        created_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            is_finalized: false,
            previous_links: LinkSet::new(),
            next_links: LinkSet::new(),
            owner_public_key: owner_public_key.into(),
            created_time,
            signature: Vec::new(),
        }
    }
}

/// A versioned, owned, optionally finalized record in the provenance graph
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "Header")]
    pub header: NodeHeader,

    #[serde(rename = "Payload")]
    pub payload: Payload,
}

impl Node {
    /// Compose a header and payload
    pub fn new(header: NodeHeader, payload: Payload) -> Self {
        Self { header, payload }
    }

    /// Node id
    pub fn id(&self) -> &str {
        &self.header.id
    }

    /// Whether the node is finalized
    pub fn is_finalized(&self) -> bool {
        self.header.is_finalized
    }

    /// Whether `id` is among this node's successors
    pub fn links_to(&self, id: &str) -> bool {
        self.header.next_links.contains(&hash_id(id))
    }

    /// Whether `id` is among this node's predecessors
    pub fn linked_from(&self, id: &str) -> bool {
        self.header.previous_links.contains(&hash_id(id))
    }

    /// Fail with `AlreadyFinalized` unless the node still accepts mutations
    pub fn ensure_mutable(&self) -> Result<()> {
        if self.header.is_finalized {
            return Err(SigChainError::AlreadyFinalized(self.header.id.clone()));
        }
        Ok(())
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

/// Base64 serialization for signature and payload bytes
pub(crate) mod serde_bytes_base64 {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
