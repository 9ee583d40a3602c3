//! Hashing and signing substrate
//!
//! Every signature in the graph is RSA PKCS#1 v1.5 over the SHA-512 digest of
//! the node's canonical form. The canonical form is the JSON record with the
//! signature field blanked, so a signature never covers itself. That rule is
//! applied uniformly: creation, finalization, linking, branching and transfer
//! all verify the same way, and clients sign with [`KeyPair::sign_node`].
//!
//! Links between nodes never store ids. They store [`LinkHash`] values from
//! [`hash_id`], a one-shot SHA-512 over the id bytes.

use crate::error::{Result, SigChainError};
use crate::node::Node;
use base64::{engine::general_purpose::STANDARD, Engine};
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPublicKey, LineEnding};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha512};
use std::fmt;

/// Length of a SHA-512 digest in bytes
pub const DIGEST_LEN: usize = 64;

const PKCS1_PEM_LABEL: &str = "-----BEGIN RSA PUBLIC KEY-----";
const SPKI_PEM_LABEL: &str = "-----BEGIN PUBLIC KEY-----";

/// SHA-512 digest of a node id, used as a member of link sets
///
/// Serialized as lowercase hex.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkHash([u8; DIGEST_LEN]);

impl LinkHash {
    /// Parse a lowercase or uppercase hex digest
    pub fn from_hex(hex_str: &str) -> Result<Self> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| SigChainError::Serialization(format!("Invalid link hash: {}", e)))?;
        let bytes: [u8; DIGEST_LEN] = bytes.try_into().map_err(|_| {
            SigChainError::Serialization("Invalid link hash length".into())
        })?;
        Ok(Self(bytes))
    }

    /// Lowercase hex encoding
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LinkHash({}..)", &self.to_hex()[..16])
    }
}

impl fmt::Display for LinkHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for LinkHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for LinkHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        LinkHash::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Hash a node id for use in a link set
///
/// Each call digests exactly `id`; nothing carries over between calls.
pub fn hash_id(id: &str) -> LinkHash {
    let digest = Sha512::digest(id.as_bytes());
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&digest);
    LinkHash(bytes)
}

/// Derive a token id from a secret seed: lowercase hex of SHA-512(seed)
pub fn token_id_from_seed(seed: &str) -> String {
    hash_id(seed).to_hex()
}

/// Canonical bytes of a node for hashing and signing
///
/// The signature field is blanked on a copy; `node` itself is untouched.
pub fn canonicalize(node: &Node) -> Result<Vec<u8>> {
    let mut unsigned = node.clone();
    unsigned.header.signature.clear();
    serde_json::to_vec(&unsigned).map_err(SigChainError::from)
}

/// SHA-512 of the canonical form
pub fn canonical_digest(node: &Node) -> Result<[u8; DIGEST_LEN]> {
    let digest = Sha512::digest(canonicalize(node)?);
    let mut bytes = [0u8; DIGEST_LEN];
    bytes.copy_from_slice(&digest);
    Ok(bytes)
}

/// Verify `signature` over `node` with an encoded RSA public key
pub fn verify(node: &Node, signature: &[u8], public_key: &str) -> Result<()> {
    PublicKey::parse(public_key)?.verify_node(node, signature)
}

/// RSA public key of a node owner
#[derive(Clone, PartialEq, Eq)]
pub struct PublicKey {
    key: RsaPublicKey,
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("bits", &(rsa::traits::PublicKeyParts::size(&self.key) * 8))
            .finish()
    }
}

impl PublicKey {
    /// Parse an owner key as stored in a node header
    ///
    /// Accepts PKCS#1 PEM (`RSA PUBLIC KEY`), SPKI PEM (`PUBLIC KEY`), or
    /// base64 of either DER encoding.
    pub fn parse(encoded: &str) -> Result<Self> {
        let trimmed = encoded.trim();

        if trimmed.starts_with(PKCS1_PEM_LABEL) {
            let key = RsaPublicKey::from_pkcs1_pem(trimmed)
                .map_err(|e| SigChainError::InvalidKeyFormat(e.to_string()))?;
            return Ok(Self { key });
        }

        if trimmed.starts_with(SPKI_PEM_LABEL) {
            let key = RsaPublicKey::from_public_key_pem(trimmed)
                .map_err(|e| SigChainError::InvalidKeyFormat(e.to_string()))?;
            return Ok(Self { key });
        }

        if trimmed.starts_with("-----BEGIN") {
            return Err(SigChainError::InvalidKeyFormat(
                "unsupported PEM label, expected an RSA public key".into(),
            ));
        }

        let der = STANDARD
            .decode(trimmed)
            .map_err(|e| SigChainError::InvalidKeyFormat(format!("not PEM or base64 DER: {}", e)))?;
        Self::from_der(&der)
    }

    /// Parse PKCS#1 or SPKI DER bytes
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let key = RsaPublicKey::from_pkcs1_der(der)
            .or_else(|_| RsaPublicKey::from_public_key_der(der))
            .map_err(|e| SigChainError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self { key })
    }

    /// PKCS#1 PEM encoding, the form written into node headers
    pub fn to_pem(&self) -> Result<String> {
        self.key
            .to_pkcs1_pem(LineEnding::LF)
            .map_err(|e| SigChainError::InvalidKeyFormat(e.to_string()))
    }

    /// Verify a signature over the canonical form of `node`
    pub fn verify_node(&self, node: &Node, signature: &[u8]) -> Result<()> {
        let digest = canonical_digest(node)?;
        self.key
            .verify(Pkcs1v15Sign::new::<Sha512>(), &digest, signature)
            .map_err(|e| {
                SigChainError::VerificationFailure(format!("node '{}': {}", node.id(), e))
            })
    }
}

/// RSA key pair of a node owner
///
/// The engine never holds private keys; this type exists for clients that
/// prepare signatures and for tests.
#[derive(Clone)]
pub struct KeyPair {
    signing_key: RsaPrivateKey,
    public_key: PublicKey,
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("signing_key", &"[redacted]")
            .finish()
    }
}

impl KeyPair {
    /// Generate a new random key pair of `bits` size
    pub fn generate(bits: usize) -> Result<Self> {
        let signing_key = RsaPrivateKey::new(&mut OsRng, bits)
            .map_err(|e| SigChainError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    /// Load a PKCS#1 PEM private key
    pub fn from_pkcs1_pem(pem: &str) -> Result<Self> {
        let signing_key = RsaPrivateKey::from_pkcs1_pem(pem)
            .map_err(|e| SigChainError::InvalidKeyFormat(e.to_string()))?;
        Ok(Self::from_signing_key(signing_key))
    }

    fn from_signing_key(signing_key: RsaPrivateKey) -> Self {
        let public_key = PublicKey {
            key: signing_key.to_public_key(),
        };
        Self {
            signing_key,
            public_key,
        }
    }

    /// The public half
    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    /// PKCS#1 PEM of the public key, ready for `owner_public_key`
    pub fn public_key_pem(&self) -> Result<String> {
        self.public_key.to_pem()
    }

    /// Sign the canonical form of `node`
    pub fn sign_node(&self, node: &Node) -> Result<Vec<u8>> {
        let digest = canonical_digest(node)?;
        self.signing_key
            .sign(Pkcs1v15Sign::new::<Sha512>(), &digest)
            .map_err(SigChainError::from)
    }
}
