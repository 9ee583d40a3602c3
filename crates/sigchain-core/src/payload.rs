//! Typed node payloads
//!
//! The engine treats the payload as opaque data. Domain schemas live here as
//! variants of one sum type so several schemas can share a world state: the
//! variant name is the type discriminant in the stored record.
//!
//! A schema consumer validates its own invariants (units, quantities, ...)
//! before calling the engine; the engine does no domain arithmetic.

use crate::error::{Result, SigChainError};
use crate::node::serde_bytes_base64;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Domain data attached to a node
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// No domain data
    #[default]
    Empty,

    /// Quantity of a named material
    Material(Material),

    /// Bytes of a schema the ledger does not know about
    Opaque(OpaquePayload),
}

impl Payload {
    /// Schema discriminant, as written in the record
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Empty => PayloadKind::Empty,
            Payload::Material(_) => PayloadKind::Material,
            Payload::Opaque(_) => PayloadKind::Opaque,
        }
    }

    /// Borrow the material schema or fail with `InvalidPayload`
    pub fn as_material(&self) -> Result<&Material> {
        match self {
            Payload::Material(material) => Ok(material),
            other => Err(SigChainError::InvalidPayload(format!(
                "expected {} payload, found {}",
                PayloadKind::Material,
                other.kind()
            ))),
        }
    }
}

/// Payload schema discriminant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    Empty,
    Material,
    Opaque,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadKind::Empty => write!(f, "Empty"),
            PayloadKind::Material => write!(f, "Material"),
            PayloadKind::Opaque => write!(f, "Opaque"),
        }
    }
}

/// A named quantity of some material
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Material {
    #[serde(rename = "Name")]
    pub name: String,

    #[serde(rename = "Unit")]
    pub unit: String,

    /// Exact decimal, stored as a string
    #[serde(rename = "Quantity")]
    pub quantity: Decimal,
}

impl Material {
    /// Build a material, rejecting negative quantities
    pub fn new(
        name: impl Into<String>,
        unit: impl Into<String>,
        quantity: Decimal,
    ) -> Result<Self> {
        if quantity < Decimal::ZERO {
            return Err(SigChainError::InvalidPayload(format!(
                "material quantity cannot be negative: {}",
                quantity
            )));
        }
        Ok(Self {
            name: name.into(),
            unit: unit.into(),
            quantity,
        })
    }

    /// Same material with a different quantity
    pub fn with_quantity(&self, quantity: Decimal) -> Self {
        Self {
            name: self.name.clone(),
            unit: self.unit.clone(),
            quantity,
        }
    }
}

/// Parse a decimal quantity from caller input
pub fn parse_quantity(raw: &str) -> Result<Decimal> {
    raw.trim()
        .parse::<Decimal>()
        .map_err(|e| SigChainError::InvalidPayload(format!("invalid quantity '{}': {}", raw, e)))
}

/// Schema-tagged bytes for consumers outside this crate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpaquePayload {
    #[serde(rename = "Schema")]
    pub schema: String,

    #[serde(rename = "Data", with = "serde_bytes_base64")]
    pub data: Vec<u8>,
}
