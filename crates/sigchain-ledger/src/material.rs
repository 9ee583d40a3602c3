//! Material contract
//!
//! Typed consumer of the graph engine for [`Material`] payloads. It validates
//! quantities and caller-supplied timestamps, then delegates to
//! [`GraphEngine`]. Signatures are over the same canonical node form the
//! engine verifies, with the material inside the payload.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::info;

use sigchain_core::{parse_quantity, Material, Node, Payload, Result, SigChainError};

use crate::config::DEFAULT_MAX_CLOCK_SKEW_SECS;
use crate::context::TxContext;
use crate::graph::{
    BranchOutcome, BranchRequest, GraphEngine, NewNode, TransferOutcome, TransferRequest,
};
use crate::storage::WorldState;

/// Arguments of [`MaterialContract::create_material`]
#[derive(Debug, Clone)]
pub struct NewMaterial {
    pub id: String,
    pub name: String,
    pub unit: String,
    /// Decimal text, e.g. `"12.5"`
    pub quantity: String,
    pub owner_public_key: String,
    pub created_time: DateTime<Utc>,
    pub signature: Vec<u8>,
}

/// Arguments of [`MaterialContract::split_material`]
#[derive(Debug, Clone, Default)]
pub struct SplitRequest {
    pub quantities: Vec<Decimal>,
    pub new_ids: Vec<String>,
    pub owner_public_keys: Vec<String>,
    /// Parent owner signature over the linked, finalized parent
    pub signature: Vec<u8>,
    pub child_signatures: Vec<Vec<u8>>,
}

impl SplitRequest {
    /// Fail with `ArityMismatch` unless every list matches `quantities`
    pub fn check_arity(&self) -> Result<()> {
        let expected = self.quantities.len();
        let lengths = [
            ("new_ids", self.new_ids.len()),
            ("owner_public_keys", self.owner_public_keys.len()),
            ("child_signatures", self.child_signatures.len()),
        ];
        for (field, actual) in lengths {
            if actual != expected {
                return Err(SigChainError::ArityMismatch {
                    field: field.to_string(),
                    expected,
                    actual,
                });
            }
        }
        Ok(())
    }
}

/// Material operations over a world state
#[derive(Debug)]
pub struct MaterialContract<'s, S: WorldState + ?Sized> {
    graph: GraphEngine<'s, S>,
    max_clock_skew_secs: i64,
}

impl<'s, S: WorldState + ?Sized> MaterialContract<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self::with_max_clock_skew(store, DEFAULT_MAX_CLOCK_SKEW_SECS)
    }

    /// Contract accepting caller timestamps up to `secs` from the transaction time
    pub fn with_max_clock_skew(store: &'s S, secs: i64) -> Self {
        Self {
            graph: GraphEngine::new(store),
            max_clock_skew_secs: secs,
        }
    }

    /// Create a material node
    pub fn create_material(&self, ctx: &TxContext, request: NewMaterial) -> Result<Node> {
        let quantity = parse_quantity(&request.quantity)?;
        let material = Material::new(request.name, request.unit, quantity)?;
        ctx.check_skew(request.created_time, self.max_clock_skew_secs)?;

        self.graph.create_node(
            ctx,
            NewNode {
                id: request.id,
                payload: Payload::Material(material),
                owner_public_key: request.owner_public_key,
                created_time: request.created_time,
                signature: request.signature,
            },
        )
    }

    /// Load a material node
    ///
    /// Fails with `InvalidPayload` if the node holds another schema.
    pub fn get_material(&self, id: &str) -> Result<(Node, Material)> {
        let node = self.graph.get_node(id)?;
        let material = node.payload.as_material()?.clone();
        Ok((node, material))
    }

    /// Hand a material to a new owner under a new id
    pub fn transfer_material(
        &self,
        ctx: &TxContext,
        request: TransferRequest,
    ) -> Result<TransferOutcome> {
        self.get_material(&request.old_id)?;
        ctx.check_skew(request.transfer_time, self.max_clock_skew_secs)?;
        self.graph.transfer_node_ownership(ctx, request)
    }

    /// Split a material into parts whose quantities sum to the original
    ///
    /// Children keep the parent's name and unit. The parent is finalized.
    pub fn split_material(
        &self,
        ctx: &TxContext,
        id: &str,
        request: SplitRequest,
    ) -> Result<BranchOutcome> {
        request.check_arity()?;
        let (_, parent) = self.get_material(id)?;
        let children = split_payloads(&parent, &request.quantities)?;

        let branch = BranchRequest {
            ids: request.new_ids,
            payloads: children,
            owner_public_keys: request.owner_public_keys,
            signatures: request.child_signatures,
            parent_signature: request.signature,
        };

        let outcome = self.graph.create_referenced_nodes_and_finalize(ctx, id, branch)?;
        info!(
            tx_id = %ctx.tx_id,
            node_id = %id,
            parts = outcome.children.len(),
            "Split material"
        );
        Ok(outcome)
    }
}

/// Child payloads of a split, checked against the parent quantity
///
/// Every part must be positive and the parts must add up to the parent
/// exactly.
pub fn split_payloads(parent: &Material, quantities: &[Decimal]) -> Result<Vec<Payload>> {
    if quantities.is_empty() {
        return Err(SigChainError::InvalidArgument(
            "split needs at least one quantity".into(),
        ));
    }
    if let Some(q) = quantities.iter().find(|q| **q <= Decimal::ZERO) {
        return Err(SigChainError::InvalidPayload(format!(
            "split quantity must be positive: {}",
            q
        )));
    }

    let total = quantities
        .iter()
        .try_fold(Decimal::ZERO, |acc, q| acc.checked_add(*q))
        .ok_or_else(|| SigChainError::InvalidPayload("split quantities overflow".into()))?;
    if total != parent.quantity {
        return Err(SigChainError::InvalidPayload(format!(
            "split quantities sum to {} but material holds {}",
            total, parent.quantity
        )));
    }

    Ok(quantities
        .iter()
        .map(|q| Payload::Material(parent.with_quantity(*q)))
        .collect())
}
