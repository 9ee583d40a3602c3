//! Graph engine
//!
//! Executes the signed state transitions of the provenance graph against a
//! world state. Every mutating operation follows the same steps:
//!
//! 1. read the affected records and check preconditions
//! 2. compute the post-state with [`sigchain_core::transition`]
//! 3. verify each caller-supplied signature over the post-state, under the
//!    owner key recorded in that post-state
//! 4. store the signature in the header and write the records
//!
//! All reads and checks happen before the first write. The engine does not
//! undo earlier writes if a later write fails; wrap it in a
//! [`StagedTransaction`](crate::storage::StagedTransaction) for atomicity.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use sigchain_core::crypto::PublicKey;
use sigchain_core::{transition, Node, Payload, Result, SigChainError};

use crate::context::TxContext;
use crate::storage::WorldState;

/// Arguments of [`GraphEngine::create_node`]
#[derive(Debug, Clone)]
pub struct NewNode {
    pub id: String,
    pub payload: Payload,
    pub owner_public_key: String,
    pub created_time: DateTime<Utc>,
    /// Owner signature over the unfinalized, unlinked node
    pub signature: Vec<u8>,
}

impl NewNode {
    /// The node this request creates, unsigned
    pub fn to_node(&self) -> Node {
        transition::created(
            self.id.clone(),
            self.payload.clone(),
            self.owner_public_key.clone(),
            self.created_time,
        )
    }
}

/// Arguments of [`GraphEngine::create_referenced_nodes_and_finalize`]
///
/// The four child lists are parallel: entry `i` of each describes child `i`.
#[derive(Debug, Clone, Default)]
pub struct BranchRequest {
    pub ids: Vec<String>,
    pub payloads: Vec<Payload>,
    pub owner_public_keys: Vec<String>,
    pub signatures: Vec<Vec<u8>>,
    /// Parent owner signature over the linked, finalized parent
    pub parent_signature: Vec<u8>,
}

impl BranchRequest {
    /// Fail with `ArityMismatch` unless all child lists have the same length
    pub fn check_arity(&self) -> Result<()> {
        let expected = self.ids.len();
        let lengths = [
            ("payloads", self.payloads.len()),
            ("owner_public_keys", self.owner_public_keys.len()),
            ("signatures", self.signatures.len()),
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

/// Arguments of [`GraphEngine::transfer_node_ownership`]
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub old_id: String,
    pub new_id: String,
    pub new_owner_public_key: String,
    /// Old owner signature over the linked, finalized old node
    pub old_signature: Vec<u8>,
    /// New owner signature over the successor node
    pub new_signature: Vec<u8>,
    pub transfer_time: DateTime<Utc>,
}

/// Records written by a branch
#[derive(Debug, Clone, Serialize)]
pub struct BranchOutcome {
    pub parent: Node,
    pub children: Vec<Node>,
}

/// Records written by an ownership transfer
#[derive(Debug, Clone, Serialize)]
pub struct TransferOutcome {
    pub previous: Node,
    pub current: Node,
}

/// Signed state-transition engine over a world state
#[derive(Debug)]
pub struct GraphEngine<'s, S: WorldState + ?Sized> {
    store: &'s S,
}

impl<'s, S: WorldState + ?Sized> GraphEngine<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Load a node
    pub fn get_node(&self, id: &str) -> Result<Node> {
        debug!(node_id = %id, "Reading node");
        let bytes = self
            .store
            .get_state(id)?
            .ok_or_else(|| SigChainError::NotFound(format!("node '{}'", id)))?;
        Node::from_bytes(&bytes)
    }

    /// Whether `id` holds a record
    pub fn node_exists(&self, id: &str) -> Result<bool> {
        Ok(self.store.contains(id)?)
    }

    /// For each id, whether it is still free
    pub fn ids_available(&self, ids: &[String]) -> Result<Vec<bool>> {
        ids.iter()
            .map(|id| self.node_exists(id).map(|exists| !exists))
            .collect()
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Insert a new, unfinalized node
    pub fn create_node(&self, ctx: &TxContext, request: NewNode) -> Result<Node> {
        self.ensure_absent(&request.id)?;

        let node = self.seal(request.to_node(), &request.signature)?;
        self.put_node(&node)?;

        info!(
            tx_id = %ctx.tx_id,
            node_id = %node.id(),
            payload = %node.payload.kind(),
            "Created node"
        );
        Ok(node)
    }

    /// Mark a node finalized
    pub fn finalize_node(&self, ctx: &TxContext, id: &str, signature: &[u8]) -> Result<Node> {
        let current = self.get_node(id)?;
        self.ensure_mutable(ctx, &current)?;

        let node = self.seal(transition::finalized(&current), signature)?;
        self.put_node(&node)?;

        info!(tx_id = %ctx.tx_id, node_id = %id, "Finalized node");
        Ok(node)
    }

    /// Link `id_a` to `id_b`
    ///
    /// Each side is signed by its own owner. Returns the updated pair.
    pub fn create_edge(
        &self,
        ctx: &TxContext,
        id_a: &str,
        id_b: &str,
        signature_a: &[u8],
        signature_b: &[u8],
    ) -> Result<(Node, Node)> {
        let a = self.get_node(id_a)?;
        let b = self.get_node(id_b)?;
        self.ensure_mutable(ctx, &a)?;
        self.ensure_mutable(ctx, &b)?;

        if id_a == id_b {
            return Err(SigChainError::InvalidArgument(format!(
                "cannot link node '{}' to itself",
                id_a
            )));
        }

        let (a_next, b_next) = transition::linked(&a, &b);
        let a_next = self.seal(a_next, signature_a)?;
        let b_next = self.seal(b_next, signature_b)?;

        self.put_node(&a_next)?;
        self.put_node(&b_next)?;

        info!(tx_id = %ctx.tx_id, from = %id_a, to = %id_b, "Created edge");
        Ok((a_next, b_next))
    }

    /// Create children of `parent_id` and finalize the parent
    ///
    /// Children get `created_time = ctx.timestamp` and a single back link to
    /// the parent. The parent is written first, then the children in request
    /// order.
    pub fn create_referenced_nodes_and_finalize(
        &self,
        ctx: &TxContext,
        parent_id: &str,
        request: BranchRequest,
    ) -> Result<BranchOutcome> {
        request.check_arity()?;
        if request.ids.is_empty() {
            return Err(SigChainError::InvalidArgument(
                "branch needs at least one child".into(),
            ));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = request.ids.iter().find(|id| !seen.insert(id.as_str())) {
            return Err(SigChainError::InvalidArgument(format!(
                "duplicate child id '{}'",
                dup
            )));
        }

        let parent = self.get_node(parent_id)?;
        self.ensure_mutable(ctx, &parent)?;

        let parent_next =
            transition::branch_parent(&parent, request.ids.iter().map(String::as_str));
        let parent_next = self.seal(parent_next, &request.parent_signature)?;

        let mut children = Vec::with_capacity(request.ids.len());
        let entries = request
            .ids
            .into_iter()
            .zip(request.payloads)
            .zip(request.owner_public_keys)
            .zip(request.signatures);
        for (((id, payload), owner_public_key), signature) in entries {
            self.ensure_absent(&id)?;
            let child =
                transition::branch_child(parent_id, id, payload, owner_public_key, ctx.timestamp);
            children.push(self.seal(child, &signature)?);
        }

        self.put_node(&parent_next)?;
        for child in &children {
            self.put_node(child)?;
        }

        info!(
            tx_id = %ctx.tx_id,
            parent_id = %parent_id,
            children = children.len(),
            "Branched and finalized node"
        );
        Ok(BranchOutcome {
            parent: parent_next,
            children,
        })
    }

    /// Retire `old_id` and continue it as `new_id` under a new owner
    pub fn transfer_node_ownership(
        &self,
        ctx: &TxContext,
        request: TransferRequest,
    ) -> Result<TransferOutcome> {
        self.ensure_absent(&request.new_id)?;
        let old = self.get_node(&request.old_id)?;
        self.ensure_mutable(ctx, &old)?;

        let (retired, successor) = transition::transferred(
            &old,
            request.new_id.clone(),
            request.new_owner_public_key,
            request.transfer_time,
        );
        let retired = self.seal(retired, &request.old_signature)?;
        let successor = self.seal(successor, &request.new_signature)?;

        self.put_node(&retired)?;
        self.put_node(&successor)?;

        info!(
            tx_id = %ctx.tx_id,
            old_id = %request.old_id,
            new_id = %request.new_id,
            "Transferred node ownership"
        );
        Ok(TransferOutcome {
            previous: retired,
            current: successor,
        })
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn ensure_absent(&self, id: &str) -> Result<()> {
        if self.node_exists(id)? {
            return Err(SigChainError::AlreadyExists(format!("node '{}'", id)));
        }
        Ok(())
    }

    fn ensure_mutable(&self, ctx: &TxContext, node: &Node) -> Result<()> {
        node.ensure_mutable().inspect_err(|_| {
            warn!(tx_id = %ctx.tx_id, node_id = %node.id(), "Rejected mutation of finalized node");
        })
    }

    /// Verify `signature` over `node` under its own owner key, then attach it
    fn seal(&self, mut node: Node, signature: &[u8]) -> Result<Node> {
        let key = PublicKey::parse(&node.header.owner_public_key)?;
        if let Err(err) = key.verify_node(&node, signature) {
            warn!(node_id = %node.id(), error = %err, "SECURITY: Rejected node signature");
            return Err(err);
        }
        node.header.signature = signature.to_vec();
        Ok(node)
    }

    fn put_node(&self, node: &Node) -> Result<()> {
        self.store.put_state(node.id(), node.to_bytes()?)?;
        Ok(())
    }
}
