//! Shared helpers for ledger integration tests
//!
//! Each helper plays the client side: compute the post-state with
//! `sigchain_core::transition`, sign it with the owner key, hand the
//! signature to the engine.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use sigchain_core::{transition, KeyPair, Node, Payload};
use sigchain_ledger::{BranchRequest, GraphEngine, NewNode, TransferRequest, TxContext, WorldState};

/// Fixed transaction time used across tests
pub fn tx_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 10, 9, 30, 0).unwrap()
}

pub fn ctx() -> TxContext {
    TxContext::new("tx-test", tx_time())
}

pub fn pem(owner: &KeyPair) -> String {
    owner.public_key_pem().expect("fixture key encodes")
}

/// Signed creation request for `id`
pub fn new_node(id: &str, owner: &KeyPair, payload: Payload) -> NewNode {
    let mut request = NewNode {
        id: id.to_string(),
        payload,
        owner_public_key: pem(owner),
        created_time: tx_time(),
        signature: Vec::new(),
    };
    request.signature = owner.sign_node(&request.to_node()).expect("sign");
    request
}

/// Create an empty-payload node owned by `owner`
pub fn create<S: WorldState + ?Sized>(
    engine: &GraphEngine<'_, S>,
    id: &str,
    owner: &KeyPair,
) -> Node {
    engine
        .create_node(&ctx(), new_node(id, owner, Payload::Empty))
        .expect("create node")
}

/// Owner signature for finalizing `node`
pub fn finalize_signature(node: &Node, owner: &KeyPair) -> Vec<u8> {
    owner.sign_node(&transition::finalized(node)).expect("sign")
}

/// Both signatures for an edge from `a` to `b`
pub fn edge_signatures(
    a: &Node,
    b: &Node,
    owner_a: &KeyPair,
    owner_b: &KeyPair,
) -> (Vec<u8>, Vec<u8>) {
    let (a_next, b_next) = transition::linked(a, b);
    (
        owner_a.sign_node(&a_next).expect("sign"),
        owner_b.sign_node(&b_next).expect("sign"),
    )
}

/// Fully signed transfer of `old` to `new_id`
pub fn transfer_request(
    old: &Node,
    old_owner: &KeyPair,
    new_id: &str,
    new_owner: &KeyPair,
    transfer_time: DateTime<Utc>,
) -> TransferRequest {
    let (retired, successor) = transition::transferred(old, new_id, pem(new_owner), transfer_time);
    TransferRequest {
        old_id: old.id().to_string(),
        new_id: new_id.to_string(),
        new_owner_public_key: pem(new_owner),
        old_signature: old_owner.sign_node(&retired).expect("sign"),
        new_signature: new_owner.sign_node(&successor).expect("sign"),
        transfer_time,
    }
}

/// Fully signed branch of `parent` into `children`
pub fn branch_request(
    parent: &Node,
    parent_owner: &KeyPair,
    children: &[(&str, Payload, &KeyPair)],
) -> BranchRequest {
    let ids: Vec<String> = children.iter().map(|(id, _, _)| id.to_string()).collect();
    let parent_next = transition::branch_parent(parent, ids.iter().map(String::as_str));

    let mut request = BranchRequest {
        ids,
        parent_signature: parent_owner.sign_node(&parent_next).expect("sign"),
        ..Default::default()
    };
    for (id, payload, owner) in children {
        let child =
            transition::branch_child(parent.id(), *id, payload.clone(), pem(owner), tx_time());
        request.signatures.push(owner.sign_node(&child).expect("sign"));
        request.payloads.push(payload.clone());
        request.owner_public_keys.push(pem(owner));
    }
    request
}
