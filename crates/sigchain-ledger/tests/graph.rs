//! Integration Tests for the Graph Engine
//!
//! These tests drive the engine the way a client would:
//! - creation and reads
//! - finalization, edges, branches and transfers
//! - rejection of finalized nodes, id collisions and arity mismatches

mod common;

use chrono::Duration;
use common::*;
use proptest::prelude::*;
use rust_decimal::Decimal;
use sigchain_core::{fixtures, hash_id, Material, Payload, SigChainError};
use sigchain_ledger::{BranchRequest, GraphEngine, MemoryStore};

// =============================================================================
// Creation
// =============================================================================

#[test]
fn test_create_then_get() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let payload = Payload::Material(Material::new("wool", "kg", Decimal::new(75, 1)).unwrap());

    engine
        .create_node(&ctx(), new_node("bale-1", &alice, payload.clone()))
        .unwrap();
    let node = engine.get_node("bale-1").unwrap();

    assert!(!node.is_finalized());
    assert!(node.header.previous_links.is_empty());
    assert!(node.header.next_links.is_empty());
    assert_eq!(node.header.owner_public_key, pem(&alice));
    assert_eq!(node.payload, payload);
}

#[test]
fn test_get_missing_node() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    assert!(matches!(engine.get_node("ghost"), Err(SigChainError::NotFound(_))));
}

#[test]
fn test_collision_leaves_record_untouched() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    create(&engine, "n1", &fixtures::alice());
    let before = store.snapshot().unwrap();

    // Valid request from a different owner for the same id
    let err = engine
        .create_node(&ctx(), new_node("n1", &fixtures::bob(), Payload::Empty))
        .unwrap_err();

    assert!(matches!(err, SigChainError::AlreadyExists(_)));
    assert_eq!(store.snapshot().unwrap(), before);
}

// =============================================================================
// Finalization and edges
// =============================================================================

#[test]
fn test_finalize() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let node = create(&engine, "n1", &alice);

    engine
        .finalize_node(&ctx(), "n1", &finalize_signature(&node, &alice))
        .unwrap();
    assert!(engine.get_node("n1").unwrap().is_finalized());
}

#[test]
fn test_finalize_requires_owner_signature() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let node = create(&engine, "n1", &fixtures::alice());

    let err = engine
        .finalize_node(&ctx(), "n1", &finalize_signature(&node, &fixtures::bob()))
        .unwrap_err();
    assert!(matches!(err, SigChainError::VerificationFailure(_)));
    assert!(!engine.get_node("n1").unwrap().is_finalized());
}

#[test]
fn test_edge_links_both_sides() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let bob = fixtures::bob();
    let a = create(&engine, "a", &alice);
    let b = create(&engine, "b", &bob);

    let (sig_a, sig_b) = edge_signatures(&a, &b, &alice, &bob);
    engine.create_edge(&ctx(), "a", "b", &sig_a, &sig_b).unwrap();

    let a = engine.get_node("a").unwrap();
    let b = engine.get_node("b").unwrap();
    assert!(a.header.next_links.contains(&hash_id("b")));
    assert!(b.header.previous_links.contains(&hash_id("a")));
    assert_eq!(a.header.signature, sig_a);
    assert_eq!(b.header.signature, sig_b);
}

#[test]
fn test_edge_with_swapped_signatures_fails() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let bob = fixtures::bob();
    let a = create(&engine, "a", &alice);
    let b = create(&engine, "b", &bob);
    let before = store.snapshot().unwrap();

    let (sig_a, sig_b) = edge_signatures(&a, &b, &alice, &bob);
    let err = engine.create_edge(&ctx(), "a", "b", &sig_b, &sig_a).unwrap_err();

    assert!(matches!(err, SigChainError::VerificationFailure(_)));
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn test_edge_to_missing_node() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    create(&engine, "a", &fixtures::alice());

    let err = engine.create_edge(&ctx(), "a", "ghost", &[], &[]).unwrap_err();
    assert!(matches!(err, SigChainError::NotFound(_)));
}

// =============================================================================
// Finalized nodes reject every mutation
// =============================================================================

/// Build a store holding a finalized node "done" (owned by alice) and an open
/// node "open" (owned by bob), after `edges` prior edge operations
fn finalized_fixture(edges: usize) -> MemoryStore {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let bob = fixtures::bob();

    create(&engine, "done", &alice);
    create(&engine, "open", &bob);
    for i in 0..edges {
        let peer_id = format!("peer-{}", i);
        create(&engine, &peer_id, &bob);
        let done = engine.get_node("done").unwrap();
        let peer = engine.get_node(&peer_id).unwrap();
        let (sig_a, sig_b) = edge_signatures(&done, &peer, &alice, &bob);
        engine.create_edge(&ctx(), "done", &peer_id, &sig_a, &sig_b).unwrap();
    }
    let done = engine.get_node("done").unwrap();
    engine
        .finalize_node(&ctx(), "done", &finalize_signature(&done, &alice))
        .unwrap();
    store
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_finalized_rejects_mutations(edges in 0usize..3, op in 0usize..5) {
        let store = finalized_fixture(edges);
        let engine = GraphEngine::new(&store);
        let alice = fixtures::alice();
        let bob = fixtures::bob();
        let done = engine.get_node("done").unwrap();
        let open = engine.get_node("open").unwrap();
        let before = store.snapshot().unwrap();

        let result = match op {
            0 => engine
                .finalize_node(&ctx(), "done", &finalize_signature(&done, &alice))
                .map(|_| ()),
            1 => {
                let (sa, sb) = edge_signatures(&done, &open, &alice, &bob);
                engine.create_edge(&ctx(), "done", "open", &sa, &sb).map(|_| ())
            }
            2 => {
                let (sa, sb) = edge_signatures(&open, &done, &bob, &alice);
                engine.create_edge(&ctx(), "open", "done", &sa, &sb).map(|_| ())
            }
            3 => engine
                .transfer_node_ownership(
                    &ctx(),
                    transfer_request(&done, &alice, "done-2", &bob, tx_time()),
                )
                .map(|_| ()),
            _ => {
                let request = branch_request(&done, &alice, &[("done-kid", Payload::Empty, &bob)]);
                engine
                    .create_referenced_nodes_and_finalize(&ctx(), "done", request)
                    .map(|_| ())
            }
        };

        prop_assert!(matches!(result, Err(SigChainError::AlreadyFinalized(_))));
        prop_assert_eq!(store.snapshot().unwrap(), before);
    }
}

// =============================================================================
// Branching
// =============================================================================

#[test]
fn test_branch_creates_children_and_finalizes_parent() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let bob = fixtures::bob();
    let carol = fixtures::carol();
    let parent = create(&engine, "root", &alice);

    let request = branch_request(
        &parent,
        &alice,
        &[("left", Payload::Empty, &bob), ("right", Payload::Empty, &carol)],
    );
    let outcome = engine
        .create_referenced_nodes_and_finalize(&ctx(), "root", request)
        .unwrap();
    assert_eq!(outcome.children.len(), 2);

    let root = engine.get_node("root").unwrap();
    assert!(root.is_finalized());
    assert!(root.links_to("left") && root.links_to("right"));

    for (id, owner) in [("left", &bob), ("right", &carol)] {
        let child = engine.get_node(id).unwrap();
        assert!(!child.is_finalized());
        assert!(child.linked_from("root"));
        assert_eq!(child.header.previous_links.len(), 1);
        assert_eq!(child.header.created_time, tx_time());
        assert_eq!(child.header.owner_public_key, pem(owner));
    }
}

#[test]
fn test_branch_arity_mismatch_writes_nothing() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let parent = create(&engine, "root", &alice);

    let mut request = branch_request(
        &parent,
        &alice,
        &[
            ("c1", Payload::Empty, &alice),
            ("c2", Payload::Empty, &alice),
            ("c3", Payload::Empty, &alice),
        ],
    );
    request.payloads.pop();
    let before = store.snapshot().unwrap();

    let err = engine
        .create_referenced_nodes_and_finalize(&ctx(), "root", request)
        .unwrap_err();

    match err {
        SigChainError::ArityMismatch { field, expected, actual } => {
            assert_eq!(field, "payloads");
            assert_eq!((expected, actual), (3, 2));
        }
        other => panic!("expected ArityMismatch, got {:?}", other),
    }
    assert_eq!(store.snapshot().unwrap(), before);
}

#[test]
fn test_branch_arity_checked_before_parent_lookup() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let request = BranchRequest {
        ids: vec!["c1".into(), "c2".into()],
        payloads: vec![Payload::Empty],
        owner_public_keys: vec!["k".into(), "k".into()],
        signatures: vec![vec![], vec![]],
        parent_signature: vec![],
    };

    let err = engine
        .create_referenced_nodes_and_finalize(&ctx(), "missing-parent", request)
        .unwrap_err();
    assert!(matches!(err, SigChainError::ArityMismatch { .. }));
}

#[test]
fn test_branch_existing_child_writes_nothing() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let parent = create(&engine, "root", &alice);
    create(&engine, "taken", &alice);
    let before = store.snapshot().unwrap();

    let request = branch_request(
        &parent,
        &alice,
        &[("fresh", Payload::Empty, &alice), ("taken", Payload::Empty, &alice)],
    );
    let err = engine
        .create_referenced_nodes_and_finalize(&ctx(), "root", request)
        .unwrap_err();

    assert!(matches!(err, SigChainError::AlreadyExists(_)));
    assert_eq!(store.snapshot().unwrap(), before);
}

// =============================================================================
// Ownership transfer
// =============================================================================

#[test]
fn test_transfer() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let bob = fixtures::bob();
    let payload = Payload::Material(Material::new("oak", "m3", Decimal::new(3, 0)).unwrap());
    let old = engine
        .create_node(&ctx(), new_node("lot-1", &alice, payload.clone()))
        .unwrap();
    let when = tx_time() + Duration::minutes(5);

    engine
        .transfer_node_ownership(&ctx(), transfer_request(&old, &alice, "lot-2", &bob, when))
        .unwrap();

    let old = engine.get_node("lot-1").unwrap();
    assert!(old.is_finalized());
    assert!(old.links_to("lot-2"));
    assert_eq!(old.header.owner_public_key, pem(&alice));

    let new = engine.get_node("lot-2").unwrap();
    assert!(!new.is_finalized());
    assert!(new.linked_from("lot-1"));
    assert_eq!(new.header.owner_public_key, pem(&bob));
    assert_eq!(new.header.created_time, when);
    assert_eq!(new.payload, payload);
}

#[test]
fn test_transfer_twice_to_same_new_id() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let bob = fixtures::bob();
    let first = create(&engine, "old-1", &alice);
    let second = create(&engine, "old-2", &alice);

    engine
        .transfer_node_ownership(&ctx(), transfer_request(&first, &alice, "new", &bob, tx_time()))
        .unwrap();
    let err = engine
        .transfer_node_ownership(&ctx(), transfer_request(&second, &alice, "new", &bob, tx_time()))
        .unwrap_err();

    assert!(matches!(err, SigChainError::AlreadyExists(_)));
    assert!(!engine.get_node("old-2").unwrap().is_finalized());
}

#[test]
fn test_transfer_from_missing_node() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let phantom = sigchain_core::transition::created("ghost", Payload::Empty, pem(&alice), tx_time());

    let err = engine
        .transfer_node_ownership(&ctx(), transfer_request(&phantom, &alice, "new", &alice, tx_time()))
        .unwrap_err();
    assert!(matches!(err, SigChainError::NotFound(_)));
}

#[test]
fn test_transfer_new_owner_must_sign() {
    let store = MemoryStore::new();
    let engine = GraphEngine::new(&store);
    let alice = fixtures::alice();
    let bob = fixtures::bob();
    let old = create(&engine, "old", &alice);

    let mut request = transfer_request(&old, &alice, "new", &bob, tx_time());
    request.new_signature = request.old_signature.clone();

    let err = engine.transfer_node_ownership(&ctx(), request).unwrap_err();
    assert!(matches!(err, SigChainError::VerificationFailure(_)));
    assert!(!engine.node_exists("new").unwrap());
}
