//! State transitions of the provenance graph
//!
//! Each function takes the current node(s) and returns the state an operation
//! would write, unsigned. The ledger applies these before verifying; a client
//! applies the same function to learn what its owner must sign.
//!
//! ```text
//!   create     ->  [id | unfinalized | prev={} next={}]
//!   finalize   ->  [id | finalized]
//!   link a->b  ->  a.next += H(b)      b.prev += H(a)
//!   branch     ->  p.next += H(c_i), p finalized;   c_i.prev = {H(p)}
//!   transfer   ->  old.next += H(new), old finalized;   new.prev = {H(old)}
//! ```
//!
//! None of these check preconditions such as finalization or existence; that
//! is the ledger's job.

use crate::crypto::hash_id;
use crate::node::{LinkSet, Node, NodeHeader};
use crate::payload::Payload;
use chrono::{DateTime, Utc};

/// Node as written by a create
pub fn created(
    id: impl Into<String>,
    payload: Payload,
    owner_public_key: impl Into<String>,
    created_time: DateTime<Utc>,
) -> Node {
    Node::new(NodeHeader::new(id, owner_public_key, created_time), payload)
}

/// `node` marked finalized
pub fn finalized(node: &Node) -> Node {
    let mut next = node.clone();
    next.header.is_finalized = true;
    next
}

/// Both ends of an edge from `from` to `to`
pub fn linked(from: &Node, to: &Node) -> (Node, Node) {
    let mut from_next = from.clone();
    let mut to_next = to.clone();
    from_next.header.next_links.insert(hash_id(to.id()));
    to_next.header.previous_links.insert(hash_id(from.id()));
    (from_next, to_next)
}

/// Parent of a branch: linked to every child, then finalized
pub fn branch_parent<'a, I>(parent: &Node, child_ids: I) -> Node
where
    I: IntoIterator<Item = &'a str>,
{
    let mut next = finalized(parent);
    next.header
        .next_links
        .extend(child_ids.into_iter().map(hash_id));
    next
}

/// One child of a branch, pointing back at its parent
pub fn branch_child(
    parent_id: &str,
    child_id: impl Into<String>,
    payload: Payload,
    owner_public_key: impl Into<String>,
    created_time: DateTime<Utc>,
) -> Node {
    let mut child = created(child_id, payload, owner_public_key, created_time);
    child.header.previous_links = LinkSet::from([hash_id(parent_id)]);
    child
}

/// Old and new node of an ownership transfer
///
/// The successor copies the payload, takes the new owner and transfer time,
/// and links back to the old node. The old node is linked forward and
/// finalized.
pub fn transferred(
    old: &Node,
    new_id: impl Into<String>,
    new_owner_public_key: impl Into<String>,
    transfer_time: DateTime<Utc>,
) -> (Node, Node) {
    let successor = branch_child(
        old.id(),
        new_id,
        old.payload.clone(),
        new_owner_public_key,
        transfer_time,
    );
    let retired = branch_parent(old, [successor.id()]);
    (retired, successor)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_created_is_blank() {
        let node = created("n", Payload::Empty, "key", at(1));
        assert!(!node.is_finalized());
        assert!(node.header.previous_links.is_empty());
        assert!(node.header.next_links.is_empty());
        assert_eq!(node.header.created_time, at(1));
    }

    #[test]
    fn test_linked_touches_both_ends() {
        let a = created("a", Payload::Empty, "ka", at(1));
        let b = created("b", Payload::Empty, "kb", at(1));
        let (a2, b2) = linked(&a, &b);

        assert!(a2.links_to("b"));
        assert!(b2.linked_from("a"));
        assert!(a2.header.previous_links.is_empty());
        assert!(b2.header.next_links.is_empty());
        // Inputs are not modified
        assert!(a.header.next_links.is_empty());
    }

    #[test]
    fn test_linked_is_idempotent() {
        let a = created("a", Payload::Empty, "ka", at(1));
        let b = created("b", Payload::Empty, "kb", at(1));
        let (a2, b2) = linked(&a, &b);
        let (a3, b3) = linked(&a2, &b2);
        assert_eq!(a2, a3);
        assert_eq!(b2, b3);
    }

    #[test]
    fn test_branch() {
        let parent = created("p", Payload::Empty, "kp", at(1));
        let next = branch_parent(&parent, ["c1", "c2"]);
        assert!(next.is_finalized());
        assert_eq!(next.header.next_links.len(), 2);
        assert!(next.links_to("c1") && next.links_to("c2"));

        let child = branch_child("p", "c1", Payload::Empty, "kc", at(2));
        assert_eq!(child.header.previous_links, LinkSet::from([hash_id("p")]));
        assert!(!child.is_finalized());
    }

    #[test]
    fn test_transferred() {
        let mut old = created("old", Payload::Empty, "k1", at(1));
        old.header.previous_links.insert(hash_id("origin"));
        old.header.signature = vec![9; 4];

        let (retired, successor) = transferred(&old, "new", "k2", at(5));

        assert!(retired.is_finalized());
        assert!(retired.links_to("new"));
        assert!(retired.linked_from("origin"));

        assert_eq!(successor.id(), "new");
        assert_eq!(successor.header.owner_public_key, "k2");
        assert_eq!(successor.header.created_time, at(5));
        assert_eq!(successor.header.previous_links, LinkSet::from([hash_id("old")]));
        assert!(successor.header.next_links.is_empty());
        assert!(successor.header.signature.is_empty());
        assert_eq!(successor.payload, old.payload);
    }
}
