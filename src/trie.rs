//! The trie algorithms: insert, delete with bottom-up purge-and-compress,
//! get/contains/lookup/lookup_prefix/lookup_prefix_lpm, overlap, union,
//! equal. Every mutating entry point takes `&mut Arc<Node<AF, V>>` and
//! calls `Arc::make_mut` before touching it, so the exact same code
//! implements both the single-writer, in-place family and the
//! copy-on-write persistent family: a persistent caller just
//! `Arc::clone`s the root first (cheap) and runs the identical
//! traversal on the clone. Unmodified subtrees are never visited by
//! `make_mut`, so they stay shared with whatever other tree still
//! references them.

use std::sync::Arc;

use log::{debug, trace};

use crate::art::{idx_to_pfx, pfx_to_idx, tables};
use crate::family::AddressFamily;
use crate::node::{Child, Leaf, Node};
use crate::prefix::Prefix;

/// `bits` remaining to be consumed once `depth` stride-levels have been
/// walked. `<= 0` means the whole prefix has already been consumed (the
/// default route of the node at this depth); `< 8` means a partial
/// octet is matched via the prefix table; `>= 8` means a child-table
/// dispatch is needed.
#[inline]
fn remaining(bits: u8, depth: usize) -> i16 {
    bits as i16 - 8 * depth as i16
}

// ---------------------------------------------------------------------
// insert
// ---------------------------------------------------------------------

/// Inserts `(prefix, value)` starting at `cur` (normally a family root).
/// Returns the previous value if the prefix was already present.
pub(crate) fn insert<AF: AddressFamily, V: Clone>(
    cur: &mut Arc<Node<AF, V>>,
    prefix: Prefix<AF>,
    value: V,
) -> Option<V> {
    insert_rec(cur, prefix, value, 0)
}

fn insert_rec<AF: AddressFamily, V: Clone>(
    cur: &mut Arc<Node<AF, V>>,
    prefix: Prefix<AF>,
    value: V,
    depth: usize,
) -> Option<V> {
    let rem = remaining(prefix.len(), depth);
    let node = Arc::make_mut(cur);

    if rem <= 0 {
        return node.insert_prefix(1, value);
    }
    let octet = prefix.addr().octet(depth);
    if rem < 8 {
        let idx = pfx_to_idx(octet, rem as u8);
        return node.insert_prefix(idx, value);
    }

    match node.delete_child(octet) {
        None => {
            let child = if rem == 8 {
                trace!("depth {depth}: octet {octet} empty, inserting fringe");
                Child::Fringe(Box::new(value))
            } else {
                trace!("depth {depth}: octet {octet} empty, inserting leaf");
                Child::Leaf(Box::new(Leaf { prefix, value }))
            };
            node.insert_child(octet, child);
            None
        }
        Some(Child::Node(mut child_arc)) => {
            trace!("depth {depth}: octet {octet} descends into child node");
            let old = insert_rec(&mut child_arc, prefix, value, depth + 1);
            node.insert_child(octet, Child::Node(child_arc));
            old
        }
        Some(Child::Leaf(leaf)) => {
            if leaf.prefix == prefix {
                node.insert_child(octet, Child::Leaf(Box::new(Leaf { prefix, value })));
                Some(leaf.value)
            } else {
                debug!("depth {depth}: octet {octet} pushes down leaf {} to make room for {}", leaf.prefix, prefix);
                let mut new_node = Arc::new(Node::new());
                insert_rec(&mut new_node, leaf.prefix, leaf.value, depth + 1);
                let old = insert_rec(&mut new_node, prefix, value, depth + 1);
                node.insert_child(octet, Child::Node(new_node));
                old
            }
        }
        Some(Child::Fringe(old_val)) => {
            if rem == 8 {
                node.insert_child(octet, Child::Fringe(Box::new(value)));
                Some(*old_val)
            } else {
                debug!("depth {depth}: octet {octet} pushes down fringe to make room for {prefix}");
                let mut new_node = Arc::new(Node::new());
                Arc::make_mut(&mut new_node).insert_prefix(1, *old_val);
                let old = insert_rec(&mut new_node, prefix, value, depth + 1);
                node.insert_child(octet, Child::Node(new_node));
                old
            }
        }
    }
}

// ---------------------------------------------------------------------
// delete + purge-and-compress
// ---------------------------------------------------------------------

/// Deletes `prefix` starting at `cur`. Returns the removed value, if
/// any. Purge-and-compress runs automatically as the recursion unwinds.
pub(crate) fn delete<AF: AddressFamily, V: Clone>(
    cur: &mut Arc<Node<AF, V>>,
    prefix: &Prefix<AF>,
) -> Option<V> {
    delete_rec(cur, prefix, 0)
}

enum Collapse<AF: AddressFamily, V> {
    Stop,
    Remove,
    Replace(Prefix<AF>, V),
}

fn delete_rec<AF: AddressFamily, V: Clone>(
    cur: &mut Arc<Node<AF, V>>,
    prefix: &Prefix<AF>,
    depth: usize,
) -> Option<V> {
    let rem = remaining(prefix.len(), depth);
    let node = Arc::make_mut(cur);

    if rem <= 0 {
        return node.delete_prefix(1);
    }
    let octet = prefix.addr().octet(depth);
    if rem < 8 {
        let idx = pfx_to_idx(octet, rem as u8);
        return node.delete_prefix(idx);
    }

    match node.get_child(octet) {
        None => None,
        Some(Child::Leaf(leaf)) => {
            let matched = leaf.prefix == *prefix;
            if matched {
                match node.delete_child(octet) {
                    Some(Child::Leaf(l)) => Some(l.value),
                    _ => crate::error::corrupted("leaf vanished under exclusive access"),
                }
            } else {
                None
            }
        }
        Some(Child::Fringe(_)) => {
            if rem == 8 {
                match node.delete_child(octet) {
                    Some(Child::Fringe(v)) => Some(*v),
                    _ => crate::error::corrupted("fringe vanished under exclusive access"),
                }
            } else {
                None
            }
        }
        Some(Child::Node(_)) => {
            let removed = match node.get_child_mut(octet) {
                Some(Child::Node(child_arc)) => delete_rec(child_arc, prefix, depth + 1),
                _ => crate::error::corrupted("child tag changed under exclusive access"),
            };
            if removed.is_some() {
                let action = plan_collapse(node, octet, depth, prefix);
                apply_collapse(node, octet, depth, action);
            }
            removed
        }
    }
}

/// Inspects the node child at `octet` (known to be `Child::Node`) and
/// decides how purge-and-compress should treat it, without holding a
/// borrow across the mutation that follows.
fn plan_collapse<AF: AddressFamily, V: Clone>(
    node: &Node<AF, V>,
    octet: u8,
    depth: usize,
    orig_prefix: &Prefix<AF>,
) -> Collapse<AF, V> {
    let child = match node.get_child(octet) {
        Some(Child::Node(n)) => n,
        _ => crate::error::corrupted("expected node child during collapse"),
    };

    if child.is_empty() {
        return Collapse::Remove;
    }

    if child.prefix_count() == 0 && child.child_count() == 1 {
        let (co, only) = child.all_children().next().unwrap();
        return match only {
            Child::Node(_) => Collapse::Stop,
            Child::Leaf(leaf) => Collapse::Replace(leaf.prefix, leaf.value.clone()),
            Child::Fringe(v) => {
                let len = 8 * (depth as u8 + 2);
                let addr = orig_prefix.addr().with_octet(depth + 1, co).mask(len);
                Collapse::Replace(Prefix::new_unchecked(addr, len), (**v).clone())
            }
        };
    }

    if child.prefix_count() == 1 && child.child_count() == 0 {
        let (idx, val) = child.all_prefixes().next().unwrap();
        let (octet_high, k) = idx_to_pfx(idx);
        let len = 8 * (depth as u8 + 1) + k;
        let addr = orig_prefix
            .addr()
            .with_octet(depth + 1, octet_high)
            .mask(len);
        return Collapse::Replace(Prefix::new_unchecked(addr, len), val.clone());
    }

    Collapse::Stop
}

fn apply_collapse<AF: AddressFamily, V>(
    node: &mut Node<AF, V>,
    octet: u8,
    depth: usize,
    action: Collapse<AF, V>,
) {
    match action {
        Collapse::Stop => {}
        Collapse::Remove => {
            debug!("depth {depth}: purge removes now-empty child at octet {octet}");
            node.delete_child(octet);
        }
        Collapse::Replace(new_prefix, value) => {
            debug!("depth {depth}: purge collapses child at octet {octet} into {new_prefix}");
            node.delete_child(octet);
            let fringe_len = 8 * (depth as u8 + 1);
            let child = if new_prefix.len() == fringe_len {
                Child::Fringe(Box::new(value))
            } else {
                Child::Leaf(Box::new(Leaf {
                    prefix: new_prefix,
                    value,
                }))
            };
            node.insert_child(octet, child);
        }
    }
}

// ---------------------------------------------------------------------
// get / contains / lookup
// ---------------------------------------------------------------------

pub(crate) fn get<'a, AF: AddressFamily, V>(
    node: &'a Node<AF, V>,
    prefix: &Prefix<AF>,
) -> Option<&'a V> {
    get_rec(node, prefix, 0)
}

fn get_rec<'a, AF: AddressFamily, V>(
    node: &'a Node<AF, V>,
    prefix: &Prefix<AF>,
    depth: usize,
) -> Option<&'a V> {
    let rem = remaining(prefix.len(), depth);
    if rem <= 0 {
        return node.get_prefix(1);
    }
    let octet = prefix.addr().octet(depth);
    if rem < 8 {
        return node.get_prefix(pfx_to_idx(octet, rem as u8));
    }
    match node.get_child(octet) {
        None => None,
        Some(Child::Leaf(leaf)) => {
            if leaf.prefix == *prefix {
                Some(&leaf.value)
            } else {
                None
            }
        }
        Some(Child::Fringe(v)) => {
            if rem == 8 {
                Some(v)
            } else {
                None
            }
        }
        Some(Child::Node(n)) => get_rec(n, prefix, depth + 1),
    }
}

pub(crate) fn contains<AF: AddressFamily, V>(node: &Node<AF, V>, addr: AF) -> bool {
    contains_rec(node, addr, 0)
}

fn contains_rec<AF: AddressFamily, V>(node: &Node<AF, V>, addr: AF, depth: usize) -> bool {
    let octet = addr.octet(depth);
    let deeper = match node.get_child(octet) {
        Some(Child::Node(n)) => contains_rec(n, addr, depth + 1),
        Some(Child::Leaf(leaf)) => leaf.prefix.contains(addr),
        Some(Child::Fringe(_)) => true,
        None => false,
    };
    deeper || node.contains(octet)
}

pub(crate) fn lookup<'a, AF: AddressFamily, V>(node: &'a Node<AF, V>, addr: AF) -> Option<&'a V> {
    lookup_rec(node, addr, 0)
}

fn lookup_rec<'a, AF: AddressFamily, V>(
    node: &'a Node<AF, V>,
    addr: AF,
    depth: usize,
) -> Option<&'a V> {
    let octet = addr.octet(depth);
    let deeper = match node.get_child(octet) {
        Some(Child::Node(n)) => lookup_rec(n, addr, depth + 1),
        Some(Child::Leaf(leaf)) => {
            if leaf.prefix.contains(addr) {
                Some(&leaf.value)
            } else {
                None
            }
        }
        Some(Child::Fringe(v)) => Some(v),
        None => None,
    };
    deeper.or_else(|| node.lookup(octet))
}

/// Longest ancestor (in the "covers this query prefix" sense, not a
/// full-address sense) of `prefix`, reconstructed as a concrete
/// `Prefix<AF>` alongside its value.
pub(crate) fn lookup_prefix_lpm<'a, AF: AddressFamily, V>(
    node: &'a Node<AF, V>,
    prefix: &Prefix<AF>,
) -> Option<(Prefix<AF>, &'a V)> {
    lpm_rec(node, prefix, 0)
}

pub(crate) fn lookup_prefix<'a, AF: AddressFamily, V>(
    node: &'a Node<AF, V>,
    prefix: &Prefix<AF>,
) -> Option<&'a V> {
    lpm_rec(node, prefix, 0).map(|(_, v)| v)
}

fn lpm_rec<'a, AF: AddressFamily, V>(
    node: &'a Node<AF, V>,
    prefix: &Prefix<AF>,
    depth: usize,
) -> Option<(Prefix<AF>, &'a V)> {
    let bits = prefix.len();
    let rem = remaining(bits, depth);

    if rem <= 0 {
        let len = 8 * depth as u8;
        return node
            .get_prefix(1)
            .map(|v| (Prefix::new_unchecked(prefix.addr().mask(len), len), v));
    }

    let octet = prefix.addr().octet(depth);

    if rem < 8 {
        for k in (0..=rem as u8).rev() {
            let idx = pfx_to_idx(octet, k);
            if let Some(v) = node.get_prefix(idx) {
                let len = 8 * depth as u8 + k;
                return Some((Prefix::new_unchecked(prefix.addr().mask(len), len), v));
            }
        }
        return None;
    }

    // rem >= 8: try the deepest structure first, fall back to this
    // node's own ancestor routes.
    let deeper = match node.get_child(octet) {
        Some(Child::Node(n)) => lpm_rec(n, prefix, depth + 1),
        Some(Child::Leaf(leaf)) => {
            if leaf.prefix.len() <= bits && leaf.prefix.contains(prefix.addr()) {
                Some((leaf.prefix, &leaf.value))
            } else {
                None
            }
        }
        Some(Child::Fringe(v)) => {
            let len = 8 * (depth as u8 + 1);
            Some((Prefix::new_unchecked(prefix.addr().mask(len), len), v.as_ref()))
        }
        None => None,
    };
    deeper.or_else(|| {
        node.lookup_idx(octet).map(|(idx, v)| {
            let (_, k) = idx_to_pfx(idx);
            let len = 8 * depth as u8 + k;
            (Prefix::new_unchecked(prefix.addr().mask(len), len), v)
        })
    })
}

// ---------------------------------------------------------------------
// overlap
// ---------------------------------------------------------------------

pub(crate) fn overlaps_prefix<AF: AddressFamily, V>(node: &Node<AF, V>, prefix: &Prefix<AF>) -> bool {
    if prefix.len() == 0 {
        return !node.is_empty();
    }
    overlaps_prefix_rec(node, prefix, 0)
}

fn overlaps_prefix_rec<AF: AddressFamily, V>(
    node: &Node<AF, V>,
    prefix: &Prefix<AF>,
    depth: usize,
) -> bool {
    let bits = prefix.len();
    let rem = remaining(bits, depth);
    let octet = prefix.addr().octet(depth);

    if rem < 8 {
        let idx = pfx_to_idx(octet, rem as u8);
        let t = tables();
        let mut anc = idx;
        loop {
            if node.get_prefix(anc).is_some() {
                return true;
            }
            if anc == 1 {
                break;
            }
            anc >>= 1;
        }
        if node.prefixes.bits().intersects(&t.allot[idx as usize]) {
            return true;
        }
        if node.children.bits().intersects(&t.child_desc[idx as usize]) {
            return true;
        }
        return false;
    }

    if rem == 8 {
        return node.contains(octet) || node.get_child(octet).is_some();
    }

    if node.contains(octet) {
        return true;
    }
    match node.get_child(octet) {
        Some(Child::Node(n)) => overlaps_prefix_rec(n, prefix, depth + 1),
        Some(Child::Leaf(leaf)) => leaf.prefix.overlaps(prefix),
        Some(Child::Fringe(_)) => true,
        None => false,
    }
}

pub(crate) fn overlaps<AF: AddressFamily, V>(a: &Node<AF, V>, b: &Node<AF, V>) -> bool {
    overlaps_nodes(a, b, 0, AF::zero())
}

fn overlaps_nodes<AF: AddressFamily, V>(
    a: &Node<AF, V>,
    b: &Node<AF, V>,
    depth: usize,
    path: AF,
) -> bool {
    let t = tables();

    for idx_a in a.prefixes.bits().iter() {
        let mut anc = idx_a;
        loop {
            if b.get_prefix(anc).is_some() {
                return true;
            }
            if anc == 1 {
                break;
            }
            anc >>= 1;
        }
        if b.prefixes.bits().intersects(&t.allot[idx_a as usize]) {
            return true;
        }
    }

    for idx_a in a.prefixes.bits().iter() {
        if b.children.bits().intersects(&t.child_desc[idx_a as usize]) {
            return true;
        }
    }
    for idx_b in b.prefixes.bits().iter() {
        if a.children.bits().intersects(&t.child_desc[idx_b as usize]) {
            return true;
        }
    }

    for octet in a.children.bits().iter() {
        if !b.children.bits().test(octet) {
            continue;
        }
        let octet = octet as u8;
        let next_path = path.with_octet(depth, octet);
        let hit = match (a.get_child(octet), b.get_child(octet)) {
            (Some(Child::Node(na)), Some(Child::Node(nb))) => {
                overlaps_nodes(na, nb, depth + 1, next_path)
            }
            (Some(Child::Node(na)), Some(Child::Leaf(lb))) => {
                overlaps_prefix_rec(na, &lb.prefix, depth + 1)
            }
            (Some(Child::Leaf(la)), Some(Child::Node(nb))) => {
                overlaps_prefix_rec(nb, &la.prefix, depth + 1)
            }
            (Some(Child::Node(na)), Some(Child::Fringe(_))) => {
                overlaps_prefix_rec(na, &fringe_prefix(next_path, depth), depth + 1)
            }
            (Some(Child::Fringe(_)), Some(Child::Node(nb))) => {
                overlaps_prefix_rec(nb, &fringe_prefix(next_path, depth), depth + 1)
            }
            (Some(Child::Leaf(la)), Some(Child::Leaf(lb))) => la.prefix.overlaps(&lb.prefix),
            (Some(Child::Leaf(la)), Some(Child::Fringe(_))) => {
                la.prefix.overlaps(&fringe_prefix(next_path, depth))
            }
            (Some(Child::Fringe(_)), Some(Child::Leaf(lb))) => {
                fringe_prefix(next_path, depth).overlaps(&lb.prefix)
            }
            (Some(Child::Fringe(_)), Some(Child::Fringe(_))) => true,
            (None, _) | (_, None) => false,
        };
        if hit {
            return true;
        }
    }

    false
}

/// The prefix implied by a fringe child reached via `path` at `depth`
/// (the node's own depth; the fringe occupies one of that node's child
/// slots, so its implicit length is one stride deeper).
fn fringe_prefix<AF: AddressFamily>(path: AF, depth: usize) -> Prefix<AF> {
    let len = 8 * (depth as u8 + 1);
    Prefix::new_unchecked(path.mask(len), len)
}

// ---------------------------------------------------------------------
// equal
// ---------------------------------------------------------------------

pub(crate) fn equal<AF: AddressFamily, V: PartialEq>(a: &Node<AF, V>, b: &Node<AF, V>) -> bool {
    if a.prefixes.bits() != b.prefixes.bits() || a.children.bits() != b.children.bits() {
        return false;
    }
    if a.all_prefixes().zip(b.all_prefixes()).any(|((_, va), (_, vb))| va != vb) {
        return false;
    }
    for ((oa, ca), (_, cb)) in a.all_children().zip(b.all_children()) {
        let _ = oa;
        let ok = match (ca, cb) {
            (Child::Node(na), Child::Node(nb)) => Arc::ptr_eq(na, nb) || equal(na, nb),
            (Child::Leaf(la), Child::Leaf(lb)) => la.prefix == lb.prefix && la.value == lb.value,
            (Child::Fringe(va), Child::Fringe(vb)) => va == vb,
            _ => false,
        };
        if !ok {
            return false;
        }
    }
    true
}

// ---------------------------------------------------------------------
// union
// ---------------------------------------------------------------------

/// Merges `other` into `cur`. Returns the number of prefixes that were
/// already present in `cur` under the same key (so the caller can
/// adjust its size counter as `size += other.size - duplicates`).
pub(crate) fn union<AF: AddressFamily, V: Clone>(
    cur: &mut Arc<Node<AF, V>>,
    other: &Node<AF, V>,
) -> usize {
    let node = Arc::make_mut(cur);
    let mut duplicates = 0;

    for (idx, v) in other.all_prefixes() {
        if node.insert_prefix(idx, v.clone()).is_some() {
            duplicates += 1;
        }
    }

    for (octet, other_child) in other.all_children() {
        match node.delete_child(octet) {
            None => {
                node.insert_child(octet, other_child.clone());
            }
            Some(Child::Node(mut na)) => match other_child {
                Child::Node(nb) => {
                    duplicates += union(&mut na, nb);
                    node.insert_child(octet, Child::Node(na));
                }
                Child::Leaf(lb) => {
                    if insert(&mut na, lb.prefix, lb.value.clone()).is_some() {
                        duplicates += 1;
                    }
                    node.insert_child(octet, Child::Node(na));
                }
                Child::Fringe(vb) => {
                    let node_a = Arc::make_mut(&mut na);
                    if node_a.insert_prefix(1, (**vb).clone()).is_some() {
                        duplicates += 1;
                    }
                    node.insert_child(octet, Child::Node(na));
                }
            },
            Some(Child::Leaf(la)) => match other_child {
                Child::Node(nb) => {
                    let mut new_node = Arc::new(Node::new());
                    insert_rec(&mut new_node, la.prefix, la.value, 0);
                    duplicates += union(&mut new_node, nb);
                    node.insert_child(octet, Child::Node(new_node));
                }
                Child::Leaf(lb) => {
                    if la.prefix == lb.prefix {
                        duplicates += 1;
                        node.insert_child(
                            octet,
                            Child::Leaf(Box::new(Leaf {
                                prefix: lb.prefix,
                                value: lb.value.clone(),
                            })),
                        );
                    } else {
                        let mut new_node = Arc::new(Node::new());
                        insert_rec(&mut new_node, la.prefix, la.value, 0);
                        if insert_rec(&mut new_node, lb.prefix, lb.value.clone(), 0).is_some() {
                            duplicates += 1;
                        }
                        node.insert_child(octet, Child::Node(new_node));
                    }
                }
                Child::Fringe(vb) => {
                    let mut new_node = Arc::new(Node::new());
                    insert_rec(&mut new_node, la.prefix, la.value, 0);
                    if Arc::make_mut(&mut new_node)
                        .insert_prefix(1, (**vb).clone())
                        .is_some()
                    {
                        duplicates += 1;
                    }
                    node.insert_child(octet, Child::Node(new_node));
                }
            },
            Some(Child::Fringe(va)) => match other_child {
                Child::Node(nb) => {
                    let mut new_node = Arc::new(Node::new());
                    Arc::make_mut(&mut new_node).insert_prefix(1, *va);
                    duplicates += union(&mut new_node, nb);
                    node.insert_child(octet, Child::Node(new_node));
                }
                Child::Leaf(lb) => {
                    let mut new_node = Arc::new(Node::new());
                    Arc::make_mut(&mut new_node).insert_prefix(1, *va);
                    if insert_rec(&mut new_node, lb.prefix, lb.value.clone(), 0).is_some() {
                        duplicates += 1;
                    }
                    node.insert_child(octet, Child::Node(new_node));
                }
                Child::Fringe(vb) => {
                    duplicates += 1;
                    node.insert_child(octet, Child::Fringe(Box::new((**vb).clone())));
                }
            },
        }
    }

    duplicates
}

