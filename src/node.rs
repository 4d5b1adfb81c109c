//! The stride node: a prefix table and a child table, both popcount-
//! compressed [`SparseArray256`]s, plus the compressed child variants
//! (leaf, fringe) that let a sparse trie avoid allocating a node per
//! octet.

use std::sync::Arc;

use crate::art::tables;
use crate::family::AddressFamily;
use crate::prefix::Prefix;
use crate::sparse::SparseArray256;

/// A compressed child holding an explicit, non-stride-aligned
/// `(prefix, value)` pair. Created when insertion reaches an empty
/// child slot with a prefix that does not end on this stride's
/// boundary.
#[derive(Debug, Clone)]
pub(crate) struct Leaf<AF: AddressFamily, V> {
    pub prefix: Prefix<AF>,
    pub value: V,
}

/// One entry of a node's child table: either another node, a compressed
/// leaf, or a compressed fringe (a value whose prefix is implied by the
/// path and the octet, needing no stored prefix at all).
#[derive(Clone)]
pub(crate) enum Child<AF: AddressFamily, V> {
    Node(Arc<Node<AF, V>>),
    Leaf(Box<Leaf<AF, V>>),
    Fringe(Box<V>),
}

impl<AF: AddressFamily, V: std::fmt::Debug> std::fmt::Debug for Child<AF, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Child::Node(n) => f.debug_tuple("Node").field(n).finish(),
            Child::Leaf(l) => f.debug_tuple("Leaf").field(l).finish(),
            Child::Fringe(v) => f.debug_tuple("Fringe").field(v).finish(),
        }
    }
}

/// One level of the trie: up to 255 prefix-table entries (ART indices
/// `1..=255`) and up to 256 child-table entries (octets `0..=255`).
#[derive(Debug, Clone)]
pub(crate) struct Node<AF: AddressFamily, V> {
    pub prefixes: SparseArray256<V>,
    pub children: SparseArray256<Child<AF, V>>,
}

impl<AF: AddressFamily, V> Default for Node<AF, V> {
    fn default() -> Self {
        Node {
            prefixes: SparseArray256::new(),
            children: SparseArray256::new(),
        }
    }
}

impl<AF: AddressFamily, V> Node<AF, V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh node whose prefix and child tables pre-reserve `cap`
    /// entries each, to avoid reallocation while a table is being
    /// populated in bulk.
    pub fn with_capacity(cap: usize) -> Self {
        Node {
            prefixes: SparseArray256::with_capacity(cap),
            children: SparseArray256::with_capacity(cap),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.children.is_empty()
    }

    pub fn prefix_count(&self) -> usize {
        self.prefixes.len()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    // ---- prefix table -----------------------------------------------

    /// Inserts `value` at ART index `idx`. Returns the previous value if
    /// the index was already occupied (the membership bit was set).
    pub fn insert_prefix(&mut self, idx: u16, value: V) -> Option<V> {
        self.prefixes.insert_at(idx, value)
    }

    /// Removes the value at ART index `idx`, if present.
    pub fn delete_prefix(&mut self, idx: u16) -> Option<V> {
        self.prefixes.delete_at(idx)
    }

    pub fn get_prefix(&self, idx: u16) -> Option<&V> {
        self.prefixes.get(idx)
    }

    pub fn get_prefix_mut(&mut self, idx: u16) -> Option<&mut V> {
        self.prefixes.get_mut(idx)
    }

    // ---- child table --------------------------------------------------

    pub fn insert_child(&mut self, octet: u8, child: Child<AF, V>) -> Option<Child<AF, V>> {
        self.children.insert_at(octet as u16, child)
    }

    pub fn get_child(&self, octet: u8) -> Option<&Child<AF, V>> {
        self.children.get(octet as u16)
    }

    pub fn get_child_mut(&mut self, octet: u8) -> Option<&mut Child<AF, V>> {
        self.children.get_mut(octet as u16)
    }

    pub fn delete_child(&mut self, octet: u8) -> Option<Child<AF, V>> {
        self.children.delete_at(octet as u16)
    }

    /// All children, ascending by octet.
    pub fn all_children(&self) -> impl Iterator<Item = (u8, &Child<AF, V>)> {
        self.children.iter().map(|(a, c)| (a as u8, c))
    }

    /// All prefix-table entries, ascending by ART index.
    pub fn all_prefixes(&self) -> impl Iterator<Item = (u16, &V)> {
        self.prefixes.iter()
    }

    // ---- within-stride longest-prefix-match ---------------------------

    /// `true` iff this node holds any ancestor route of `octet`'s host
    /// index (i.e. any prefix that would match an address continuing
    /// through this octet).
    pub fn contains(&self, octet: u8) -> bool {
        self.prefixes
            .bits()
            .intersects(&tables().lookup[octet as usize])
    }

    /// The value of the longest ancestor route of `octet`'s host index,
    /// if any.
    pub fn lookup(&self, octet: u8) -> Option<&V> {
        self.prefixes
            .bits()
            .intersection_top(&tables().lookup[octet as usize])
            .map(|idx| self.prefixes.must_get(idx))
    }

    /// As [`Node::lookup`], but also returns the matching ART index so
    /// the caller can reconstruct the matched prefix's length.
    pub fn lookup_idx(&self, octet: u8) -> Option<(u16, &V)> {
        self.prefixes
            .bits()
            .intersection_top(&tables().lookup[octet as usize])
            .map(|idx| (idx, self.prefixes.must_get(idx)))
    }
}

impl<AF: AddressFamily, V: Clone> Node<AF, V> {
    /// Shallow copy: both tables' membership and items are copied, each
    /// prefix value and each leaf/fringe value is deep-cloned, but node
    /// children are only `Arc`-cloned (the refcount bump), never
    /// descended into.
    pub fn clone_flat(&self) -> Self {
        self.clone()
    }

    /// Deep copy: flat-clones every node reached from `self`, producing
    /// a tree that shares no `Arc` allocations with the original.
    pub fn clone_rec(&self) -> Self {
        let mut out = self.clone_flat();
        for (_, child) in out.children.iter_mut() {
            if let Child::Node(n) = child {
                *n = Arc::new(n.clone_rec());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_table_roundtrip() {
        let mut n: Node<u32, &'static str> = Node::new();
        assert_eq!(n.insert_prefix(1, "default"), None);
        assert_eq!(n.get_prefix(1), Some(&"default"));
        assert_eq!(n.insert_prefix(1, "default2"), Some("default"));
        assert_eq!(n.delete_prefix(1), Some("default2"));
        assert_eq!(n.get_prefix(1), None);
    }

    #[test]
    fn lookup_within_stride() {
        let mut n: Node<u32, i32> = Node::new();
        n.insert_prefix(1, 100); // default route
        let idx = crate::art::pfx_to_idx(10, 5); // a /5-within-stride covering octet 10
        n.insert_prefix(idx, 200);
        assert!(n.contains(10));
        assert_eq!(n.lookup(10), Some(&200));
        assert_eq!(n.lookup(200), Some(&100));
    }

    #[test]
    fn clone_flat_does_not_descend_node_children() {
        let mut inner: Node<u32, i32> = Node::new();
        inner.insert_prefix(1, 42);
        let mut outer: Node<u32, i32> = Node::new();
        outer.insert_child(5, Child::Node(Arc::new(inner)));

        let flat = outer.clone_flat();
        if let Some(Child::Node(a)) = flat.get_child(5) {
            if let Some(Child::Node(b)) = outer.get_child(5) {
                assert!(Arc::ptr_eq(a, b));
            } else {
                panic!("expected node child");
            }
        } else {
            panic!("expected node child");
        }
    }

    #[test]
    fn clone_rec_produces_independent_arcs() {
        let mut inner: Node<u32, i32> = Node::new();
        inner.insert_prefix(1, 42);
        let mut outer: Node<u32, i32> = Node::new();
        outer.insert_child(5, Child::Node(Arc::new(inner)));

        let rec = outer.clone_rec();
        if let (Some(Child::Node(a)), Some(Child::Node(b))) =
            (rec.get_child(5), outer.get_child(5))
        {
            assert!(!Arc::ptr_eq(a, b));
            assert_eq!(a.get_prefix(1), b.get_prefix(1));
        } else {
            panic!("expected node children");
        }
    }
}
