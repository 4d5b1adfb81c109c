//! Read-only structural statistics, gathered by walking a tree without
//! touching any `Arc` refcount (no `make_mut`, no mutation).

use crate::family::AddressFamily;
use crate::node::{Child, Node};

/// A snapshot of one tree's shape. Two tables' stats can be combined
/// with [`TrieStats::merge`] to report dual-stack totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrieStats {
    pub nodes: usize,
    pub prefixes: usize,
    pub leaves: usize,
    pub fringes: usize,
}

impl TrieStats {
    pub(crate) fn collect<AF: AddressFamily, V>(root: &Node<AF, V>) -> Self {
        let mut stats = TrieStats::default();
        walk(root, &mut stats);
        stats
    }

    pub fn merge(mut self, other: Self) -> Self {
        self.nodes += other.nodes;
        self.prefixes += other.prefixes;
        self.leaves += other.leaves;
        self.fringes += other.fringes;
        self
    }
}

fn walk<AF: AddressFamily, V>(node: &Node<AF, V>, stats: &mut TrieStats) {
    stats.nodes += 1;
    stats.prefixes += node.prefix_count();
    for (_, child) in node.all_children() {
        match child {
            Child::Node(n) => walk(n, stats),
            Child::Leaf(_) => stats.leaves += 1,
            Child::Fringe(_) => stats.fringes += 1,
        }
    }
}
