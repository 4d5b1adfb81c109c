//! A balanced, multibit longest-prefix-match routing table for IPv4 and
//! IPv6 CIDR prefixes.
//!
//! The trie uses a fixed 8-bit stride (ART, Allotment Routing Table):
//! each [`Node`](node::Node) holds a popcount-compressed prefix table
//! and a popcount-compressed child table, with leaf and fringe
//! compression collapsing runs of otherwise-empty nodes. Every mutating
//! operation goes through [`std::sync::Arc::make_mut`], so the same
//! code path implements both in-place mutation (the default) and the
//! copy-on-write `_persist` family: a persistent caller just clones the
//! root `Arc` first.

mod art;
mod bitset;
mod error;
mod family;
mod iter;
mod node;
mod prefix;
mod sparse;
mod stats;
mod table;
mod trie;

pub use error::{BartError, Corruption};
pub use family::AddressFamily;
pub use prefix::Prefix;
pub use stats::TrieStats;
pub use table::{LiteTable, SlimTable, Table};
