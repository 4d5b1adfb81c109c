//! The public entry point: a dual-stack routing table pairing one IPv4
//! and one IPv6 trie under a single handle, plus the size-zero
//! instantiations used when only membership (not a value) matters.

use std::sync::Arc;

use inetnum::addr::Prefix as HostPrefix;
use log::trace;

use crate::error::BartError;
use crate::node::Node;
use crate::prefix::Prefix;
use crate::stats::TrieStats;
use crate::trie;

/// A longest-prefix-match table over both IPv4 and IPv6 address space.
///
/// Every mutating method takes `&mut self` and mutates in place; the
/// `_persist` family instead returns a new `Table` that shares untouched
/// subtrees with `self` via `Arc`, leaving `self` itself unobserved.
#[derive(Debug, Clone)]
pub struct Table<V> {
    v4: Arc<Node<u32, V>>,
    v6: Arc<Node<u128, V>>,
    len4: usize,
    len6: usize,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Table {
            v4: Arc::new(Node::new()),
            v6: Arc::new(Node::new()),
            len4: 0,
            len6: 0,
        }
    }
}

impl<V> Table<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh table whose two root nodes pre-reserve `cap4`/`cap6`
    /// top-level entries, for bulk loading.
    pub fn with_capacity(cap4: usize, cap6: usize) -> Self {
        Table {
            v4: Arc::new(Node::with_capacity(cap4)),
            v6: Arc::new(Node::with_capacity(cap6)),
            len4: 0,
            len6: 0,
        }
    }

    /// Number of prefixes held in the IPv4 tree.
    pub fn len_v4(&self) -> usize {
        self.len4
    }

    /// Number of prefixes held in the IPv6 tree.
    pub fn len_v6(&self) -> usize {
        self.len6
    }

    pub fn len(&self) -> usize {
        self.len4 + self.len6
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of prefixes across both families.
    pub fn size(&self) -> usize {
        self.len()
    }

    pub fn size4(&self) -> usize {
        self.len4
    }

    pub fn size6(&self) -> usize {
        self.len6
    }

    pub fn stats(&self) -> TrieStats {
        TrieStats::collect(&self.v4).merge(TrieStats::collect(&self.v6))
    }

    /// Iterates every `(prefix, value)` pair across both families.
    /// Lazy and restartable: a partially-consumed iterator holds only
    /// an explicit stack, never a recursion.
    pub fn all(&self) -> impl Iterator<Item = (HostPrefix, &V)> {
        crate::iter::Iter::new(&self.v4)
            .map(|(p, v)| (p.into(), v))
            .chain(crate::iter::Iter::new(&self.v6).map(|(p, v)| (p.into(), v)))
    }
}

impl<V: Clone> Table<V> {
    /// Inserts `(prefix, value)`, overwriting and returning any previous
    /// value at that exact prefix.
    pub fn insert(&mut self, prefix: HostPrefix, value: V) -> Result<Option<V>, BartError> {
        match prefix.addr() {
            std::net::IpAddr::V4(_) => {
                let p: Prefix<u32> = prefix.try_into()?;
                let old = trie::insert(&mut self.v4, p, value);
                if old.is_none() {
                    self.len4 += 1;
                }
                trace!("insert {} into ipv4 tree (len={})", p, self.len4);
                Ok(old)
            }
            std::net::IpAddr::V6(_) => {
                let p: Prefix<u128> = prefix.try_into()?;
                let old = trie::insert(&mut self.v6, p, value);
                if old.is_none() {
                    self.len6 += 1;
                }
                trace!("insert {} into ipv6 tree (len={})", p, self.len6);
                Ok(old)
            }
        }
    }

    /// Removes `prefix`, returning its value if it was present.
    pub fn delete(&mut self, prefix: HostPrefix) -> Result<Option<V>, BartError> {
        match prefix.addr() {
            std::net::IpAddr::V4(_) => {
                let p: Prefix<u32> = prefix.try_into()?;
                let old = trie::delete(&mut self.v4, &p);
                if old.is_some() {
                    self.len4 -= 1;
                }
                Ok(old)
            }
            std::net::IpAddr::V6(_) => {
                let p: Prefix<u128> = prefix.try_into()?;
                let old = trie::delete(&mut self.v6, &p);
                if old.is_some() {
                    self.len6 -= 1;
                }
                Ok(old)
            }
        }
    }

    /// Returns a new table with `(prefix, value)` inserted, sharing
    /// every untouched subtree with `self`.
    pub fn insert_persist(&self, prefix: HostPrefix, value: V) -> Result<(Self, Option<V>), BartError> {
        let mut next = self.clone();
        let old = next.insert(prefix, value)?;
        Ok((next, old))
    }

    /// Returns a new table with `prefix` removed, sharing every
    /// untouched subtree with `self`.
    pub fn delete_persist(&self, prefix: HostPrefix) -> Result<(Self, Option<V>), BartError> {
        let mut next = self.clone();
        let old = next.delete(prefix)?;
        Ok((next, old))
    }

    /// Applies `f` to the current value at `prefix`, if any, and realizes
    /// whatever `f` decides: `f` returns `Some(new_value)` to insert or
    /// update, or `None` to delete (a no-op if `prefix` was absent).
    ///
    /// Returns `(prior, deleted)`: `prior` is the value associated with
    /// `prefix` before this call resolved the outcome below — except when
    /// nothing existed and `f` chose to insert, where `prior` instead
    /// carries the value just inserted. `deleted` is `true` only when an
    /// existing entry was removed. The four cases:
    ///
    /// 1. absent, `f` returns `None`: no-op, returns `(None, false)`.
    /// 2. absent, `f` returns `Some(v)`: inserts `v`, returns `(Some(v), false)`.
    /// 3. present, `f` returns `Some(v)`: updates to `v`, returns `(old, false)`.
    /// 4. present, `f` returns `None`: deletes, returns `(old, true)`.
    pub fn modify(
        &mut self,
        prefix: HostPrefix,
        f: impl FnOnce(Option<&V>) -> Option<V>,
    ) -> Result<(Option<V>, bool), BartError> {
        let existing = self.get(prefix)?;
        let existed = existing.is_some();
        match f(existing) {
            Some(new_value) => {
                let prior = self.insert(prefix, new_value.clone())?;
                if existed {
                    Ok((prior, false))
                } else {
                    Ok((Some(new_value), false))
                }
            }
            None => {
                if existed {
                    let prior = self.delete(prefix)?;
                    Ok((prior, true))
                } else {
                    Ok((None, false))
                }
            }
        }
    }

    /// As [`Table::modify`], but returns a new table instead of mutating
    /// `self`, alongside the same `(prior, deleted)` outcome.
    pub fn modify_persist(
        &self,
        prefix: HostPrefix,
        f: impl FnOnce(Option<&V>) -> Option<V>,
    ) -> Result<(Self, Option<V>, bool), BartError> {
        let mut next = self.clone();
        let (prior, deleted) = next.modify(prefix, f)?;
        Ok((next, prior, deleted))
    }

    /// Merges `other` into `self`. Entries in `other` win on key
    /// collision. Returns the number of new prefixes added.
    pub fn union(&mut self, other: &Self) -> usize {
        let dup4 = trie::union(&mut self.v4, &other.v4);
        let dup6 = trie::union(&mut self.v6, &other.v6);
        let added = (other.len4 - dup4) + (other.len6 - dup6);
        self.len4 += other.len4 - dup4;
        self.len6 += other.len6 - dup6;
        added
    }

    /// As [`Table::union`], but returns a new table instead of mutating
    /// `self`.
    pub fn union_persist(&self, other: &Self) -> Self {
        let mut next = self.clone();
        next.union(other);
        next
    }

    /// Folds over every `(prefix, value)` pair in `self`, threading a
    /// persistent accumulator tree through `f`. `f` receives the
    /// accumulator built so far and the current pair, and returns the
    /// next accumulator plus whether to continue; returning `false` stops
    /// the walk early. `self` is only ever read — `f` must mutate the
    /// accumulator it is handed using persistent operations (e.g.
    /// `insert_persist`), never `self`.
    pub fn walk_persist<F>(&self, mut f: F) -> Self
    where
        F: FnMut(Self, HostPrefix, &V) -> (Self, bool),
    {
        let mut acc = self.clone();
        for (p, v) in self.all() {
            let (next_acc, keep_going) = f(acc, p, v);
            acc = next_acc;
            if !keep_going {
                break;
            }
        }
        acc
    }
}

impl<V> Table<V> {
    pub fn get(&self, prefix: HostPrefix) -> Result<Option<&V>, BartError> {
        match prefix.addr() {
            std::net::IpAddr::V4(_) => {
                let p: Prefix<u32> = prefix.try_into()?;
                Ok(trie::get(&self.v4, &p))
            }
            std::net::IpAddr::V6(_) => {
                let p: Prefix<u128> = prefix.try_into()?;
                Ok(trie::get(&self.v6, &p))
            }
        }
    }

    pub fn contains(&self, addr: std::net::IpAddr) -> bool {
        match addr {
            std::net::IpAddr::V4(v4) => trie::contains(&self.v4, u32::from(v4)),
            std::net::IpAddr::V6(v6) => trie::contains(&self.v6, u128::from(v6)),
        }
    }

    pub fn lookup(&self, addr: std::net::IpAddr) -> Option<&V> {
        match addr {
            std::net::IpAddr::V4(v4) => trie::lookup(&self.v4, u32::from(v4)),
            std::net::IpAddr::V6(v6) => trie::lookup(&self.v6, u128::from(v6)),
        }
    }

    pub fn lookup_prefix(&self, prefix: HostPrefix) -> Result<Option<&V>, BartError> {
        match prefix.addr() {
            std::net::IpAddr::V4(_) => {
                let p: Prefix<u32> = prefix.try_into()?;
                Ok(trie::lookup_prefix(&self.v4, &p))
            }
            std::net::IpAddr::V6(_) => {
                let p: Prefix<u128> = prefix.try_into()?;
                Ok(trie::lookup_prefix(&self.v6, &p))
            }
        }
    }

    pub fn lookup_prefix_lpm(&self, prefix: HostPrefix) -> Result<Option<(HostPrefix, &V)>, BartError> {
        match prefix.addr() {
            std::net::IpAddr::V4(_) => {
                let p: Prefix<u32> = prefix.try_into()?;
                Ok(trie::lookup_prefix_lpm(&self.v4, &p).map(|(m, v)| (m.into(), v)))
            }
            std::net::IpAddr::V6(_) => {
                let p: Prefix<u128> = prefix.try_into()?;
                Ok(trie::lookup_prefix_lpm(&self.v6, &p).map(|(m, v)| (m.into(), v)))
            }
        }
    }

    pub fn overlaps_prefix(&self, prefix: HostPrefix) -> Result<bool, BartError> {
        match prefix.addr() {
            std::net::IpAddr::V4(_) => {
                let p: Prefix<u32> = prefix.try_into()?;
                Ok(trie::overlaps_prefix(&self.v4, &p))
            }
            std::net::IpAddr::V6(_) => {
                let p: Prefix<u128> = prefix.try_into()?;
                Ok(trie::overlaps_prefix(&self.v6, &p))
            }
        }
    }

    /// `true` iff any prefix in `self` overlaps any prefix in `other`,
    /// in either address family.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.overlaps4(other) || self.overlaps6(other)
    }

    pub fn overlaps4(&self, other: &Self) -> bool {
        trie::overlaps(&self.v4, &other.v4)
    }

    pub fn overlaps6(&self, other: &Self) -> bool {
        trie::overlaps(&self.v6, &other.v6)
    }
}

impl<V: PartialEq> Table<V> {
    /// Structural equality: same prefixes mapped to equal values in
    /// both address families. Unlike `==` on the handle itself (which
    /// this type does not derive), this descends shared `Arc` subtrees
    /// only when their pointers differ.
    pub fn trie_eq(&self, other: &Self) -> bool {
        trie::equal(&self.v4, &other.v4) && trie::equal(&self.v6, &other.v6)
    }
}

/// A table that only tracks membership, paying no per-entry value cost.
pub type LiteTable = Table<()>;

/// Alias kept for callers migrating from a value-carrying table to a
/// membership-only one; identical to [`LiteTable`].
pub type SlimTable = Table<()>;
