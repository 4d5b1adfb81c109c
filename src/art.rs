//! ART (Allotment Routing Table) index algebra: translating between an
//! octet/bit-length pair and the base index into the complete binary tree
//! of prefixes within one 8-bit stride, plus the precomputed bitmasks
//! that make longest-prefix-match and overlap tests O(1) per node.

use std::sync::OnceLock;

use crate::bitset::Bitset256;

/// The ART base index of the prefix whose top `k` bits equal
/// `octet >> (8 - k)`. `k == 0` (the default route within this stride)
/// always maps to index 1. Valid for `k` in `0..=7`; prefix-table
/// indices occupy `1..=255`. A full /8 (`k == 8`) is a host route and is
/// represented through the child table (fringe), not this index space.
#[inline]
pub fn pfx_to_idx(octet: u8, k: u8) -> u16 {
    if k == 0 {
        1
    } else {
        (1u16 << k) | (octet as u16 >> (8 - k))
    }
}

/// Inverse of [`pfx_to_idx`]: returns `(octet_high, k)` such that
/// `pfx_to_idx(octet_high, k) == idx` for any `octet` whose top `k` bits
/// match `octet_high`.
#[inline]
pub fn idx_to_pfx(idx: u16) -> (u8, u8) {
    debug_assert!((1..256).contains(&idx));
    let k = 15 - idx.leading_zeros() as u8; // position of idx's highest set bit
    let low = idx - (1u16 << k);
    let octet_high = (low << (8 - k)) as u8;
    (octet_high, k)
}

/// Precomputed tables, indexed by octet (0..=255) or by ART index
/// (1..=255, with index 0 unused).
pub struct ArtTables {
    /// `lookup[octet]`: the set of ART indices (1..=255) that are
    /// ancestors of the host route for `octet` — i.e. `pfx_to_idx(octet,
    /// k)` for every `k` in `0..=7`. Intersecting a node's prefix bitset
    /// with this and taking the top set bit is the within-stride LPM.
    pub lookup: [Bitset256; 256],
    /// `allot[idx]`: `idx` and every one of its descendants in the
    /// complete binary tree (`1..=255`). Used to propagate/collapse
    /// allotment and to test "does this node hold any more-specific
    /// route than idx".
    pub allot: [Bitset256; 256],
    /// `child_desc[idx]`: the set of octets (0..=255) whose top bits are
    /// covered by `idx`, i.e. the child-table octets that fall inside
    /// the prefix `idx` denotes. Used by the overlap test to decide
    /// whether a child edge is a descendant of a queried prefix.
    pub child_desc: [Bitset256; 256],
}

static TABLES: OnceLock<ArtTables> = OnceLock::new();

/// Returns the process-wide ART tables, computing them on first use.
pub fn tables() -> &'static ArtTables {
    TABLES.get_or_init(build_tables)
}

fn build_tables() -> ArtTables {
    let mut lookup = [Bitset256::new(); 256];
    let mut allot = [Bitset256::new(); 256];
    let mut child_desc = [Bitset256::new(); 256];

    for octet in 0..=255u16 {
        for k in 0..=7u8 {
            let idx = pfx_to_idx(octet as u8, k);
            lookup[octet as usize].set(idx);
        }
    }

    for idx in 1..256u16 {
        let mut mask = Bitset256::new();
        let mut stack = vec![idx];
        while let Some(i) = stack.pop() {
            mask.set(i);
            let (l, r) = (i * 2, i * 2 + 1);
            if r < 256 {
                stack.push(l);
                stack.push(r);
            }
        }
        allot[idx as usize] = mask;

        let (octet_high, k) = idx_to_pfx(idx);
        let size: u16 = 1 << (8 - k);
        let start = octet_high as u16;
        let mut mask = Bitset256::new();
        for o in start..start + size {
            mask.set(o);
        }
        child_desc[idx as usize] = mask;
    }

    ArtTables {
        lookup,
        allot,
        child_desc,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pfx_to_idx_idx_to_pfx_roundtrip() {
        for octet in 0u16..256 {
            for k in 1u8..=7 {
                let idx = pfx_to_idx(octet as u8, k);
                let (octet_high, rk) = idx_to_pfx(idx);
                assert_eq!(rk, k);
                assert_eq!(octet_high, (octet as u8) & !((1u8 << (8 - k)).wrapping_sub(1)));
            }
        }
    }

    #[test]
    fn default_route_is_idx_one() {
        assert_eq!(pfx_to_idx(0, 0), 1);
        assert_eq!(pfx_to_idx(255, 0), 1);
    }

    #[test]
    fn lookup_table_contains_all_ancestors() {
        let t = tables();
        // octet 0b1010_0000 (160): ancestors at k=0..=7
        let octet = 0b1010_0000u8;
        let mask = &t.lookup[octet as usize];
        for k in 0..=7u8 {
            assert!(mask.test(pfx_to_idx(octet, k)));
        }
        assert_eq!(mask.popcount(), 8);
    }

    #[test]
    fn allot_mask_covers_descendants_only() {
        let t = tables();
        let idx = pfx_to_idx(0b1000_0000, 1); // idx=3, covers octets 128..=255
        let mask = &t.allot[idx as usize];
        assert!(mask.test(idx));
        // a deeper descendant idx under 3's subtree
        let child = pfx_to_idx(0b1100_0000, 2); // idx=6
        assert!(mask.test(child));
        // a sibling (not a descendant)
        let sibling = pfx_to_idx(0b0000_0000, 1); // idx=2
        assert!(!mask.test(sibling));
    }

    #[test]
    fn child_desc_mask_matches_octet_range() {
        let t = tables();
        let idx = pfx_to_idx(0b1010_0000, 3); // top 3 bits = 101, covers 0xA0..=0xBF
        let mask = &t.child_desc[idx as usize];
        for o in 0xA0u16..=0xBF {
            assert!(mask.test(o));
        }
        assert!(!mask.test(0x9F));
        assert!(!mask.test(0xC0));
    }
}
