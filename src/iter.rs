//! A restartable, explicit-stack tree walk: every frame holds exactly
//! the cursor state needed to resume, so `next()` never recurses.

use crate::art::idx_to_pfx;
use crate::family::AddressFamily;
use crate::node::{Child, Node};
use crate::prefix::Prefix;

struct Frame<'a, AF: AddressFamily, V> {
    depth: usize,
    path: AF,
    prefixes: Box<dyn Iterator<Item = (u16, &'a V)> + 'a>,
    children: Box<dyn Iterator<Item = (u8, &'a Child<AF, V>)> + 'a>,
}

/// Iterates all `(Prefix<AF>, &V)` pairs held under one family's tree,
/// in deterministic order: within a stride, ascending ART index;
/// children are descended in ascending octet.
pub struct Iter<'a, AF: AddressFamily, V> {
    stack: Vec<Frame<'a, AF, V>>,
}

impl<'a, AF: AddressFamily, V> Iter<'a, AF, V> {
    pub(crate) fn new(root: &'a Node<AF, V>) -> Self {
        Iter {
            stack: vec![frame(root, 0, AF::zero())],
        }
    }
}

fn frame<AF: AddressFamily, V>(node: &Node<AF, V>, depth: usize, path: AF) -> Frame<'_, AF, V> {
    Frame {
        depth,
        path,
        prefixes: Box::new(node.all_prefixes()),
        children: Box::new(node.all_children()),
    }
}

impl<'a, AF: AddressFamily, V> Iterator for Iter<'a, AF, V> {
    type Item = (Prefix<AF>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;

            if let Some((idx, v)) = top.prefixes.next() {
                let (octet_high, k) = idx_to_pfx(idx);
                let len = 8 * top.depth as u8 + k;
                let addr = top.path.with_octet(top.depth, octet_high).mask(len);
                return Some((Prefix::new_unchecked(addr, len), v));
            }

            if let Some((octet, child)) = top.children.next() {
                match child {
                    Child::Node(n) => {
                        let next_path = top.path.with_octet(top.depth, octet);
                        let next_depth = top.depth + 1;
                        self.stack.push(frame(n, next_depth, next_path));
                        continue;
                    }
                    Child::Leaf(leaf) => {
                        return Some((leaf.prefix, &leaf.value));
                    }
                    Child::Fringe(v) => {
                        let len = 8 * (top.depth as u8 + 1);
                        let addr = top.path.with_octet(top.depth, octet).mask(len);
                        return Some((Prefix::new_unchecked(addr, len), v));
                    }
                }
            }

            self.stack.pop();
        }
    }
}
