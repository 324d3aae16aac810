//! Invariant checks excluded from coverage reports.

#![cfg_attr(coverage_nightly, coverage(off))]

use super::ids::{IdAllocator, Node};

impl IdAllocator {
    /// Id of a node the collector reached. Every operand of an emitted
    /// instruction is collected first, so a miss is a collector bug.
    pub(super) fn ensure(&self, node: Node) -> u32 {
        match self.ids.get(&node) {
            Some(id) => *id,
            None => panic!("{node:?} is referenced but was never collected"),
        }
    }
}
