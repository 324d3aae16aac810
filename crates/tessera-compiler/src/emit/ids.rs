//! Dense result ids.

use std::collections::HashMap;

use tessera_ir::{BlockId, ExtImportId, FunctionId, OpId, TypeId};

/// Anything that owns a result id in the emitted module.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(super) enum Node {
    Type(TypeId),
    Op(OpId),
    Function(FunctionId),
    Block(BlockId),
    ExtImport(ExtImportId),
}

/// Sequential ids, one per node, handed out on first request.
#[derive(Debug)]
pub(super) struct IdAllocator {
    pub(super) ids: HashMap<Node, u32>,
    next: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self {
            ids: HashMap::new(),
            next: 1,
        }
    }

    pub fn assign(&mut self, node: Node) -> u32 {
        if let Some(id) = self.ids.get(&node) {
            return *id;
        }
        let id = self.next;
        self.next += 1;
        self.ids.insert(node, id);
        id
    }

    /// One past the largest id, the header's bound.
    pub fn bound(&self) -> u32 {
        self.next
    }
}
