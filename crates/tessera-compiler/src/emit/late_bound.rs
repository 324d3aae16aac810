//! Substitution of late-bound functions.
//!
//! A library calls placeholders (e.g. an output stream's `Append`) whose
//! behavior differs per composite. Each entry point records which function
//! replaces each placeholder; the map is applied to call operands while
//! collecting and writing, so translated libraries are never mutated.

use std::borrow::Cow;

use indexmap::IndexMap;
use tessera_ir::spirv::Op as SpirvOp;
use tessera_ir::{EntryPointInfo, FunctionId, Library, Op, Operand};

use super::EmitError;

#[derive(Debug, Clone, Default)]
pub struct LateBoundRewrite {
    substitutions: IndexMap<FunctionId, FunctionId>,
}

impl LateBoundRewrite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the maps of several entry points. Two entry points replacing
    /// the same placeholder differently cannot share one module.
    pub fn from_entry_points<'a>(
        lib: &Library,
        entry_points: impl IntoIterator<Item = &'a EntryPointInfo>,
    ) -> Result<Self, EmitError> {
        let mut rewrite = Self::new();
        for info in entry_points {
            for (placeholder, specialized) in &info.late_bound {
                match rewrite.substitutions.get(placeholder) {
                    Some(existing) if existing != specialized => {
                        let name = lib.function(*placeholder).name.clone();
                        return Err(EmitError::ConflictingLateBound(name));
                    }
                    _ => rewrite.insert(*placeholder, *specialized),
                }
            }
        }
        Ok(rewrite)
    }

    pub fn insert(&mut self, placeholder: FunctionId, specialized: FunctionId) {
        self.substitutions.insert(placeholder, specialized);
    }

    pub fn len(&self) -> usize {
        self.substitutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.substitutions.is_empty()
    }

    /// The function a call to `id` actually reaches.
    pub fn resolve(&self, id: FunctionId) -> FunctionId {
        self.substitutions.get(&id).copied().unwrap_or(id)
    }

    /// `op` with its call target substituted, borrowed when unchanged.
    pub fn rewrite_op<'o>(&self, op: &'o Op) -> Cow<'o, Op> {
        if op.opcode != SpirvOp::FunctionCall {
            return Cow::Borrowed(op);
        }
        let Some(Operand::Function(target)) = op.operands.first() else {
            return Cow::Borrowed(op);
        };
        let resolved = self.resolve(*target);
        if resolved == *target {
            return Cow::Borrowed(op);
        }
        let mut rewritten = op.clone();
        rewritten.operands[0] = Operand::Function(resolved);
        Cow::Owned(rewritten)
    }
}
