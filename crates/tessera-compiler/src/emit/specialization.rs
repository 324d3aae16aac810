//! Specialization constants of an emitted module, addressable by name.
//!
//! Only scalar specialization constants can be overridden, so a vector
//! constant maps to one SpecId per component; its first one identifies it.

use indexmap::IndexMap;
use serde::Serialize;
use tessera_ir::spirv::Op as SpirvOp;
use tessera_ir::{Library, OpId, Operand};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpecConstantInfo {
    /// SpecIds of every scalar, in component order.
    pub ids: Vec<u32>,
    /// Default value words, one per id.
    pub defaults: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpecializationReflection {
    constants: IndexMap<String, SpecConstantInfo>,
}

impl SpecializationReflection {
    /// Named constants of `lib` and its dependencies that were emitted.
    pub(super) fn gather(lib: &Library, spec_ids: &IndexMap<OpId, u32>) -> Self {
        let mut constants = IndexMap::new();
        let libraries = std::iter::once(lib).chain(lib.dependencies().iter().map(|l| l.as_ref()));
        for library in libraries {
            for (key, op) in library.spec_constants() {
                if !key.path.is_empty() || constants.contains_key(&key.symbol) {
                    continue;
                }
                let scalars = scalars_of(lib, *op, spec_ids);
                if scalars.is_empty() {
                    continue;
                }
                let (ids, defaults) = scalars.into_iter().unzip();
                constants.insert(key.symbol.clone(), SpecConstantInfo { ids, defaults });
            }
        }
        Self { constants }
    }

    /// SpecId of the first scalar of a declared constant.
    pub fn spec_id(&self, name: &str) -> Option<u32> {
        self.constants.get(name).and_then(|c| c.ids.first().copied())
    }

    pub fn get(&self, name: &str) -> Option<&SpecConstantInfo> {
        self.constants.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SpecConstantInfo)> {
        self.constants.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.constants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// SpecId -> value pairs overriding every scalar of `name`. `None` when
    /// the constant is unknown or the value count does not match.
    pub fn overrides(&self, name: &str, values: &[u32]) -> Option<IndexMap<u32, u32>> {
        let info = self.constants.get(name)?;
        if info.ids.len() != values.len() {
            return None;
        }
        Some(info.ids.iter().copied().zip(values.iter().copied()).collect())
    }

    /// Name -> first SpecId, as recorded in shader reflection.
    pub fn first_ids(&self) -> IndexMap<String, u32> {
        self.constants
            .iter()
            .filter_map(|(name, info)| info.ids.first().map(|id| (name.clone(), *id)))
            .collect()
    }
}

fn scalars_of(lib: &Library, op: OpId, spec_ids: &IndexMap<OpId, u32>) -> Vec<(u32, u32)> {
    if let Some(id) = spec_ids.get(&op) {
        return vec![(*id, default_word(lib, op))];
    }
    let op = lib.op(op);
    if op.opcode != SpirvOp::SpecConstantComposite {
        return Vec::new();
    }
    op.operands
        .iter()
        .filter_map(Operand::as_op)
        .flat_map(|component| scalars_of(lib, component, spec_ids))
        .collect()
}

fn default_word(lib: &Library, op: OpId) -> u32 {
    let op = lib.op(op);
    match op.opcode {
        SpirvOp::SpecConstantTrue => 1,
        SpirvOp::SpecConstantFalse => 0,
        _ => match op.operands.first() {
            Some(Operand::Literal(word)) => *word,
            _ => 0,
        },
    }
}
