//! Byte-to-byte passes over an emitted module.

use std::collections::HashMap;

use indexmap::IndexMap;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use rspirv::binary::Assemble;
use rspirv::dr::{Instruction, Module, Operand};
use rspirv::spirv::{Decoration, Op};

use super::PassError;
use crate::emit::{bytes_from_words, words_from_bytes};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pass {
    /// Drops names, source and line information.
    StripDebugInfo,
    /// Turns specialization constants into plain constants. `overrides`
    /// maps SpecId to the value word replacing the default.
    FreezeSpecConstants { overrides: IndexMap<u32, u32> },
    /// Runs naga's validator; the module passes through unchanged.
    Validate,
}

impl Pass {
    pub fn name(&self) -> &'static str {
        match self {
            Pass::StripDebugInfo => "strip-debug-info",
            Pass::FreezeSpecConstants { .. } => "freeze-spec-constants",
            Pass::Validate => "validate",
        }
    }

    pub fn run(&self, bytes: &[u8]) -> Result<Vec<u8>, PassError> {
        match self {
            Pass::StripDebugInfo => rewrite(self.name(), bytes, strip_debug_info),
            Pass::FreezeSpecConstants { overrides } => {
                rewrite(self.name(), bytes, |module| freeze_spec_constants(module, overrides))
            }
            Pass::Validate => {
                validate(bytes)?;
                Ok(bytes.to_vec())
            }
        }
    }
}

/// Passes applied in order; the first failure stops the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PassPipeline {
    passes: Vec<Pass>,
}

impl PassPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, pass: Pass) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn push(&mut self, pass: Pass) {
        self.passes.push(pass);
    }

    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }

    pub fn run(&self, bytes: &[u8]) -> Result<Vec<u8>, PassError> {
        let mut current = bytes.to_vec();
        for pass in &self.passes {
            current = pass.run(&current)?;
            log::debug!("pass {}: {} bytes", pass.name(), current.len());
        }
        Ok(current)
    }
}

fn load(pass: &'static str, bytes: &[u8]) -> Result<Module, PassError> {
    let words = words_from_bytes(bytes).ok_or_else(|| {
        PassError::new(pass, format!("length {} is not a multiple of 4", bytes.len()))
    })?;
    rspirv::dr::load_words(words).map_err(|e| PassError::new(pass, format!("{e:?}")))
}

fn rewrite(
    pass: &'static str,
    bytes: &[u8],
    f: impl FnOnce(&mut Module),
) -> Result<Vec<u8>, PassError> {
    let mut module = load(pass, bytes)?;
    f(&mut module);
    Ok(bytes_from_words(&module.assemble()))
}

fn strip_debug_info(module: &mut Module) {
    module.debug_string_source.clear();
    module.debug_names.clear();
    module.debug_module_processed.clear();
    for function in &mut module.functions {
        for block in &mut function.blocks {
            block
                .instructions
                .retain(|inst| !matches!(inst.class.opcode, Op::Line | Op::NoLine));
        }
    }
}

fn freeze_spec_constants(module: &mut Module, overrides: &IndexMap<u32, u32>) {
    let mut spec_ids: HashMap<u32, u32> = HashMap::new();
    module.annotations.retain(|inst| {
        let is_spec_id = inst.class.opcode == Op::Decorate
            && inst.operands.get(1) == Some(&Operand::Decoration(Decoration::SpecId));
        if !is_spec_id {
            return true;
        }
        if let (Some(Operand::IdRef(target)), Some(Operand::LiteralBit32(id))) =
            (inst.operands.first(), inst.operands.get(2))
        {
            spec_ids.insert(*target, *id);
        }
        false
    });

    let mut frozen = 0;
    for inst in &mut module.types_global_values {
        let value = inst
            .result_id
            .and_then(|id| spec_ids.get(&id))
            .and_then(|spec_id| overrides.get(spec_id))
            .copied();
        let replacement = match inst.class.opcode {
            Op::SpecConstant => {
                let operands = match value {
                    Some(word) => vec![Operand::LiteralBit32(word)],
                    None => inst.operands.clone(),
                };
                Some(Instruction::new(Op::Constant, inst.result_type, inst.result_id, operands))
            }
            Op::SpecConstantTrue | Op::SpecConstantFalse => {
                let default = inst.class.opcode == Op::SpecConstantTrue;
                let truth = value.map_or(default, |word| word != 0);
                let opcode = if truth { Op::ConstantTrue } else { Op::ConstantFalse };
                Some(Instruction::new(opcode, inst.result_type, inst.result_id, Vec::new()))
            }
            Op::SpecConstantComposite => Some(Instruction::new(
                Op::ConstantComposite,
                inst.result_type,
                inst.result_id,
                inst.operands.clone(),
            )),
            _ => None,
        };
        if let Some(replacement) = replacement {
            *inst = replacement;
            frozen += 1;
        }
    }
    log::trace!("froze {frozen} specialization constants");
}

fn validate(bytes: &[u8]) -> Result<(), PassError> {
    const PASS: &str = "validate";
    if bytes.len() % 4 != 0 {
        return Err(PassError::new(PASS, format!("length {} is not a multiple of 4", bytes.len())));
    }
    let module = naga::front::spv::parse_u8_slice(bytes, &naga::front::spv::Options::default())
        .map_err(|e| PassError::new(PASS, e.to_string()))?;
    Validator::new(ValidationFlags::all(), Capabilities::all())
        .validate(&module)
        .map_err(|e| PassError::new(PASS, e.into_inner().to_string()))?;
    Ok(())
}
