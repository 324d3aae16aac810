//! Entry points generated for composite classes.

use indexmap::IndexMap;
use rspirv::spirv::{Capability, ExecutionMode, ExecutionModel};
use serde::{Deserialize, Serialize};

use crate::{FragmentType, FunctionId, OpId};

#[derive(Debug, Clone)]
pub struct EntryPointInfo {
    pub name: String,
    pub function: FunctionId,
    pub fragment_type: FragmentType,
    pub execution_model: ExecutionModel,
    /// Mode plus literal operands.
    pub execution_modes: Vec<(ExecutionMode, Vec<u32>)>,
    /// Input/Output globals listed on `OpEntryPoint`.
    pub interface: Vec<OpId>,
    /// Every global the entry point declares, including uniforms.
    pub globals: Vec<OpId>,
    pub capabilities: Vec<Capability>,
    /// Placeholder function -> specialized function, applied before emission.
    pub late_bound: IndexMap<FunctionId, FunctionId>,
    pub reflection: ShaderReflection,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ShaderReflection {
    pub stage_inputs: Vec<InterfaceVariable>,
    pub stage_outputs: Vec<InterfaceVariable>,
    pub uniform_blocks: Vec<UniformBlockReflection>,
    pub sampled_resources: Vec<ResourceReflection>,
    /// Declared name -> SpecId of its first scalar.
    pub spec_constants: IndexMap<String, u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InterfaceVariable {
    pub name: String,
    pub location: u32,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformBlockReflection {
    pub name: String,
    pub binding: u32,
    pub descriptor_set: u32,
    pub size: u32,
    pub members: Vec<UniformMemberReflection>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UniformMemberReflection {
    pub name: String,
    pub ty: String,
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceReflection {
    pub name: String,
    pub binding: u32,
    pub descriptor_set: u32,
}

impl ShaderReflection {
    /// SpecId of the first scalar of a declared specialization constant.
    pub fn spec_id(&self, name: &str) -> Option<u32> {
        self.spec_constants.get(name).copied()
    }
}
