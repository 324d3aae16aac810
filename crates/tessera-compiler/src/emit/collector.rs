//! Reachability from entry points, in emission order.
//!
//! SPIR-V forbids forward references among types, constants and globals.
//! Visiting a declaration visits its operands first and only then appends
//! it, so first-discovery order is already a valid topological order.
//! Functions are visited parameters first, then each block's locals and
//! lines; calls are followed through the late-bound rewrite.

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use tessera_ir::spirv::{Capability, Decoration as SpirvDecoration, Op as SpirvOp, StorageClass};
use tessera_ir::{
    Decoration, DecorationTarget, EntryPointInfo, ExtImportId, FunctionId, Library, OpId, Operand,
    ResourceReflection, SpecConstantKey, TypeId, TypeKind, is_constant,
};

use super::capabilities;
use super::{EmitError, LateBoundRewrite};
use crate::intrinsics::RESERVED_SPEC_CONSTANTS;

/// One entry of the types/constants/globals section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Declaration {
    Type(TypeId),
    Constant(OpId),
    Global(OpId),
}

/// Everything one module has to declare, in emission order.
#[derive(Debug, Clone, Default)]
pub struct CollectedModule {
    pub capabilities: Vec<Capability>,
    pub extensions: Vec<String>,
    pub ext_imports: Vec<ExtImportId>,
    pub declarations: Vec<Declaration>,
    pub functions: Vec<FunctionId>,
    /// Ops carrying a debug name, in discovery order.
    pub named_ops: Vec<OpId>,
    pub decorations: Vec<Decoration>,
    /// Scalar specialization constant -> SpecId.
    pub spec_ids: IndexMap<OpId, u32>,
    /// Images and samplers with the bindings assigned to them.
    pub resources: Vec<ResourceReflection>,
}

impl CollectedModule {
    pub fn contains_op(&self, op: OpId) -> bool {
        self.declarations
            .iter()
            .any(|d| matches!(d, Declaration::Constant(o) | Declaration::Global(o) if *o == op))
    }

    pub fn contains_type(&self, ty: TypeId) -> bool {
        self.declarations.contains(&Declaration::Type(ty))
    }
}

pub struct TypeDependencyCollector<'a> {
    lib: &'a Library,
    rewrite: &'a LateBoundRewrite,
    capabilities: IndexSet<Capability>,
    extensions: IndexSet<String>,
    ext_imports: IndexSet<ExtImportId>,
    declarations: IndexSet<Declaration>,
    functions: IndexSet<FunctionId>,
    named_ops: Vec<OpId>,
    decorations: Vec<Decoration>,
    spec_ids: IndexMap<OpId, u32>,
    visited_types: HashSet<TypeId>,
    visited_ops: HashSet<OpId>,
    unemittable: Option<String>,
}

impl<'a> TypeDependencyCollector<'a> {
    pub fn new(lib: &'a Library, rewrite: &'a LateBoundRewrite) -> Self {
        let mut capabilities = IndexSet::new();
        capabilities.insert(Capability::Shader);
        Self {
            lib,
            rewrite,
            capabilities,
            extensions: IndexSet::new(),
            ext_imports: IndexSet::new(),
            declarations: IndexSet::new(),
            functions: IndexSet::new(),
            named_ops: Vec::new(),
            decorations: Vec::new(),
            spec_ids: IndexMap::new(),
            visited_types: HashSet::new(),
            visited_ops: HashSet::new(),
            unemittable: None,
        }
    }

    pub fn collect_entry_point(&mut self, info: &EntryPointInfo) {
        self.capabilities.extend(info.capabilities.iter().copied());
        if let Some(capability) = capabilities::for_execution_model(info.execution_model) {
            self.capabilities.insert(capability);
        }
        self.collect_function(info.function);
        for global in info.interface.iter().chain(&info.globals) {
            self.visit_op(*global);
        }
    }

    /// The reserved specialization constants are always declared so hosts
    /// can override them whether or not a shader reads them.
    pub fn collect_reserved_spec_constants(&mut self) {
        for name in RESERVED_SPEC_CONSTANTS {
            if let Some(op) = self.lib.find_spec_constant(&SpecConstantKey::new(name)) {
                self.visit_op(op);
            }
        }
    }

    pub fn collect_function(&mut self, id: FunctionId) {
        let id = self.rewrite.resolve(id);
        if !self.functions.insert(id) {
            return;
        }
        let lib = self.lib;
        let function = lib.function(id);
        self.visit_type(function.ty);
        for param in &function.params {
            self.visit_op(*param);
        }
        for block in &function.blocks {
            let block = lib.block(*block);
            for op in block.locals.iter().chain(&block.lines) {
                self.visit_op(*op);
            }
        }
    }

    pub fn finish(mut self) -> Result<CollectedModule, EmitError> {
        if let Some(name) = self.unemittable.take() {
            return Err(EmitError::UnemittableType(name));
        }
        let resources = self.bind_resources();
        log::debug!(
            "collected {} declarations, {} functions, {} capabilities",
            self.declarations.len(),
            self.functions.len(),
            self.capabilities.len()
        );
        Ok(CollectedModule {
            capabilities: self.capabilities.into_iter().collect(),
            extensions: self.extensions.into_iter().collect(),
            ext_imports: self.ext_imports.into_iter().collect(),
            declarations: self.declarations.into_iter().collect(),
            functions: self.functions.into_iter().collect(),
            named_ops: self.named_ops,
            decorations: self.decorations,
            spec_ids: self.spec_ids,
            resources,
        })
    }

    // ========================================================================
    // Visitors
    // ========================================================================

    fn visit_operand(&mut self, operand: &Operand) {
        match operand {
            Operand::Op(op) => self.visit_op(*op),
            Operand::Type(ty) => self.visit_type(*ty),
            Operand::Function(function) => self.collect_function(*function),
            Operand::ExtImport(import) => {
                self.ext_imports.insert(*import);
            }
            Operand::Block(_) | Operand::Literal(_) | Operand::String(_) => {}
        }
    }

    fn visit_type(&mut self, id: TypeId) {
        if !self.visited_types.insert(id) {
            return;
        }
        let lib = self.lib;
        let ty = lib.ty(id);
        if ty.kind == TypeKind::Unknown {
            self.unemittable.get_or_insert_with(|| ty.name.clone());
            return;
        }
        for operand in &ty.parameters {
            self.visit_operand(operand);
        }
        let (capability, extension) = capabilities::for_type(lib, ty);
        self.capabilities.extend(capability);
        self.extensions.extend(extension.map(str::to_string));
        self.declarations.insert(Declaration::Type(id));
        self.collect_decorations(DecorationTarget::Type(id));
    }

    fn visit_op(&mut self, id: OpId) {
        if !self.visited_ops.insert(id) {
            return;
        }
        let lib = self.lib;
        let op = lib.op(id);
        if let Some(capability) = capabilities::for_opcode(op.opcode) {
            self.capabilities.insert(capability);
        }
        if let Some(ty) = op.result_type {
            self.visit_type(ty);
        }
        for operand in &op.operands {
            self.visit_operand(operand);
        }
        if op.debug_name.is_some() {
            self.named_ops.push(id);
        }

        if is_constant(op.opcode) {
            self.declarations.insert(Declaration::Constant(id));
            if matches!(
                op.opcode,
                SpirvOp::SpecConstant | SpirvOp::SpecConstantTrue | SpirvOp::SpecConstantFalse
            ) {
                let spec_id = self.spec_ids.len() as u32 + 1;
                self.spec_ids.insert(id, spec_id);
                self.decorations.push(Decoration {
                    target: DecorationTarget::Op(id),
                    member: None,
                    decoration: SpirvDecoration::SpecId,
                    operands: vec![spec_id],
                });
            }
        } else if is_global(op) {
            self.declarations.insert(Declaration::Global(id));
            self.collect_decorations(DecorationTarget::Op(id));
        }
    }

    fn collect_decorations(&mut self, target: DecorationTarget) {
        for decoration in self.lib.decorations_for(target) {
            if let Some(capability) = capabilities::for_decoration(decoration) {
                self.capabilities.insert(capability);
            }
            if !self.decorations.contains(decoration) {
                self.decorations.push(decoration.clone());
            }
        }
    }

    /// Images and samplers without a binding get descriptor set 0 and the
    /// bindings following the highest one already used.
    fn bind_resources(&mut self) -> Vec<ResourceReflection> {
        let mut next = self
            .decorations
            .iter()
            .filter(|d| d.decoration == SpirvDecoration::Binding)
            .filter_map(|d| d.operands.first())
            .max()
            .map_or(0, |b| b + 1);

        let lib = self.lib;
        let mut resources = Vec::new();
        let globals: Vec<OpId> = self
            .declarations
            .iter()
            .filter_map(|d| match d {
                Declaration::Global(op) => Some(*op),
                _ => None,
            })
            .collect();
        for global in globals {
            let op = lib.op(global);
            let Some(pointer) = op.result_type else {
                continue;
            };
            let pointer = lib.ty(pointer);
            if pointer.storage_class != Some(StorageClass::UniformConstant) {
                continue;
            }
            let name = op.debug_name.clone().unwrap_or_default();
            let existing = self.decorations.iter().find(|d| {
                d.target == DecorationTarget::Op(global) && d.decoration == SpirvDecoration::Binding
            });
            if let Some(existing) = existing {
                let binding = existing.operands.first().copied().unwrap_or(0);
                resources.push(ResourceReflection {
                    name,
                    binding,
                    descriptor_set: self.descriptor_set_of(global),
                });
                continue;
            }
            let bindings = [(SpirvDecoration::DescriptorSet, 0), (SpirvDecoration::Binding, next)];
            for (decoration, value) in bindings {
                self.decorations.push(Decoration {
                    target: DecorationTarget::Op(global),
                    member: None,
                    decoration,
                    operands: vec![value],
                });
            }
            resources.push(ResourceReflection {
                name,
                binding: next,
                descriptor_set: 0,
            });
            next += 1;
        }
        if !resources.is_empty() {
            log::trace!("bound {} sampled resources", resources.len());
        }
        resources
    }

    fn descriptor_set_of(&self, global: OpId) -> u32 {
        self.decorations
            .iter()
            .find(|d| {
                d.target == DecorationTarget::Op(global)
                    && d.decoration == SpirvDecoration::DescriptorSet
            })
            .and_then(|d| d.operands.first().copied())
            .unwrap_or(0)
    }
}

/// An `OpVariable` outside function storage.
fn is_global(op: &tessera_ir::Op) -> bool {
    if op.opcode != SpirvOp::Variable {
        return false;
    }
    let function = StorageClass::Function as u32;
    matches!(op.operands.first(), Some(Operand::Literal(sc)) if *sc != function)
}
