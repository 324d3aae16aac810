//! Module serialization.
//!
//! Section order: header → capabilities → extensions → extended instruction
//! imports → memory model → entry points → execution modes → debug source
//! and names → decorations → types/constants/globals → functions.

use serde::Serialize;
use tessera_ir::spirv::{AddressingModel, MemoryModel, Op as SpirvOp, SourceLanguage};
use tessera_ir::{
    BlockKind, DecorationTarget, EntryPointInfo, FragmentType, FunctionId, Library, Op, Operand,
    ShaderReflection, TypeId, TypeKind,
};

use super::collector::{CollectedModule, Declaration, TypeDependencyCollector};
use super::ids::{IdAllocator, Node};
use super::late_bound::LateBoundRewrite;
use super::specialization::SpecializationReflection;
use super::writer::{WordWriter, string_words};
use super::{EmitError, MAGIC, VERSION, bytes_from_words};

/// `OpSource` version for an unknown source language.
const SOURCE_VERSION: u32 = 100;
/// Generator magic; 0 is reserved for unregistered tools.
const GENERATOR: u32 = 0;

/// One emitted SPIR-V module plus what a host needs to bind it.
#[derive(Debug, Clone, Serialize)]
pub struct EmittedModule {
    #[serde(skip)]
    pub words: Vec<u32>,
    /// Stage of each entry point, in emission order.
    pub stages: Vec<FragmentType>,
    pub reflection: ShaderReflection,
    pub specialization: SpecializationReflection,
}

impl EmittedModule {
    pub fn to_bytes(&self) -> Vec<u8> {
        bytes_from_words(&self.words)
    }

    /// Bound from the header: one past the largest id.
    pub fn bound(&self) -> u32 {
        self.words.get(3).copied().unwrap_or(0)
    }
}

/// Emits the entry points of `entry_types` into one module.
pub fn emit(lib: &Library, entry_types: &[TypeId]) -> Result<EmittedModule, EmitError> {
    if entry_types.is_empty() {
        return Err(EmitError::NoEntryPoints);
    }
    let mut infos = Vec::with_capacity(entry_types.len());
    for ty in entry_types {
        let info = lib
            .entry_point(*ty)
            .ok_or_else(|| EmitError::NoEntryPoint(lib.ty(*ty).name.clone()))?;
        infos.push(info);
    }

    let rewrite = LateBoundRewrite::from_entry_points(lib, infos.iter().copied())?;
    let mut collector = TypeDependencyCollector::new(lib, &rewrite);
    for info in &infos {
        collector.collect_entry_point(info);
    }
    collector.collect_reserved_spec_constants();
    let collected = collector.finish()?;

    let mut emitter = Emitter {
        lib,
        rewrite: &rewrite,
        collected: &collected,
        ids: IdAllocator::new(),
        out: WordWriter::new(),
    };
    emitter.assign_ids();
    emitter.write(&infos);
    let bound = emitter.ids.bound();
    let mut words = vec![MAGIC, VERSION, GENERATOR, bound, 0];
    words.extend(emitter.out.into_words());

    let specialization = SpecializationReflection::gather(lib, &collected.spec_ids);
    let mut reflection = ShaderReflection::default();
    for info in &infos {
        let r = &info.reflection;
        reflection.stage_inputs.extend(r.stage_inputs.iter().cloned());
        reflection.stage_outputs.extend(r.stage_outputs.iter().cloned());
        reflection.uniform_blocks.extend(r.uniform_blocks.iter().cloned());
    }
    reflection.sampled_resources = collected.resources.clone();
    reflection.spec_constants = specialization.first_ids();

    log::debug!(
        "emitted {} entry points: {} words, bound {bound}",
        infos.len(),
        words.len()
    );
    Ok(EmittedModule {
        words,
        stages: infos.iter().map(|i| i.fragment_type).collect(),
        reflection,
        specialization,
    })
}

struct Emitter<'a> {
    lib: &'a Library,
    rewrite: &'a LateBoundRewrite,
    collected: &'a CollectedModule,
    ids: IdAllocator,
    out: WordWriter,
}

impl Emitter<'_> {
    /// Ids for every node up front, so branches and calls may point forward.
    fn assign_ids(&mut self) {
        let lib = self.lib;
        for import in &self.collected.ext_imports {
            self.ids.assign(Node::ExtImport(*import));
        }
        for declaration in &self.collected.declarations {
            self.ids.assign(declaration_node(*declaration));
        }
        for function in &self.collected.functions {
            self.ids.assign(Node::Function(*function));
        }
        for function in &self.collected.functions {
            let function = lib.function(*function);
            for param in &function.params {
                self.ids.assign(Node::Op(*param));
            }
            for block in &function.blocks {
                self.ids.assign(Node::Block(*block));
            }
            for block in &function.blocks {
                let block = lib.block(*block);
                for op in block.locals.iter().chain(&block.lines) {
                    if lib.op(*op).has_result() {
                        self.ids.assign(Node::Op(*op));
                    }
                }
            }
        }
    }

    fn write(&mut self, infos: &[&EntryPointInfo]) {
        let lib = self.lib;
        let collected = self.collected;

        for capability in &collected.capabilities {
            self.out.instruction(SpirvOp::Capability, &[*capability as u32]);
        }
        for extension in &collected.extensions {
            self.out.instruction(SpirvOp::Extension, &string_words(extension));
        }
        for import in &collected.ext_imports {
            let mut body = vec![self.ids.ensure(Node::ExtImport(*import))];
            body.extend(string_words(&lib.ext_import(*import).name));
            self.out.instruction(SpirvOp::ExtInstImport, &body);
        }
        self.out.instruction(
            SpirvOp::MemoryModel,
            &[AddressingModel::Logical as u32, MemoryModel::GLSL450 as u32],
        );

        for info in infos {
            let function = self.function_id(info.function);
            let mut body = vec![info.execution_model as u32, function];
            body.extend(string_words(&info.name));
            body.extend(info.interface.iter().map(|g| self.ids.ensure(Node::Op(*g))));
            self.out.instruction(SpirvOp::EntryPoint, &body);
        }
        for info in infos {
            let function = self.function_id(info.function);
            for (mode, literals) in &info.execution_modes {
                let mut body = vec![function, *mode as u32];
                body.extend(literals);
                self.out.instruction(SpirvOp::ExecutionMode, &body);
            }
        }

        self.out
            .instruction(SpirvOp::Source, &[SourceLanguage::Unknown as u32, SOURCE_VERSION]);
        self.write_names();
        self.write_decorations();
        for declaration in &collected.declarations {
            self.write_declaration(*declaration);
        }
        self.write_functions();
    }

    fn function_id(&self, id: FunctionId) -> u32 {
        self.ids.ensure(Node::Function(self.rewrite.resolve(id)))
    }

    fn write_names(&mut self) {
        let lib = self.lib;
        for declaration in &self.collected.declarations {
            let Declaration::Type(ty) = declaration else {
                continue;
            };
            let ty = lib.ty(*ty);
            if ty.kind != TypeKind::Struct {
                continue;
            }
            let id = self.ids.ensure(Node::Type(ty.id));
            self.name(id, &ty.name);
            for (index, member) in ty.members.iter().enumerate() {
                let mut body = vec![id, index as u32];
                body.extend(string_words(&member.name));
                self.out.instruction(SpirvOp::MemberName, &body);
            }
        }
        for function in &self.collected.functions {
            let id = self.ids.ensure(Node::Function(*function));
            self.name(id, &lib.function(*function).name);
        }
        for op in &self.collected.named_ops {
            let Some(name) = &lib.op(*op).debug_name else {
                continue;
            };
            let Some(id) = self.ids.ids.get(&Node::Op(*op)).copied() else {
                continue;
            };
            self.name(id, name);
        }
    }

    fn name(&mut self, id: u32, name: &str) {
        let mut body = vec![id];
        body.extend(string_words(name));
        self.out.instruction(SpirvOp::Name, &body);
    }

    fn write_decorations(&mut self) {
        for decoration in &self.collected.decorations {
            let target = match decoration.target {
                DecorationTarget::Type(ty) => self.ids.ensure(Node::Type(ty)),
                DecorationTarget::Op(op) => self.ids.ensure(Node::Op(op)),
            };
            match decoration.member {
                Some(member) => {
                    let mut body = vec![target, member, decoration.decoration as u32];
                    body.extend(&decoration.operands);
                    self.out.instruction(SpirvOp::MemberDecorate, &body);
                }
                None => {
                    let mut body = vec![target, decoration.decoration as u32];
                    body.extend(&decoration.operands);
                    self.out.instruction(SpirvOp::Decorate, &body);
                }
            }
        }
    }

    fn write_declaration(&mut self, declaration: Declaration) {
        let lib = self.lib;
        match declaration {
            Declaration::Type(id) => {
                let ty = lib.ty(id);
                // Unknown kinds never reach here; the collector rejects them.
                let Some(opcode) = ty.kind.opcode() else {
                    return;
                };
                let mut body = vec![self.ids.ensure(Node::Type(id))];
                for operand in &ty.parameters {
                    self.operand(operand, &mut body);
                }
                self.out.instruction(opcode, &body);
            }
            Declaration::Constant(op) | Declaration::Global(op) => self.write_op(lib.op(op)),
        }
    }

    fn write_functions(&mut self) {
        let lib = self.lib;
        // Declarations (no body) precede definitions.
        let (declared, defined): (Vec<&FunctionId>, Vec<&FunctionId>) = self
            .collected
            .functions
            .iter()
            .partition(|f| lib.function(**f).blocks.is_empty());

        for id in declared.into_iter().chain(defined) {
            let function = lib.function(*id);
            self.out.instruction(
                SpirvOp::Function,
                &[
                    self.ids.ensure(Node::Type(function.return_type)),
                    self.ids.ensure(Node::Function(*id)),
                    0,
                    self.ids.ensure(Node::Type(function.ty)),
                ],
            );
            for param in &function.params {
                self.write_op(lib.op(*param));
            }
            for (index, block_id) in function.blocks.iter().enumerate() {
                let block = lib.block(*block_id);
                self.out.instruction(SpirvOp::Label, &[self.ids.ensure(Node::Block(*block_id))]);
                if index == 0 {
                    for other in &function.blocks {
                        for local in &lib.block(*other).locals {
                            self.write_op(lib.op(*local));
                        }
                    }
                }
                for line in &block.lines {
                    let op = lib.op(*line);
                    if op.is_terminator() {
                        self.write_merge(block.kind, block.merge, block.continue_target);
                    }
                    let op = self.rewrite.rewrite_op(op);
                    self.write_op(&op);
                }
            }
            self.out.instruction(SpirvOp::FunctionEnd, &[]);
        }
    }

    /// Structured control flow: the merge instruction right before a
    /// selection or loop header's terminator.
    fn write_merge(
        &mut self,
        kind: BlockKind,
        merge: Option<tessera_ir::BlockId>,
        cont: Option<tessera_ir::BlockId>,
    ) {
        let Some(merge) = merge else {
            return;
        };
        let merge = self.ids.ensure(Node::Block(merge));
        match (kind, cont) {
            (BlockKind::Selection, _) => self.out.instruction(SpirvOp::SelectionMerge, &[merge, 0]),
            (BlockKind::Loop, Some(cont)) => {
                let cont = self.ids.ensure(Node::Block(cont));
                self.out.instruction(SpirvOp::LoopMerge, &[merge, cont, 0]);
            }
            _ => {}
        }
    }

    fn write_op(&mut self, op: &Op) {
        let mut body = Vec::with_capacity(op.operands.len() + 2);
        if let Some(ty) = op.result_type {
            body.push(self.ids.ensure(Node::Type(ty)));
            body.push(self.ids.ensure(Node::Op(op.id)));
        }
        for operand in &op.operands {
            self.operand(operand, &mut body);
        }
        self.out.instruction(op.opcode, &body);
    }

    fn operand(&self, operand: &Operand, body: &mut Vec<u32>) {
        match operand {
            Operand::Op(op) => body.push(self.ids.ensure(Node::Op(*op))),
            Operand::Type(ty) => body.push(self.ids.ensure(Node::Type(*ty))),
            Operand::Function(f) => body.push(self.function_id(*f)),
            Operand::Block(b) => body.push(self.ids.ensure(Node::Block(*b))),
            Operand::ExtImport(x) => body.push(self.ids.ensure(Node::ExtImport(*x))),
            Operand::Literal(word) => body.push(*word),
            Operand::String(text) => body.extend(string_words(text)),
        }
    }
}

fn declaration_node(declaration: Declaration) -> Node {
    match declaration {
        Declaration::Type(ty) => Node::Type(ty),
        Declaration::Constant(op) | Declaration::Global(op) => Node::Op(op),
    }
}
