//! Front end: typed syntax tree → IR.
//!
//! Translation runs three passes over every class of a project:
//! - **Collect**: struct types, enum constants, type metas
//! - **Declare**: struct members, globals, specialization constants and
//!   function signatures, so bodies can reference anything in the project
//! - **Walk**: function bodies, field initializers, then entry points for
//!   classes whose `Main` carries `[EntryPoint]`
//!
//! Errors are reported into the diagnostics collector and replaced by
//! `OpUndef` values of the expected type, so one run surfaces as many
//! problems as possible.

mod attributes;
mod calls;
mod collect;
mod constants;
mod declare;
mod entry_point;
mod expressions;
mod layout;
mod statements;

#[cfg(test)]
mod attributes_tests;

use std::collections::HashMap;

use indexmap::IndexMap;
use tessera_core::{ClassDecl, FunctionKey, Project, Span, TypeRef};
use tessera_ir::spirv::{Op as SpirvOp, StorageClass};
use tessera_ir::{
    BlockId, FragmentType, FunctionId, IrError, Library, Module, OpId, Operand, TypeId,
    is_terminator,
};

pub use attributes::validate_attributes;
pub use layout::{BlockLayout, std140_block, std140_size_align};

use crate::analyze::analyze;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::intrinsics::{CoreTypes, ShaderIntrinsics};
use crate::settings::{NameSettings, Settings};
use crate::{Error, PassResult};

pub(crate) type IrResult<T> = std::result::Result<T, IrError>;

/// Name of the synthesized function that runs instance field initializers.
pub const PRE_CONSTRUCTOR: &str = "PreConstructor";

pub fn pre_constructor_key(owner: &TypeRef) -> FunctionKey {
    FunctionKey::new(owner.clone(), PRE_CONSTRUCTOR, Vec::new())
}

/// Translates `project` into a new, locked Library.
///
/// `deps` lists already translated libraries the project references; the
/// intrinsics library is always searched first. Recursion is fatal and
/// returned as [`Error::Recursion`]; every other problem is reported in the
/// returned diagnostics.
pub fn translate(
    project: &Project,
    settings: &Settings,
    intrinsics: &ShaderIntrinsics,
    deps: &Module,
) -> PassResult<Library> {
    let module = intrinsics.module_with(deps);
    let mut diag = Diagnostics::new();

    let analysis = analyze(project, &settings.names, &module, &mut diag);
    if analysis.has_recursion {
        return Err(Error::Recursion(diag));
    }

    let library = Library::new(project.name.clone(), module)?;
    let mut translator = Translator::new(project, settings, intrinsics.types(), library, diag);
    translator.run()?;

    let Translator { mut lib, diag, .. } = translator;
    analysis.stages.store(&mut lib)?;
    lib.lock();
    log::debug!(
        "translated '{}': {} types, {} functions, {} errors",
        lib.name(),
        lib.types().count(),
        lib.functions().count(),
        diag.error_count()
    );
    Ok((lib, diag))
}

// ============================================================================
// Translator state
// ============================================================================

/// A translated expression: an op plus its IR type. Pointer-typed values
/// are addressable; everything else is an immediate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Value {
    pub op: OpId,
    pub ty: TypeId,
}

impl Value {
    pub fn new(op: OpId, ty: TypeId) -> Self {
        Self { op, ty }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct ClassInfo<'a> {
    pub decl: &'a ClassDecl,
    pub ty: TypeId,
    pub fragment: FragmentType,
}

impl ClassInfo<'_> {
    pub fn type_ref(&self) -> TypeRef {
        self.decl.type_ref()
    }
}

#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    break_to: BlockId,
    continue_to: BlockId,
}

/// Per-function lowering state: the block being filled, lexical scopes and
/// the break/continue target stack.
#[derive(Debug)]
pub(crate) struct FunctionContext {
    pub function: FunctionId,
    pub entry: BlockId,
    pub current: BlockId,
    pub return_type: TypeId,
    pub receiver: Option<Value>,
    scopes: Vec<HashMap<String, Value>>,
    loops: Vec<LoopTargets>,
}

impl FunctionContext {
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.into(), value);
        }
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        self.scopes.iter().rev().find_map(|s| s.get(name).copied())
    }

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }
}

pub(crate) struct Translator<'a> {
    project: &'a Project,
    settings: &'a Settings,
    names: &'a NameSettings,
    core: CoreTypes,
    pub(crate) lib: Library,
    pub(crate) diag: Diagnostics,
    classes: IndexMap<TypeRef, ClassInfo<'a>>,
    /// Enum names resolve to Integer.
    enum_types: HashMap<String, TypeId>,
    globals_init: Option<FunctionContext>,
}

impl<'a> Translator<'a> {
    fn new(
        project: &'a Project,
        settings: &'a Settings,
        core: CoreTypes,
        lib: Library,
        diag: Diagnostics,
    ) -> Self {
        Self {
            project,
            settings,
            names: &settings.names,
            core,
            lib,
            diag,
            classes: IndexMap::new(),
            enum_types: HashMap::new(),
            globals_init: None,
        }
    }

    fn run(&mut self) -> IrResult<()> {
        validate_attributes(self.project, self.settings, &mut self.diag);

        self.collect()?;
        log::debug!("collect: {} classes", self.classes.len());
        self.declare()?;
        log::debug!("declare: {} functions", self.lib.functions().count());
        self.walk()?;
        self.finish_globals_initializer()?;
        self.generate_entry_points()?;
        log::debug!("walk: done, {} errors so far", self.diag.error_count());
        Ok(())
    }

    fn class_infos(&self) -> Vec<ClassInfo<'a>> {
        self.classes.values().copied().collect()
    }

    // ------------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------------

    pub(crate) fn report(&mut self, kind: DiagnosticKind, span: Span, message: impl Into<String>) {
        self.diag.report(kind, span).message(message).emit();
    }

    /// Placeholder value of `ty` so lowering can continue after an error.
    pub(crate) fn dummy(&mut self, f: &mut FunctionContext, ty: TypeId) -> IrResult<Value> {
        let op = self.emit(f, SpirvOp::Undef, Some(ty), Vec::new())?;
        Ok(Value::new(op, ty))
    }

    // ------------------------------------------------------------------------
    // Functions and blocks
    // ------------------------------------------------------------------------

    pub(crate) fn begin_function(
        &mut self,
        function: FunctionId,
        receiver: Option<Value>,
    ) -> IrResult<FunctionContext> {
        let entry = self.lib.add_block()?;
        self.lib.function_mut(function)?.blocks.push(entry);
        Ok(FunctionContext {
            function,
            entry,
            current: entry,
            return_type: self.lib.function(function).return_type,
            receiver,
            scopes: vec![HashMap::new()],
            loops: Vec::new(),
        })
    }

    /// Leaves every block with exactly one terminator: lines after the
    /// first terminator are dropped, a block without one returns.
    pub(crate) fn finish_function(&mut self, f: FunctionContext) -> IrResult<()> {
        let blocks = self.lib.function(f.function).blocks.clone();
        for block in blocks {
            let lines = self.lib.block(block).lines.clone();
            let first = lines.iter().position(|op| is_terminator(self.lib.op(*op).opcode));
            match first {
                Some(index) => self.lib.block_mut(block)?.lines.truncate(index + 1),
                None => {
                    let returns_void =
                        self.lib.ty(f.return_type).kind == tessera_ir::TypeKind::Void;
                    let operands = if returns_void {
                        None
                    } else {
                        Some(self.lib.null_constant(f.return_type)?)
                    };
                    match operands {
                        None => self.lib.emit(block, SpirvOp::Return, None, Vec::new())?,
                        Some(null) => {
                            self.lib
                                .emit(block, SpirvOp::ReturnValue, None, vec![Operand::Op(null)])?
                        }
                    };
                }
            }
        }
        Ok(())
    }

    pub(crate) fn new_block(&mut self) -> IrResult<BlockId> {
        self.lib.add_block()
    }

    /// Appends `block` to the function and makes it current.
    pub(crate) fn start_block(&mut self, f: &mut FunctionContext, block: BlockId) -> IrResult<()> {
        self.lib.function_mut(f.function)?.blocks.push(block);
        f.current = block;
        Ok(())
    }

    pub(crate) fn is_terminated(&self, block: BlockId) -> bool {
        self.lib
            .block(block)
            .lines
            .iter()
            .any(|op| is_terminator(self.lib.op(*op).opcode))
    }

    /// Branches to `target` unless the current block already left.
    pub(crate) fn branch(&mut self, f: &mut FunctionContext, target: BlockId) -> IrResult<()> {
        if !self.is_terminated(f.current) {
            self.emit(f, SpirvOp::Branch, None, vec![Operand::Block(target)])?;
        }
        Ok(())
    }

    pub(crate) fn emit(
        &mut self,
        f: &FunctionContext,
        opcode: SpirvOp,
        result: Option<TypeId>,
        operands: Vec<Operand>,
    ) -> IrResult<OpId> {
        self.lib.emit(f.current, opcode, result, operands)
    }

    // ------------------------------------------------------------------------
    // Values
    // ------------------------------------------------------------------------

    pub(crate) fn is_pointer(&self, value: Value) -> bool {
        self.lib.ty(value.ty).is_pointer()
    }

    /// Function-local variable, hoisted into the entry block.
    pub(crate) fn local(
        &mut self,
        f: &FunctionContext,
        ty: TypeId,
        name: Option<&str>,
    ) -> IrResult<Value> {
        let ptr = self.lib.get_or_create_pointer_type(ty, StorageClass::Function)?;
        let op = self.lib.add_op(
            SpirvOp::Variable,
            Some(ptr),
            vec![Operand::Literal(StorageClass::Function as u32)],
        )?;
        if let Some(name) = name {
            self.lib.set_debug_name(op, name)?;
        }
        self.lib.block_mut(f.entry)?.locals.push(op);
        Ok(Value::new(op, ptr))
    }

    /// Loads through a pointer; immediates pass unchanged.
    pub(crate) fn to_value(&mut self, f: &FunctionContext, value: Value) -> IrResult<Value> {
        if !self.is_pointer(value) {
            return Ok(value);
        }
        let ty = self.lib.value_type(value.ty);
        let op = self.emit(f, SpirvOp::Load, Some(ty), vec![Operand::Op(value.op)])?;
        Ok(Value::new(op, ty))
    }

    /// Spills an immediate into a fresh temporary; pointers pass unchanged.
    pub(crate) fn to_pointer(&mut self, f: &FunctionContext, value: Value) -> IrResult<Value> {
        if self.is_pointer(value) {
            return Ok(value);
        }
        let temp = self.local(f, value.ty, None)?;
        self.store(f, temp, value)?;
        Ok(temp)
    }

    pub(crate) fn store(
        &mut self,
        f: &FunctionContext,
        pointer: Value,
        value: Value,
    ) -> IrResult<()> {
        let value = self.to_value(f, value)?;
        self.emit(
            f,
            SpirvOp::Store,
            None,
            vec![Operand::Op(pointer.op), Operand::Op(value.op)],
        )?;
        Ok(())
    }

    /// Pointer to member `index` of a struct pointer, or the extracted
    /// member of a struct value.
    pub(crate) fn member_access(
        &mut self,
        f: &FunctionContext,
        base: Value,
        index: u32,
        member_ty: TypeId,
    ) -> IrResult<Value> {
        if self.is_pointer(base) {
            let storage = self.lib.ty(base.ty).storage_class.unwrap_or(StorageClass::Function);
            let ptr = self.lib.get_or_create_pointer_type(member_ty, storage)?;
            let index = self.int_const(index)?;
            let op = self.emit(
                f,
                SpirvOp::AccessChain,
                Some(ptr),
                vec![Operand::Op(base.op), Operand::Op(index)],
            )?;
            return Ok(Value::new(op, ptr));
        }
        let op = self.emit(
            f,
            SpirvOp::CompositeExtract,
            Some(member_ty),
            vec![Operand::Op(base.op), Operand::Literal(index)],
        )?;
        Ok(Value::new(op, member_ty))
    }

    /// Stores the null value into `pointer`, then runs the pre-constructor
    /// when the type is a class.
    pub(crate) fn default_initialize(
        &mut self,
        f: &mut FunctionContext,
        pointer: Value,
        ty: TypeId,
    ) -> IrResult<()> {
        let null = self.lib.null_constant(ty)?;
        self.store(f, pointer, Value::new(null, ty))?;
        if self.lib.type_meta(ty).is_none() {
            return Ok(());
        }
        let owner = TypeRef::named(self.lib.ty(ty).name.clone());
        if let Some(pre) = self.lib.find_function(&pre_constructor_key(&owner)) {
            self.call_user(f, pre, Some(pointer), Vec::new())?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------------
    // Globals initializer
    // ------------------------------------------------------------------------

    fn take_globals_initializer(&mut self) -> IrResult<FunctionContext> {
        if let Some(f) = self.globals_init.take() {
            return Ok(f);
        }
        let name = format!("{}.GlobalsInitializer", self.lib.name());
        let function = self.lib.add_function(name, self.core.void, Vec::new())?;
        self.lib.set_globals_initializer(function)?;
        self.begin_function(function, None)
    }

    fn finish_globals_initializer(&mut self) -> IrResult<()> {
        match self.globals_init.take() {
            Some(f) => self.finish_function(f),
            None => Ok(()),
        }
    }
}
