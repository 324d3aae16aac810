//! The unit of compilation.
//!
//! A Library owns every IR node created while translating one project, in
//! plain arenas addressed by handles. It is mutable until [`Library::lock`]
//! marks it translated; after that every mutating call fails with
//! [`IrError::LibraryLocked`] and the library can be shared behind an `Arc`.

use std::collections::HashMap;

use indexmap::IndexMap;
use rspirv::spirv::{Decoration as SpirvDecoration, Op as SpirvOp, StorageClass};
use tessera_core::{BinaryOp, FunctionKey, TypeRef, UnaryOp};

use crate::resolvers::{
    BinaryOperatorKey, InstructionResolver, ResolverTables, TemplateResolver, TypeCastKey,
    UnaryOperatorKey,
};
use crate::{
    Block, BlockId, Decoration, DecorationTarget, EntryPointInfo, ExtImport, ExtImportId,
    Function, FunctionId, FunctionMeta, IrError, LibraryId, Module, Op, OpId, Operand,
    StageRequirementsData, StageSymbol, Type, TypeId, TypeKind, TypeMeta,
};

/// Identifies one scalar (or composite) of a specialization constant:
/// the declaring symbol plus the component path inside it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpecConstantKey {
    pub symbol: String,
    pub path: Vec<u32>,
}

impl SpecConstantKey {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            path: Vec::new(),
        }
    }

    pub fn child(&self, index: u32) -> Self {
        let mut path = self.path.clone();
        path.push(index);
        Self {
            symbol: self.symbol.clone(),
            path,
        }
    }
}

/// A global shared between all fragments of a composite.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FragmentSharedKey {
    pub storage_class: StorageClass,
    pub ty: TypeId,
    pub name: String,
}

#[derive(Debug)]
pub struct Library {
    id: LibraryId,
    name: String,
    dependencies: Module,
    translated: bool,

    types: Vec<Type>,
    ops: Vec<Op>,
    functions: Vec<Function>,
    blocks: Vec<Block>,
    ext_imports: Vec<ExtImport>,

    type_names: HashMap<String, TypeId>,
    pointer_types: HashMap<(TypeId, StorageClass), TypeId>,
    function_types: HashMap<(TypeId, Vec<TypeId>), TypeId>,
    type_metas: HashMap<TypeId, TypeMeta>,
    type_dependents: HashMap<TypeId, Vec<TypeId>>,

    function_keys: HashMap<FunctionKey, FunctionId>,
    function_metas: HashMap<FunctionId, FunctionMeta>,

    constants: HashMap<(TypeId, Vec<u32>), OpId>,
    composite_constants: HashMap<(TypeId, Vec<OpId>), OpId>,
    null_constants: HashMap<TypeId, OpId>,
    spec_constants: IndexMap<SpecConstantKey, OpId>,
    enum_values: HashMap<(String, String), OpId>,

    globals: Vec<OpId>,
    field_globals: IndexMap<(TypeRef, String), OpId>,
    fragment_shared: HashMap<FragmentSharedKey, OpId>,
    globals_initializer: Option<FunctionId>,

    decorations: Vec<Decoration>,
    resolvers: ResolverTables,
    stage_requirements: HashMap<StageSymbol, StageRequirementsData>,
    entry_points: IndexMap<TypeId, EntryPointInfo>,
    late_bound: HashMap<TypeId, FunctionId>,
}

impl Library {
    /// Creates an empty library. Every dependency must already be translated.
    pub fn new(name: impl Into<String>, dependencies: Module) -> Result<Self, IrError> {
        if let Some(lib) = dependencies.iter().find(|l| !l.is_translated()) {
            return Err(IrError::DependencyNotTranslated(lib.name().to_string()));
        }
        Ok(Self {
            id: LibraryId::next(),
            name: name.into(),
            dependencies,
            translated: false,
            types: Vec::new(),
            ops: Vec::new(),
            functions: Vec::new(),
            blocks: Vec::new(),
            ext_imports: Vec::new(),
            type_names: HashMap::new(),
            pointer_types: HashMap::new(),
            function_types: HashMap::new(),
            type_metas: HashMap::new(),
            type_dependents: HashMap::new(),
            function_keys: HashMap::new(),
            function_metas: HashMap::new(),
            constants: HashMap::new(),
            composite_constants: HashMap::new(),
            null_constants: HashMap::new(),
            spec_constants: IndexMap::new(),
            enum_values: HashMap::new(),
            globals: Vec::new(),
            field_globals: IndexMap::new(),
            fragment_shared: HashMap::new(),
            globals_initializer: None,
            decorations: Vec::new(),
            resolvers: ResolverTables::default(),
            stage_requirements: HashMap::new(),
            entry_points: IndexMap::new(),
            late_bound: HashMap::new(),
        })
    }

    pub fn id(&self) -> LibraryId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dependencies(&self) -> &Module {
        &self.dependencies
    }

    pub fn is_translated(&self) -> bool {
        self.translated
    }

    /// Marks the library translated. Idempotent.
    pub fn lock(&mut self) {
        self.translated = true;
    }

    fn check_unlocked(&self) -> Result<(), IrError> {
        if self.translated {
            return Err(IrError::LibraryLocked(self.name.clone()));
        }
        Ok(())
    }

    /// This library or the dependency owning `id`.
    pub fn library(&self, id: LibraryId) -> Option<&Library> {
        if id == self.id {
            Some(self)
        } else {
            self.dependencies.library(id)
        }
    }

    fn cascade<'a, T: 'a>(&'a self, f: impl Fn(&'a Library) -> Option<T>) -> Option<T> {
        if let Some(found) = f(self) {
            return Some(found);
        }
        self.dependencies.iter().find_map(|lib| f(lib.as_ref()))
    }

    // ========================================================================
    // Types
    // ========================================================================

    /// Adds a named type. Value types get their Function-storage pointer
    /// type created alongside.
    pub fn add_type(&mut self, name: impl Into<String>, kind: TypeKind) -> Result<TypeId, IrError> {
        self.check_unlocked()?;
        let name = name.into();
        if self.type_names.contains_key(&name) {
            return Err(IrError::DuplicateType(name, self.name.clone()));
        }
        let id = TypeId::new(self.id, self.types.len());
        self.types.push(Type::new(id, name.clone(), kind));
        self.type_names.insert(name, id);

        if !matches!(
            kind,
            TypeKind::Pointer | TypeKind::Function | TypeKind::Void | TypeKind::Unknown
        ) {
            let ptr = self.get_or_create_pointer_type(id, StorageClass::Function)?;
            self.types[id.idx()].pointer_type = Some(ptr);
        }
        Ok(id)
    }

    pub fn find_type(&self, name: &str, cascade: bool) -> Option<TypeId> {
        if let Some(id) = self.type_names.get(name) {
            return Some(*id);
        }
        if !cascade {
            return None;
        }
        self.dependencies.find_type(name)
    }

    pub fn ty(&self, id: TypeId) -> &Type {
        &self.ensure_library(id.library, "type").types[id.idx()]
    }

    pub fn type_mut(&mut self, id: TypeId) -> Result<&mut Type, IrError> {
        self.check_unlocked()?;
        if id.library != self.id {
            return Err(IrError::ForeignHandle(format!("type {}", self.ty(id).name)));
        }
        Ok(&mut self.types[id.idx()])
    }

    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.types.iter()
    }

    pub fn find_pointer_type(&self, value: TypeId, storage_class: StorageClass) -> Option<TypeId> {
        self.cascade(|lib| lib.pointer_types.get(&(value, storage_class)).copied())
    }

    pub fn get_or_create_pointer_type(
        &mut self,
        value: TypeId,
        storage_class: StorageClass,
    ) -> Result<TypeId, IrError> {
        if let Some(found) = self.find_pointer_type(value, storage_class) {
            return Ok(found);
        }
        self.check_unlocked()?;
        let value_name = self.ty(value).name.clone();
        let name = match storage_class {
            StorageClass::Function => format!("{value_name}*"),
            other => format!("{value_name}*{other:?}"),
        };
        let id = TypeId::new(self.id, self.types.len());
        let mut ty = Type::new(id, name, TypeKind::Pointer);
        ty.storage_class = Some(storage_class);
        ty.value_type = Some(value);
        ty.non_copyable = self.ty(value).non_copyable;
        ty.parameters = vec![Operand::Literal(storage_class as u32), Operand::Type(value)];
        self.types.push(ty);
        self.pointer_types.insert((value, storage_class), id);
        Ok(id)
    }

    /// Value type of a pointer, or the type itself.
    pub fn value_type(&self, id: TypeId) -> TypeId {
        self.ty(id).value_type.unwrap_or(id)
    }

    pub fn get_or_create_function_type(
        &mut self,
        return_type: TypeId,
        params: Vec<TypeId>,
    ) -> Result<TypeId, IrError> {
        let key = (return_type, params);
        if let Some(found) = self.cascade(|lib| lib.function_types.get(&key).copied()) {
            return Ok(found);
        }
        self.check_unlocked()?;
        let (return_type, params) = key;
        let params_text: Vec<&str> = params.iter().map(|p| self.ty(*p).name.as_str()).collect();
        let name = format!("({}) -> {}", params_text.join(", "), self.ty(return_type).name);
        let id = TypeId::new(self.id, self.types.len());
        let mut ty = Type::new(id, name, TypeKind::Function);
        ty.parameters.push(Operand::Type(return_type));
        ty.parameters.extend(params.iter().map(|p| Operand::Type(*p)));
        self.types.push(ty);
        self.function_types.insert((return_type, params), id);
        Ok(id)
    }

    pub fn set_type_meta(&mut self, ty: TypeId, meta: TypeMeta) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.type_metas.insert(ty, meta);
        Ok(())
    }

    pub fn type_meta(&self, ty: TypeId) -> Option<&TypeMeta> {
        self.cascade(|lib| lib.type_metas.get(&ty))
    }

    /// Records that `dependent` embeds `ty` (member, element or pointee).
    pub fn add_dependent(&mut self, ty: TypeId, dependent: TypeId) -> Result<(), IrError> {
        self.check_unlocked()?;
        let list = self.type_dependents.entry(ty).or_default();
        if !list.contains(&dependent) {
            list.push(dependent);
        }
        Ok(())
    }

    pub fn dependents(&self, ty: TypeId) -> Vec<TypeId> {
        let mut out: Vec<TypeId> = self.type_dependents.get(&ty).cloned().unwrap_or_default();
        for lib in self.dependencies.iter() {
            for dependent in lib.type_dependents.get(&ty).into_iter().flatten() {
                if !out.contains(dependent) {
                    out.push(*dependent);
                }
            }
        }
        out
    }

    // ========================================================================
    // Ops, blocks, functions
    // ========================================================================

    pub fn add_op(
        &mut self,
        opcode: SpirvOp,
        result_type: Option<TypeId>,
        operands: Vec<Operand>,
    ) -> Result<OpId, IrError> {
        self.check_unlocked()?;
        let id = OpId::new(self.id, self.ops.len());
        self.ops.push(Op {
            id,
            opcode,
            result_type,
            operands,
            debug_name: None,
        });
        Ok(id)
    }

    pub fn op(&self, id: OpId) -> &Op {
        &self.ensure_library(id.library, "op").ops[id.idx()]
    }

    pub fn op_mut(&mut self, id: OpId) -> Result<&mut Op, IrError> {
        self.check_unlocked()?;
        if id.library != self.id {
            return Err(IrError::ForeignHandle(format!("op {id}")));
        }
        Ok(&mut self.ops[id.idx()])
    }

    pub fn set_debug_name(&mut self, id: OpId, name: impl Into<String>) -> Result<(), IrError> {
        self.op_mut(id)?.debug_name = Some(name.into());
        Ok(())
    }

    /// Creates an op and appends it to a block's lines.
    pub fn emit(
        &mut self,
        block: BlockId,
        opcode: SpirvOp,
        result_type: Option<TypeId>,
        operands: Vec<Operand>,
    ) -> Result<OpId, IrError> {
        let op = self.add_op(opcode, result_type, operands)?;
        self.block_mut(block)?.lines.push(op);
        Ok(op)
    }

    pub fn add_block(&mut self) -> Result<BlockId, IrError> {
        self.check_unlocked()?;
        let id = BlockId::new(self.id, self.blocks.len());
        self.blocks.push(Block::new(id));
        Ok(id)
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.ensure_library(id.library, "block").blocks[id.idx()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> Result<&mut Block, IrError> {
        self.check_unlocked()?;
        if id.library != self.id {
            return Err(IrError::ForeignHandle(format!("block {id}")));
        }
        Ok(&mut self.blocks[id.idx()])
    }

    /// Creates a function with its type and parameter ops but no blocks.
    pub fn add_function(
        &mut self,
        name: impl Into<String>,
        return_type: TypeId,
        params: Vec<TypeId>,
    ) -> Result<FunctionId, IrError> {
        let fn_type = self.get_or_create_function_type(return_type, params.clone())?;
        let mut param_ops = Vec::with_capacity(params.len());
        for p in params {
            param_ops.push(self.add_op(SpirvOp::FunctionParameter, Some(p), Vec::new())?);
        }
        let id = FunctionId::new(self.id, self.functions.len());
        self.functions.push(Function {
            id,
            name: name.into(),
            ty: fn_type,
            return_type,
            params: param_ops,
            blocks: Vec::new(),
            key: None,
        });
        Ok(id)
    }

    pub fn function(&self, id: FunctionId) -> &Function {
        &self.ensure_library(id.library, "function").functions[id.idx()]
    }

    pub fn function_mut(&mut self, id: FunctionId) -> Result<&mut Function, IrError> {
        self.check_unlocked()?;
        if id.library != self.id {
            return Err(IrError::ForeignHandle(format!("function {id}")));
        }
        Ok(&mut self.functions[id.idx()])
    }

    pub fn functions(&self) -> impl Iterator<Item = &Function> {
        self.functions.iter()
    }

    /// Maps a source-level function key to its IR function.
    pub fn map_function(&mut self, key: FunctionKey, id: FunctionId) -> Result<(), IrError> {
        self.check_unlocked()?;
        if id.library == self.id {
            self.functions[id.idx()].key = Some(key.clone());
        }
        self.function_keys.insert(key, id);
        Ok(())
    }

    pub fn find_function(&self, key: &FunctionKey) -> Option<FunctionId> {
        self.cascade(|lib| lib.function_keys.get(key).copied())
    }

    pub fn set_function_meta(&mut self, id: FunctionId, meta: FunctionMeta) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.function_metas.insert(id, meta);
        Ok(())
    }

    pub fn function_meta(&self, id: FunctionId) -> Option<&FunctionMeta> {
        self.cascade(|lib| lib.function_metas.get(&id))
    }

    pub fn get_or_add_ext_import(&mut self, name: &str) -> Result<ExtImportId, IrError> {
        if let Some(found) = self.find_ext_import(name) {
            return Ok(found);
        }
        self.check_unlocked()?;
        let id = ExtImportId::new(self.id, self.ext_imports.len());
        self.ext_imports.push(ExtImport {
            id,
            name: name.to_string(),
        });
        Ok(id)
    }

    pub fn find_ext_import(&self, name: &str) -> Option<ExtImportId> {
        self.cascade(|lib| lib.ext_imports.iter().find(|e| e.name == name).map(|e| e.id))
    }

    pub fn ext_import(&self, id: ExtImportId) -> &ExtImport {
        &self.ensure_library(id.library, "extension import").ext_imports[id.idx()]
    }

    // ========================================================================
    // Constants
    // ========================================================================

    /// Interned scalar constant from its literal words.
    pub fn constant(&mut self, ty: TypeId, words: Vec<u32>) -> Result<OpId, IrError> {
        let key = (ty, words);
        if let Some(found) = self.cascade(|lib| lib.constants.get(&key).copied()) {
            return Ok(found);
        }
        let (ty, words) = key;
        let op = if self.ty(ty).kind == TypeKind::Bool {
            let opcode = if words.first().copied().unwrap_or(0) != 0 {
                SpirvOp::ConstantTrue
            } else {
                SpirvOp::ConstantFalse
            };
            self.add_op(opcode, Some(ty), Vec::new())?
        } else {
            let operands = words.iter().map(|w| Operand::Literal(*w)).collect();
            self.add_op(SpirvOp::Constant, Some(ty), operands)?
        };
        self.constants.insert((ty, words), op);
        Ok(op)
    }

    pub fn composite_constant(
        &mut self,
        ty: TypeId,
        components: Vec<OpId>,
    ) -> Result<OpId, IrError> {
        let key = (ty, components);
        if let Some(found) = self.cascade(|lib| lib.composite_constants.get(&key).copied()) {
            return Ok(found);
        }
        let (ty, components) = key;
        let operands = components.iter().map(|c| Operand::Op(*c)).collect();
        let op = self.add_op(SpirvOp::ConstantComposite, Some(ty), operands)?;
        self.composite_constants.insert((ty, components), op);
        Ok(op)
    }

    pub fn null_constant(&mut self, ty: TypeId) -> Result<OpId, IrError> {
        if let Some(found) = self.cascade(|lib| lib.null_constants.get(&ty).copied()) {
            return Ok(found);
        }
        let op = self.add_op(SpirvOp::ConstantNull, Some(ty), Vec::new())?;
        self.null_constants.insert(ty, op);
        Ok(op)
    }

    pub fn add_spec_constant(&mut self, key: SpecConstantKey, op: OpId) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.spec_constants.insert(key, op);
        Ok(())
    }

    pub fn find_spec_constant(&self, key: &SpecConstantKey) -> Option<OpId> {
        self.cascade(|lib| lib.spec_constants.get(key).copied())
    }

    pub fn spec_constants(&self) -> impl Iterator<Item = (&SpecConstantKey, &OpId)> {
        self.spec_constants.iter()
    }

    pub fn map_enum_value(&mut self, owner: &str, value: &str, op: OpId) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.enum_values.insert((owner.to_string(), value.to_string()), op);
        Ok(())
    }

    pub fn find_enum_value(&self, owner: &str, value: &str) -> Option<OpId> {
        let key = (owner.to_string(), value.to_string());
        self.cascade(|lib| lib.enum_values.get(&key).copied())
    }

    // ========================================================================
    // Globals
    // ========================================================================

    /// Adds an `OpVariable` global of the given value type.
    pub fn add_global(
        &mut self,
        value_type: TypeId,
        storage_class: StorageClass,
        name: impl Into<String>,
        initializer: Option<OpId>,
    ) -> Result<OpId, IrError> {
        let ptr = self.get_or_create_pointer_type(value_type, storage_class)?;
        let mut operands = vec![Operand::Literal(storage_class as u32)];
        if let Some(init) = initializer {
            operands.push(Operand::Op(init));
        }
        let op = self.add_op(SpirvOp::Variable, Some(ptr), operands)?;
        self.set_debug_name(op, name)?;
        self.globals.push(op);
        Ok(op)
    }

    pub fn globals(&self) -> &[OpId] {
        &self.globals
    }

    pub fn map_field_global(
        &mut self,
        owner: &TypeRef,
        field: &str,
        op: OpId,
    ) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.field_globals.insert((owner.clone(), field.to_string()), op);
        Ok(())
    }

    pub fn find_field_global(&self, owner: &TypeRef, field: &str) -> Option<OpId> {
        let key = (owner.clone(), field.to_string());
        self.cascade(|lib| lib.field_globals.get(&key).copied())
    }

    pub fn find_or_add_fragment_shared(
        &mut self,
        storage_class: StorageClass,
        value_type: TypeId,
        name: &str,
    ) -> Result<OpId, IrError> {
        let key = FragmentSharedKey {
            storage_class,
            ty: value_type,
            name: name.to_string(),
        };
        if let Some(found) = self.cascade(|lib| lib.fragment_shared.get(&key).copied()) {
            return Ok(found);
        }
        let op = self.add_global(value_type, storage_class, name, None)?;
        self.fragment_shared.insert(key, op);
        Ok(op)
    }

    pub fn globals_initializer(&self) -> Option<FunctionId> {
        self.globals_initializer
    }

    pub fn set_globals_initializer(&mut self, id: FunctionId) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.globals_initializer = Some(id);
        Ok(())
    }

    // ========================================================================
    // Decorations
    // ========================================================================

    pub fn decorate(
        &mut self,
        target: DecorationTarget,
        decoration: SpirvDecoration,
        operands: Vec<u32>,
    ) -> Result<(), IrError> {
        self.push_decoration(Decoration {
            target,
            member: None,
            decoration,
            operands,
        })
    }

    pub fn decorate_member(
        &mut self,
        ty: TypeId,
        member: u32,
        decoration: SpirvDecoration,
        operands: Vec<u32>,
    ) -> Result<(), IrError> {
        self.push_decoration(Decoration {
            target: DecorationTarget::Type(ty),
            member: Some(member),
            decoration,
            operands,
        })
    }

    fn push_decoration(&mut self, decoration: Decoration) -> Result<(), IrError> {
        self.check_unlocked()?;
        if !self.decorations.contains(&decoration) {
            self.decorations.push(decoration);
        }
        Ok(())
    }

    /// Decorations on `target` from this library and its dependencies.
    pub fn decorations_for(&self, target: DecorationTarget) -> Vec<&Decoration> {
        let mut out: Vec<&Decoration> =
            self.decorations.iter().filter(|d| d.target == target).collect();
        for lib in self.dependencies.iter() {
            out.extend(lib.decorations.iter().filter(|d| d.target == target));
        }
        out
    }

    // ========================================================================
    // Resolvers
    // ========================================================================

    pub fn resolvers_mut(&mut self) -> Result<&mut ResolverTables, IrError> {
        self.check_unlocked()?;
        Ok(&mut self.resolvers)
    }

    pub fn find_field_resolver(&self, ty: &TypeRef, name: &str) -> Option<&InstructionResolver> {
        self.cascade(|lib| lib.resolvers.types.get(ty).and_then(|r| r.field(name)))
    }

    pub fn find_setter_resolver(&self, ty: &TypeRef, name: &str) -> Option<&InstructionResolver> {
        self.cascade(|lib| lib.resolvers.types.get(ty).and_then(|r| r.setter(name)))
    }

    pub fn find_constructor_resolver(
        &self,
        ty: &TypeRef,
        params: &[TypeRef],
    ) -> Option<&InstructionResolver> {
        self.cascade(|lib| {
            let resolvers = lib.resolvers.types.get(ty)?;
            if params.is_empty() {
                if let Some(default) = &resolvers.default_constructor {
                    return Some(default);
                }
            }
            resolvers.constructors.get(params)
        })
    }

    pub fn find_function_resolver(&self, key: &FunctionKey) -> Option<&InstructionResolver> {
        self.cascade(|lib| lib.resolvers.functions.get(key))
    }

    pub fn find_unary_resolver(
        &self,
        operand: &TypeRef,
        op: UnaryOp,
    ) -> Option<&InstructionResolver> {
        let key = UnaryOperatorKey {
            operand: operand.clone(),
            op,
        };
        self.cascade(|lib| lib.resolvers.unary.get(&key))
    }

    pub fn find_binary_resolver(
        &self,
        lhs: &TypeRef,
        rhs: &TypeRef,
        op: BinaryOp,
    ) -> Option<&InstructionResolver> {
        let key = BinaryOperatorKey::new(lhs.clone(), rhs.clone(), op);
        self.cascade(|lib| lib.resolvers.binary.get(&key))
    }

    pub fn find_cast_resolver(&self, from: &TypeRef, to: &TypeRef) -> Option<&InstructionResolver> {
        let key = TypeCastKey {
            from: from.clone(),
            to: to.clone(),
        };
        self.cascade(|lib| lib.resolvers.casts.get(&key))
    }

    pub fn find_template_resolver(&self, base: &str) -> Option<TemplateResolver> {
        self.cascade(|lib| lib.resolvers.templates.get(base).copied())
    }

    // ========================================================================
    // Analyses, entry points
    // ========================================================================

    pub fn set_stage_requirements(
        &mut self,
        symbol: StageSymbol,
        data: StageRequirementsData,
    ) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.stage_requirements.insert(symbol, data);
        Ok(())
    }

    pub fn stage_requirements(&self, symbol: &StageSymbol) -> Option<&StageRequirementsData> {
        self.cascade(|lib| lib.stage_requirements.get(symbol))
    }

    pub fn set_entry_point(&mut self, ty: TypeId, info: EntryPointInfo) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.entry_points.insert(ty, info);
        Ok(())
    }

    pub fn entry_point(&self, ty: TypeId) -> Option<&EntryPointInfo> {
        self.cascade(|lib| lib.entry_points.get(&ty))
    }

    pub fn entry_points(&self) -> impl Iterator<Item = (&TypeId, &EntryPointInfo)> {
        self.entry_points.iter()
    }

    /// Registers the placeholder function a late-bound call site targets.
    pub fn set_late_bound(&mut self, ty: TypeId, placeholder: FunctionId) -> Result<(), IrError> {
        self.check_unlocked()?;
        self.late_bound.insert(ty, placeholder);
        Ok(())
    }

    pub fn late_bound(&self, ty: TypeId) -> Option<FunctionId> {
        self.cascade(|lib| lib.late_bound.get(&ty).copied())
    }
}
