//! Entry points for classes whose `Main` carries `[EntryPoint]`.
//!
//! Each field's in/out attributes bind it to interface storage:
//! - `StageInput` / `StageOutput`: located `Input`/`Output` variables
//! - `HardwareBuiltInInput/Output`: built-in variables or built-in block members
//! - `AppBuiltInInput`: a member of an app uniform buffer
//! - `PropertyInput`: a member of the material block
//!
//! The generated `EntryPoint_Main` runs the globals initializers, constructs
//! the class, copies inputs in, calls `Main` and copies outputs out.
//! Geometry entry points additionally specialize every output stream's
//! placeholder `Append` to write the stage outputs and emit a vertex.

use indexmap::IndexMap;
use tessera_core::{AttributeList, FieldKey, FunctionDecl, TypeRef};
use tessera_ir::spirv::{
    BuiltIn, Capability, Decoration, ExecutionMode, ExecutionModel, Op as SpirvOp, StorageClass,
};
use tessera_ir::{
    DecorationTarget, EntryPointInfo, FieldMeta, FragmentType, FunctionId, InterfaceVariable, OpId,
    Operand, Primitive, ShaderReflection, TemplateResolver, TypeId, TypeKind,
    UniformBlockReflection, UniformMemberReflection,
};

use super::layout::decorate_std140;
use super::{ClassInfo, FunctionContext, IrResult, Translator, Value};
use crate::diagnostics::DiagnosticKind;
use crate::settings::UniformBufferDescription;

/// Where an interface value lives: a global, possibly one member of it,
/// possibly one element per input vertex.
#[derive(Debug, Clone, Copy)]
struct Slot {
    global: OpId,
    member: Option<u32>,
    value_ty: TypeId,
    storage: StorageClass,
    arrayed: bool,
}

#[derive(Debug, Clone, Copy)]
struct BuiltInBlock {
    ty: TypeId,
    global: OpId,
}

#[derive(Debug, Clone)]
struct GeometryStreams {
    input: TypeId,
    input_vertex: TypeId,
    input_primitive: Primitive,
    output: TypeId,
    output_vertex: TypeId,
    output_primitive: Primitive,
}

/// Interface state of one entry point under construction.
#[derive(Debug, Default)]
struct Interface {
    /// Entry point class; prefixes the block types it declares.
    owner: String,
    interface: Vec<OpId>,
    globals: Vec<OpId>,
    input_location: u32,
    output_location: u32,
    input_block: Option<BuiltInBlock>,
    output_block: Option<BuiltInBlock>,
    built_in_globals: IndexMap<(FieldKey, bool), OpId>,
    uniform_blocks: IndexMap<String, OpId>,
    reflection: ShaderReflection,
    depth_replacing: bool,
    /// (member of the class, source)
    copies_in: Vec<(u32, Slot)>,
    /// (member of the class, destination)
    copies_out: Vec<(u32, Slot)>,
    /// Geometry only: (member of the input vertex, per-vertex source)
    vertex_inputs: Vec<(u32, Slot)>,
    /// Geometry only: stage outputs written by `Append`
    vertex_outputs: IndexMap<FieldKey, Slot>,
}

impl Interface {
    fn add_global(&mut self, global: OpId, is_interface: bool) {
        if is_interface && !self.interface.contains(&global) {
            self.interface.push(global);
        }
        if !self.globals.contains(&global) {
            self.globals.push(global);
        }
    }
}

impl<'a> Translator<'a> {
    pub(super) fn generate_entry_points(&mut self) -> IrResult<()> {
        for info in self.class_infos() {
            let Some(main) = info.decl.find_function(&self.names.main_function) else {
                continue;
            };
            if !main.attributes.has_attribute(&self.names.entry_point) {
                continue;
            }
            if info.fragment == FragmentType::None {
                self.report(
                    DiagnosticKind::Unsupported,
                    info.decl.span,
                    format!("entry point class `{}` has no stage attribute", info.decl.name),
                );
                continue;
            }
            self.generate_entry_point(info, main)?;
        }
        Ok(())
    }

    fn generate_entry_point(&mut self, info: ClassInfo<'a>, main: &FunctionDecl) -> IrResult<()> {
        let stage = info.fragment;
        let owner = info.type_ref();
        let Some(main_fn) = self.lib.find_function(&main.key(&owner)) else {
            return Ok(());
        };

        let streams = match stage {
            FragmentType::Geometry => match self.geometry_streams(main)? {
                Some(streams) => Some(streams),
                None => {
                    self.report(
                        DiagnosticKind::Unsupported,
                        main.span,
                        format!(
                            "geometry `{}` takes an input stream and an output stream",
                            main.name
                        ),
                    );
                    return Ok(());
                }
            },
            _ => None,
        };

        let mut io = Interface {
            owner: info.decl.name.clone(),
            ..Interface::default()
        };
        let fields = self.lib.type_meta(info.ty).map(|m| m.fields.clone()).unwrap_or_default();
        let mut material = Vec::new();
        for field in fields.iter().filter(|f| !f.is_static) {
            let Some(member) = self.lib.ty(info.ty).member_index(&field.name) else {
                continue;
            };
            let member = member as u32;
            if field.has_attribute(&self.names.property_input) {
                material.push((field.clone(), member));
            } else if let Some(slot) = self.input_slot(&mut io, stage, field, None)? {
                io.copies_in.push((member, slot));
            }
            if let Some(slot) = self.output_slot(&mut io, stage, field)? {
                io.copies_out.push((member, slot));
            }
        }
        self.material_block(&mut io, info, stage, &material)?;

        if let Some(streams) = &streams {
            let count = streams.input_primitive.size();
            let input_fields = self
                .lib
                .type_meta(streams.input_vertex)
                .map(|m| m.fields.clone())
                .unwrap_or_default();
            for field in &input_fields {
                let input_ty = self.lib.ty(streams.input_vertex);
                let Some(member) = input_ty.member_index(&field.name) else {
                    continue;
                };
                if let Some(slot) = self.input_slot(&mut io, stage, field, Some(count))? {
                    io.vertex_inputs.push((member as u32, slot));
                }
            }
            let output_fields = self
                .lib
                .type_meta(streams.output_vertex)
                .map(|m| m.fields.clone())
                .unwrap_or_default();
            for field in &output_fields {
                let key = self.output_key(field);
                if let (Some(key), Some(slot)) = (key, self.output_slot(&mut io, stage, field)?) {
                    io.vertex_outputs.insert(key, slot);
                }
            }
        }

        let function = self.entry_point_body(info, main_fn, &io, streams.as_ref())?;
        let late_bound = match &streams {
            Some(_) => self.specialize_appends(info, &io)?,
            None => IndexMap::new(),
        };

        let (execution_model, execution_modes) =
            self.execution_modes(info, stage, &io, streams.as_ref());
        let mut capabilities = vec![Capability::Shader];
        if stage == FragmentType::Geometry {
            capabilities.push(Capability::Geometry);
        }

        log::debug!(
            "entry point {}: {} interface variables, {} globals",
            info.decl.name,
            io.interface.len(),
            io.globals.len()
        );
        self.lib.set_entry_point(
            info.ty,
            EntryPointInfo {
                name: "main".to_string(),
                function,
                fragment_type: stage,
                execution_model,
                execution_modes,
                interface: io.interface,
                globals: io.globals,
                capabilities,
                late_bound,
                reflection: io.reflection,
            },
        )
    }

    fn geometry_streams(&mut self, main: &FunctionDecl) -> IrResult<Option<GeometryStreams>> {
        let [input, output] = &main.params[..] else {
            return Ok(None);
        };
        let input_primitive = match self.lib.find_template_resolver(&input.ty.name) {
            Some(TemplateResolver::InputStream(p)) => p,
            _ => return Ok(None),
        };
        let output_primitive = match self.lib.find_template_resolver(&output.ty.name) {
            Some(TemplateResolver::OutputStream(p)) => p,
            _ => return Ok(None),
        };
        let (Some(input_vertex), Some(output_vertex)) =
            (input.ty.type_arg(0), output.ty.type_arg(0))
        else {
            return Ok(None);
        };
        let (input_vertex, output_vertex) = (input_vertex.clone(), output_vertex.clone());
        Ok(Some(GeometryStreams {
            input: self.require_type(&input.ty, input.span)?,
            input_vertex: self.require_type(&input_vertex, input.span)?,
            input_primitive,
            output: self.require_type(&output.ty, output.span)?,
            output_vertex: self.require_type(&output_vertex, output.span)?,
            output_primitive,
        }))
    }

    // ========================================================================
    // Interface variables
    // ========================================================================

    /// Binds an input field; `arrayed` is the per-primitive vertex count of
    /// a geometry input.
    fn input_slot(
        &mut self,
        io: &mut Interface,
        stage: FragmentType,
        field: &FieldMeta,
        arrayed: Option<u32>,
    ) -> IrResult<Option<Slot>> {
        let names = self.names;
        let ty = self.require_type(&field.ty, field.span)?;

        if field.has_attribute(&names.stage_input) {
            let key = field.key_for(&names.stage_input);
            let explicit = explicit_location(field, &names.stage_input, &names.location_param);
            let location = if let Some(location) = explicit {
                location
            } else if stage == FragmentType::Vertex {
                match self.settings.vertex_definition_index(&key) {
                    Some(index) => index as u32,
                    None => {
                        self.report(
                            DiagnosticKind::UnresolvedFieldInput,
                            field.span,
                            format!("`{key}` is not a vertex definition"),
                        );
                        return Ok(None);
                    }
                }
            } else {
                io.input_location += 1;
                io.input_location - 1
            };
            let global_ty = match arrayed {
                Some(count) => self.fixed_array(&field.ty, count)?.unwrap_or(ty),
                None => ty,
            };
            let name = format!("in_{}", key.name);
            let global = self.lib.add_global(global_ty, StorageClass::Input, name, None)?;
            self.lib.decorate(DecorationTarget::Op(global), Decoration::Location, vec![location])?;
            if stage == FragmentType::Pixel && self.is_integral(ty) {
                self.lib.decorate(DecorationTarget::Op(global), Decoration::Flat, Vec::new())?;
            }
            io.add_global(global, true);
            io.reflection.stage_inputs.push(InterfaceVariable {
                name: key.name.clone(),
                location,
                ty: key.type_name.clone(),
            });
            return Ok(Some(Slot {
                global,
                member: None,
                value_ty: ty,
                storage: StorageClass::Input,
                arrayed: arrayed.is_some(),
            }));
        }

        if field.has_attribute(&names.hardware_built_in_input) {
            let key = field.key_for(&names.hardware_built_in_input);
            let found = self
                .settings
                .built_ins
                .stage(stage)
                .and_then(|b| b.find_input(&key))
                .map(|m| (m.field.built_in.to_spirv(), m.in_block));
            let Some((built_in, in_block)) = found else {
                self.report(
                    DiagnosticKind::UnresolvedFieldInput,
                    field.span,
                    format!("`{key}` is not a hardware input of the {} stage", stage.name()),
                );
                return Ok(None);
            };
            let slot = if in_block {
                self.built_in_block_member(io, StorageClass::Input, &key, ty, built_in, arrayed)?
            } else {
                self.built_in_global(io, StorageClass::Input, &key, ty, built_in)?
            };
            return Ok(Some(slot));
        }

        if field.has_attribute(&names.app_built_in_input) {
            let key = field.key_for(&names.app_built_in_input);
            let settings = self.settings;
            let Some((buffer, index)) = settings.find_app_built_in(&key, stage) else {
                self.report(
                    DiagnosticKind::UnresolvedFieldInput,
                    field.span,
                    format!("`{key}` is not an app built-in of the {} stage", stage.name()),
                );
                return Ok(None);
            };
            let global = self.app_uniform_block(io, buffer)?;
            return Ok(Some(Slot {
                global,
                member: Some(index as u32),
                value_ty: ty,
                storage: StorageClass::Uniform,
                arrayed: false,
            }));
        }
        Ok(None)
    }

    fn output_key(&self, field: &FieldMeta) -> Option<FieldKey> {
        let names = self.names;
        [
            &names.stage_output,
            &names.hardware_built_in_output,
            &names.fragment_output,
            &names.output,
        ]
        .into_iter()
        .find(|attr| field.has_attribute(attr))
        .map(|attr| field.key_for(attr))
    }

    fn output_slot(
        &mut self,
        io: &mut Interface,
        stage: FragmentType,
        field: &FieldMeta,
    ) -> IrResult<Option<Slot>> {
        let names = self.names;
        let ty = self.require_type(&field.ty, field.span)?;

        if field.has_attribute(&names.stage_output) {
            let key = field.key_for(&names.stage_output);
            let explicit = explicit_location(field, &names.stage_output, &names.location_param);
            let location = if let Some(location) = explicit {
                location
            } else if stage == FragmentType::Pixel {
                match self.settings.render_target_index(&key.name) {
                    Some(index) => index as u32,
                    None => {
                        self.report(
                            DiagnosticKind::Unsupported,
                            field.span,
                            format!("`{}` is not a render target", key.name),
                        );
                        return Ok(None);
                    }
                }
            } else {
                io.output_location += 1;
                io.output_location - 1
            };
            let name = format!("out_{}", key.name);
            let global = self.lib.add_global(ty, StorageClass::Output, name, None)?;
            self.lib.decorate(DecorationTarget::Op(global), Decoration::Location, vec![location])?;
            io.add_global(global, true);
            io.reflection.stage_outputs.push(InterfaceVariable {
                name: key.name.clone(),
                location,
                ty: key.type_name.clone(),
            });
            return Ok(Some(Slot {
                global,
                member: None,
                value_ty: ty,
                storage: StorageClass::Output,
                arrayed: false,
            }));
        }

        if field.has_attribute(&names.hardware_built_in_output) {
            let key = field.key_for(&names.hardware_built_in_output);
            let found = self
                .settings
                .built_ins
                .stage(stage)
                .and_then(|b| b.find_output(&key))
                .map(|m| (m.field.built_in.to_spirv(), m.in_block));
            let Some((built_in, in_block)) = found else {
                self.report(
                    DiagnosticKind::UnresolvedFieldInput,
                    field.span,
                    format!("`{key}` is not a hardware output of the {} stage", stage.name()),
                );
                return Ok(None);
            };
            if built_in == BuiltIn::FragDepth {
                io.depth_replacing = true;
            }
            let slot = if in_block {
                self.built_in_block_member(io, StorageClass::Output, &key, ty, built_in, None)?
            } else {
                self.built_in_global(io, StorageClass::Output, &key, ty, built_in)?
            };
            return Ok(Some(slot));
        }
        Ok(None)
    }

    fn built_in_global(
        &mut self,
        io: &mut Interface,
        storage: StorageClass,
        key: &FieldKey,
        ty: TypeId,
        built_in: BuiltIn,
    ) -> IrResult<Slot> {
        let is_input = storage == StorageClass::Input;
        let global = match io.built_in_globals.get(&(key.clone(), is_input)) {
            Some(global) => *global,
            None => {
                let prefix = if is_input { "in" } else { "out" };
                let name = format!("{prefix}_{}", key.name);
                let global = self.lib.add_global(ty, storage, name, None)?;
                let target = DecorationTarget::Op(global);
                self.lib.decorate(target, Decoration::BuiltIn, vec![built_in as u32])?;
                io.built_in_globals.insert((key.clone(), is_input), global);
                io.add_global(global, true);
                global
            }
        };
        Ok(Slot {
            global,
            member: None,
            value_ty: ty,
            storage,
            arrayed: false,
        })
    }

    fn built_in_block_member(
        &mut self,
        io: &mut Interface,
        storage: StorageClass,
        key: &FieldKey,
        ty: TypeId,
        built_in: BuiltIn,
        arrayed: Option<u32>,
    ) -> IrResult<Slot> {
        let is_input = storage == StorageClass::Input;
        let existing = if is_input { io.input_block } else { io.output_block };
        let block = match existing {
            Some(block) => block,
            None => {
                let (suffix, global_name) = if is_input {
                    ("BuiltInInput", "in_builtins")
                } else {
                    ("BuiltInOutput", "out_builtins")
                };
                let name = format!("{}_{suffix}", io.owner);
                let block_ty = match self.lib.find_type(&name, false) {
                    Some(found) => found,
                    None => {
                        let block_ty = self.lib.add_type(name.clone(), TypeKind::Struct)?;
                        let target = DecorationTarget::Type(block_ty);
                        self.lib.decorate(target, Decoration::Block, Vec::new())?;
                        block_ty
                    }
                };
                let global_ty = match arrayed {
                    Some(count) => {
                        self.fixed_array(&TypeRef::named(name), count)?.unwrap_or(block_ty)
                    }
                    None => block_ty,
                };
                let global = self.lib.add_global(global_ty, storage, global_name, None)?;
                io.add_global(global, true);
                let block = BuiltInBlock { ty: block_ty, global };
                if is_input {
                    io.input_block = Some(block);
                } else {
                    io.output_block = Some(block);
                }
                block
            }
        };

        let member = match self.lib.ty(block.ty).member_index_by_key(key) {
            Some(index) => index as u32,
            None => {
                let index = self.lib.type_mut(block.ty)?.add_member(
                    key.name.clone(),
                    ty,
                    Some(key.clone()),
                ) as u32;
                self.lib.add_dependent(ty, block.ty)?;
                let decoration = vec![built_in as u32];
                self.lib.decorate_member(block.ty, index, Decoration::BuiltIn, decoration)?;
                index
            }
        };
        Ok(Slot {
            global: block.global,
            member: Some(member),
            value_ty: ty,
            storage,
            arrayed: arrayed.is_some(),
        })
    }

    fn is_integral(&self, ty: TypeId) -> bool {
        let t = self.lib.ty(ty);
        let scalar = match t.kind {
            TypeKind::Vector => t.component_type.map(|c| self.lib.ty(c).kind),
            kind => Some(kind),
        };
        matches!(scalar, Some(TypeKind::Int | TypeKind::Bool))
    }

    // ========================================================================
    // Uniform blocks
    // ========================================================================

    fn app_uniform_block(
        &mut self,
        io: &mut Interface,
        buffer: &UniformBufferDescription,
    ) -> IrResult<OpId> {
        if let Some(global) = io.uniform_blocks.get(&buffer.debug_name) {
            return Ok(*global);
        }
        let members: Vec<(String, TypeRef)> =
            buffer.fields.iter().map(|f| (f.name.clone(), f.ty.clone())).collect();
        let global = self.uniform_block(
            io,
            &buffer.debug_name,
            buffer.binding,
            buffer.descriptor_set,
            &members,
        )?;
        io.uniform_blocks.insert(buffer.debug_name.clone(), global);
        Ok(global)
    }

    fn material_block(
        &mut self,
        io: &mut Interface,
        info: ClassInfo<'a>,
        stage: FragmentType,
        fields: &[(FieldMeta, u32)],
    ) -> IrResult<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let settings = self.settings;
        let material = &settings.default_uniform_buffer;
        let members: Vec<(String, TypeRef)> =
            fields.iter().map(|(f, _)| (f.name.clone(), f.ty.clone())).collect();
        let global = self.uniform_block(
            io,
            &material.debug_name,
            settings.material_binding(stage),
            material.descriptor_set,
            &members,
        )?;
        for (index, (field, member)) in fields.iter().enumerate() {
            let value_ty = self.require_type(&field.ty, field.span)?;
            io.copies_in.push((
                *member,
                Slot {
                    global,
                    member: Some(index as u32),
                    value_ty,
                    storage: StorageClass::Uniform,
                    arrayed: false,
                },
            ));
        }
        log::trace!("{}: material block with {} members", info.decl.name, fields.len());
        Ok(())
    }

    /// A std140 `Uniform` block global with reflection.
    fn uniform_block(
        &mut self,
        io: &mut Interface,
        name: &str,
        binding: u32,
        descriptor_set: u32,
        members: &[(String, TypeRef)],
    ) -> IrResult<OpId> {
        let type_name = format!("{}_{name}", io.owner);
        let block_ty = match self.lib.find_type(&type_name, false) {
            Some(found) => found,
            None => {
                let block_ty = self.lib.add_type(type_name, TypeKind::Struct)?;
                for (member, ty) in members {
                    let id = self.require_type(ty, tessera_core::Span::default())?;
                    self.lib
                        .type_mut(block_ty)?
                        .add_member(
                            member.clone(),
                            id,
                            Some(FieldKey::new(member.clone(), ty.to_string())),
                        );
                    self.lib.add_dependent(id, block_ty)?;
                }
                self.lib.decorate(DecorationTarget::Type(block_ty), Decoration::Block, Vec::new())?;
                block_ty
            }
        };
        let layout = decorate_std140(&mut self.lib, block_ty)?;

        let global = self.lib.add_global(block_ty, StorageClass::Uniform, name, None)?;
        let target = DecorationTarget::Op(global);
        self.lib.decorate(target, Decoration::DescriptorSet, vec![descriptor_set])?;
        self.lib.decorate(DecorationTarget::Op(global), Decoration::Binding, vec![binding])?;
        io.add_global(global, false);
        io.reflection.uniform_blocks.push(UniformBlockReflection {
            name: name.to_string(),
            binding,
            descriptor_set,
            size: layout.size,
            members: members
                .iter()
                .zip(&layout.offsets)
                .map(|((member, ty), offset)| UniformMemberReflection {
                    name: member.clone(),
                    ty: ty.to_string(),
                    offset: *offset,
                })
                .collect(),
        });
        Ok(global)
    }

    // ========================================================================
    // Bodies
    // ========================================================================

    fn slot_pointer(
        &mut self,
        f: &FunctionContext,
        slot: Slot,
        vertex: Option<u32>,
    ) -> IrResult<Value> {
        let mut indices = Vec::new();
        if let (true, Some(vertex)) = (slot.arrayed, vertex) {
            indices.push(Operand::Op(self.int_const(vertex)?));
        }
        if let Some(member) = slot.member {
            indices.push(Operand::Op(self.int_const(member)?));
        }
        if indices.is_empty() {
            let ty = self.lib.op(slot.global).result_type.unwrap_or(self.core.void);
            return Ok(Value::new(slot.global, ty));
        }
        let ptr = self.lib.get_or_create_pointer_type(slot.value_ty, slot.storage)?;
        let mut operands = vec![Operand::Op(slot.global)];
        operands.extend(indices);
        let op = self.emit(f, SpirvOp::AccessChain, Some(ptr), operands)?;
        Ok(Value::new(op, ptr))
    }

    fn entry_point_body(
        &mut self,
        info: ClassInfo<'a>,
        main: FunctionId,
        io: &Interface,
        streams: Option<&GeometryStreams>,
    ) -> IrResult<FunctionId> {
        let name = format!("{}.EntryPoint_Main", info.decl.name);
        let function = self.lib.add_function(name, self.core.void, Vec::new())?;
        let mut f = self.begin_function(function, None)?;

        let mut initializers: Vec<FunctionId> =
            self.lib.dependencies().iter().filter_map(|lib| lib.globals_initializer()).collect();
        initializers.extend(self.lib.globals_initializer());
        for init in initializers {
            self.call_user(&mut f, init, None, Vec::new())?;
        }

        let this = self.local(&f, info.ty, Some("self"))?;
        self.default_initialize(&mut f, this, info.ty)?;

        for (member, slot) in &io.copies_in {
            let source = self.slot_pointer(&f, *slot, None)?;
            let member_ty = self.lib.ty(info.ty).members[*member as usize].ty;
            let place = self.member_access(&f, this, *member, member_ty)?;
            self.store(&f, place, source)?;
        }

        match streams {
            Some(streams) => {
                let input = self.local(&f, streams.input, Some("input"))?;
                let vertex_ptr = self.pointer(streams.input_vertex)?;
                for vertex in 0..streams.input_primitive.size() {
                    let index = self.int_const(vertex)?;
                    let element = self.emit(
                        &f,
                        SpirvOp::AccessChain,
                        Some(vertex_ptr),
                        vec![Operand::Op(input.op), Operand::Op(index)],
                    )?;
                    let element = Value::new(element, vertex_ptr);
                    for (member, slot) in &io.vertex_inputs {
                        let source = self.slot_pointer(&f, *slot, Some(vertex))?;
                        let member_ty =
                            self.lib.ty(streams.input_vertex).members[*member as usize].ty;
                        let place = self.member_access(&f, element, *member, member_ty)?;
                        self.store(&f, place, source)?;
                    }
                }
                let output = self.local(&f, streams.output, Some("output"))?;
                let null = self.lib.null_constant(streams.output)?;
                self.store(&f, output, Value::new(null, streams.output))?;
                self.call_user(&mut f, main, Some(this), vec![input, output])?;
            }
            None => {
                self.call_user(&mut f, main, Some(this), Vec::new())?;
            }
        }

        for (member, slot) in &io.copies_out {
            let member_ty = self.lib.ty(info.ty).members[*member as usize].ty;
            let source = self.member_access(&f, this, *member, member_ty)?;
            let place = self.slot_pointer(&f, *slot, None)?;
            self.store(&f, place, source)?;
        }
        self.emit(&f, SpirvOp::Return, None, Vec::new())?;
        self.finish_function(f)?;
        Ok(function)
    }

    /// Every output stream visible to this library gets an `Append` that
    /// copies the vertex's outputs to the stage outputs matched by key.
    fn specialize_appends(
        &mut self,
        info: ClassInfo<'a>,
        io: &Interface,
    ) -> IrResult<IndexMap<FunctionId, FunctionId>> {
        let mut streams: Vec<TypeId> = self.lib.types().map(|t| t.id).collect();
        for lib in self.lib.dependencies().iter() {
            streams.extend(lib.types().map(|t| t.id));
        }
        streams.retain(|ty| {
            self.lib.ty(*ty).kind == TypeKind::Struct && self.lib.late_bound(*ty).is_some()
        });

        let mut late_bound = IndexMap::new();
        for stream in streams {
            let Some(placeholder) = self.lib.late_bound(stream) else {
                continue;
            };
            let params = self.lib.function(placeholder).params.clone();
            let param_types: Vec<TypeId> = params
                .iter()
                .map(|p| self.lib.op(*p).result_type.unwrap_or(self.core.void))
                .collect();
            let Some(vertex_ptr) = param_types.get(1).copied() else {
                continue;
            };
            let vertex = self.lib.value_type(vertex_ptr);

            let name = format!("{}.{}.Append", info.decl.name, self.lib.ty(stream).name);
            let function = self.lib.add_function(name, self.core.void, param_types)?;
            let f = self.begin_function(function, None)?;
            let vertex_param = Value::new(self.lib.function(function).params[1], vertex_ptr);

            let fields = self.lib.type_meta(vertex).map(|m| m.fields.clone()).unwrap_or_default();
            for field in &fields {
                let Some(key) = self.output_key(field) else {
                    continue;
                };
                let Some(slot) = io.vertex_outputs.get(&key).copied() else {
                    continue;
                };
                let Some(member) = self.lib.ty(vertex).member_index(&field.name) else {
                    continue;
                };
                let member_ty = self.lib.ty(vertex).members[member].ty;
                let source = self.member_access(&f, vertex_param, member as u32, member_ty)?;
                let place = self.slot_pointer(&f, slot, None)?;
                self.store(&f, place, source)?;
            }
            self.emit(&f, SpirvOp::EmitVertex, None, Vec::new())?;
            self.emit(&f, SpirvOp::Return, None, Vec::new())?;
            self.finish_function(f)?;
            late_bound.insert(placeholder, function);
        }
        Ok(late_bound)
    }

    fn execution_modes(
        &self,
        info: ClassInfo<'a>,
        stage: FragmentType,
        io: &Interface,
        streams: Option<&GeometryStreams>,
    ) -> (ExecutionModel, Vec<(ExecutionMode, Vec<u32>)>) {
        let names = self.names;
        match stage {
            FragmentType::Pixel => {
                let mut modes = vec![(ExecutionMode::OriginUpperLeft, Vec::new())];
                if io.depth_replacing {
                    modes.push((ExecutionMode::DepthReplacing, Vec::new()));
                }
                (ExecutionModel::Fragment, modes)
            }
            FragmentType::Geometry => {
                let Some(streams) = streams else {
                    return (ExecutionModel::Geometry, Vec::new());
                };
                let max_vertices = info
                    .decl
                    .attributes
                    .find_attribute(&names.geometry)
                    .and_then(|a| a.int_param(&names.max_vertices_param, 0))
                    .map(|v| v as u32)
                    .unwrap_or(streams.output_primitive.size());
                let input = match streams.input_primitive {
                    Primitive::Points => ExecutionMode::InputPoints,
                    Primitive::Lines => ExecutionMode::InputLines,
                    Primitive::Triangles => ExecutionMode::Triangles,
                };
                let output = match streams.output_primitive {
                    Primitive::Points => ExecutionMode::OutputPoints,
                    Primitive::Lines => ExecutionMode::OutputLineStrip,
                    Primitive::Triangles => ExecutionMode::OutputTriangleStrip,
                };
                let modes = vec![
                    (input, Vec::new()),
                    (ExecutionMode::Invocations, vec![1]),
                    (ExecutionMode::OutputVertices, vec![max_vertices]),
                    (output, Vec::new()),
                ];
                (ExecutionModel::Geometry, modes)
            }
            FragmentType::Compute => {
                let compute = info.decl.attributes.find_attribute(&names.compute);
                let size = |param: &str, position: usize| {
                    compute
                        .and_then(|a| a.int_param(param, position))
                        .map(|v| v as u32)
                        .unwrap_or(1)
                };
                let local_size = vec![
                    size(&names.local_size_x_param, 0),
                    size(&names.local_size_y_param, 1),
                    size(&names.local_size_z_param, 2),
                ];
                (ExecutionModel::GLCompute, vec![(ExecutionMode::LocalSize, local_size)])
            }
            FragmentType::Vertex | FragmentType::None => (ExecutionModel::Vertex, Vec::new()),
        }
    }
}

/// `location` parameter of a stage in/out attribute, as assigned by the
/// compositor so both sides of a stage boundary agree.
fn explicit_location(field: &FieldMeta, attribute: &str, param: &str) -> Option<u32> {
    field
        .attributes_named(attribute)
        .find_map(|a| a.int_param(param, usize::MAX))
        .and_then(|v| u32::try_from(v).ok())
}
