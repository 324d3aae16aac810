//! Collect pass: class types, enums, type metadata and type resolution.

use tessera_core::{AttributeList, FieldKey, FunctionKey, Span, TemplateArg, TypeRef};
use tessera_ir::resolvers::TemplateResolver;
use tessera_ir::spirv::{Op as SpirvOp, StorageClass};
use tessera_ir::{
    FieldMeta, FragmentType, FunctionMeta, InstructionResolver, Operand, Primitive, TypeId,
    TypeKind, TypeMeta,
};

use super::{ClassInfo, IrResult, Translator};
use crate::diagnostics::DiagnosticKind;

impl<'a> Translator<'a> {
    pub(super) fn collect(&mut self) -> IrResult<()> {
        let project = self.project;

        for decl in project.enums() {
            self.enum_types.insert(decl.name.clone(), self.core.integer);
            for value in &decl.values {
                let op = self.lib.constant(self.core.integer, vec![value.value as u32])?;
                self.lib.map_enum_value(&decl.name, &value.name, op)?;
            }
        }

        for decl in project.classes() {
            let ty = self.lib.add_type(decl.name.clone(), TypeKind::Struct)?;
            let fragment = decl
                .attributes
                .iter()
                .find_map(|a| self.names.stage_of(&a.name))
                .unwrap_or(FragmentType::None);
            if decl.attributes.has_attribute(&self.names.non_copyable) {
                self.lib.type_mut(ty)?.non_copyable = true;
            }
            self.classes.insert(decl.type_ref(), ClassInfo { decl, ty, fragment });
        }

        for info in self.class_infos() {
            self.collect_meta(info)?;
        }
        Ok(())
    }

    fn collect_meta(&mut self, info: ClassInfo<'a>) -> IrResult<()> {
        let decl = info.decl;
        let owner = info.type_ref();
        let fields = decl
            .fields
            .iter()
            .map(|f| FieldMeta {
                owner: decl.name.clone(),
                name: f.name.clone(),
                ty: f.ty.clone(),
                attributes: f.attributes.clone(),
                is_static: f.is_static,
                initializer: f.initializer.clone(),
                span: f.span,
            })
            .collect();
        let functions = decl
            .functions
            .iter()
            .chain(&decl.constructors)
            .map(|f| FunctionMeta {
                key: f.key(&owner),
                attributes: f.attributes.clone(),
                span: f.span,
            })
            .collect();
        self.lib.set_type_meta(
            info.ty,
            TypeMeta {
                name: decl.name.clone(),
                fragment_type: info.fragment,
                attributes: decl.attributes.clone(),
                fields,
                functions,
                span: decl.span,
            },
        )?;

        let has_main = decl.find_function(&self.names.main_function).is_some();
        self.lib.type_mut(info.ty)?.has_main = has_main;
        let required = self.settings.errors.front_end_error_on_no_main;
        if !has_main && info.fragment != FragmentType::None && required {
            self.report(DiagnosticKind::MissingMain, decl.span, decl.name.clone());
        }
        Ok(())
    }

    // ========================================================================
    // Type resolution
    // ========================================================================

    /// IR type of a source type, instantiating templates on first use.
    pub(crate) fn resolve_type(&mut self, ty: &TypeRef) -> IrResult<Option<TypeId>> {
        if ty.is_void() {
            return Ok(Some(self.core.void));
        }
        if let Some(alias) = self.enum_types.get(&ty.name) {
            if !ty.is_template() {
                return Ok(Some(*alias));
            }
        }
        if let Some(found) = self.lib.find_type(&ty.to_string(), true) {
            return Ok(Some(found));
        }
        if !ty.is_template() {
            return Ok(None);
        }
        self.instantiate(ty)
    }

    /// Like [`Self::resolve_type`], reporting unknown types. Unknown types
    /// continue as Void.
    pub(crate) fn require_type(&mut self, ty: &TypeRef, span: Span) -> IrResult<TypeId> {
        match self.resolve_type(ty)? {
            Some(id) => Ok(id),
            None => {
                self.report(DiagnosticKind::UnresolvedSymbol, span, ty.to_string());
                Ok(self.core.void)
            }
        }
    }

    fn instantiate(&mut self, ty: &TypeRef) -> IrResult<Option<TypeId>> {
        let Some(template) = self.lib.find_template_resolver(&ty.name) else {
            return Ok(None);
        };
        let Some(element_ref) = ty.type_arg(0).cloned() else {
            return Ok(None);
        };
        let Some(element) = self.resolve_type(&element_ref)? else {
            return Ok(None);
        };
        let name = ty.to_string();
        let id = match template {
            TemplateResolver::FixedArray => match ty.value_arg(1) {
                Some(length) if length > 0 => self.array_type(name, element, length as u32)?,
                _ => return Ok(None),
            },
            TemplateResolver::RuntimeArray => {
                let id = self.lib.add_type(name, TypeKind::RuntimeArray)?;
                let array = self.lib.type_mut(id)?;
                array.component_type = Some(element);
                array.parameters = vec![Operand::Type(element)];
                self.lib.add_dependent(element, id)?;
                id
            }
            TemplateResolver::InputStream(primitive) => {
                self.array_type(name, element, primitive.size())?
            }
            TemplateResolver::OutputStream(primitive) => {
                self.output_stream_type(ty, name, element, primitive)?
            }
        };
        log::trace!("instantiated template {}", self.lib.ty(id).name);
        Ok(Some(id))
    }

    pub(crate) fn array_type(
        &mut self,
        name: String,
        element: TypeId,
        length: u32,
    ) -> IrResult<TypeId> {
        let length_op = self.lib.constant(self.core.integer, vec![length])?;
        let non_copyable = self.lib.ty(element).non_copyable;
        let id = self.lib.add_type(name, TypeKind::FixedArray)?;
        let array = self.lib.type_mut(id)?;
        array.component_type = Some(element);
        array.component_count = length;
        array.parameters = vec![Operand::Type(element), Operand::Op(length_op)];
        array.non_copyable = non_copyable;
        self.lib.add_dependent(element, id)?;
        Ok(id)
    }

    /// Fixed array `name`, instantiated through the `FixedArray` template
    /// so every library agrees on the name.
    pub(crate) fn fixed_array(
        &mut self,
        element: &TypeRef,
        length: u32,
    ) -> IrResult<Option<TypeId>> {
        let array = TypeRef::template(
            "FixedArray",
            vec![TemplateArg::Type(element.clone()), TemplateArg::Value(i64::from(length))],
        );
        self.resolve_type(&array)
    }

    /// Output streams are opaque handles in source; in IR they are a small
    /// struct plus a placeholder `Append` that each composite specializes.
    fn output_stream_type(
        &mut self,
        ty: &TypeRef,
        name: String,
        vertex: TypeId,
        primitive: Primitive,
    ) -> IrResult<TypeId> {
        let integer = self.core.integer;
        let id = self.lib.add_type(name.clone(), TypeKind::Struct)?;
        self.lib
            .type_mut(id)?
            .add_member("Primitive", integer, Some(FieldKey::new("Primitive", "Integer")));
        self.lib.add_dependent(integer, id)?;

        let vertex_ref = ty.type_arg(0).cloned().unwrap_or_else(TypeRef::void);
        let tables = self.lib.resolvers_mut()?;
        tables.functions.insert(
            FunctionKey::new(
                ty.clone(),
                "Append",
                vec![vertex_ref.clone(), TypeRef::named("Integer")],
            ),
            InstructionResolver::Append,
        );
        tables.functions.insert(
            FunctionKey::new(ty.clone(), "Append", vec![vertex_ref]),
            InstructionResolver::Append,
        );
        tables.functions.insert(
            FunctionKey::new(ty.clone(), "RestartStrip", Vec::new()),
            InstructionResolver::RestartStrip,
        );

        let stream_ptr = self.pointer(id)?;
        let vertex_ptr = self.pointer(vertex)?;
        let integer_ptr = self.pointer(integer)?;
        let placeholder = self.lib.add_function(
            format!("{name}.Append"),
            self.core.void,
            vec![stream_ptr, vertex_ptr, integer_ptr],
        )?;
        let f = self.begin_function(placeholder, None)?;
        self.emit(&f, SpirvOp::Return, None, Vec::new())?;
        self.finish_function(f)?;
        self.lib.set_late_bound(id, placeholder)?;
        log::trace!("output stream {name} ({primitive:?}) with placeholder append");
        Ok(id)
    }

    pub(crate) fn pointer(&mut self, ty: TypeId) -> IrResult<TypeId> {
        self.lib.get_or_create_pointer_type(ty, StorageClass::Function)
    }

    /// Interned Integer constant.
    pub(crate) fn int_const(&mut self, value: u32) -> IrResult<tessera_ir::OpId> {
        self.lib.constant(self.core.integer, vec![value])
    }
}
