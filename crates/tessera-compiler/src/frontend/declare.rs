//! Declare pass: struct members, globals, specialization constants and
//! function signatures.
//!
//! Every function of the project is declared before any body is walked, so
//! bodies reference each other freely.

use tessera_core::{AttributeList, FieldDecl, FieldKey, FunctionKey, Span, TypeRef};
use tessera_ir::spirv::StorageClass;
use tessera_ir::{FunctionId, FunctionMeta, TypeId};

use super::{ClassInfo, IrResult, Translator, pre_constructor_key};

/// What a declared function is, for naming and body lowering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Receiver {
    Instance,
    Static,
}

impl<'a> Translator<'a> {
    pub(super) fn declare(&mut self) -> IrResult<()> {
        let infos = self.class_infos();
        for info in &infos {
            for field in &info.decl.fields {
                self.declare_field(*info, field)?;
            }
        }
        for info in &infos {
            self.declare_functions(*info)?;
        }
        Ok(())
    }

    fn declare_field(&mut self, info: ClassInfo<'a>, field: &FieldDecl) -> IrResult<()> {
        let owner = info.type_ref();
        let ty = self.require_type(&field.ty, field.span)?;
        let global_name = format!("{}_{}", info.decl.name, field.name);

        if field.attributes.has_attribute(&self.names.fragment_shared) {
            let op = self.lib.find_or_add_fragment_shared(StorageClass::Private, ty, &field.name)?;
            return self.lib.map_field_global(&owner, &field.name, op);
        }

        if field.is_static {
            let spec = field.attributes.find_attribute(&self.names.spec_constant);
            let op = match spec {
                Some(attr) if self.is_spec_constant_type(ty) => {
                    let symbol = attr
                        .string_param(&self.names.name_param)
                        .map(str::to_string)
                        .unwrap_or_else(|| global_name.clone());
                    self.declare_spec_constant(&symbol, ty, field.initializer.as_ref())?
                }
                _ => self.lib.add_global(ty, StorageClass::Private, global_name, None)?,
            };
            return self.lib.map_field_global(&owner, &field.name, op);
        }

        if self.lib.ty(ty).non_copyable {
            let op = self.lib.add_global(ty, StorageClass::UniformConstant, global_name, None)?;
            return self.lib.map_field_global(&owner, &field.name, op);
        }

        let key = FieldKey::new(field.name.clone(), field.ty.to_string());
        self.lib.type_mut(info.ty)?.add_member(field.name.clone(), ty, Some(key));
        self.lib.add_dependent(ty, info.ty)
    }

    pub(super) fn is_spec_constant_type(&self, ty: TypeId) -> bool {
        let ty = self.lib.ty(ty);
        ty.is_scalar() || (ty.kind == tessera_ir::TypeKind::Vector)
    }

    fn declare_functions(&mut self, info: ClassInfo<'a>) -> IrResult<()> {
        let owner = info.type_ref();
        let decl = info.decl;

        let void = TypeRef::void();
        let pre_constructor = pre_constructor_key(&owner);
        self.declare_function(info, pre_constructor, &[], &void, Receiver::Instance, decl.span)?;

        for ctor in &decl.constructors {
            let params: Vec<TypeRef> = ctor.params.iter().map(|p| p.ty.clone()).collect();
            let key = ctor.key(&owner);
            let id =
                self.declare_function(info, key, &params, &void, Receiver::Instance, ctor.span)?;
            self.set_meta(id, ctor.key(&owner), &ctor.attributes, ctor.span)?;
        }

        for property in &decl.properties {
            let receiver = if property.is_static { Receiver::Static } else { Receiver::Instance };
            if property.get.is_some() {
                let key = FunctionKey::getter(&owner, &property.name);
                let id = self.declare_function(
                    info,
                    key.clone(),
                    &[],
                    &property.ty,
                    receiver,
                    property.span,
                )?;
                self.set_meta(id, key, &property.attributes, property.span)?;
            }
            if property.set.is_some() {
                let key = FunctionKey::setter(&owner, &property.name, &property.ty);
                let params = [property.ty.clone()];
                let id = self.declare_function(
                    info,
                    key.clone(),
                    &params,
                    &void,
                    receiver,
                    property.span,
                )?;
                self.set_meta(id, key, &property.attributes, property.span)?;
            }
        }

        for function in &decl.functions {
            let receiver = if function.is_static { Receiver::Static } else { Receiver::Instance };
            let params: Vec<TypeRef> = function.params.iter().map(|p| p.ty.clone()).collect();
            let key = function.key(&owner);
            let id = self.declare_function(
                info,
                key.clone(),
                &params,
                &function.return_type,
                receiver,
                function.span,
            )?;
            self.set_meta(id, key, &function.attributes, function.span)?;
        }
        Ok(())
    }

    /// Declares a function named `Owner.Name`. Instance functions take a
    /// pointer to the receiver first; copyable parameters are passed by
    /// pointer, opaque handles by value.
    fn declare_function(
        &mut self,
        info: ClassInfo<'a>,
        key: FunctionKey,
        params: &[TypeRef],
        return_type: &TypeRef,
        receiver: Receiver,
        span: Span,
    ) -> IrResult<FunctionId> {
        let mut param_types = Vec::with_capacity(params.len() + 1);
        if receiver == Receiver::Instance {
            param_types.push(self.pointer(info.ty)?);
        }
        for param in params {
            let ty = self.require_type(param, span)?;
            if self.lib.ty(ty).non_copyable {
                param_types.push(ty);
            } else {
                param_types.push(self.pointer(ty)?);
            }
        }
        let ret = self.require_type(return_type, span)?;
        let name = format!("{}.{}", info.decl.name, key.name);
        let id = self.lib.add_function(name, ret, param_types)?;
        self.lib.map_function(key, id)?;
        Ok(id)
    }

    fn set_meta(
        &mut self,
        id: FunctionId,
        key: FunctionKey,
        attributes: &[tessera_core::Attribute],
        span: Span,
    ) -> IrResult<()> {
        self.lib.set_function_meta(
            id,
            FunctionMeta {
                key,
                attributes: attributes.to_vec(),
                span,
            },
        )
    }
}
