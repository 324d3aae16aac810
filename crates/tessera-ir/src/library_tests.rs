use std::sync::Arc;

use tessera_core::{BinaryOp, FieldKey, FunctionKey, TypeRef};

use crate::resolvers::{BinaryOperatorKey, TypeResolvers};
use crate::spirv::{Op as SpirvOp, StorageClass};
use crate::{
    DecorationTarget, InstructionResolver, IrError, Library, Module, Operand, SpecConstantKey,
    TypeKind,
};

fn base_library() -> Library {
    let mut lib = Library::new("base", Module::default()).unwrap();
    let real = lib.add_type("Real", TypeKind::Float).unwrap();
    lib.type_mut(real).unwrap().parameters = vec![Operand::Literal(32)];
    let real4 = lib.add_type("Real4", TypeKind::Vector).unwrap();
    {
        let ty = lib.type_mut(real4).unwrap();
        ty.component_type = Some(real);
        ty.component_count = 4;
        ty.parameters = vec![Operand::Type(real), Operand::Literal(4)];
    }
    lib.add_type("Void", TypeKind::Void).unwrap();
    lib
}

#[test]
fn value_types_get_function_pointer() {
    let lib = base_library();
    let real4 = lib.find_type("Real4", false).unwrap();

    let ptr = lib.ty(real4).pointer_type.unwrap();
    assert!(lib.ty(ptr).is_pointer());
    assert_eq!(lib.ty(ptr).storage_class, Some(StorageClass::Function));
    assert_eq!(lib.ty(ptr).value_type, Some(real4));
    assert_eq!(lib.find_pointer_type(real4, StorageClass::Function), Some(ptr));

    let void = lib.find_type("Void", false).unwrap();
    assert_eq!(lib.ty(void).pointer_type, None);
}

#[test]
fn pointer_value_duality_per_storage_class() {
    let mut lib = base_library();
    let real4 = lib.find_type("Real4", false).unwrap();

    for sc in [
        StorageClass::Function,
        StorageClass::Input,
        StorageClass::Output,
        StorageClass::Uniform,
        StorageClass::Private,
    ] {
        let ptr = lib.get_or_create_pointer_type(real4, sc).unwrap();
        assert_eq!(lib.ty(ptr).value_type, Some(real4));
        assert_eq!(lib.find_pointer_type(real4, sc), Some(ptr));
        // asking again yields the same type
        assert_eq!(lib.get_or_create_pointer_type(real4, sc).unwrap(), ptr);
    }
}

#[test]
fn pointer_types_resolve_through_dependencies() {
    let mut base = base_library();
    let real4 = base.find_type("Real4", false).unwrap();
    let input = base.get_or_create_pointer_type(real4, StorageClass::Input).unwrap();
    base.lock();

    let mut user = Library::new("user", Module::new([Arc::new(base)])).unwrap();
    assert_eq!(user.find_type("Real4", true), Some(real4));
    assert_eq!(user.find_type("Real4", false), None);
    assert_eq!(user.get_or_create_pointer_type(real4, StorageClass::Input).unwrap(), input);

    let output = user.get_or_create_pointer_type(real4, StorageClass::Output).unwrap();
    assert_eq!(output.library, user.id());
    assert_eq!(user.ty(output).value_type, Some(real4));
}

#[test]
fn locked_library_rejects_mutation() {
    let mut lib = base_library();
    lib.lock();

    assert_eq!(
        lib.add_type("Real2", TypeKind::Vector),
        Err(IrError::LibraryLocked("base".into()))
    );
    assert!(matches!(
        lib.add_op(SpirvOp::Nop, None, Vec::new()),
        Err(IrError::LibraryLocked(_))
    ));
    assert!(lib.add_block().is_err());
}

#[test]
fn dependencies_must_be_translated() {
    let base = Arc::new(base_library());
    let err = Library::new("user", Module::new([base])).unwrap_err();
    assert_eq!(err, IrError::DependencyNotTranslated("base".into()));
}

#[test]
fn duplicate_type_names_are_rejected() {
    let mut lib = base_library();
    assert!(matches!(
        lib.add_type("Real4", TypeKind::Vector),
        Err(IrError::DuplicateType(..))
    ));
}

#[test]
fn constants_are_interned() {
    let mut lib = base_library();
    let real = lib.find_type("Real", false).unwrap();

    let a = lib.constant(real, vec![1.5f32.to_bits()]).unwrap();
    let b = lib.constant(real, vec![1.5f32.to_bits()]).unwrap();
    let c = lib.constant(real, vec![2.0f32.to_bits()]).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);

    let real4 = lib.find_type("Real4", false).unwrap();
    let v1 = lib.composite_constant(real4, vec![a, a, c, c]).unwrap();
    let v2 = lib.composite_constant(real4, vec![a, a, c, c]).unwrap();
    assert_eq!(v1, v2);
    assert_eq!(lib.op(v1).opcode, SpirvOp::ConstantComposite);
}

#[test]
fn bool_constants_use_true_false_ops() {
    let mut lib = base_library();
    let boolean = lib.add_type("Boolean", TypeKind::Bool).unwrap();

    let t = lib.constant(boolean, vec![1]).unwrap();
    let f = lib.constant(boolean, vec![0]).unwrap();
    assert_eq!(lib.op(t).opcode, SpirvOp::ConstantTrue);
    assert_eq!(lib.op(f).opcode, SpirvOp::ConstantFalse);
}

#[test]
fn struct_members_by_name_and_key() {
    let mut lib = base_library();
    let real4 = lib.find_type("Real4", false).unwrap();
    let tint = lib.add_type("Tint", TypeKind::Struct).unwrap();
    let ty = lib.type_mut(tint).unwrap();
    ty.add_member("Color", real4, Some(FieldKey::new("Albedo", "Real4")));
    ty.add_member("Gain", real4, None);

    let ty = lib.ty(tint);
    assert_eq!(ty.member_index("Gain"), Some(1));
    assert_eq!(ty.member_index_by_key(&FieldKey::new("Albedo", "Real4")), Some(0));
    assert_eq!(ty.parameters, vec![Operand::Type(real4), Operand::Type(real4)]);
}

#[test]
fn function_types_are_shared() {
    let mut lib = base_library();
    let void = lib.find_type("Void", false).unwrap();
    let real = lib.find_type("Real", false).unwrap();

    let f = lib.add_function("f", void, vec![real]).unwrap();
    let g = lib.add_function("g", void, vec![real]).unwrap();
    assert_eq!(lib.function(f).ty, lib.function(g).ty);
    assert_eq!(lib.ty(lib.function(f).ty).name, "(Real) -> Void");
    assert_eq!(lib.function(f).params.len(), 1);
}

#[test]
fn resolvers_cascade_local_first() {
    let mut base = base_library();
    let key = BinaryOperatorKey::new("Real".into(), "Real".into(), BinaryOp::Add);
    base.resolvers_mut()
        .unwrap()
        .binary
        .insert(key.clone(), InstructionResolver::Op(SpirvOp::FAdd));
    base.resolvers_mut().unwrap().types.insert(
        TypeRef::named("Real4"),
        TypeResolvers {
            field_backup: Some(InstructionResolver::Swizzle),
            ..TypeResolvers::default()
        },
    );
    base.lock();

    let mut user = Library::new("user", Module::new([Arc::new(base)])).unwrap();
    let real = TypeRef::named("Real");
    assert_eq!(
        user.find_binary_resolver(&real, &real, BinaryOp::Add),
        Some(&InstructionResolver::Op(SpirvOp::FAdd))
    );
    assert_eq!(
        user.find_field_resolver(&TypeRef::named("Real4"), "XYZ"),
        Some(&InstructionResolver::Swizzle)
    );

    user.resolvers_mut()
        .unwrap()
        .binary
        .insert(key, InstructionResolver::Unsupported("shadowed".into()));
    assert_eq!(
        user.find_binary_resolver(&real, &real, BinaryOp::Add),
        Some(&InstructionResolver::Unsupported("shadowed".into()))
    );
}

#[test]
fn functions_map_by_key() {
    let mut lib = base_library();
    let void = lib.find_type("Void", false).unwrap();
    let id = lib.add_function("Main", void, vec![]).unwrap();
    let key = FunctionKey::new("Tint", "Main", vec![]);
    lib.map_function(key.clone(), id).unwrap();

    assert_eq!(lib.find_function(&key), Some(id));
    assert_eq!(lib.function(id).key.as_ref(), Some(&key));
}

#[test]
fn globals_and_decorations() {
    let mut lib = base_library();
    let real4 = lib.find_type("Real4", false).unwrap();
    let global = lib.add_global(real4, StorageClass::Output, "Color", None).unwrap();
    lib.decorate(
        DecorationTarget::Op(global),
        crate::spirv::Decoration::Location,
        vec![0],
    )
    .unwrap();
    lib.decorate(
        DecorationTarget::Op(global),
        crate::spirv::Decoration::Location,
        vec![0],
    )
    .unwrap();

    assert_eq!(lib.globals(), &[global]);
    assert_eq!(lib.decorations_for(DecorationTarget::Op(global)).len(), 1);
    let ptr = lib.op(global).result_type.unwrap();
    assert_eq!(lib.ty(ptr).storage_class, Some(StorageClass::Output));
}

#[test]
fn fragment_shared_globals_are_unique() {
    let mut lib = base_library();
    let real = lib.find_type("Real", false).unwrap();
    let a = lib.find_or_add_fragment_shared(StorageClass::Private, real, "Shared").unwrap();
    let b = lib.find_or_add_fragment_shared(StorageClass::Private, real, "Shared").unwrap();
    let c = lib.find_or_add_fragment_shared(StorageClass::Private, real, "Other").unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
}

#[test]
fn spec_constant_keys_nest() {
    let mut lib = base_library();
    let real = lib.find_type("Real", false).unwrap();
    let root = SpecConstantKey::new("Tint_Gain");
    let child = root.child(2);
    let op = lib
        .add_op(SpirvOp::SpecConstant, Some(real), vec![Operand::Literal(0)])
        .unwrap();
    lib.add_spec_constant(child.clone(), op).unwrap();

    assert_eq!(child.path, vec![2]);
    assert_eq!(lib.find_spec_constant(&child), Some(op));
    assert_eq!(lib.find_spec_constant(&root), None);
}

#[test]
fn type_dependents_cascade() {
    let mut base = base_library();
    let real = base.find_type("Real", false).unwrap();
    let real4 = base.find_type("Real4", false).unwrap();
    base.add_dependent(real, real4).unwrap();
    base.lock();

    let mut user = Library::new("user", Module::new([Arc::new(base)])).unwrap();
    let tint = user.add_type("Tint", TypeKind::Struct).unwrap();
    user.add_dependent(real, tint).unwrap();

    assert_eq!(user.dependents(real), vec![tint, real4]);
}
