use std::collections::HashMap;

use tessera_core::{Attribute, Expr, FieldDecl, Stmt};
use tessera_ir::spirv::{
    BuiltIn, Capability, Decoration as SpirvDecoration, ExecutionModel, Op as SpirvOp,
};
use tessera_ir::{
    Decoration, DecorationTarget, FragmentType, FunctionId, Library, LibraryId, Op, OpId, Operand,
    TypeId,
};

use super::*;
use crate::settings::Settings;
use crate::test_utils::{
    build_composite, entry_class, pass_through, stage_type, translate_classes, ty,
};

fn collect(lib: &Library, entry: TypeId) -> CollectedModule {
    let info = lib.entry_point(entry).unwrap();
    let rewrite = LateBoundRewrite::from_entry_points(lib, [info]).unwrap();
    let mut collector = TypeDependencyCollector::new(lib, &rewrite);
    collector.collect_entry_point(info);
    collector.collect_reserved_spec_constants();
    collector.finish().unwrap()
}

fn pixel_of_pass_through() -> (Library, TypeId) {
    let (fragments, def) = pass_through();
    let (lib, shader) = build_composite(fragments, &def, &Settings::default());
    let pixel = stage_type(&lib, &shader, FragmentType::Pixel);
    (lib, pixel)
}

#[test]
fn declarations_never_reference_forward() {
    let (lib, pixel) = pixel_of_pass_through();
    let collected = collect(&lib, pixel);

    let position: HashMap<Declaration, usize> =
        collected.declarations.iter().enumerate().map(|(i, d)| (*d, i)).collect();
    let position_of_op = |op: OpId| {
        position
            .get(&Declaration::Constant(op))
            .or_else(|| position.get(&Declaration::Global(op)))
            .copied()
    };

    for (index, declaration) in collected.declarations.iter().enumerate() {
        let (result_type, operands) = match declaration {
            Declaration::Type(ty) => (None, &lib.ty(*ty).parameters),
            Declaration::Constant(op) | Declaration::Global(op) => {
                let op = lib.op(*op);
                (op.result_type, &op.operands)
            }
        };
        if let Some(result_type) = result_type {
            assert!(position[&Declaration::Type(result_type)] < index, "{declaration:?}");
        }
        for operand in operands {
            match operand {
                Operand::Type(ty) => {
                    assert!(position[&Declaration::Type(*ty)] < index, "{declaration:?}")
                }
                Operand::Op(op) => assert!(position_of_op(*op).unwrap() < index, "{declaration:?}"),
                _ => {}
            }
        }
    }
}

#[test]
fn collection_is_deterministic() {
    let (lib, pixel) = pixel_of_pass_through();
    let first = collect(&lib, pixel);
    let second = collect(&lib, pixel);

    assert_eq!(first.declarations, second.declarations);
    assert_eq!(first.functions, second.functions);
    assert_eq!(first.decorations, second.decorations);
    assert_eq!(first.capabilities, [Capability::Shader]);
}

#[test]
fn vector_spec_constant_gets_one_id_per_component() {
    let tinted = entry_class(
        "Tinted",
        Attribute::new("Pixel"),
        vec![Stmt::var(
            "t",
            ty("Real3"),
            Some(Expr::type_name(ty("Tinted")).field("Tint", ty("Real3"))),
        )],
    )
    .with_field(
        FieldDecl::new("Tint", ty("Real3"))
            .with_attribute(Attribute::new("SpecConstant"))
            .with_initializer(Expr::construct(
                ty("Real3"),
                vec![Expr::real(1.0), Expr::real(0.5), Expr::real(0.25)],
            ))
            .make_static(),
    );
    let (lib, diag) = translate_classes(vec![tinted], &Settings::default());
    assert!(!diag.has_errors(), "{}", diag.render());

    let entry = lib.find_type("Tinted", false).unwrap();
    let collected = collect(&lib, entry);
    let ids: Vec<u32> = collected.spec_ids.values().copied().collect();
    assert_eq!(ids, [1, 2, 3, 4, 5]);

    let spec_ids: Vec<u32> = collected
        .decorations
        .iter()
        .filter(|d| d.decoration == SpirvDecoration::SpecId)
        .map(|d| d.operands[0])
        .collect();
    assert_eq!(spec_ids, ids);

    let reflection = SpecializationReflection::gather(&lib, &collected.spec_ids);
    let tint = reflection.get("Tinted_Tint").unwrap();
    assert_eq!(tint.ids, [1, 2, 3]);
    assert_eq!(tint.defaults, [1.0f32.to_bits(), 0.5f32.to_bits(), 0.25f32.to_bits()]);
    assert_eq!(reflection.spec_id("LanguageId"), Some(4));
    assert_eq!(reflection.spec_id("LanguageVersion"), Some(5));
    assert_eq!(reflection.overrides("Tinted_Tint", &[7, 8]), None);
    assert_eq!(
        reflection.overrides("Tinted_Tint", &[7, 8, 9]).unwrap().into_iter().collect::<Vec<_>>(),
        [(1, 7), (2, 8), (3, 9)]
    );
}

#[test]
fn sampled_images_are_bound_in_order() {
    let sample = tessera_core::FunctionKey::new(
        ty("Shader"),
        "Sample",
        vec![ty("SampledImage2d"), ty("Real2")],
    );
    let lit = entry_class(
        "Lit",
        Attribute::new("Pixel"),
        vec![Stmt::var(
            "c",
            ty("Real4"),
            Some(Expr::static_call(
                sample,
                vec![
                    Expr::this(ty("Lit")).field("Albedo", ty("SampledImage2d")),
                    Expr::construct(ty("Real2"), vec![Expr::real(0.5), Expr::real(0.5)]),
                ],
                ty("Real4"),
            )),
        )],
    )
    .with_field(FieldDecl::new("Albedo", ty("SampledImage2d")));
    let (lib, diag) = translate_classes(vec![lit], &Settings::default());
    assert!(!diag.has_errors(), "{}", diag.render());

    let entry = lib.find_type("Lit", false).unwrap();
    let collected = collect(&lib, entry);
    assert_eq!(collected.resources.len(), 1);
    assert_eq!(collected.resources[0].name, "Lit_Albedo");
    assert_eq!(collected.resources[0].binding, 0);
    assert_eq!(collected.resources[0].descriptor_set, 0);
}

// ============================================================================
// Capabilities
// ============================================================================

#[test]
fn capabilities_of_opcodes_and_models() {
    assert_eq!(capabilities::for_opcode(SpirvOp::DPdxFine), Some(Capability::DerivativeControl));
    assert_eq!(capabilities::for_opcode(SpirvOp::ImageQuerySizeLod), Some(Capability::ImageQuery));
    assert_eq!(capabilities::for_opcode(SpirvOp::EmitVertex), Some(Capability::Geometry));
    assert_eq!(capabilities::for_opcode(SpirvOp::FAdd), None);

    assert_eq!(
        capabilities::for_execution_model(ExecutionModel::Geometry),
        Some(Capability::Geometry)
    );
    assert_eq!(
        capabilities::for_execution_model(ExecutionModel::TessellationControl),
        Some(Capability::Tessellation)
    );
    assert_eq!(capabilities::for_execution_model(ExecutionModel::Fragment), None);
}

#[test]
fn capabilities_of_built_ins() {
    let built_in = |value: BuiltIn| Decoration {
        target: DecorationTarget::Op(OpId::new(LibraryId::next(), 0)),
        member: None,
        decoration: SpirvDecoration::BuiltIn,
        operands: vec![value as u32],
    };
    assert_eq!(capabilities::for_decoration(&built_in(BuiltIn::Layer)), Some(Capability::Geometry));
    assert_eq!(
        capabilities::for_decoration(&built_in(BuiltIn::SampleId)),
        Some(Capability::SampleRateShading)
    );
    assert_eq!(
        capabilities::for_decoration(&built_in(BuiltIn::ClipDistance)),
        Some(Capability::ClipDistance)
    );
    assert_eq!(capabilities::for_decoration(&built_in(BuiltIn::Position)), None);

    let mut location = built_in(BuiltIn::Layer);
    location.decoration = SpirvDecoration::Location;
    assert_eq!(capabilities::for_decoration(&location), None);
}

// ============================================================================
// Late-bound rewrite
// ============================================================================

#[test]
fn rewrite_substitutes_call_targets_only() {
    let library = LibraryId::next();
    let placeholder = FunctionId::new(library, 0);
    let specialized = FunctionId::new(library, 1);
    let mut rewrite = LateBoundRewrite::new();
    assert!(rewrite.is_empty());
    rewrite.insert(placeholder, specialized);
    assert_eq!(rewrite.len(), 1);
    assert_eq!(rewrite.resolve(placeholder), specialized);
    assert_eq!(rewrite.resolve(specialized), specialized);

    let call = Op {
        id: OpId::new(library, 0),
        opcode: SpirvOp::FunctionCall,
        result_type: Some(TypeId::new(library, 0)),
        operands: vec![Operand::Function(placeholder), Operand::Op(OpId::new(library, 1))],
        debug_name: None,
    };
    let rewritten = rewrite.rewrite_op(&call);
    assert!(matches!(rewritten, std::borrow::Cow::Owned(_)));
    assert_eq!(rewritten.operands[0], Operand::Function(specialized));
    assert_eq!(rewritten.operands[1], call.operands[1]);

    let other = Op {
        opcode: SpirvOp::Store,
        operands: vec![Operand::Op(OpId::new(library, 1)), Operand::Op(OpId::new(library, 2))],
        result_type: None,
        ..call.clone()
    };
    assert!(matches!(rewrite.rewrite_op(&other), std::borrow::Cow::Borrowed(_)));
}
