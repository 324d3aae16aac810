use tessera_core::{Attribute, AttributeValue, ClassDecl, FieldDecl, FunctionDecl};

use super::*;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::settings::Settings;
use crate::test_utils::{named, plain, project, ty};

fn validate(classes: impl IntoIterator<Item = ClassDecl>) -> Diagnostics {
    let mut diag = Diagnostics::new();
    validate_attributes(&project(classes), &Settings::default(), &mut diag);
    diag
}

fn int(value: i64) -> AttributeValue {
    AttributeValue::Int(value)
}

#[test]
fn well_formed_fragment_is_clean() {
    let class = ClassDecl::new("Lit")
        .with_attribute(Attribute::new("Pixel"))
        .with_field(plain("Color", "Real4", "StageInput"))
        .with_field(
            FieldDecl::new("Gain", ty("Real"))
                .make_static()
                .with_attribute(Attribute::new("SpecConstant")),
        )
        .with_function(FunctionDecl::new("Main").with_attribute(Attribute::new("EntryPoint")));
    assert!(validate([class]).is_empty());
}

#[test]
fn two_stage_attributes_conflict() {
    let class = ClassDecl::new("Both")
        .with_attribute(Attribute::new("Vertex"))
        .with_attribute(Attribute::new("Pixel"));
    let diag = validate([class]);

    assert_eq!(diag.len(), 1);
    insta::assert_snapshot!(
        diag.render(),
        @"error at 0..0: conflicting attributes: `Pixel` conflicts with `Vertex` (related: `Vertex` declared here at 0..0)"
    );
}

#[test]
fn geometry_needs_max_vertices() {
    let missing = ClassDecl::new("Spray").with_attribute(Attribute::new("Geometry"));
    assert!(validate([missing]).contains(DiagnosticKind::InvalidAttribute));

    let six = AttributeValue::String("6".into());
    let wrong_kind = ClassDecl::new("Spray")
        .with_attribute(Attribute::new("Geometry").with_param("maxVertices", six));
    assert!(validate([wrong_kind]).contains(DiagnosticKind::InvalidAttribute));

    let positional = ClassDecl::new("Spray")
        .with_attribute(Attribute::new("Geometry").with_positional(int(6)));
    assert!(validate([positional]).is_empty());
}

#[test]
fn compute_local_size_limits() {
    let deep = ClassDecl::new("Blur").with_attribute(
        Attribute::new("Compute")
            .with_param("localSizeX", int(8))
            .with_param("localSizeZ", int(65)),
    );
    let diag = validate([deep]);
    assert!(diag.contains(DiagnosticKind::AttributeOutOfRange));
    insta::assert_snapshot!(
        diag.render(),
        @"error at 0..0: attribute parameter out of range: `localSizeZ` must be between 1 and 64, found 65"
    );

    let zero =
        ClassDecl::new("Blur").with_attribute(Attribute::new("Compute").with_positional(int(0)));
    assert!(validate([zero]).contains(DiagnosticKind::AttributeOutOfRange));
}

#[test]
fn spec_constant_must_be_static_scalar_or_vector() {
    let instance = ClassDecl::new("Knobs").with_field(plain("Gain", "Real", "SpecConstant"));
    assert!(validate([instance]).contains(DiagnosticKind::InvalidSpecConstant));

    let matrix = ClassDecl::new("Knobs").with_field(
        FieldDecl::new("Basis", ty("Real3x3"))
            .make_static()
            .with_attribute(Attribute::new("SpecConstant")),
    );
    assert!(validate([matrix]).contains(DiagnosticKind::InvalidSpecConstant));

    let vector = ClassDecl::new("Knobs").with_field(
        FieldDecl::new("Tint", ty("Integer3"))
            .make_static()
            .with_attribute(Attribute::new("SpecConstant")),
    );
    assert!(validate([vector]).is_empty());
}

#[test]
fn hardware_built_ins_must_exist() {
    let class = ClassDecl::new("Paint")
        .with_attribute(Attribute::new("Vertex"))
        .with_field(plain("Position", "Real4", "HardwareBuiltInOutput"))
        .with_field(plain("Wobble", "Real", "HardwareBuiltInInput"));
    let diag = validate([class]);

    assert_eq!(diag.len(), 1);
    insta::assert_snapshot!(
        diag.render(),
        @"error at 0..0: `Wobble : Real` is not a hardware built-in of any stage"
    );
}

#[test]
fn renamed_built_in_is_looked_up_by_link_name() {
    let class = ClassDecl::new("Paint").with_field(
        FieldDecl::new("ClipPosition", ty("Real4"))
            .with_attribute(named("HardwareBuiltInOutput", "Position")),
    );
    assert!(validate([class]).is_empty());
}

#[test]
fn link_name_must_be_a_string() {
    let class = ClassDecl::new("Paint").with_field(
        FieldDecl::new("Color", ty("Real4"))
            .with_attribute(Attribute::new("StageOutput").with_param("name", int(3))),
    );
    assert!(validate([class]).contains(DiagnosticKind::InvalidAttribute));
}

#[test]
fn misplaced_attributes_are_warnings() {
    let class = ClassDecl::new("Helper")
        .with_field(plain("Scale", "Real", "Pixel"))
        .with_function(FunctionDecl::new("Run").with_attribute(Attribute::new("EntryPoint")));
    let diag = validate([class]);

    assert_eq!(diag.warning_count(), 2);
    assert!(!diag.has_errors());
    assert!(diag.contains(DiagnosticKind::IgnoredAttribute));
}
