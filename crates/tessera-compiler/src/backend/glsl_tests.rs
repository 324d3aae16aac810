use indoc::indoc;
use tessera_ir::FragmentType;

use super::glsl::suffix_uniform_blocks;
use super::*;
use crate::emit::{EmittedModule, emit};
use crate::settings::Settings;
use crate::test_utils::{build_composite, pass_through, stage_type};

fn stage_module(stage: FragmentType) -> EmittedModule {
    let (fragments, def) = pass_through();
    let (lib, shader) = build_composite(fragments, &def, &Settings::default());
    emit(&lib, &[stage_type(&lib, &shader, stage)]).unwrap()
}

fn stage_bytes(stage: FragmentType) -> Vec<u8> {
    stage_module(stage).to_bytes()
}

#[test]
fn pixel_stage_to_glsl() {
    let output = GlslBackend::new()
        .translate(
            &stage_bytes(FragmentType::Pixel),
            FragmentType::Pixel,
            GlslVersion::Desktop(450),
        )
        .unwrap();

    assert!(output.source.starts_with("#version 450"), "{}", output.source);
    assert!(output.source.contains("void main()"));
    assert!(output.images.is_empty());
    assert!(output.samplers.is_empty());
}

#[test]
fn spec_constants_are_frozen_to_given_values() {
    let module = stage_module(FragmentType::Pixel);
    let language = module.specialization.spec_id("LanguageId").unwrap();

    let output = GlslBackend::new()
        .with_spec_constant(language, 3.0)
        .translate(&module.to_bytes(), FragmentType::Pixel, GlslVersion::Desktop(450))
        .unwrap();
    assert!(output.source.starts_with("#version 450"), "{}", output.source);
}

#[test]
fn unusable_spec_constant_value_is_reported() {
    let module = stage_module(FragmentType::Pixel);
    let language = module.specialization.spec_id("LanguageId").unwrap();

    let err = GlslBackend::new()
        .with_spec_constant(language, f64::INFINITY)
        .translate(&module.to_bytes(), FragmentType::Pixel, GlslVersion::Desktop(450))
        .unwrap_err();
    assert!(matches!(err, BackendError::SpecConstants(_)), "{err:?}");
}

#[test]
fn vertex_stage_to_glsl_es() {
    let output = GlslBackend::new()
        .translate(
            &stage_bytes(FragmentType::Vertex),
            FragmentType::Vertex,
            "310 es".parse().unwrap(),
        )
        .unwrap();
    assert!(output.source.starts_with("#version 310 es"), "{}", output.source);
    assert!(output.source.contains("gl_Position"));
}

#[test]
fn stage_must_match_an_entry_point() {
    let err = GlslBackend::new()
        .translate(&stage_bytes(FragmentType::Pixel), FragmentType::Vertex, GlslVersion::default())
        .unwrap_err();
    assert_eq!(err, BackendError::MissingEntryPoint("Vertex"));
}

#[test]
fn geometry_has_no_glsl_translation() {
    let err = GlslBackend::new()
        .translate(&[], FragmentType::Geometry, GlslVersion::default())
        .unwrap_err();
    assert_eq!(err, BackendError::UnsupportedStage("Geometry"));
}

#[test]
fn parse_versions() {
    assert_eq!("450".parse::<GlslVersion>().unwrap(), GlslVersion::Desktop(450));
    assert_eq!("300es".parse::<GlslVersion>().unwrap(), GlslVersion::Embedded(300));
    assert_eq!(GlslVersion::Embedded(310).to_string(), "310 es");
    assert_eq!(
        "latest".parse::<GlslVersion>().unwrap_err(),
        BackendError::UnknownVersion("latest".into())
    );
}

#[test]
fn uniform_blocks_get_stage_suffix() {
    let source = indoc! {"
        uniform highp sampler2D _group_0_binding_1_fs;
        layout(std140) uniform Material_block_0 { Material _group_0_binding_0_fs; };
        layout(std140) uniform Lights_block_1Fragment { Lights _group_0_binding_2_fs; };
        void main() {
            vec4 tint = _group_0_binding_0_fs.tint;
        }
    "};

    insta::assert_snapshot!(suffix_uniform_blocks(source, "Fragment"), @r"
    uniform highp sampler2D _group_0_binding_1_fs;
    layout(std140) uniform Material_block_0Fragment { Material _group_0_binding_0_fs; };
    layout(std140) uniform Lights_block_1Fragment { Lights _group_0_binding_2_fs; };
    void main() {
        vec4 tint = _group_0_binding_0_fs.tint;
    }
    ");
}
