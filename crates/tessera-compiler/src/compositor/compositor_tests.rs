use std::sync::Arc;

use tessera_core::{Attribute, AttributeValue, ClassDecl, Expr, FieldKey, FunctionDecl};
use tessera_ir::{FragmentType, Library};

use super::*;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::settings::Settings;
use crate::test_utils::{
    field, fragment, module_of, named, plain, translate_classes, translate_project, ty,
};

fn transform() -> ClassDecl {
    fragment("Transform", "Vertex")
        .with_field(plain("LocalPosition", "Real3", "StageInput"))
        .with_field(plain("LocalToWorld", "Real4x4", "AppBuiltInInput"))
        .with_field(plain("Position", "Real4", "HardwareBuiltInOutput"))
        .with_field(plain("Uv", "Real2", "StageOutput"))
}

fn albedo() -> ClassDecl {
    fragment("Albedo", "Pixel")
        .with_field(plain("Uv", "Real2", "StageInput"))
        .with_field(plain("Tint", "Real4", "PropertyInput"))
        .with_field(plain("LocalNormal", "Real3", "Input"))
        .with_field(field("Color", "Real4", named("Output", "Target0")))
}

fn fog() -> ClassDecl {
    fragment("Fog", "Pixel")
        .with_field(field("Color", "Real4", named("FragmentInput", "Target0")))
        .with_field(plain("Density", "Real", "SpecConstantInput").with_initializer(Expr::real(0.5)))
        .with_field(field("Result", "Real4", named("StageOutput", "Target0")))
}

fn scene() -> ShaderDefinition {
    ShaderDefinition::new("Scene")
        .with_fragment("Transform")
        .with_fragment("Albedo")
        .with_fragment("Fog")
}

fn composite_with(
    settings: &Settings,
    lib: &Library,
    def: &ShaderDefinition) -> (Result<CompositeShader,
    CompositorError>, Diagnostics,
) {
    let mut diag = Diagnostics::new();
    let result = Compositor::new(settings, lib).composite(def, &mut diag);
    (result, diag)
}

fn composite(
    classes: Vec<ClassDecl>,
    def: &ShaderDefinition) -> (Result<CompositeShader,
    CompositorError>, Diagnostics,
) {
    let settings = Settings::default();
    let (lib, _) = translate_classes(classes, &settings);
    composite_with(&settings, &lib, def)
}

#[test]
fn vertex_stage_threads_stage_fields() {
    let (result, diag) = composite(vec![transform(), albedo(), fog()], &scene());
    let shader = result.unwrap();
    assert!(diag.is_empty());
    assert_eq!(
        shader.stages.iter().map(|s| s.class_name.as_str()).collect::<Vec<_>>(),
        ["Scene_Vertex", "Scene_Pixel"]
    );

    let vertex = shader.stage(FragmentType::Vertex).unwrap();
    insta::assert_snapshot!(vertex.source_text, @r#"
    [Vertex]
    struct Scene_Vertex
    {
      [StageOutput(name : "Uv", location : 0)] var Stage_Uv_Real2 : Real2;
      [StageOutput(name : "LocalNormal", location : 1)][StageInput(name : "LocalNormal")] var Stage_LocalNormal_Real3 : Real3;
      [StageInput(name : "LocalPosition")] var Stage_LocalPosition_Real3 : Real3;
      [AppBuiltInInput(name : "LocalToWorld")] var LocalToWorld : Real4x4;
      [HardwareBuiltInOutput(name : "Position")] var Position : Real4;

      [EntryPoint]
      function Main()
      {
        var transform = Transform();
        transform.LocalPosition = this.Stage_LocalPosition_Real3;
        transform.LocalToWorld = this.LocalToWorld;
        transform.Main();
        this.Position = transform.Position;
        this.Stage_Uv_Real2 = transform.Uv;
      }
    }
    "#);
}

#[test]
fn pixel_stage_chains_fragments() {
    let (result, _) = composite(vec![transform(), albedo(), fog()], &scene());
    let shader = result.unwrap();

    let pixel = shader.stage(FragmentType::Pixel).unwrap();
    insta::assert_snapshot!(pixel.source_text, @r#"
    [Pixel]
    struct Scene_Pixel
    {
      [StageInput(name : "Uv", location : 0)] var Stage_Uv_Real2 : Real2;
      [StageInput(name : "LocalNormal", location : 1)] var Stage_LocalNormal_Real3 : Real3;
      [PropertyInput] var Albedo_Tint : Real4;
      [Static][SpecConstant(name : "Fog_Density")] var Fog_Density : Real = 0.5;
      [StageOutput(name : "Target0")] var Stage_Target0_Real4 : Real4;

      [EntryPoint]
      function Main()
      {
        var albedo = Albedo();
        albedo.Uv = this.Stage_Uv_Real2;
        albedo.Tint = this.Albedo_Tint;
        albedo.LocalNormal = this.Stage_LocalNormal_Real3;
        albedo.Main();
        var fog = Fog();
        fog.Color = albedo.Color;
        fog.Density = Scene_Pixel.Fog_Density;
        fog.Main();
        this.Stage_Target0_Real4 = fog.Result;
      }
    }
    "#);
}

#[test]
fn descriptions_record_every_link() {
    let (result, _) = composite(vec![transform(), albedo(), fog()], &scene());
    let shader = result.unwrap();
    let pixel = shader.stage(FragmentType::Pixel).unwrap();

    let albedo = pixel.fragment("Albedo").unwrap();
    let linked: Vec<_> = albedo.fields.iter().map(|f| (f.field.as_str(), f.linked)).collect();
    assert_eq!(
        linked,
        [
            ("Uv", LinkedFieldType::Stage),
            ("Tint", LinkedFieldType::Property),
            ("LocalNormal", LinkedFieldType::Stage),
        ]
    );
    assert_eq!(albedo.fields[0].dependency.as_deref(), Some("Transform.Uv"));
    assert_eq!(albedo.fields[2].dependency.as_deref(), Some("LocalNormal"));
    assert_eq!(albedo.fields[1].property_name.as_deref(), Some("Albedo_Tint"));

    let fog = pixel.fragment("Fog").unwrap();
    assert_eq!(
        fog.fields[0],
        FieldDescription {
            field: "Color".into(),
            ty: "Real4".into(),
            linked: LinkedFieldType::Fragment,
            dependency: Some("Albedo.Color".into()),
            property_name: None,
        }
    );
    assert_eq!(fog.fields[1].linked, LinkedFieldType::SpecConstant);
    assert_eq!(fog.fields[1].property_name.as_deref(), Some("Fog_Density"));

    let json = serde_json::to_value(pixel).unwrap();
    assert_eq!(json["class_name"], "Scene_Pixel");
    assert_eq!(json["fragment_descriptions"][1]["fields"][0]["linked"], "Fragment");
}

#[test]
fn same_property_name_in_two_fragments_stays_distinct() {
    let tinted = |name: &str| {
        fragment(name, "Pixel")
            .with_field(plain("Tint", "Real4", "PropertyInput"))
            .with_field(field("Color", "Real4", named("StageOutput", "Target0")))
    };
    let def = ShaderDefinition::new("Layers")
        .with_fragment("Transform")
        .with_fragment("A")
        .with_fragment("B");
    let (result, _) = composite(vec![transform(), tinted("A"), tinted("B")], &def);
    let shader = result.unwrap();
    let pixel = shader.stage(FragmentType::Pixel).unwrap();

    let text = &pixel.source_text;
    assert!(text.contains("[PropertyInput] var A_Tint : Real4;"), "{text}");
    assert!(text.contains("[PropertyInput] var B_Tint : Real4;"), "{text}");
    let a = &pixel.fragment("A").unwrap().fields[0];
    let b = &pixel.fragment("B").unwrap().fields[0];
    assert_eq!(a.property_name.as_deref(), Some("A_Tint"));
    assert_eq!(b.property_name.as_deref(), Some("B_Tint"));
}

#[test]
fn repeated_composites_are_identical() {
    let settings = Settings::default();
    let (lib, _) = translate_classes(vec![transform(), albedo(), fog()], &settings);
    let (first, _) = composite_with(&settings, &lib, &scene());
    let (second, _) = composite_with(&settings, &lib, &scene());
    let (first, second) = (first.unwrap(), second.unwrap());

    for (a, b) in first.stages.iter().zip(&second.stages) {
        assert_eq!(a.source_text, b.source_text);
        assert_eq!(serde_json::to_value(a).unwrap(), serde_json::to_value(b).unwrap());
    }
    assert_eq!(first.stages.len(), second.stages.len());
}

#[test]
fn composite_translates_against_fragments() {
    let settings = Settings::default();
    let (lib, _) = translate_classes(vec![transform(), albedo(), fog()], &settings);
    let (result, _) = composite_with(&settings, &lib, &scene());
    let shader = result.unwrap();

    let (composite, diag) = translate_project(&shader.project(), &settings, &module_of(lib));
    assert!(!diag.has_errors(), "{}", diag.render());
    let mut entry_points: Vec<_> = composite
        .entry_points()
        .map(|(_, info)| info.fragment_type)
        .collect();
    entry_points.sort();
    assert_eq!(entry_points, [FragmentType::Vertex, FragmentType::Pixel]);
}

#[test]
fn vertex_stage_requires_position() {
    let vertex = fragment("Flat", "Vertex").with_field(plain("Uv", "Real2", "StageOutput"));
    let def = ShaderDefinition::new("Flat").with_fragment("Flat");
    let (result, diag) = composite(vec![vertex], &def);

    assert_eq!(
        result.unwrap_err(),
        CompositorError::MissingRequiredOutput {
            stage: "Vertex",
            field: "Position : Real4".into(),
        }
    );
    assert!(diag.contains(DiagnosticKind::MissingRequiredOutput));
}

#[test]
fn callback_can_supply_position() {
    let mut settings = Settings::default();
    settings.callbacks.composite = Some(Arc::new(|data: &mut CompositorCallbackData<'_>| {
        if data.stage() == FragmentType::Vertex {
            data.add_hardware_output(FieldKey::new("Position", "Real4"));
        }
    }));
    let vertex = fragment("Flat", "Vertex").with_field(plain("Uv", "Real2", "StageOutput"));
    let (lib, _) = translate_classes(vec![vertex], &settings);
    let def = ShaderDefinition::new("Flat").with_fragment("Flat");
    let (result, _) = composite_with(&settings, &lib, &def);

    let shader = result.unwrap();
    let vertex = shader.stage(FragmentType::Vertex).unwrap();
    assert!(
        vertex
            .source_text
            .contains(r#"[HardwareBuiltInOutput(name : "Position")] var Position : Real4;"#)
    );
}

#[test]
fn composite_needs_vertex_fragment() {
    let pixel = fragment("Solid", "Pixel")
        .with_field(field("Color", "Real4", named("StageOutput", "Target0")));
    let def = ShaderDefinition::new("Solid").with_fragment("Solid");
    let (result, diag) = composite(vec![pixel], &def);

    assert_eq!(result.unwrap_err(), CompositorError::MissingStage("Vertex"));
    assert!(diag.contains(DiagnosticKind::MissingStage));
}

#[test]
fn unknown_fragment() {
    let def = ShaderDefinition::new("Nothing").with_fragment("Missing");
    let (result, _) = composite(vec![transform()], &def);
    assert_eq!(result.unwrap_err(), CompositorError::UnknownFragment("Missing".into()));
}

#[test]
fn fragment_without_main() {
    let vertex = ClassDecl::new("Headless")
        .with_attribute(Attribute::new("Vertex"))
        .with_field(plain("Position", "Real4", "HardwareBuiltInOutput"));
    let def = ShaderDefinition::new("Headless").with_fragment("Headless");
    let (result, diag) = composite(vec![vertex], &def);

    assert_eq!(result.unwrap_err(), CompositorError::MissingMain("Headless".into()));
    assert!(diag.contains(DiagnosticKind::MissingFragmentMain));
}

#[test]
fn unresolved_hardware_input_is_fatal() {
    let pixel =
        fragment("Odd", "Pixel").with_field(plain("Barycentric", "Real3", "HardwareBuiltInInput"));
    let def = ShaderDefinition::new("Odd").with_fragment("Transform").with_fragment("Odd");
    let (result, diag) = composite(vec![transform(), pixel], &def);

    assert_eq!(
        result.unwrap_err(),
        CompositorError::UnresolvedInput {
            fragment: "Odd".into(),
            field: "Barycentric".into(),
            stage: "Pixel",
        }
    );
    assert!(diag.contains(DiagnosticKind::UnresolvedFieldInput));
}

#[test]
fn built_in_with_wrong_type() {
    let pixel =
        fragment("Coords", "Pixel").with_field(plain("FragCoord", "Real2", "HardwareBuiltInInput"));
    let def = ShaderDefinition::new("Coords").with_fragment("Transform").with_fragment("Coords");
    let (result, diag) = composite(vec![transform(), pixel], &def);

    assert_eq!(
        result.unwrap_err(),
        CompositorError::IncompatibleBuiltIn {
            fragment: "Coords".into(),
            field: "FragCoord".into(),
        }
    );
    assert!(diag.contains(DiagnosticKind::DuplicateHardwareBuiltIn));
}

#[test]
fn unmatched_stage_input_keeps_default() {
    let pixel = fragment("Glow", "Pixel")
        .with_field(plain("Emissive", "Real4", "StageInput"))
        .with_field(field("Color", "Real4", named("StageOutput", "Target0")));
    let def = ShaderDefinition::new("Glow").with_fragment("Transform").with_fragment("Glow");
    let (result, _) = composite(vec![transform(), pixel], &def);

    let shader = result.unwrap();
    let glow = shader.stage(FragmentType::Pixel).unwrap().fragment("Glow").unwrap();
    assert_eq!(glow.fields[0].linked, LinkedFieldType::None);
    assert!(!shader.stage(FragmentType::Pixel).unwrap().source_text.contains("Emissive"));
}

#[test]
fn disabled_stage_is_rejected() {
    let mut settings = Settings::default();
    settings.capabilities.remove(tessera_ir::ShaderStages::GEOMETRY);
    let (lib, _) = translate_classes(geometry_classes(), &settings);
    let (result, diag) = composite_with(&settings, &lib, &geometry_scene());

    assert_eq!(result.unwrap_err(), CompositorError::UnsupportedStage("Geometry"));
    assert!(diag.contains(DiagnosticKind::UnsupportedStage));
}

// ============================================================================
// Geometry
// ============================================================================

fn geometry_classes() -> Vec<ClassDecl> {
    let expand_in = ClassDecl::new("ExpandIn")
        .with_field(plain("Uv", "Real2", "StageInput"))
        .with_field(plain("Position", "Real4", "HardwareBuiltInInput"));
    let expand_out = ClassDecl::new("ExpandOut")
        .with_field(plain("Uv", "Real2", "StageOutput"))
        .with_field(plain("Position", "Real4", "HardwareBuiltInOutput"));
    let expand = ClassDecl::new("Expand")
        .with_attribute(
            Attribute::new("Geometry").with_param("maxVertices", AttributeValue::Int(6)),
        )
        .with_function(
            FunctionDecl::new("Main")
                .with_param("input", ty("TriangleInput[ExpandIn]"))
                .with_param("output", ty("TriangleOutput[ExpandOut]")),
        );
    let shade = fragment("Shade", "Pixel")
        .with_field(plain("Uv", "Real2", "StageInput"))
        .with_field(field("Color", "Real4", named("StageOutput", "Target0")));
    vec![transform(), expand_in, expand_out, expand, shade]
}

fn geometry_scene() -> ShaderDefinition {
    ShaderDefinition::new("Sprites")
        .with_fragment("Transform")
        .with_fragment("Expand")
        .with_fragment("Shade")
}

#[test]
fn geometry_stage_wraps_streams() {
    let settings = Settings::default();
    let (lib, _) = translate_classes(geometry_classes(), &settings);
    let (result, _) = composite_with(&settings, &lib, &geometry_scene());
    let shader = result.unwrap();

    assert_eq!(shader.stages.len(), 3);
    let geometry = shader.stage(FragmentType::Geometry).unwrap();
    insta::assert_snapshot!(geometry.source_text, @r#"
    struct Sprites_GeoIn
    {
      [StageInput(name : "Uv", location : 0)] var Stage_Uv_Real2 : Real2;
      [HardwareBuiltInInput(name : "Position")] var Position : Real4;
    }

    struct Sprites_GeoOut
    {
      [StageOutput(name : "Uv", location : 0)] var Stage_Uv_Real2 : Real2;
      [HardwareBuiltInOutput(name : "Position")] var Position : Real4;
    }

    [Geometry(maxVertices : 6)]
    struct Sprites_Geometry
    {
      [EntryPoint]
      function Main(input : TriangleInput[Sprites_GeoIn], output : TriangleOutput[Sprites_GeoOut])
      {
        var fragmentInput = TriangleInput[ExpandIn]();
        for (var i = 0; i < 3; i += 1)
        {
          fragmentInput[i].Uv = input[i].Stage_Uv_Real2;
          fragmentInput[i].Position = input[i].Position;
        }
        var fragmentOutput = TriangleOutput[ExpandOut]();
        var expand = Expand();
        expand.Main(fragmentInput, fragmentOutput);
      }
    }
    "#);
}

#[test]
fn pixel_after_geometry_reads_geometry_outputs() {
    let settings = Settings::default();
    let (lib, _) = translate_classes(geometry_classes(), &settings);
    let (result, _) = composite_with(&settings, &lib, &geometry_scene());
    let shader = result.unwrap();

    let shade = shader.stage(FragmentType::Pixel).unwrap().fragment("Shade").unwrap();
    assert_eq!(shade.fields[0].linked, LinkedFieldType::Stage);
    assert_eq!(shade.fields[0].dependency.as_deref(), Some("ExpandOut.Uv"));
}

#[test]
fn second_geometry_fragment_is_rejected() {
    let mut classes = geometry_classes();
    let mut twin = classes[3].clone();
    twin.name = "Twin".into();
    classes.push(twin);
    let def = geometry_scene().with_fragment("Twin");
    let (result, diag) = composite(classes, &def);

    assert_eq!(result.unwrap_err(), CompositorError::DuplicateGeometryFragment);
    assert!(diag.contains(DiagnosticKind::DuplicateGeometryFragment));
}

// ============================================================================
// Compute
// ============================================================================

#[test]
fn compute_stage_from_fragment_attribute() {
    let blur = ClassDecl::new("Blur")
        .with_attribute(
            Attribute::new("Compute")
                .with_param("localSizeX", AttributeValue::Int(8))
                .with_param("localSizeY", AttributeValue::Int(8)),
        )
        .with_field(plain("GlobalInvocationId", "Integer3", "HardwareBuiltInInput"))
        .with_field(plain("Radius", "Real", "PropertyInput"))
        .with_function(FunctionDecl::new("Main"));
    let def = ShaderDefinition::new("Post").with_fragment("Blur");
    let (result, _) = composite(vec![blur], &def);

    let shader = result.unwrap();
    assert_eq!(shader.stages.len(), 1);
    insta::assert_snapshot!(shader.stages[0].source_text, @r#"
    [Compute(localSizeX : 8, localSizeY : 8, localSizeZ : 1)]
    struct Post_Compute
    {
      [HardwareBuiltInInput(name : "GlobalInvocationId")] var GlobalInvocationId : Integer3;
      [PropertyInput] var Blur_Radius : Real;

      [EntryPoint]
      function Main()
      {
        var blur = Blur();
        blur.GlobalInvocationId = this.GlobalInvocationId;
        blur.Radius = this.Blur_Radius;
        blur.Main();
      }
    }
    "#);
}

#[test]
fn compute_local_size_override() {
    let blur = fragment("Blur", "Compute");
    let mut def = ShaderDefinition::new("Post").with_fragment("Blur");
    def.compute = Some(ComputeProperties {
        local_size_x: 16,
        local_size_y: 4,
        local_size_z: 2,
    });
    let (result, _) = composite(vec![blur], &def);

    let shader = result.unwrap();
    assert!(
        shader.stages[0]
            .source_text
            .starts_with("[Compute(localSizeX : 16, localSizeY : 4, localSizeZ : 2)]")
    );
}

#[test]
fn compute_rejects_pipeline_fragments() {
    let def = ShaderDefinition::new("Mixed").with_fragment("Blur").with_fragment("Transform");
    let (result, _) = composite(vec![fragment("Blur", "Compute"), transform()], &def);
    assert_eq!(result.unwrap_err(), CompositorError::UnsupportedStage("Vertex"));
}

#[test]
fn naming_helpers() {
    assert_eq!(property_name("Tint", "Albedo"), "Albedo_Tint");
    assert_eq!(
        stage_field_name("Bones", &ty("FixedArray[Real4x4, 4]")),
        "Stage_Bones_FixedArrayReal4x44"
    );
    assert_eq!(fragment_var_name("VertexColor"), "vertexColor");
}
