use tessera_core::FieldKey;
use tessera_ir::{FragmentType, ShaderStages};

use super::*;

#[test]
fn defaults_are_valid() {
    let settings = Settings::default();
    assert_eq!(settings.finalize(), Ok(()));
    assert_eq!(settings.render_target_index("Target3"), Some(3));
    assert_eq!(settings.default_uniform_buffer.debug_name, "Material");
}

#[test]
fn duplicate_binding_is_rejected() {
    let mut settings = Settings::default();
    settings.uniform_buffers[1].binding = 1;

    let err = settings.finalize().unwrap_err();
    insta::assert_snapshot!(
        err,
        @"uniform block 'CameraData' shares descriptor set 0 and binding 1 with block 'FrameData'"
    );
}

#[test]
fn binding_collides_with_material_without_overlap() {
    let mut settings = Settings::default();
    settings.allow_uniform_material_buffer_overlap = false;

    let err = settings.finalize().unwrap_err();
    assert!(matches!(err, SettingsError::DuplicateBinding { binding: 1, .. }));
}

#[test]
fn duplicate_uniform_field_for_same_stage() {
    let mut settings = Settings::default();
    settings.uniform_buffers.push(UniformBufferDescription {
        binding: 7,
        debug_name: "Extra".into(),
        fields: vec![FieldDescription::new("FrameTime", "Real")],
        ..UniformBufferDescription::default()
    });

    let err = settings.finalize().unwrap_err();
    insta::assert_snapshot!(
        err,
        @"field 'FrameTime' of uniform block 'Extra' is registered for the same stage more than once"
    );
}

#[test]
fn same_uniform_field_in_disjoint_stages() {
    let mut settings = Settings::default();
    settings.uniform_buffers[0].allowed_stages = ShaderStages::VERTEX;
    settings.uniform_buffers.push(UniformBufferDescription {
        binding: 7,
        debug_name: "PixelFrame".into(),
        allowed_stages: ShaderStages::PIXEL,
        fields: vec![FieldDescription::new("FrameTime", "Real")],
        ..UniformBufferDescription::default()
    });

    assert_eq!(settings.finalize(), Ok(()));
    let key = FieldKey::new("FrameTime", "Real");
    let (buffer, index) = settings.find_app_built_in(&key, FragmentType::Pixel).unwrap();
    assert_eq!(buffer.debug_name, "PixelFrame");
    assert_eq!(index, 0);
}

#[test]
fn app_built_in_cannot_shadow_hardware() {
    let mut settings = Settings::default();
    settings.uniform_buffers[0]
        .fields
        .push(FieldDescription::new("Position", "Real4"));

    let err = settings.finalize().unwrap_err();
    assert_eq!(err, SettingsError::AppBuiltInShadowsHardware("Position".into()));
}

#[test]
fn conflicting_built_in_names() {
    let mut settings = Settings::default();
    settings.built_ins.pixel.input_globals.push(BuiltInField::new(
        "InstanceId",
        "Integer",
        HardwareBuiltIn::PrimitiveId,
    ));

    let err = settings.finalize().unwrap_err();
    insta::assert_snapshot!(
        err,
        @"built-in 'InstanceId' is declared as more than one hardware built-in"
    );
}

#[test]
fn too_many_render_targets() {
    let mut settings = Settings::default();
    settings.render_targets.push("Target8".into());

    let err = settings.finalize().unwrap_err();
    insta::assert_snapshot!(err, @"9 render targets exceed the limit of 8");
}

#[test]
fn rename_built_in_in_every_stage() {
    let mut settings = Settings::default();
    settings.set_hardware_built_in_name(HardwareBuiltIn::Position, "ClipPosition");

    let key = FieldKey::new("ClipPosition", "Real4");
    let vertex = settings.built_ins.vertex.find_output(&key).unwrap();
    assert!(vertex.in_block);
    assert!(settings.built_ins.geometry.find_input(&key).is_some());
    assert!(!settings.built_ins.is_any_built_in_name("Position"));
}

#[test]
fn built_in_lookup_by_stage() {
    let settings = Settings::default();
    let key = FieldKey::new("FragCoord", "Real4");

    let pixel = settings.built_ins.stage(FragmentType::Pixel).unwrap();
    let found = pixel.find_input(&key).unwrap();
    assert!(!found.in_block);
    assert_eq!(found.field.built_in, HardwareBuiltIn::FragCoord);
    assert!(settings.built_ins.vertex.find_input(&key).is_none());
    assert!(settings.built_ins.stage(FragmentType::None).is_none());
}

#[test]
fn partial_json_keeps_defaults() {
    let json = r#"{
        "max_render_targets": 2,
        "render_targets": ["Albedo", "Normal"],
        "names": { "main_function": "Run" }
    }"#;
    let settings = Settings::from_json(json).unwrap();

    assert_eq!(settings.names.main_function, "Run");
    assert_eq!(settings.names.input, "Input");
    assert_eq!(settings.render_target_index("Normal"), Some(1));
    assert_eq!(settings.uniform_buffers.len(), 3);
    assert_eq!(settings.finalize(), Ok(()));
}

#[test]
fn stage_attribute_names() {
    let names = NameSettings::default();
    assert_eq!(names.stage_of("Geometry"), Some(FragmentType::Geometry));
    assert_eq!(names.stage_of("Static"), None);
    assert!(names.is_input("SpecConstantInput"));
    assert!(names.is_output("HardwareBuiltInOutput"));
    assert!(!names.is_output("Input"));
}

#[test]
fn material_binding_per_stage() {
    let mut settings = Settings::default();
    assert_eq!(settings.material_binding(FragmentType::Pixel), 0);

    settings.allow_uniform_material_buffer_overlap = false;
    settings.default_uniform_buffer.binding = 10;
    assert_eq!(settings.material_binding(FragmentType::Vertex), 10);
    assert_eq!(settings.material_binding(FragmentType::Pixel), 12);
}
