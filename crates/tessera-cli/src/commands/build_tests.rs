use std::path::PathBuf;

use tessera_ir::FragmentType;

use super::CommandError;
use super::build::{BuildArgs, build};
use super::composite::{CompositeArgs, composite};
use super::disasm::{DisasmArgs, disasm};
use super::glsl::{GlslArgs, glsl};
use super::loader::ShaderSource;
use super::test_fixtures::workspace;

fn build_args(project_path: PathBuf, shader_path: PathBuf, out_dir: PathBuf) -> BuildArgs {
    BuildArgs {
        project_path,
        settings_path: None,
        shader: Some(ShaderSource::File(shader_path)),
        out_dir,
        strip_debug: false,
        validate: false,
        color: false,
    }
}

fn file_names(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn build_writes_a_binary_and_reflection_per_stage() {
    let (dir, project_path, shader_path) = workspace();
    let out_dir = dir.path().join("out");

    let written = build(&build_args(project_path, shader_path, out_dir.clone())).unwrap();
    assert_eq!(
        file_names(&written),
        ["Flat_Vertex.spv", "Flat_Vertex.json", "Flat_Pixel.spv", "Flat_Pixel.json"]
    );

    let spv = std::fs::read(out_dir.join("Flat_Pixel.spv")).unwrap();
    assert_eq!(&spv[..4], &0x0723_0203u32.to_le_bytes());

    let text = std::fs::read_to_string(out_dir.join("Flat_Pixel.json")).unwrap();
    let reflection: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(reflection["class_name"], "Flat_Pixel");
    assert_eq!(reflection["stage"], "Pixel");
}

#[test]
fn strip_debug_shrinks_the_binary() {
    let (dir, project_path, shader_path) = workspace();
    let plain_dir = dir.path().join("plain");
    let stripped_dir = dir.path().join("stripped");

    build(&build_args(project_path.clone(), shader_path.clone(), plain_dir.clone())).unwrap();
    let mut args = build_args(project_path, shader_path, stripped_dir.clone());
    args.strip_debug = true;
    build(&args).unwrap();

    let size = |dir: &PathBuf| std::fs::metadata(dir.join("Flat_Vertex.spv")).unwrap().len();
    assert!(size(&stripped_dir) < size(&plain_dir));
}

#[test]
fn unknown_fragment_is_rejected_with_diagnostics() {
    let (dir, project_path, _) = workspace();
    let mut args = build_args(project_path, PathBuf::new(), dir.path().join("out"));
    args.shader = Some(ShaderSource::Inline {
        name: "Flat".into(),
        fragments: vec!["Paint".into(), "Missing".into()],
    });

    let err = build(&args).unwrap_err();
    assert!(matches!(err, CommandError::Rejected { .. } | CommandError::Compile(_)), "{err:?}");
    assert!(!dir.path().join("out").exists());
}

#[test]
fn composite_prints_each_stage_class() {
    let (_dir, project_path, shader_path) = workspace();
    let args = CompositeArgs {
        project_path,
        settings_path: None,
        shader: Some(ShaderSource::File(shader_path)),
        color: false,
    };

    let text = composite(&args).unwrap();
    assert!(text.contains("// Flat_Vertex (Vertex)"), "{text}");
    assert!(text.contains("// Flat_Pixel (Pixel)"), "{text}");
}

#[test]
fn built_binaries_disassemble_and_cross_compile() {
    let (dir, project_path, shader_path) = workspace();
    let out_dir = dir.path().join("out");
    build(&build_args(project_path, shader_path, out_dir.clone())).unwrap();

    let text = disasm(&DisasmArgs {
        spirv_path: out_dir.join("Flat_Pixel.spv"),
        output: None,
    })
    .unwrap();
    assert!(text.contains("OpEntryPoint"), "{text}");

    let source = glsl(&GlslArgs {
        spirv_path: out_dir.join("Flat_Pixel.spv"),
        stage: FragmentType::Pixel,
        version: "450".into(),
        adjust_coordinates: false,
        output: None,
    })
    .unwrap();
    assert!(source.starts_with("#version 450"), "{source}");
}

#[test]
fn bad_glsl_version_is_reported() {
    let (dir, project_path, shader_path) = workspace();
    let out_dir = dir.path().join("out");
    build(&build_args(project_path, shader_path, out_dir.clone())).unwrap();

    let err = glsl(&GlslArgs {
        spirv_path: out_dir.join("Flat_Pixel.spv"),
        stage: FragmentType::Pixel,
        version: "latest".into(),
        adjust_coordinates: false,
        output: None,
    })
    .unwrap_err();
    assert!(matches!(err, CommandError::Backend(_)));
}

#[test]
fn disasm_of_missing_file() {
    let err = disasm(&DisasmArgs {
        spirv_path: PathBuf::from("/nonexistent/shader.spv"),
        output: None,
    })
    .unwrap_err();
    assert!(matches!(err, CommandError::Load(_)));
}
