//! Tests for CLI dispatch logic.
//!
//! These tests verify:
//! 1. Every command parses its documented flags
//! 2. Shader sources: `--shader` and inline `-f` lists are exclusive
//! 3. Params extraction: correct fields are extracted from ArgMatches

use std::path::PathBuf;

use tessera_ir::FragmentType;

use super::*;
use crate::cli::commands::{
    build_command, check_command, composite_command, disasm_command, glsl_command,
};
use crate::commands::loader::ShaderSource;

#[test]
fn check_extracts_project_and_settings() {
    let m = check_command()
        .try_get_matches_from(["check", "fragments.json", "--settings", "s.json", "--strict"])
        .unwrap();
    let params = CheckParams::from_matches(&m);

    assert_eq!(params.project_path, PathBuf::from("fragments.json"));
    assert_eq!(params.settings_path, Some(PathBuf::from("s.json")));
    assert!(params.strict);
    assert_eq!(params.color, ColorChoice::Auto);
}

#[test]
fn check_requires_a_project() {
    let result = check_command().try_get_matches_from(["check"]);
    assert!(result.is_err());
}

#[test]
fn color_flag_is_parsed() {
    let m = check_command()
        .try_get_matches_from(["check", "p.json", "--color", "never"])
        .unwrap();
    assert_eq!(CheckParams::from_matches(&m).color, ColorChoice::Never);

    let rejected =
        check_command().try_get_matches_from(["check", "p.json", "--color", "sometimes"]);
    assert!(rejected.is_err());
}

#[test]
fn composite_reads_shader_file() {
    let m = composite_command()
        .try_get_matches_from(["composite", "p.json", "--shader", "lit.json"])
        .unwrap();
    let params = CompositeParams::from_matches(&m);
    assert_eq!(params.shader, Some(ShaderSource::File(PathBuf::from("lit.json"))));
}

#[test]
fn inline_fragments_keep_their_order() {
    let m = composite_command()
        .try_get_matches_from([
            "composite",
            "p.json",
            "-f",
            "Mesh",
            "--fragment",
            "Lit",
            "--name",
            "Lit",
        ])
        .unwrap();
    let params = CompositeParams::from_matches(&m);
    assert_eq!(
        params.shader,
        Some(ShaderSource::Inline {
            name: "Lit".into(),
            fragments: vec!["Mesh".into(), "Lit".into()],
        })
    );
}

#[test]
fn inline_name_defaults() {
    let m = build_command().try_get_matches_from(["build", "p.json", "-f", "Mesh"]).unwrap();
    let params = BuildParams::from_matches(&m);
    assert_eq!(
        params.shader,
        Some(ShaderSource::Inline {
            name: "Shader".into(),
            fragments: vec!["Mesh".into()],
        })
    );
}

#[test]
fn shader_file_and_fragments_conflict() {
    let result = build_command()
        .try_get_matches_from(["build", "p.json", "--shader", "lit.json", "-f", "Mesh"]);
    assert!(result.is_err());
}

#[test]
fn shader_is_optional_at_parse_time() {
    let m = composite_command().try_get_matches_from(["composite", "p.json"]).unwrap();
    assert!(CompositeParams::from_matches(&m).shader.is_none());
}

#[test]
fn build_flags() {
    let m = build_command()
        .try_get_matches_from([
            "build",
            "p.json",
            "--shader",
            "lit.json",
            "-o",
            "out",
            "--strip-debug",
            "--validate",
            "-vv",
        ])
        .unwrap();
    let params = BuildParams::from_matches(&m);

    assert_eq!(params.out_dir, PathBuf::from("out"));
    assert!(params.strip_debug);
    assert!(params.validate);
    assert_eq!(m.get_count("verbose"), 2);
}

#[test]
fn build_defaults_to_current_directory() {
    let m = build_command().try_get_matches_from(["build", "p.json", "-f", "Lit"]).unwrap();
    let params = BuildParams::from_matches(&m);
    assert_eq!(params.out_dir, PathBuf::from("."));
    assert!(!params.strip_debug);
}

#[test]
fn disasm_takes_a_binary() {
    let m = disasm_command()
        .try_get_matches_from(["disasm", "Lit_Pixel.spv", "-o", "lit.txt"])
        .unwrap();
    let params = DisasmParams::from_matches(&m);
    assert_eq!(params.spirv_path, PathBuf::from("Lit_Pixel.spv"));
    assert_eq!(params.output, Some(PathBuf::from("lit.txt")));
}

#[test]
fn glsl_requires_a_stage() {
    let result = glsl_command().try_get_matches_from(["glsl", "Lit_Pixel.spv"]);
    assert!(result.is_err());
}

#[test]
fn glsl_flags() {
    let m = glsl_command()
        .try_get_matches_from([
            "glsl",
            "Lit_Vertex.spv",
            "--stage",
            "vertex",
            "--glsl-version",
            "310es",
            "--adjust-coordinates",
        ])
        .unwrap();
    let params = GlslParams::from_matches(&m);

    assert_eq!(params.stage, FragmentType::Vertex);
    assert_eq!(params.version, "310es");
    assert!(params.adjust_coordinates);
    assert!(params.output.is_none());
}

#[test]
fn glsl_version_defaults() {
    let m = glsl_command()
        .try_get_matches_from(["glsl", "Lit_Pixel.spv", "--stage", "pixel"])
        .unwrap();
    let params = GlslParams::from_matches(&m);
    assert_eq!(params.stage, FragmentType::Pixel);
    assert_eq!(params.version, "450");
}

#[test]
fn help_lists_every_command() {
    let help = build_cli().render_help().to_string();
    for name in ["check", "composite", "build", "disasm", "glsl"] {
        assert!(help.contains(name), "{name} missing from help");
    }
}
