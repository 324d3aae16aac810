use std::path::PathBuf;

use indoc::indoc;
use tessera_core::SourceEntry;

use super::loader::{LoadError, ShaderSource, load_project, load_settings, load_shader};
use super::test_fixtures::{pass_through_project, workspace, write};

#[test]
fn project_file_round_trips() {
    let (_dir, project_path, _) = workspace();
    let project = load_project(&project_path).unwrap();
    assert_eq!(project, pass_through_project());
}

#[test]
fn directory_collects_sources_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("lighting");
    std::fs::create_dir(&root).unwrap();
    for name in ["b", "a"] {
        let entry = SourceEntry::new(format!("{name}.tess"), "");
        write(&root, &format!("{name}.json"), &serde_json::to_string(&entry).unwrap());
    }
    write(&root, "notes.txt", "ignored");

    let project = load_project(&root).unwrap();
    assert_eq!(project.name, "lighting");
    let origins: Vec<&str> = project.sources.iter().map(|s| s.origin.as_str()).collect();
    assert_eq!(origins, ["a.tess", "b.tess"]);
}

#[test]
fn empty_directory_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_project(dir.path()).unwrap_err();
    assert!(matches!(err, LoadError::EmptyDirectory(_)));
}

#[test]
fn missing_file_names_the_path() {
    let err = load_project(&PathBuf::from("/nonexistent/project.json")).unwrap_err();
    assert!(matches!(err, LoadError::Read { .. }));
    assert!(err.to_string().starts_with("failed to read '/nonexistent/project.json'"));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "broken.json", "{ \"name\": ");
    let err = load_project(&path).unwrap_err();
    assert!(matches!(err, LoadError::Parse { .. }));
}

#[test]
fn settings_default_when_absent() {
    let settings = load_settings(None).unwrap();
    assert!(settings.allow_uniform_material_buffer_overlap);
}

#[test]
fn settings_file_overrides_only_given_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(
        dir.path(),
        "settings.json",
        indoc! {r#"
            {
              "allow_uniform_material_buffer_overlap": false,
              "errors": { "front_end_error_on_no_main": true }
            }
        "#},
    );
    let settings = load_settings(Some(path.as_path())).unwrap();

    assert!(!settings.allow_uniform_material_buffer_overlap);
    assert!(settings.errors.front_end_error_on_no_main);
    assert_eq!(settings.render_targets.len(), 8);
}

#[test]
fn shader_from_file() {
    let (_dir, _, shader_path) = workspace();
    let def = load_shader(Some(&ShaderSource::File(shader_path))).unwrap();
    assert_eq!(def.name, "Flat");
    assert_eq!(def.fragments, ["Paint", "Shade"]);
}

#[test]
fn inline_shader() {
    let source = ShaderSource::Inline {
        name: "Lit".into(),
        fragments: vec!["Mesh".into(), "Lit".into()],
    };
    let def = load_shader(Some(&source)).unwrap();
    assert_eq!(def.name, "Lit");
    assert_eq!(def.fragments, ["Mesh", "Lit"]);
}

#[test]
fn shader_is_required() {
    let err = load_shader(None).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"shader definition is required: use --shader or -f/--fragment"
    );
}

#[test]
fn shader_needs_fragments() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "empty.json", r#"{ "name": "Empty" }"#);
    let err = load_shader(Some(&ShaderSource::File(path))).unwrap_err();
    insta::assert_snapshot!(err.to_string(), @"shader definition 'Empty' lists no fragments");
}
