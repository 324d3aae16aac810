use std::path::PathBuf;

use tessera_core::{Attribute, ClassDecl, FunctionDecl, Project, SourceEntry};

use super::CommandError;
use super::check::{CheckArgs, check};
use super::test_fixtures::{workspace, write};

fn args(project_path: PathBuf, strict: bool) -> CheckArgs {
    CheckArgs {
        project_path,
        settings_path: None,
        strict,
        color: false,
    }
}

/// A project whose one class triggers an ignored-attribute warning.
fn warning_project() -> Project {
    let helper = ClassDecl::new("Helper")
        .with_function(FunctionDecl::new("Run").with_attribute(Attribute::new("EntryPoint")));
    Project::new("Warn").with_source(SourceEntry::new("warn.tess", "").with_type(helper))
}

#[test]
fn clean_project_is_silent() {
    let (_dir, project_path, _) = workspace();
    assert_eq!(check(&args(project_path, false)).unwrap(), None);
}

#[test]
fn warnings_are_reported_but_pass() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "warn.json", &serde_json::to_string(&warning_project()).unwrap());

    let rendered = check(&args(path, false)).unwrap().unwrap();
    assert!(rendered.contains("warning"), "{rendered}");
}

#[test]
fn strict_rejects_warnings() {
    let dir = tempfile::tempdir().unwrap();
    let path = write(dir.path(), "warn.json", &serde_json::to_string(&warning_project()).unwrap());

    let err = check(&args(path, true)).unwrap_err();
    let CommandError::Rejected { message, rendered } = err else {
        panic!("expected a rejection, got {err:?}");
    };
    assert_eq!(message, "1 warnings with --strict");
    assert!(rendered.contains("warning"), "{rendered}");
}

#[test]
fn missing_settings_file_fails_before_translation() {
    let (_dir, project_path, _) = workspace();
    let mut check_args = args(project_path, false);
    check_args.settings_path = Some(PathBuf::from("/nonexistent/settings.json"));

    let err = check(&check_args).unwrap_err();
    assert!(matches!(err, CommandError::Load(_)));
}
