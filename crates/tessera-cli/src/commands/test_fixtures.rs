//! On-disk inputs for command tests.

use std::path::{Path, PathBuf};

use indoc::indoc;
use tempfile::TempDir;
use tessera_core::{
    Attribute, AttributeValue, ClassDecl, Expr, FieldDecl, FunctionDecl, Project, SourceEntry,
    TypeRef,
};

fn ty(name: &str) -> TypeRef {
    name.parse().unwrap()
}

fn field(name: &str, type_name: &str, attribute: Attribute) -> FieldDecl {
    FieldDecl::new(name, ty(type_name)).with_attribute(attribute)
}

fn fragment(name: &str, stage: &str) -> ClassDecl {
    ClassDecl::new(name)
        .with_attribute(Attribute::new(stage))
        .with_function(FunctionDecl::new("Main"))
}

/// A vertex fragment feeding `Color` to a pixel fragment writing `Target0`.
pub fn pass_through_project() -> Project {
    let paint = fragment("Paint", "Vertex")
        .with_field(field("Position", "Real4", Attribute::new("HardwareBuiltInOutput")))
        .with_field(field("Color", "Real4", Attribute::new("StageOutput")));
    let shade = fragment("Shade", "Pixel")
        .with_field(field("Color", "Real4", Attribute::new("StageInput")))
        .with_field(
            field("Strength", "Real", Attribute::new("SpecConstantInput"))
                .with_initializer(Expr::real(0.5)),
        )
        .with_field(field(
            "Result",
            "Real4",
            Attribute::new("StageOutput")
                .with_param("name", AttributeValue::String("Target0".into())),
        ));
    let source = SourceEntry::new("flat.tess", "").with_type(paint).with_type(shade);
    Project::new("Flat").with_source(source)
}

pub const SHADER_JSON: &str = indoc! {r#"
    {
      "name": "Flat",
      "fragments": ["Paint", "Shade"]
    }
"#};

pub fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

/// A temp dir holding `project.json` and `flat.json`.
pub fn workspace() -> (TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let project = serde_json::to_string_pretty(&pass_through_project()).unwrap();
    let project_path = write(dir.path(), "project.json", &project);
    let shader_path = write(dir.path(), "flat.json", SHADER_JSON);
    (dir, project_path, shader_path)
}
