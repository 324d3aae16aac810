//! Fixtures shared by the unit tests.

use std::sync::{Arc, OnceLock};

use tessera_core::{
    Attribute, AttributeValue, ClassDecl, Expr, FieldDecl, FunctionDecl, Project, SourceEntry, Stmt,
    TypeRef,
};
use tessera_ir::{FragmentType, Library, Module, TypeId};

use crate::compositor::{CompositeShader, Compositor, ShaderDefinition};
use crate::diagnostics::Diagnostics;
use crate::frontend::translate;
use crate::intrinsics::ShaderIntrinsics;
use crate::settings::Settings;

pub fn ty(name: &str) -> TypeRef {
    name.parse().unwrap()
}

pub fn project(classes: impl IntoIterator<Item = ClassDecl>) -> Project {
    let mut source = SourceEntry::new("test.tess", "");
    for class in classes {
        source = source.with_type(class);
    }
    Project::new("Test").with_source(source)
}

/// Translates classes on top of the intrinsics, panicking on fatal errors.
pub fn translate_classes(
    classes: impl IntoIterator<Item = ClassDecl>,
    settings: &Settings) -> (Library, Diagnostics,
) {
    translate_project(&project(classes), settings, &Module::default())
}

/// One intrinsics library for every test, so libraries translated in
/// separate steps share their core types.
pub fn intrinsics() -> &'static ShaderIntrinsics {
    static INTRINSICS: OnceLock<ShaderIntrinsics> = OnceLock::new();
    INTRINSICS.get_or_init(|| ShaderIntrinsics::new().unwrap())
}

pub fn translate_project(
    project: &Project,
    settings: &Settings,
    deps: &Module) -> (Library, Diagnostics,
) {
    translate(project, settings, intrinsics(), deps).unwrap()
}

/// Module holding one translated library, for dependent translations.
pub fn module_of(lib: Library) -> Module {
    Module::new([Arc::new(lib)])
}

/// `[attribute(name : "link")]`
pub fn named(attribute: &str, link: &str) -> Attribute {
    Attribute::new(attribute).with_param("name", AttributeValue::String(link.to_string()))
}

pub fn field(name: &str, type_name: &str, attribute: Attribute) -> FieldDecl {
    FieldDecl::new(name, ty(type_name)).with_attribute(attribute)
}

/// `[attribute] var name : type_name;`
pub fn plain(name: &str, type_name: &str, attribute: &str) -> FieldDecl {
    field(name, type_name, Attribute::new(attribute))
}

/// A class carrying the stage attribute and an empty `Main()`.
pub fn fragment(name: &str, stage: &str) -> ClassDecl {
    ClassDecl::new(name)
        .with_attribute(Attribute::new(stage))
        .with_function(FunctionDecl::new("Main"))
}

/// A class whose `Main()` carries `[EntryPoint]` and runs `body`.
pub fn entry_class(name: &str, stage: Attribute, body: Vec<Stmt>) -> ClassDecl {
    ClassDecl::new(name).with_attribute(stage).with_function(
        FunctionDecl::new("Main")
            .with_attribute(Attribute::new("EntryPoint"))
            .with_body(body),
    )
}

/// `this.target = this.source;` inside `owner`.
pub fn copy_field(owner: &str, target: &str, source: &str, type_name: &str) -> Stmt {
    let this = Expr::this(ty(owner));
    Stmt::expr(Expr::assign(
        this.clone().field(target, ty(type_name)),
        this.field(source, ty(type_name)),
    ))
}

/// Translates `fragments`, composites `def` over them and translates the
/// generated stage classes. Panics on any error along the way.
pub fn build_composite(
    fragments: Vec<ClassDecl>,
    def: &ShaderDefinition,
    settings: &Settings) -> (Library, CompositeShader,
) {
    let (fragments, diag) = translate_classes(fragments, settings);
    assert!(!diag.has_errors(), "{}", diag.render());
    let mut diag = Diagnostics::new();
    let shader = Compositor::new(settings, &fragments).composite(def, &mut diag).unwrap();
    let (lib, diag) = translate_project(&shader.project(), settings, &module_of(fragments));
    assert!(!diag.has_errors(), "{}", diag.render());
    (lib, shader)
}

/// The translated class of one composited stage.
pub fn stage_type(lib: &Library, shader: &CompositeShader, stage: FragmentType) -> TypeId {
    let class_name = &shader.stage(stage).unwrap().class_name;
    lib.find_type(class_name, false).unwrap()
}

/// A vertex fragment handing `Color` to a pixel fragment that writes
/// `Target0` and reads the `Strength` specialization constant.
pub fn pass_through() -> (Vec<ClassDecl>, ShaderDefinition) {
    let paint = fragment("Paint", "Vertex")
        .with_field(plain("Position", "Real4", "HardwareBuiltInOutput"))
        .with_field(plain("Color", "Real4", "StageOutput"));
    let shade = fragment("Shade", "Pixel")
        .with_field(plain("Color", "Real4", "StageInput"))
        .with_field(
            plain("Strength", "Real", "SpecConstantInput").with_initializer(Expr::real(0.5)),
        )
        .with_field(field("Result", "Real4", named("StageOutput", "Target0")));
    let def = ShaderDefinition::new("Flat").with_fragment("Paint").with_fragment("Shade");
    (vec![paint, shade], def)
}
