use tessera_core::{
    Attribute, ClassDecl, Expr, FieldDecl, FunctionDecl, FunctionKey, Project, SourceEntry,
    SourceId, Span, Stmt, TypeRef,
};
use tessera_ir::{Module, ShaderStages, StageSymbol};

use super::analyze;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::intrinsics::ShaderIntrinsics;
use crate::settings::NameSettings;

fn span(start: u32, end: u32) -> Span {
    Span::new(SourceId(0), start, end)
}

fn ddx(at: Span) -> Stmt {
    let ddx = FunctionKey::new(TypeRef::named("Math"), "Ddx", vec![TypeRef::named("Real")]);
    Stmt::expr(Expr::static_call(ddx, vec![Expr::real(1.0)], TypeRef::named("Real")).at(at))
}

fn call(owner: &str, name: &str, at: Span) -> Stmt {
    let owner = TypeRef::named(owner);
    Stmt::expr(
        Expr::this(owner.clone())
            .call(FunctionKey::new(owner, name, vec![]), vec![], TypeRef::void())
            .at(at),
    )
}

fn run(classes: Vec<ClassDecl>) -> (super::Analysis, Diagnostics) {
    let mut source = SourceEntry::new("test.tess", "");
    for class in classes {
        source = source.with_type(class);
    }
    let project = Project::new("Test").with_source(source);
    let intrinsics = ShaderIntrinsics::new().unwrap();
    let deps = intrinsics.module_with(&Module::default());
    let mut diag = Diagnostics::new();
    let analysis = analyze(&project, &NameSettings::default(), &deps, &mut diag);
    (analysis, diag)
}

fn function(owner: &str, name: &str) -> StageSymbol {
    StageSymbol::Function(FunctionKey::new(TypeRef::named(owner), name, vec![]))
}

#[test]
fn pixel_requirement_propagates_through_helpers() {
    let class = ClassDecl::new("Edges")
        .with_function(
            FunctionDecl::new("Main").with_body(vec![call("Edges", "Helper", span(3, 9))]),
        )
        .with_function(FunctionDecl::new("Helper").with_body(vec![ddx(span(20, 30))]));

    let (analysis, diag) = run(vec![class]);
    assert!(diag.is_empty());

    let main = analysis.stages.get(&function("Edges", "Main")).unwrap();
    assert_eq!(main.required, ShaderStages::PIXEL);
    assert_eq!(main.dependency, Some(function("Edges", "Helper")));
    assert_eq!(main.call_span, span(3, 9));
}

#[test]
fn vertex_fragment_calling_pixel_intrinsic() {
    let class = ClassDecl::new("Wobble")
        .with_attribute(Attribute::new("Vertex"))
        .with_function(
            FunctionDecl::new("Main").with_body(vec![call("Wobble", "Helper", span(3, 9))]),
        )
        .with_function(FunctionDecl::new("Helper").with_body(vec![ddx(span(20, 30))]));

    let (_, diag) = run(vec![class]);
    assert_eq!(diag.error_count(), 1);
    assert!(diag.contains(DiagnosticKind::StageMismatch));
    insta::assert_snapshot!(
        diag.render(),
        @"error at 20..30: 'Wobble.Helper' requires shader stage Vertex but references 'Math.Ddx' which requires stage Pixel (hint: move the call into a fragment of the required stage, or drop the stage attribute)"
    );
}

#[test]
fn mismatch_notes_trace_first_cause() {
    let shared = ClassDecl::new("Shared")
        .with_function(
            FunctionDecl::new("Outer").with_body(vec![call("Shared", "Inner", span(40, 45))]),
        )
        .with_function(FunctionDecl::new("Inner").with_body(vec![ddx(span(50, 60))]));
    let vertex = ClassDecl::new("Deform")
        .with_attribute(Attribute::new("Vertex"))
        .with_function(
            FunctionDecl::new("Main").with_body(vec![call("Shared", "Outer", span(3, 9))]),
        );

    let (_, diag) = run(vec![shared, vertex]);
    assert_eq!(diag.error_count(), 1);
    insta::assert_snapshot!(
        diag.render(),
        @"error at 3..9: 'Deform.Main' requires shader stage Vertex but references 'Shared.Outer' which requires stage Pixel (related: 'Shared.Outer' requires stage Pixel through 'Shared.Inner' at 40..45) (related: 'Shared.Inner' requires stage Pixel through 'Math.Ddx' at 50..60) (hint: move the call into a fragment of the required stage, or drop the stage attribute)"
    );
}

#[test]
fn requires_pixel_attribute_is_honored() {
    let class = ClassDecl::new("Util")
        .with_function(FunctionDecl::new("Shade").with_attribute(Attribute::new("RequiresPixel")));

    let (analysis, diag) = run(vec![class]);
    assert!(diag.is_empty());
    let shade = analysis.stages.get(&function("Util", "Shade")).unwrap();
    assert_eq!(shade.required, ShaderStages::PIXEL);
    assert_eq!(shade.dependency, None);
}

#[test]
fn static_field_initializer_requirements_reach_readers() {
    let ddx = FunctionKey::new(TypeRef::named("Math"), "Ddx", vec![TypeRef::named("Real")]);
    let edge =
        Expr::static_call(ddx, vec![Expr::real(1.0)], TypeRef::named("Real")).at(span(50, 60));
    let palette = ClassDecl::new("Palette").with_field(
        FieldDecl::new("Edge", TypeRef::named("Real"))
            .make_static()
            .with_initializer(edge),
    );
    let read = Expr::type_name(TypeRef::named("Palette"))
        .field("Edge", TypeRef::named("Real"))
        .at(span(3, 9));
    let vertex = ClassDecl::new("Deform")
        .with_attribute(Attribute::new("Vertex"))
        .with_function(FunctionDecl::new("Main").with_body(vec![Stmt::expr(read)]));

    let (analysis, diag) = run(vec![palette, vertex]);
    let field = StageSymbol::Field {
        owner: TypeRef::named("Palette"),
        name: "Edge".into(),
    };
    assert_eq!(analysis.stages.get(&field).unwrap().required, ShaderStages::PIXEL);
    assert_eq!(diag.error_count(), 1);
    let rendered = diag.render();
    assert!(rendered.contains("'Deform.Main' requires shader stage Vertex"), "{rendered}");
    assert!(rendered.contains("references 'Palette.Edge'"), "{rendered}");
}
