use tessera_core::{
    BinaryOp, ClassDecl, Expr, FieldDecl, FunctionDecl, FunctionKey, Project, PropertyDecl,
    SourceEntry, Stmt, TypeRef,
};
use tessera_ir::StageSymbol;

use super::CallGraph;

fn ty(name: &str) -> TypeRef {
    TypeRef::named(name)
}

fn project(classes: Vec<ClassDecl>) -> Project {
    let mut source = SourceEntry::new("test.tess", "");
    for class in classes {
        source = source.with_type(class);
    }
    Project::new("Test").with_source(source)
}

fn edges(graph: &CallGraph) -> String {
    let mut out = String::new();
    for (symbol, node) in graph.iter() {
        let callees: Vec<String> = node.edges.iter().map(|e| e.callee.to_string()).collect();
        out.push_str(&format!("{symbol} -> [{}]\n", callees.join(", ")));
    }
    out
}

#[test]
fn function_calls_in_source_order() {
    let owner = ty("Lighting");
    let call = |name: &str| {
        Stmt::expr(Expr::this(owner.clone()).call(
            FunctionKey::new(owner.clone(), name, vec![]),
            vec![],
            TypeRef::void(),
        ))
    };
    let class = ClassDecl::new("Lighting")
        .with_function(FunctionDecl::new("Main").with_body(vec![call("Diffuse"), call("Specular")]))
        .with_function(FunctionDecl::new("Diffuse"))
        .with_function(FunctionDecl::new("Specular").with_body(vec![call("Diffuse")]));

    let graph = CallGraph::build(&project(vec![class]));
    insta::assert_snapshot!(edges(&graph), @r"
    Lighting.Main -> [Lighting.Diffuse, Lighting.Specular]
    Lighting.Diffuse -> []
    Lighting.Specular -> [Lighting.Diffuse]
    ");
}

#[test]
fn property_access_picks_accessors() {
    let owner = ty("Counter");
    let value = || Expr::this(owner.clone()).property("Value", ty("Integer"));
    let class = ClassDecl::new("Counter")
        .with_property(
            PropertyDecl::new("Value", ty("Integer"))
                .with_getter(vec![Stmt::ret(Some(Expr::int(0)))])
                .with_setter(vec![]),
        )
        .with_function(FunctionDecl::new("Read").with_body(vec![Stmt::var(
            "v",
            ty("Integer"),
            Some(value()),
        )]))
        .with_function(
            FunctionDecl::new("Write")
                .with_body(vec![Stmt::expr(Expr::assign(value(), Expr::int(1)))]),
        )
        .with_function(FunctionDecl::new("Bump").with_body(vec![Stmt::expr(Expr::binary(
            BinaryOp::AddAssign,
            value(),
            Expr::int(1),
            ty("Integer"),
        ))]));

    let graph = CallGraph::build(&project(vec![class]));
    insta::assert_snapshot!(edges(&graph), @r"
    Counter.get_Value -> []
    Counter.set_Value -> []
    Counter.Read -> [Counter.get_Value]
    Counter.Write -> [Counter.set_Value]
    Counter.Bump -> [Counter.get_Value, Counter.set_Value]
    ");
}

#[test]
fn construction_references_pre_constructor() {
    let particle = ty("Particle");
    let class = ClassDecl::new("Particle")
        .with_field(FieldDecl::new("Age", ty("Real")).with_initializer(Expr::real(0.0)))
        .with_constructor(FunctionDecl::new("Particle").with_param("age", ty("Real")));
    let user = ClassDecl::new("Emitter")
        .with_function(FunctionDecl::new("Spawn").with_body(vec![Stmt::var(
            "p",
            particle.clone(),
            Some(Expr::construct(particle.clone(), vec![Expr::real(1.0)])),
        )]))
        .with_function(
            FunctionDecl::new("Idle").with_body(vec![Stmt::var("q", particle.clone(), None)]),
        );

    let graph = CallGraph::build(&project(vec![class, user]));
    insta::assert_snapshot!(edges(&graph), @r"
    Particle.PreConstructor -> []
    Particle.Particle -> [Particle.PreConstructor]
    Emitter.Spawn -> [Particle.PreConstructor, Particle.Particle]
    Emitter.Idle -> [Particle.PreConstructor]
    ");
}

#[test]
fn static_field_initializer_is_a_node() {
    let owner = ty("Palette");
    let key = FunctionKey::new(owner.clone(), "Base", vec![]);
    let class = ClassDecl::new("Palette")
        .with_field(
            FieldDecl::new("Tint", ty("Real"))
                .make_static()
                .with_initializer(Expr::static_call(key.clone(), vec![], ty("Real"))),
        )
        .with_function(FunctionDecl::new("Base").make_static().returns(ty("Real")));

    let graph = CallGraph::build(&project(vec![class]));
    let tint = StageSymbol::Field {
        owner: owner.clone(),
        name: "Tint".into(),
    };
    let callees: Vec<_> = graph.internal_edges(&tint).map(|e| e.callee.clone()).collect();
    assert_eq!(callees, vec![StageSymbol::Function(key)]);
    assert!(!graph.contains(&StageSymbol::PreConstructor(owner)));
}

#[test]
fn intrinsic_callees_are_not_internal() {
    let owner = ty("Frag");
    let ddx = FunctionKey::new(ty("Math"), "Ddx", vec![ty("Real")]);
    let class = ClassDecl::new("Frag").with_function(FunctionDecl::new("Main").with_body(vec![
        Stmt::expr(Expr::static_call(ddx, vec![Expr::real(1.0)], ty("Real"))),
    ]));

    let graph = CallGraph::build(&project(vec![class]));
    let main = StageSymbol::Function(FunctionKey::new(owner, "Main", vec![]));
    assert_eq!(graph.node(&main).unwrap().edges.len(), 1);
    assert_eq!(graph.internal_edges(&main).count(), 0);
}
