use crate::visit::{Access, NodeRef, VisitFlow, Visitor, walk};
use crate::{
    BinaryOp, ClassDecl, Expr, ExprKind, FieldDecl, FunctionDecl, PropertyDecl, Stmt, TypeRef,
};

fn real() -> TypeRef {
    TypeRef::named("Real")
}

fn sample_class() -> ClassDecl {
    let this = || Expr::this(TypeRef::named("Sample"));
    let body = vec![
        Stmt::var("x", real(), Some(this().property("Gain", real()))),
        Stmt::expr(Expr::assign(
            this().property("Gain", real()),
            Expr::local("x", real()),
        )),
        Stmt::expr(Expr::binary(
            BinaryOp::AddAssign,
            this().field("Offset", real()),
            Expr::real(1.0),
            real(),
        )),
    ];
    ClassDecl::new("Sample")
        .with_field(FieldDecl::new("Offset", real()).with_initializer(Expr::real(2.0)))
        .with_property(
            PropertyDecl::new("Gain", real())
                .with_getter(vec![Stmt::ret(Some(Expr::real(1.0)))])
                .with_setter(vec![]),
        )
        .with_function(FunctionDecl::new("Main").with_body(body))
}

#[derive(Default)]
struct Trace {
    events: Vec<String>,
}

struct Recorder;

impl<'a> Visitor<'a> for Recorder {
    type Context = Trace;

    fn pre_visit(&mut self, node: NodeRef<'a>, ctx: &mut Trace) -> VisitFlow {
        match node {
            NodeRef::Function(f) => ctx.events.push(format!("enter {}", f.name)),
            NodeRef::Accessor(p, setter) => {
                let kind = if setter { "set" } else { "get" };
                ctx.events.push(format!("enter {kind} {}", p.name));
            }
            _ => {}
        }
        VisitFlow::Descend
    }

    fn visit(&mut self, node: NodeRef<'a>, ctx: &mut Trace) {
        if let NodeRef::Expr(expr, access) = node {
            if let ExprKind::Member { name, .. } = &expr.kind {
                ctx.events.push(format!("{name} {access:?}"));
            }
        }
    }
}

#[test]
fn member_access_modes() {
    let class = sample_class();
    let mut trace = Trace::default();
    walk(&mut Recorder, NodeRef::Class(&class), &mut trace);

    assert_eq!(
        trace.events,
        vec![
            "enter get Gain",
            "enter set Gain",
            "enter Main",
            "Gain Read",
            "Gain Write",
            "Offset ReadWrite",
        ]
    );
}

struct SkipFunctions;

impl<'a> Visitor<'a> for SkipFunctions {
    type Context = usize;

    fn pre_visit(&mut self, node: NodeRef<'a>, _ctx: &mut usize) -> VisitFlow {
        match node {
            NodeRef::Function(_) => VisitFlow::Skip,
            _ => VisitFlow::Descend,
        }
    }

    fn visit(&mut self, node: NodeRef<'a>, count: &mut usize) {
        if matches!(node, NodeRef::Expr(_, Access::Read)) {
            *count += 1;
        }
    }
}

#[test]
fn skip_prunes_children() {
    let class = sample_class();
    let mut count = 0;
    walk(&mut SkipFunctions, NodeRef::Class(&class), &mut count);

    // field initializer + getter return value
    assert_eq!(count, 2);
}
