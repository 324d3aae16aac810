//! Static call graph over the syntax tree.
//!
//! Nodes are functions, constructors, property accessors, pre-constructors
//! (instance field initializers) and static fields with initializers. Edges
//! keep source order and the span of the referencing expression.

use indexmap::IndexMap;
use tessera_core::visit::{Access, NodeRef, VisitFlow, Visitor, walk};
use tessera_core::{
    Attribute, ClassDecl, ExprKind, FunctionKey, MemberKind, Project, Span, Stmt, TypeRef,
};
use tessera_ir::StageSymbol;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallEdge {
    pub callee: StageSymbol,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SymbolNode {
    pub span: Span,
    pub attributes: Vec<Attribute>,
    pub edges: Vec<CallEdge>,
}

#[derive(Debug, Clone, Default)]
pub struct CallGraph {
    nodes: IndexMap<StageSymbol, SymbolNode>,
}

impl CallGraph {
    pub fn build(project: &Project) -> Self {
        let user_types: Vec<TypeRef> = project.classes().map(ClassDecl::type_ref).collect();
        let mut ctx = BuildContext::default();
        for class in project.classes() {
            let mut builder = GraphBuilder {
                owner: class.type_ref(),
                class_name: &class.name,
                user_types: &user_types,
            };
            walk(&mut builder, NodeRef::Class(class), &mut ctx);
            debug_assert!(ctx.current.is_empty());
        }
        log::debug!("call graph has {} symbols", ctx.graph.len());
        ctx.graph
    }

    pub fn node(&self, symbol: &StageSymbol) -> Option<&SymbolNode> {
        self.nodes.get(symbol)
    }

    pub fn contains(&self, symbol: &StageSymbol) -> bool {
        self.nodes.contains_key(symbol)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &StageSymbol> {
        self.nodes.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StageSymbol, &SymbolNode)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Callees of `symbol` that are themselves nodes of the graph.
    pub fn internal_edges<'a>(
        &'a self,
        symbol: &StageSymbol,
    ) -> impl Iterator<Item = &'a CallEdge> {
        self.nodes
            .get(symbol)
            .into_iter()
            .flat_map(|n| n.edges.iter())
            .filter(|e| self.nodes.contains_key(&e.callee))
    }

    fn declare(&mut self, symbol: StageSymbol, span: Span, attributes: &[Attribute]) {
        let node = self.nodes.entry(symbol).or_insert_with(|| SymbolNode {
            span,
            attributes: Vec::new(),
            edges: Vec::new(),
        });
        node.attributes.extend(attributes.iter().cloned());
    }

    fn add_edge(&mut self, caller: &StageSymbol, callee: StageSymbol, span: Span) {
        let Some(node) = self.nodes.get_mut(caller) else {
            return;
        };
        let edge = CallEdge { callee, span };
        if !node.edges.contains(&edge) {
            node.edges.push(edge);
        }
    }
}

#[derive(Default)]
struct BuildContext {
    graph: CallGraph,
    current: Vec<StageSymbol>,
}

struct GraphBuilder<'a> {
    owner: TypeRef,
    class_name: &'a str,
    user_types: &'a [TypeRef],
}

impl GraphBuilder<'_> {
    fn is_user_type(&self, ty: &TypeRef) -> bool {
        self.user_types.contains(ty)
    }

    fn enter(
        &self,
        ctx: &mut BuildContext,
        symbol: StageSymbol,
        span: Span,
        attributes: &[Attribute],
    ) {
        ctx.graph.declare(symbol.clone(), span, attributes);
        ctx.current.push(symbol);
    }

    fn reference(&self, ctx: &mut BuildContext, callee: StageSymbol, span: Span) {
        if let Some(caller) = ctx.current.last() {
            let caller = caller.clone();
            ctx.graph.add_edge(&caller, callee, span);
        }
    }

    fn construct(&self, ctx: &mut BuildContext, ty: &TypeRef, args: Vec<TypeRef>, span: Span) {
        if !self.is_user_type(ty) {
            return;
        }
        self.reference(ctx, StageSymbol::PreConstructor(ty.clone()), span);
        if !args.is_empty() {
            let key = FunctionKey::new(ty.clone(), ty.name.clone(), args);
            self.reference(ctx, StageSymbol::Function(key), span);
        }
    }
}

impl<'a> Visitor<'a> for GraphBuilder<'_> {
    type Context = BuildContext;

    fn pre_visit(&mut self, node: NodeRef<'a>, ctx: &mut Self::Context) -> VisitFlow {
        match node {
            NodeRef::Field(field) => {
                let Some(init) = &field.initializer else {
                    return VisitFlow::Skip;
                };
                let symbol = if field.is_static {
                    StageSymbol::Field {
                        owner: self.owner.clone(),
                        name: field.name.clone(),
                    }
                } else {
                    StageSymbol::PreConstructor(self.owner.clone())
                };
                self.enter(ctx, symbol, init.span, &[]);
            }
            NodeRef::Accessor(property, is_setter) => {
                let key = if is_setter {
                    FunctionKey::setter(&self.owner, &property.name, &property.ty)
                } else {
                    FunctionKey::getter(&self.owner, &property.name)
                };
                self.enter(ctx, StageSymbol::Function(key), property.span, &property.attributes);
            }
            NodeRef::Constructor(ctor) => {
                let params = ctor.params.iter().map(|p| p.ty.clone()).collect();
                let key = FunctionKey::new(self.owner.clone(), self.class_name, params);
                self.enter(ctx, StageSymbol::Function(key), ctor.span, &ctor.attributes);
                // Running a constructor default-initializes the instance first.
                self.reference(ctx, StageSymbol::PreConstructor(self.owner.clone()), ctor.span);
            }
            NodeRef::Function(function) => {
                let key = function.key(&self.owner);
                self.enter(ctx, StageSymbol::Function(key), function.span, &function.attributes);
            }
            NodeRef::Stmt(Stmt::Var { ty, init: None, span, .. }) => {
                self.construct(ctx, ty, Vec::new(), *span);
            }
            NodeRef::Expr(expr, access) => match &expr.kind {
                ExprKind::Call { function, .. } => {
                    self.reference(ctx, StageSymbol::Function(function.clone()), expr.span);
                }
                ExprKind::Construct { args } => {
                    let params = args.iter().map(|a| a.ty.clone()).collect();
                    self.construct(ctx, &expr.ty, params, expr.span);
                }
                ExprKind::Member {
                    target,
                    name,
                    kind: MemberKind::Property,
                } => {
                    let owner = &target.ty;
                    if access != Access::Write {
                        let getter = FunctionKey::getter(owner, name);
                        self.reference(ctx, StageSymbol::Function(getter), expr.span);
                    }
                    if access != Access::Read {
                        let setter = FunctionKey::setter(owner, name, &expr.ty);
                        self.reference(ctx, StageSymbol::Function(setter), expr.span);
                    }
                }
                ExprKind::Member {
                    target,
                    name,
                    kind: MemberKind::Field,
                } => {
                    // Reading a static field runs its initializer.
                    if let ExprKind::TypeName { target: owner } = &target.kind {
                        let field = StageSymbol::Field {
                            owner: owner.clone(),
                            name: name.clone(),
                        };
                        self.reference(ctx, field, expr.span);
                    }
                }
                _ => {}
            },
            _ => {}
        }
        VisitFlow::Descend
    }

    fn visit(&mut self, node: NodeRef<'a>, ctx: &mut Self::Context) {
        match node {
            NodeRef::Field(field) if field.initializer.is_some() => {
                ctx.current.pop();
            }
            NodeRef::Accessor(..) | NodeRef::Constructor(_) | NodeRef::Function(_) => {
                ctx.current.pop();
            }
            _ => {}
        }
    }
}
