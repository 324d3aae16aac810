//! Two-phase visitor over the syntax tree.
//!
//! `walk` dispatches on the node tag: `pre_visit` runs before the children
//! and may skip them, `visit` runs after. Visitors carry their mutable state
//! in an explicit context value rather than in the walker.

use crate::syntax::{
    ClassDecl, EnumDecl, Expr, ExprKind, FieldDecl, FunctionDecl, PropertyDecl, Stmt, TypeDecl,
};

/// How an expression is used by its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Read,
    /// Left side of `=`.
    Write,
    /// Left side of a compound assignment or operand of `++`/`--`.
    ReadWrite,
}

#[derive(Debug, Clone, Copy)]
pub enum NodeRef<'a> {
    Class(&'a ClassDecl),
    Enum(&'a EnumDecl),
    Field(&'a FieldDecl),
    Property(&'a PropertyDecl),
    /// Property accessor bodies; `true` for the setter.
    Accessor(&'a PropertyDecl, bool),
    Constructor(&'a FunctionDecl),
    Function(&'a FunctionDecl),
    Stmt(&'a Stmt),
    Expr(&'a Expr, Access),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitFlow {
    Descend,
    Skip,
}

pub trait Visitor<'a> {
    type Context;

    fn pre_visit(&mut self, _node: NodeRef<'a>, _ctx: &mut Self::Context) -> VisitFlow {
        VisitFlow::Descend
    }

    fn visit(&mut self, _node: NodeRef<'a>, _ctx: &mut Self::Context) {}
}

pub fn walk_type<'a, V: Visitor<'a>>(v: &mut V, decl: &'a TypeDecl, ctx: &mut V::Context) {
    match decl {
        TypeDecl::Class(class) => walk(v, NodeRef::Class(class), ctx),
        TypeDecl::Enum(e) => walk(v, NodeRef::Enum(e), ctx),
    }
}

pub fn walk<'a, V: Visitor<'a>>(v: &mut V, node: NodeRef<'a>, ctx: &mut V::Context) {
    if v.pre_visit(node, ctx) == VisitFlow::Skip {
        return;
    }

    match node {
        NodeRef::Class(class) => {
            for field in &class.fields {
                walk(v, NodeRef::Field(field), ctx);
            }
            for property in &class.properties {
                walk(v, NodeRef::Property(property), ctx);
            }
            for ctor in &class.constructors {
                walk(v, NodeRef::Constructor(ctor), ctx);
            }
            for function in &class.functions {
                walk(v, NodeRef::Function(function), ctx);
            }
        }
        NodeRef::Enum(_) => {}
        NodeRef::Field(field) => {
            if let Some(init) = &field.initializer {
                walk(v, NodeRef::Expr(init, Access::Read), ctx);
            }
        }
        NodeRef::Property(property) => {
            if property.get.is_some() {
                walk(v, NodeRef::Accessor(property, false), ctx);
            }
            if property.set.is_some() {
                walk(v, NodeRef::Accessor(property, true), ctx);
            }
        }
        NodeRef::Accessor(property, is_setter) => {
            let body = if is_setter { &property.set } else { &property.get };
            walk_block(v, body.as_deref().unwrap_or_default(), ctx);
        }
        NodeRef::Constructor(f) | NodeRef::Function(f) => walk_block(v, &f.body, ctx),
        NodeRef::Stmt(stmt) => walk_stmt_children(v, stmt, ctx),
        NodeRef::Expr(expr, _) => walk_expr_children(v, expr, ctx),
    }

    v.visit(node, ctx);
}

fn read(expr: &Expr) -> NodeRef<'_> {
    NodeRef::Expr(expr, Access::Read)
}

pub fn walk_block<'a, V: Visitor<'a>>(v: &mut V, body: &'a [Stmt], ctx: &mut V::Context) {
    for stmt in body {
        walk(v, NodeRef::Stmt(stmt), ctx);
    }
}

fn walk_stmt_children<'a, V: Visitor<'a>>(v: &mut V, stmt: &'a Stmt, ctx: &mut V::Context) {
    match stmt {
        Stmt::Var { init, .. } => {
            if let Some(init) = init {
                walk(v, read(init), ctx);
            }
        }
        Stmt::Expr { expr, .. } => walk(v, read(expr), ctx),
        Stmt::If {
            cond,
            then,
            else_body,
            ..
        } => {
            walk(v, read(cond), ctx);
            walk_block(v, then, ctx);
            if let Some(else_body) = else_body {
                walk_block(v, else_body, ctx);
            }
        }
        Stmt::While { cond, body, .. } => {
            walk(v, read(cond), ctx);
            walk_block(v, body, ctx);
        }
        Stmt::DoWhile { body, cond, .. } => {
            walk_block(v, body, ctx);
            walk(v, read(cond), ctx);
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
            ..
        } => {
            if let Some(init) = init {
                walk(v, NodeRef::Stmt(init), ctx);
            }
            if let Some(cond) = cond {
                walk(v, read(cond), ctx);
            }
            walk_block(v, body, ctx);
            if let Some(step) = step {
                walk(v, read(step), ctx);
            }
        }
        Stmt::Loop { body, .. } | Stmt::Scope { body, .. } => walk_block(v, body, ctx),
        Stmt::Return { value, .. } => {
            if let Some(value) = value {
                walk(v, read(value), ctx);
            }
        }
        Stmt::Break { .. } | Stmt::Continue { .. } => {}
    }
}

fn walk_expr_children<'a, V: Visitor<'a>>(v: &mut V, expr: &'a Expr, ctx: &mut V::Context) {
    match &expr.kind {
        ExprKind::Literal { .. } | ExprKind::Local { .. } | ExprKind::This => {}
        ExprKind::TypeName { .. } => {}
        ExprKind::Member { target, .. } => walk(v, read(target), ctx),
        ExprKind::Call { target, args, .. } => {
            if let Some(target) = target {
                walk(v, read(target), ctx);
            }
            for arg in args {
                walk(v, read(arg), ctx);
            }
        }
        ExprKind::Construct { args } => {
            for arg in args {
                walk(v, read(arg), ctx);
            }
        }
        ExprKind::Binary { op, lhs, rhs } => {
            let access = if op.compound_base().is_some() {
                Access::ReadWrite
            } else if op.is_assignment() {
                Access::Write
            } else {
                Access::Read
            };
            walk(v, NodeRef::Expr(lhs, access), ctx);
            walk(v, read(rhs), ctx);
        }
        ExprKind::Unary { op, operand } => {
            let access = match op {
                crate::UnaryOp::Increment | crate::UnaryOp::Decrement => Access::ReadWrite,
                _ => Access::Read,
            };
            walk(v, NodeRef::Expr(operand, access), ctx);
        }
        ExprKind::Cast { operand } => walk(v, read(operand), ctx),
        ExprKind::Index { target, index } => {
            walk(v, read(target), ctx);
            walk(v, read(index), ctx);
        }
    }
}
