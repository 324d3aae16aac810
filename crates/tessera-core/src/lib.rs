#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Typed syntax tree for the tessera shading language.
//!
//! The parser and type-checker live in the host; this crate only defines the
//! data they hand over:
//! - **Syntax**: classes, fields, properties, functions, statements and
//!   expressions, each expression carrying its resolved type
//! - **Symbols**: structural keys (`TypeRef`, `FunctionKey`, `FieldKey`)
//! - **Traversal**: a two-phase visitor and a source printer

mod attributes;
mod build;
pub mod printer;
mod span;
pub mod syntax;
mod types;
pub mod visit;

#[cfg(test)]
mod printer_tests;
#[cfg(test)]
mod syntax_tests;
#[cfg(test)]
mod visit_tests;

pub use attributes::{Attribute, AttributeList, AttributeParam, AttributeValue};
pub use printer::SourcePrinter;
pub use span::{SourceId, Span};
pub use syntax::{
    BinaryOp, ClassDecl, EnumDecl, EnumValue, Expr, ExprKind, FieldDecl, FunctionDecl, Literal,
    MemberKind, Param, Project, PropertyDecl, SourceEntry, Stmt, TypeDecl, UnaryOp,
};
pub use types::{FieldKey, FunctionKey, TemplateArg, TypeRef, TypeRefError};
