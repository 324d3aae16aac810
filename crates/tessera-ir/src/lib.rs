#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Intermediate representation for the tessera shader compiler.
//!
//! This crate contains:
//! - IR nodes (types, ops, blocks, functions) stored in per-library arenas
//! - `Library` and `Module`, the units of compilation and dependency
//! - Resolver tables mapping source symbols onto IR construction strategies
//! - Stage requirements, reflection metadata and entry-point descriptions

mod dump;
mod entry_point;
mod error;
mod ids;
mod invariants;
mod library;
mod meta;
mod module;
mod node;
pub mod resolvers;
mod stage;
mod types;

#[cfg(test)]
mod dump_tests;
#[cfg(test)]
mod library_tests;
#[cfg(test)]
mod module_tests;

pub use rspirv::spirv;

pub use dump::dump_function;
pub use entry_point::{
    EntryPointInfo, InterfaceVariable, ResourceReflection, ShaderReflection,
    UniformBlockReflection, UniformMemberReflection,
};
pub use error::IrError;
pub use ids::{BlockId, ExtImportId, FunctionId, LibraryId, OpId, TypeId};
pub use library::{FragmentSharedKey, Library, SpecConstantKey};
pub use meta::{FieldMeta, FragmentType, FunctionMeta, TypeMeta};
pub use module::Module;
pub use node::{
    Block, BlockKind, Decoration, DecorationTarget, ExtImport, Function, Op, Operand,
    is_constant, is_terminator,
};
pub use resolvers::{InstructionResolver, Primitive, TemplateResolver};
pub use stage::{ShaderStages, StageRequirementsData, StageSymbol};
pub use types::{Member, Type, TypeKind};
