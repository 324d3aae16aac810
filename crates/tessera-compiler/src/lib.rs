//! Tessera compiler: typed syntax tree to SPIR-V.
//!
//! This crate provides the compilation pipeline for tessera shaders:
//! - `analyze` - call graph, recursion and stage-requirement checks
//! - `frontend` - syntax tree to IR translation, entry-point generation
//! - `compositor` - linking fragments into one shader class per stage
//! - `emit` - dependency collection, late-bound rewrite, binary emission
//! - `backend` - disassembly, GLSL and byte-stream passes
//! - `diagnostics` - error reporting
//! - `project` - high-level `ShaderProject` facade

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod analyze;
pub mod backend;
pub mod compositor;
pub mod diagnostics;
pub mod emit;
pub mod frontend;
pub mod intrinsics;
pub mod project;
pub mod settings;

#[cfg(test)]
mod project_tests;
#[cfg(test)]
pub mod test_utils;

/// Result type for passes that produce both output and diagnostics.
///
/// Each pass returns its typed output alongside any diagnostics it collected.
/// Fatal errors (like recursion) use the outer `Result`.
pub type PassResult<T> = std::result::Result<(T, Diagnostics), Error>;

pub use backend::{
    BackendError, GlslBackend, GlslOutput, GlslVersion, Pass, PassError, PassPipeline, disassemble,
};
pub use compositor::{CompositeShader, Compositor, CompositorError, ShaderDefinition};
pub use diagnostics::{Diagnostics, DiagnosticsPrinter, Severity};
pub use emit::{EmitError, EmittedModule, SpecializationReflection, emit};
pub use intrinsics::ShaderIntrinsics;
pub use project::{BuiltShader, BuiltStage, ShaderProject};
pub use settings::{Settings, SettingsError};
pub use tessera_core::{SourceId, Span};

/// Errors that end a compile.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Ir(#[from] tessera_ir::IrError),

    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    #[error("recursion detected ({} errors)", .0.error_count())]
    Recursion(Diagnostics),

    #[error("translation failed with {} errors", .0.error_count())]
    TranslationFailed(Diagnostics),

    #[error("composite failed: {0}")]
    Compositor(#[from] CompositorError),

    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Pass(#[from] PassError),
}

/// Result type for compiler operations.
pub type Result<T> = std::result::Result<T, Error>;
