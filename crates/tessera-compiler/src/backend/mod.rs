//! Consumers of emitted SPIR-V: disassembly, GLSL cross-compilation and
//! byte-to-byte passes (strip, freeze, validate).

mod disassembly;
mod error;
mod glsl;
mod passes;

#[cfg(test)]
mod glsl_tests;

pub use disassembly::disassemble;
pub use error::{BackendError, PassError};
pub use glsl::{GlslBackend, GlslOutput, GlslResource, GlslVersion};
pub use passes::{Pass, PassPipeline};

use crate::emit::words_from_bytes;

/// Words of a SPIR-V byte stream, rejecting truncated input.
fn module_words(bytes: &[u8]) -> Result<Vec<u32>, BackendError> {
    words_from_bytes(bytes).ok_or(BackendError::Truncated(bytes.len()))
}
