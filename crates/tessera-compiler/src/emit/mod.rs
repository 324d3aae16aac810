//! SPIR-V emission from translated libraries.
//!
//! Emission of one or more entry points runs in three steps:
//! - **Rewrite**: late-bound placeholders are mapped to the functions each
//!   entry point specialized for them
//! - **Collect**: everything reachable from the entry points, in an order
//!   free of forward references, plus capabilities and SpecIds
//! - **Write**: ids are assigned densely and the module is serialized in
//!   the section order SPIR-V mandates

mod capabilities;
mod collector;
mod emitter;
mod error;
mod ids;
mod invariants;
mod late_bound;
mod specialization;
mod writer;

#[cfg(test)]
mod collector_tests;

pub use collector::{CollectedModule, Declaration, TypeDependencyCollector};
pub use emitter::{EmittedModule, emit};
pub use error::EmitError;
pub use late_bound::LateBoundRewrite;
pub use specialization::{SpecConstantInfo, SpecializationReflection};

/// SPIR-V magic number, first word of every module.
pub const MAGIC: u32 = 0x0723_0203;
/// SPIR-V 1.0.
pub const VERSION: u32 = 0x0001_0000;

/// Converts a little-endian byte stream into words.
pub fn words_from_bytes(bytes: &[u8]) -> Option<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    Some(
        bytes
            .chunks_exact(4)
            .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect(),
    )
}

pub fn bytes_from_words(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_le_bytes()).collect()
}
