use rspirv::binary::Disassemble;

use super::{BackendError, module_words};

/// Textual form of a module, one instruction per line.
pub fn disassemble(bytes: &[u8]) -> Result<String, BackendError> {
    let words = module_words(bytes)?;
    let module = rspirv::dr::load_words(words)
        .map_err(|e| BackendError::InvalidBinary(format!("{e:?}")))?;
    Ok(module.disassemble())
}
