use std::path::PathBuf;

use tessera_compiler::disassemble;

use super::loader::LoadError;
use super::{CommandError, emit_text, exit_with};

pub struct DisasmArgs {
    pub spirv_path: PathBuf,
    pub output: Option<PathBuf>,
}

pub fn run(args: DisasmArgs) {
    let result = disasm(&args).and_then(|text| emit_text(&text, args.output.as_deref()));
    if let Err(err) = result {
        exit_with(err);
    }
}

pub fn disasm(args: &DisasmArgs) -> Result<String, CommandError> {
    let bytes = read_binary(&args.spirv_path)?;
    Ok(disassemble(&bytes)?)
}

pub(super) fn read_binary(path: &std::path::Path) -> Result<Vec<u8>, CommandError> {
    std::fs::read(path).map_err(|source| {
        LoadError::Read {
            path: path.to_path_buf(),
            source,
        }
        .into()
    })
}
