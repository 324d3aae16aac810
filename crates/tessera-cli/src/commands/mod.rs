pub mod build;
pub mod check;
pub mod composite;
pub mod disasm;
pub mod glsl;
pub mod loader;
mod session;

#[cfg(test)]
mod build_tests;
#[cfg(test)]
mod check_tests;
#[cfg(test)]
mod loader_tests;
#[cfg(test)]
mod test_fixtures;

use std::io;
use std::path::{Path, PathBuf};

use tessera_compiler::{BackendError, PassError};

use loader::LoadError;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Compile(#[from] tessera_compiler::Error),

    /// A step failed and left diagnostics worth showing before the error.
    #[error("{message}")]
    Rejected { message: String, rendered: String },

    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Pass(#[from] PassError),

    #[error("failed to serialize reflection: {0}")]
    Reflection(#[from] serde_json::Error),

    #[error("failed to write '{}': {source}", path.display())]
    Write { path: PathBuf, source: io::Error },
}

/// Prints `err` the way every command reports failure and exits.
pub fn exit_with(err: CommandError) -> ! {
    if let CommandError::Rejected { rendered, .. } = &err {
        eprint!("{rendered}");
    }
    eprintln!("error: {err}");
    std::process::exit(1);
}

fn write_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<(), CommandError> {
    std::fs::write(path, contents).map_err(|source| CommandError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes `text` to `output`, or stdout when no file is given.
fn emit_text(text: &str, output: Option<&Path>) -> Result<(), CommandError> {
    match output {
        Some(path) => write_file(path, text),
        None => {
            print!("{text}");
            Ok(())
        }
    }
}
