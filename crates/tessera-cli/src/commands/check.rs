use std::path::PathBuf;

use super::session::Session;
use super::{CommandError, exit_with};

pub struct CheckArgs {
    pub project_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub strict: bool,
    pub color: bool,
}

pub fn run(args: CheckArgs) {
    match check(&args) {
        // Silent on a clean project (like cargo check)
        Ok(None) => {}
        Ok(Some(warnings)) => eprint!("{warnings}"),
        Err(err) => exit_with(err),
    }
}

/// Translates the project's fragments. Returns rendered warnings, if any.
pub fn check(args: &CheckArgs) -> Result<Option<String>, CommandError> {
    let session = Session::open(&args.project_path, args.settings_path.as_deref(), args.color)?;
    let mut shaders = session.shader_project()?;

    if let Err(err) = shaders.compile_fragments(&session.project) {
        return Err(session.reject(&shaders, err));
    }

    let diagnostics = shaders.take_diagnostics();
    if diagnostics.is_empty() {
        return Ok(None);
    }
    let rendered = session.render(&diagnostics);
    if args.strict {
        return Err(CommandError::Rejected {
            message: format!("{} warnings with --strict", diagnostics.warning_count()),
            rendered,
        });
    }
    Ok(Some(rendered))
}
