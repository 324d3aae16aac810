use std::fmt::Write;
use std::path::PathBuf;

use super::loader::{ShaderSource, load_shader};
use super::session::Session;
use super::{CommandError, exit_with};

pub struct CompositeArgs {
    pub project_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub shader: Option<ShaderSource>,
    pub color: bool,
}

pub fn run(args: CompositeArgs) {
    match composite(&args) {
        Ok(text) => print!("{text}"),
        Err(err) => exit_with(err),
    }
}

/// Links the shader's fragments and prints each generated stage class.
pub fn composite(args: &CompositeArgs) -> Result<String, CommandError> {
    let session = Session::open(&args.project_path, args.settings_path.as_deref(), args.color)?;
    let def = load_shader(args.shader.as_ref())?;
    let mut shaders = session.shader_project()?;

    let fragments = match shaders.compile_fragments(&session.project) {
        Ok(lib) => lib,
        Err(err) => return Err(session.reject(&shaders, err)),
    };
    let shader = match shaders.composite(&fragments, &def) {
        Ok(shader) => shader,
        Err(err) => return Err(session.reject(&shaders, err)),
    };

    let warnings = shaders.take_diagnostics();
    if !warnings.is_empty() {
        eprint!("{}", session.render(&warnings));
    }

    let mut out = String::new();
    for stage in &shader.stages {
        // Writing into a String cannot fail.
        let _ = writeln!(out, "// {} ({})", stage.class_name, stage.stage.name());
        out.push_str(&stage.source_text);
        if !stage.source_text.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    Ok(out)
}
