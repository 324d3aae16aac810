use std::path::{Path, PathBuf};

use tessera_compiler::{BuiltShader, Pass, PassPipeline};

use super::loader::{ShaderSource, load_shader};
use super::session::Session;
use super::{CommandError, exit_with, write_file};

pub struct BuildArgs {
    pub project_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub shader: Option<ShaderSource>,
    pub out_dir: PathBuf,
    pub strip_debug: bool,
    pub validate: bool,
    pub color: bool,
}

pub fn run(args: BuildArgs) {
    match build(&args) {
        Ok(written) => {
            for path in written {
                log::info!("wrote '{}'", path.display());
            }
        }
        Err(err) => exit_with(err),
    }
}

/// Compiles the shader and writes a binary and a reflection file per stage.
/// Returns the written paths.
pub fn build(args: &BuildArgs) -> Result<Vec<PathBuf>, CommandError> {
    let session = Session::open(&args.project_path, args.settings_path.as_deref(), args.color)?;
    let def = load_shader(args.shader.as_ref())?;
    let mut shaders = session.shader_project()?;

    let fragments = match shaders.compile_fragments(&session.project) {
        Ok(lib) => lib,
        Err(err) => return Err(session.reject(&shaders, err)),
    };
    let built = match shaders.build(fragments, &def) {
        Ok(built) => built,
        Err(err) => return Err(session.reject(&shaders, err)),
    };

    let warnings = shaders.take_diagnostics();
    if !warnings.is_empty() {
        eprint!("{}", session.render(&warnings));
    }

    write_stages(&built, &pipeline(args), &args.out_dir)
}

fn pipeline(args: &BuildArgs) -> PassPipeline {
    let mut pipeline = PassPipeline::new();
    if args.strip_debug {
        pipeline.push(Pass::StripDebugInfo);
    }
    if args.validate {
        pipeline.push(Pass::Validate);
    }
    pipeline
}

fn write_stages(
    built: &BuiltShader,
    pipeline: &PassPipeline,
    out_dir: &Path,
) -> Result<Vec<PathBuf>, CommandError> {
    std::fs::create_dir_all(out_dir).map_err(|source| CommandError::Write {
        path: out_dir.to_path_buf(),
        source,
    })?;

    let mut written = Vec::with_capacity(built.stages.len() * 2);
    for stage in &built.stages {
        let stem = format!("{}_{}", built.name, stage.stage.name());
        let bytes = pipeline.run(&stage.module.to_bytes())?;

        let spv = out_dir.join(format!("{stem}.spv"));
        write_file(&spv, &bytes)?;
        written.push(spv);

        let reflection = serde_json::to_string_pretty(stage)?;
        let json = out_dir.join(format!("{stem}.json"));
        write_file(&json, reflection)?;
        written.push(json);
    }
    Ok(written)
}
