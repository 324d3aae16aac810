use std::path::PathBuf;

use tessera_compiler::{GlslBackend, GlslVersion};
use tessera_ir::FragmentType;

use super::disasm::read_binary;
use super::{CommandError, emit_text, exit_with};

pub struct GlslArgs {
    pub spirv_path: PathBuf,
    pub stage: FragmentType,
    pub version: String,
    pub adjust_coordinates: bool,
    pub output: Option<PathBuf>,
}

pub fn run(args: GlslArgs) {
    let result = glsl(&args).and_then(|text| emit_text(&text, args.output.as_deref()));
    if let Err(err) = result {
        exit_with(err);
    }
}

pub fn glsl(args: &GlslArgs) -> Result<String, CommandError> {
    let version: GlslVersion = args.version.parse()?;
    let bytes = read_binary(&args.spirv_path)?;
    let backend = GlslBackend {
        adjust_coordinate_space: args.adjust_coordinates,
        ..GlslBackend::default()
    };
    let output = backend.translate(&bytes, args.stage, version)?;
    for uniform in &output.uniforms {
        log::debug!(
            "uniform {} (set {:?}, binding {:?})",
            uniform.glsl_name,
            uniform.descriptor_set,
            uniform.binding
        );
    }
    Ok(output.source)
}
