//! Dispatch logic: extract params from ArgMatches and convert to command args.
//!
//! This module contains:
//! - `*Params` structs that mirror command `*Args` but are populated from clap
//! - `from_matches()` extractors
//! - `Into<*Args>` impls to bridge dispatch and command handlers

use std::path::PathBuf;

use clap::ArgMatches;
use tessera_ir::FragmentType;

use super::ColorChoice;
use crate::commands::build::BuildArgs;
use crate::commands::check::CheckArgs;
use crate::commands::composite::CompositeArgs;
use crate::commands::disasm::DisasmArgs;
use crate::commands::glsl::GlslArgs;
use crate::commands::loader::ShaderSource;

pub struct CheckParams {
    pub project_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub strict: bool,
    pub color: ColorChoice,
}

impl CheckParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            project_path: project_path(m),
            settings_path: m.get_one::<PathBuf>("settings").cloned(),
            strict: m.get_flag("strict"),
            color: parse_color(m),
        }
    }
}

impl From<CheckParams> for CheckArgs {
    fn from(p: CheckParams) -> Self {
        Self {
            project_path: p.project_path,
            settings_path: p.settings_path,
            strict: p.strict,
            color: p.color.should_colorize(),
        }
    }
}

pub struct CompositeParams {
    pub project_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub shader: Option<ShaderSource>,
    pub color: ColorChoice,
}

impl CompositeParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            project_path: project_path(m),
            settings_path: m.get_one::<PathBuf>("settings").cloned(),
            shader: parse_shader(m),
            color: parse_color(m),
        }
    }
}

impl From<CompositeParams> for CompositeArgs {
    fn from(p: CompositeParams) -> Self {
        Self {
            project_path: p.project_path,
            settings_path: p.settings_path,
            shader: p.shader,
            color: p.color.should_colorize(),
        }
    }
}

pub struct BuildParams {
    pub project_path: PathBuf,
    pub settings_path: Option<PathBuf>,
    pub shader: Option<ShaderSource>,
    pub out_dir: PathBuf,
    pub strip_debug: bool,
    pub validate: bool,
    pub color: ColorChoice,
}

impl BuildParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            project_path: project_path(m),
            settings_path: m.get_one::<PathBuf>("settings").cloned(),
            shader: parse_shader(m),
            out_dir: m
                .get_one::<PathBuf>("out_dir")
                .cloned()
                .unwrap_or_else(|| PathBuf::from(".")),
            strip_debug: m.get_flag("strip_debug"),
            validate: m.get_flag("validate"),
            color: parse_color(m),
        }
    }
}

impl From<BuildParams> for BuildArgs {
    fn from(p: BuildParams) -> Self {
        Self {
            project_path: p.project_path,
            settings_path: p.settings_path,
            shader: p.shader,
            out_dir: p.out_dir,
            strip_debug: p.strip_debug,
            validate: p.validate,
            color: p.color.should_colorize(),
        }
    }
}

pub struct DisasmParams {
    pub spirv_path: PathBuf,
    pub output: Option<PathBuf>,
}

impl DisasmParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            spirv_path: spirv_path(m),
            output: m.get_one::<PathBuf>("output").cloned(),
        }
    }
}

impl From<DisasmParams> for DisasmArgs {
    fn from(p: DisasmParams) -> Self {
        Self {
            spirv_path: p.spirv_path,
            output: p.output,
        }
    }
}

pub struct GlslParams {
    pub spirv_path: PathBuf,
    pub stage: FragmentType,
    pub version: String,
    pub adjust_coordinates: bool,
    pub output: Option<PathBuf>,
}

impl GlslParams {
    pub fn from_matches(m: &ArgMatches) -> Self {
        Self {
            spirv_path: spirv_path(m),
            stage: parse_stage(m),
            version: m
                .get_one::<String>("glsl_version")
                .cloned()
                .unwrap_or_else(|| "450".to_string()),
            adjust_coordinates: m.get_flag("adjust_coordinates"),
            output: m.get_one::<PathBuf>("output").cloned(),
        }
    }
}

impl From<GlslParams> for GlslArgs {
    fn from(p: GlslParams) -> Self {
        Self {
            spirv_path: p.spirv_path,
            stage: p.stage,
            version: p.version,
            adjust_coordinates: p.adjust_coordinates,
            output: p.output,
        }
    }
}

// Required positionals; clap rejects the command line before these run empty.
fn project_path(m: &ArgMatches) -> PathBuf {
    m.get_one::<PathBuf>("project_path").cloned().unwrap_or_default()
}

fn spirv_path(m: &ArgMatches) -> PathBuf {
    m.get_one::<PathBuf>("spirv_path").cloned().unwrap_or_default()
}

/// `--shader` wins; otherwise `-f` values form an inline definition.
fn parse_shader(m: &ArgMatches) -> Option<ShaderSource> {
    if let Some(path) = m.get_one::<PathBuf>("shader") {
        return Some(ShaderSource::File(path.clone()));
    }
    let fragments: Vec<String> = m.get_many::<String>("fragments")?.cloned().collect();
    let name = m
        .get_one::<String>("name")
        .cloned()
        .unwrap_or_else(|| "Shader".to_string());
    Some(ShaderSource::Inline { name, fragments })
}

fn parse_stage(m: &ArgMatches) -> FragmentType {
    match m.get_one::<String>("stage").map(|s| s.as_str()) {
        Some("vertex") => FragmentType::Vertex,
        Some("geometry") => FragmentType::Geometry,
        Some("pixel") => FragmentType::Pixel,
        Some("compute") => FragmentType::Compute,
        _ => FragmentType::None,
    }
}

fn parse_color(m: &ArgMatches) -> ColorChoice {
    match m.get_one::<String>("color").map(|s| s.as_str()) {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}
