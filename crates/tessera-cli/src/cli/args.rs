//! Shared argument builders for CLI commands.
//!
//! Each function returns a `clap::Arg` that can be composed into commands,
//! so `check`, `composite` and `build` read their inputs the same way.

use std::path::PathBuf;

use clap::{Arg, ArgAction, value_parser};

/// Project JSON file or directory of source JSON files (positional).
pub fn project_path_arg() -> Arg {
    Arg::new("project_path")
        .value_name("PROJECT")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Project JSON file, source directory, or '-' for stdin")
}

/// Shader definition file (--shader).
pub fn shader_arg() -> Arg {
    Arg::new("shader")
        .long("shader")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .conflicts_with("fragments")
        .help("Shader definition JSON (name and fragment list)")
}

/// Inline fragment list (-f/--fragment, repeatable).
pub fn fragment_arg() -> Arg {
    Arg::new("fragments")
        .short('f')
        .long("fragment")
        .value_name("CLASS")
        .action(ArgAction::Append)
        .help("Fragment class to link, in execution order (repeatable)")
}

/// Shader name for inline fragment lists (--name).
pub fn name_arg() -> Arg {
    Arg::new("name")
        .long("name")
        .value_name("NAME")
        .default_value("Shader")
        .help("Shader name when fragments are given inline")
}

/// Compiler settings file (--settings).
pub fn settings_arg() -> Arg {
    Arg::new("settings")
        .long("settings")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Settings JSON (defaults apply when omitted)")
}

/// Color output control (--color).
pub fn color_arg() -> Arg {
    Arg::new("color")
        .long("color")
        .value_name("WHEN")
        .default_value("auto")
        .value_parser(["auto", "always", "never"])
        .help("Colorize output")
}

/// Treat warnings as errors (--strict).
pub fn strict_arg() -> Arg {
    Arg::new("strict")
        .long("strict")
        .action(ArgAction::SetTrue)
        .help("Treat warnings as errors")
}

/// Verbosity level (-v, -vv, -vvv).
pub fn verbose_arg() -> Arg {
    Arg::new("verbose")
        .short('v')
        .action(ArgAction::Count)
        .help("Log level (-v info, -vv debug, -vvv trace)")
}

/// Output directory (-o/--out-dir).
pub fn out_dir_arg() -> Arg {
    Arg::new("out_dir")
        .short('o')
        .long("out-dir")
        .value_name("DIR")
        .default_value(".")
        .value_parser(value_parser!(PathBuf))
        .help("Directory receiving one .spv and .json per stage")
}

/// Write output to file (-o/--output).
pub fn output_file_arg() -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .value_name("FILE")
        .value_parser(value_parser!(PathBuf))
        .help("Write output to file")
}

/// Drop debug names from emitted modules (--strip-debug).
pub fn strip_debug_arg() -> Arg {
    Arg::new("strip_debug")
        .long("strip-debug")
        .action(ArgAction::SetTrue)
        .help("Strip names and line information")
}

/// Validate emitted modules (--validate).
pub fn validate_arg() -> Arg {
    Arg::new("validate")
        .long("validate")
        .action(ArgAction::SetTrue)
        .help("Validate every emitted module")
}

/// SPIR-V binary (positional).
pub fn spirv_path_arg() -> Arg {
    Arg::new("spirv_path")
        .value_name("SPV")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("SPIR-V binary")
}

/// Pipeline stage of a SPIR-V binary (--stage).
pub fn stage_arg() -> Arg {
    Arg::new("stage")
        .long("stage")
        .value_name("STAGE")
        .required(true)
        .value_parser(["vertex", "geometry", "pixel", "compute"])
        .help("Stage the binary was built for")
}

/// GLSL version (--glsl-version).
pub fn glsl_version_arg() -> Arg {
    Arg::new("glsl_version")
        .long("glsl-version")
        .value_name("VERSION")
        .default_value("450")
        .help("Target GLSL version (e.g. 450, 310es)")
}

/// Flip Y and remap depth for GL clip space (--adjust-coordinates).
pub fn adjust_coordinates_arg() -> Arg {
    Arg::new("adjust_coordinates")
        .long("adjust-coordinates")
        .action(ArgAction::SetTrue)
        .help("Convert clip space from Vulkan to GL conventions")
}
