//! Command builders for the CLI.
//!
//! Each command is built from the shared arg builders in `args.rs`.
//! `composite` and `build` take the same project, shader and settings
//! inputs as `check`.

use clap::Command;

use super::args::*;

/// Build the complete CLI with all subcommands.
pub fn build_cli() -> Command {
    Command::new("tessera")
        .about("Shader fragment compiler: typed syntax tree to SPIR-V")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(check_command())
        .subcommand(composite_command())
        .subcommand(build_command())
        .subcommand(disasm_command())
        .subcommand(glsl_command())
}

/// Project inputs shared by check, composite and build.
fn with_project_args(cmd: Command) -> Command {
    cmd.arg(project_path_arg())
        .arg(settings_arg())
        .arg(color_arg())
        .arg(verbose_arg())
}

/// Shader definition inputs shared by composite and build.
fn with_shader_args(cmd: Command) -> Command {
    cmd.arg(shader_arg()).arg(fragment_arg()).arg(name_arg())
}

/// Translate fragments and report diagnostics.
pub fn check_command() -> Command {
    let cmd = Command::new("check")
        .about("Translate fragments and report diagnostics")
        .override_usage(
            "\
  tessera check <PROJECT>
  tessera check <PROJECT> --settings <FILE>",
        )
        .after_help(
            r#"EXAMPLES:
  tessera check fragments.json                   # one project file
  tessera check fragments/                       # directory of source files
  tessera check fragments.json --strict          # fail on warnings
  tessera check fragments.json --settings s.json # custom settings"#,
        )
        .arg(strict_arg());

    with_project_args(cmd)
}

/// Link fragments into one class per stage and print the generated code.
pub fn composite_command() -> Command {
    let cmd = Command::new("composite")
        .about("Link fragments and print the generated stage classes")
        .override_usage(
            "\
  tessera composite <PROJECT> --shader <FILE>
  tessera composite <PROJECT> -f <CLASS>... [--name <NAME>]",
        )
        .after_help(
            r#"EXAMPLES:
  tessera composite fragments.json --shader lit.json
  tessera composite fragments.json -f Mesh -f Lit --name Lit"#,
        );

    with_shader_args(with_project_args(cmd))
}

/// Compile a shader to one SPIR-V module per stage.
pub fn build_command() -> Command {
    let cmd = Command::new("build")
        .about("Compile a shader to one SPIR-V module per stage")
        .override_usage(
            "\
  tessera build <PROJECT> --shader <FILE> [-o <DIR>]
  tessera build <PROJECT> -f <CLASS>... [--name <NAME>] [-o <DIR>]",
        )
        .after_help(
            r#"EXAMPLES:
  tessera build fragments.json --shader lit.json -o out/
  tessera build fragments.json -f Mesh -f Lit --strip-debug --validate

Each stage writes <SHADER>_<STAGE>.spv and its reflection as
<SHADER>_<STAGE>.json."#,
        )
        .arg(out_dir_arg())
        .arg(strip_debug_arg())
        .arg(validate_arg());

    with_shader_args(with_project_args(cmd))
}

/// Print a SPIR-V binary as text.
pub fn disasm_command() -> Command {
    Command::new("disasm")
        .about("Disassemble a SPIR-V binary")
        .override_usage("  tessera disasm <SPV>")
        .arg(spirv_path_arg())
        .arg(output_file_arg())
        .arg(verbose_arg())
}

/// Cross-compile a SPIR-V binary to GLSL.
pub fn glsl_command() -> Command {
    Command::new("glsl")
        .about("Translate a SPIR-V binary to GLSL")
        .override_usage("  tessera glsl <SPV> --stage <STAGE> [--glsl-version <VERSION>]")
        .after_help(
            r#"EXAMPLES:
  tessera glsl Lit_Pixel.spv --stage pixel
  tessera glsl Lit_Vertex.spv --stage vertex --glsl-version 310es --adjust-coordinates"#,
        )
        .arg(spirv_path_arg())
        .arg(stage_arg())
        .arg(glsl_version_arg())
        .arg(adjust_coordinates_arg())
        .arg(output_file_arg())
        .arg(verbose_arg())
}
