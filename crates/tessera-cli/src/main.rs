mod cli;
mod commands;
mod logging;

use cli::{BuildParams, CheckParams, CompositeParams, DisasmParams, GlslParams, build_cli};

fn main() {
    let matches = build_cli().get_matches();
    if let Some((_, m)) = matches.subcommand() {
        logging::init(m.get_count("verbose"));
    }

    match matches.subcommand() {
        Some(("check", m)) => {
            let params = CheckParams::from_matches(m);
            commands::check::run(params.into());
        }
        Some(("composite", m)) => {
            let params = CompositeParams::from_matches(m);
            commands::composite::run(params.into());
        }
        Some(("build", m)) => {
            let params = BuildParams::from_matches(m);
            commands::build::run(params.into());
        }
        Some(("disasm", m)) => {
            let params = DisasmParams::from_matches(m);
            commands::disasm::run(params.into());
        }
        Some(("glsl", m)) => {
            let params = GlslParams::from_matches(m);
            commands::glsl::run(params.into());
        }
        _ => unreachable!("clap should have caught this"),
    }
}
