use clap::Parser;

use ccon::cli::Cli;
use ccon::{config, logging, orchestrator};

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let code = match config::load(&cli).and_then(|config| orchestrator::run(&config)) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            1
        }
    };
    std::process::exit(code);
}
