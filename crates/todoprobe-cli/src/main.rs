//! Todoprobe CLI
//!
//! ## Usage
//!
//! ```bash
//! todoprobe run                          # Whole suite, in-memory backend
//! todoprobe run --driver chromium        # Against the live demo
//! todoprobe run --seed 42 -f "marking"   # Replay part of a run
//! todoprobe list                         # Scenario names
//! todoprobe config                       # Effective configuration
//! ```
//!
//! Exit status: 0 when every scenario passed, 1 when any failed,
//! 2 when the run could not be carried out.

use clap::Parser;
use std::process::ExitCode;
use todoprobe_cli::{execute_config, execute_list, execute_run, logging, Cli, CliConfig, CliResult, Commands};

fn main() -> ExitCode {
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(2)
        }
    }
}

fn run() -> CliResult<bool> {
    let cli = Cli::parse();
    let config = CliConfig::from_cli(&cli);
    logging::init(&config);

    match cli.command {
        Commands::Run(args) => execute_run(&config, &args),
        Commands::List(args) => {
            execute_list(&config, &args);
            Ok(true)
        }
        Commands::Config(args) => {
            execute_config(&args)?;
            Ok(true)
        }
    }
}
