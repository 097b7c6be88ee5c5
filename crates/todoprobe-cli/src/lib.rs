//! Todoprobe CLI library
//!
//! Command-line front end for the todoprobe TodoMVC suite: argument parsing,
//! configuration layering, progress output and log setup.

#![warn(missing_docs)]

mod commands;
mod config;
mod error;
pub mod logging;
mod output;
mod runner;

pub use commands::{AssertionArg, Cli, Commands, ConfigArgs, ListArgs, RunArgs};
pub use config::{CliConfig, ColorChoice, Verbosity};
pub use error::{CliError, CliResult};
pub use output::ProgressReporter;
pub use runner::{apply_args, execute_config, execute_list, execute_run, resolve_config};
