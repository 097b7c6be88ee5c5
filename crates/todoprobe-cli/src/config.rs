//! Presentation settings resolved from the global flags

use crate::commands::Cli;
use clap::ValueEnum;

/// How much the CLI says
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// `-q`: failures and the summary of a failed run only
    Quiet,
    /// Progress, results and summary
    #[default]
    Normal,
    /// `-v`: hooks in `list`, info logs from the suite
    Verbose,
    /// `-vv` and up
    Debug,
}

impl Verbosity {
    /// From the `-q` flag and the number of `-v` flags
    #[must_use]
    pub const fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Debug,
        }
    }

    /// `-q` given
    #[must_use]
    pub const fn is_quiet(self) -> bool {
        matches!(self, Self::Quiet)
    }

    /// At least one `-v`
    #[must_use]
    pub const fn is_verbose(self) -> bool {
        matches!(self, Self::Verbose | Self::Debug)
    }

    /// Log filter used when `RUST_LOG` is not set
    #[must_use]
    pub const fn default_log_filter(self) -> &'static str {
        match self {
            Self::Quiet => "error",
            Self::Normal => "warn",
            Self::Verbose => "todoprobe=info,warn",
            Self::Debug => "todoprobe=debug,info",
        }
    }
}

/// `--color`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorChoice {
    /// Color when stderr is a terminal
    #[default]
    Auto,
    /// Color even when piped
    Always,
    /// Plain text
    Never,
}

impl ColorChoice {
    /// Auto checks stderr, where progress and logs go
    #[must_use]
    pub fn should_color(self) -> bool {
        match self {
            Self::Always => true,
            Self::Never => false,
            Self::Auto => std::io::IsTerminal::is_terminal(&std::io::stderr()),
        }
    }
}

/// Resolved global flags
#[derive(Debug, Clone, Copy, Default)]
pub struct CliConfig {
    /// From `-q` and `-v`
    pub verbosity: Verbosity,
    /// From `--color`
    pub color: ColorChoice,
    /// JSON log lines instead of the human format
    pub log_json: bool,
}

impl CliConfig {
    /// Read the global flags
    #[must_use]
    pub const fn from_cli(cli: &Cli) -> Self {
        Self {
            verbosity: Verbosity::from_flags(cli.quiet, cli.verbose),
            color: cli.color,
            log_json: cli.log_json,
        }
    }
}
