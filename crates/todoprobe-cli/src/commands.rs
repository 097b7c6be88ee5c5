//! CLI command definitions using clap

use crate::config::ColorChoice;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use todoprobe::mock::Quirk;
use todoprobe::{AssertionMode, DriverKind};

/// Todoprobe: end-to-end suite for the TodoMVC reference application
#[derive(Parser, Debug)]
#[command(name = "todoprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto, global = true)]
    pub color: ColorChoice,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the TodoMVC scenarios
    Run(RunArgs),

    /// List scenarios without running them
    List(ListArgs),

    /// Show the effective configuration
    Config(ConfigArgs),
}

/// Arguments for the run command
#[derive(Parser, Debug, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct RunArgs {
    /// Configuration file (default: ./todoprobe.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Application address
    #[arg(long)]
    pub base_url: Option<String>,

    /// Automation backend (memory, chromium)
    #[arg(long)]
    pub driver: Option<DriverKind>,

    /// Only run scenarios whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,

    /// Run seed, to replay a previous run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Scenarios run concurrently
    #[arg(short = 'j', long)]
    pub workers: Option<usize>,

    /// Skip remaining scenarios after the first failure
    #[arg(long)]
    pub fail_fast: bool,

    /// Soft assertion behaviour
    #[arg(long)]
    pub assertions: Option<AssertionArg>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the chromium sandbox (containers)
    #[arg(long)]
    pub no_sandbox: bool,

    /// Chromium binary
    #[arg(long)]
    pub chromium_path: Option<PathBuf>,

    /// Output directory for reports and attachments
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Do not capture screenshots
    #[arg(long)]
    pub no_screenshots: bool,

    /// Inject a defect into the in-memory application (repeatable)
    #[arg(long = "quirk")]
    pub quirks: Vec<Quirk>,
}

/// Arguments for the list command
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only list scenarios whose name contains this text
    #[arg(short, long)]
    pub filter: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Configuration file (default: ./todoprobe.yaml when present)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Print built-in defaults, ignoring files and environment
    #[arg(long)]
    pub defaults: bool,
}

/// Assertion mode argument
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum AssertionArg {
    /// Record failures and keep going
    Collect,
    /// Abort the scenario on the first failed expectation
    FailFast,
}

impl From<AssertionArg> for AssertionMode {
    fn from(arg: AssertionArg) -> Self {
        match arg {
            AssertionArg::Collect => Self::Collect,
            AssertionArg::FailFast => Self::FailFast,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("todoprobe").chain(args.iter().copied())).unwrap()
    }

    mod run_args_tests {
        use super::*;

        #[test]
        fn test_run_defaults() {
            let cli = parse(&["run"]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert!(args.seed.is_none());
            assert!(args.quirks.is_empty());
            assert!(!args.fail_fast);
        }

        #[test]
        fn test_run_flags() {
            let cli = parse(&[
                "run",
                "--driver",
                "chromium",
                "--seed",
                "42",
                "-j",
                "3",
                "--quirk",
                "zero-counter",
                "--quirk",
                "accept-empty",
                "--assertions",
                "fail-fast",
                "--headed",
            ]);
            let Commands::Run(args) = cli.command else {
                panic!("expected run");
            };
            assert_eq!(args.driver, Some(DriverKind::Chromium));
            assert_eq!(args.seed, Some(42));
            assert_eq!(args.workers, Some(3));
            assert_eq!(args.quirks, [Quirk::ZeroCounter, Quirk::AcceptEmpty]);
            assert!(matches!(args.assertions, Some(AssertionArg::FailFast)));
            assert!(args.headed);
        }

        #[test]
        fn test_unknown_quirk_rejected() {
            assert!(Cli::try_parse_from(["todoprobe", "run", "--quirk", "flaky"]).is_err());
        }
    }

    mod global_args_tests {
        use super::*;

        #[test]
        fn test_verbosity_counts() {
            let cli = parse(&["-vv", "list"]);
            assert_eq!(cli.verbose, 2);
        }

        #[test]
        fn test_global_flags_after_subcommand() {
            let cli = parse(&["list", "--log-json", "--color", "never"]);
            assert!(cli.log_json);
            assert_eq!(cli.color, ColorChoice::Never);
        }

        #[test]
        fn test_subcommand_required() {
            assert!(Cli::try_parse_from(["todoprobe"]).is_err());
        }
    }
}
