//! Log setup.
//!
//! Logs go to stderr so they never mix with command output on stdout.
//! `RUST_LOG` wins over the verbosity flags.

use crate::config::CliConfig;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &CliConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.verbosity.default_log_filter()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = if config.log_json {
        builder.json().try_init()
    } else {
        builder.with_ansi(config.color.should_color()).try_init()
    };
    if installed.is_err() {
        tracing::debug!("log subscriber already installed");
    }
}
