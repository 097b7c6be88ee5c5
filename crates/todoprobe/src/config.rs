//! Run configuration.
//!
//! Values are layered: built-in defaults, then a YAML file
//! (`todoprobe.yaml` in the working directory, or an explicit path), then
//! environment variables, then command-line flags applied by the caller.

use crate::assertion::AssertionMode;
use crate::driver::Timeouts;
use crate::mock::Quirk;
use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Address of the reference application
pub const DEFAULT_BASE_URL: &str = "https://demo.playwright.dev/todomvc/#/";

/// File picked up from the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "todoprobe.yaml";

/// Environment variable overriding `base_url`
pub const ENV_BASE_URL: &str = "TODOPROBE_BASE_URL";

/// Environment variable overriding `seed`
pub const ENV_SEED: &str = "TODOPROBE_SEED";

/// Upper bound on concurrent scenarios
pub const MAX_WORKERS: usize = 64;

/// Automation backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriverKind {
    /// In-memory TodoMVC model
    #[default]
    Memory,
    /// Real Chromium over CDP
    Chromium,
}

impl fmt::Display for DriverKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Memory => "memory",
            Self::Chromium => "chromium",
        })
    }
}

impl FromStr for DriverKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "chromium" | "chrome" => Ok(Self::Chromium),
            other => Err(format!("unknown driver '{other}' (expected memory or chromium)")),
        }
    }
}

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrowserSettings {
    /// Run in headless mode
    pub headless: bool,
    /// Viewport width
    pub viewport_width: u32,
    /// Viewport height
    pub viewport_height: u32,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<PathBuf>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1280,
            viewport_height: 720,
            chromium_path: None,
            sandbox: true,
        }
    }
}

/// Effective configuration of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Application address every scenario starts from
    pub base_url: String,
    /// Run seed; drawn at random when absent
    pub seed: Option<u64>,
    /// Scenarios run concurrently
    pub workers: usize,
    /// Skip remaining scenarios after the first failure
    pub fail_fast: bool,
    /// Where reports and attachments are written
    pub output_dir: PathBuf,
    /// Capture screenshots at checkpoints
    pub screenshots: bool,
    /// Automation backend
    pub driver: DriverKind,
    /// Soft assertion behaviour inside a scenario
    pub assertion_mode: AssertionMode,
    /// Defects injected into the in-memory application
    pub quirks: Vec<Quirk>,
    /// Browser launch settings
    pub browser: BrowserSettings,
    /// Wait tuning
    pub timeouts: Timeouts,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            seed: None,
            workers: 1,
            fail_fast: false,
            output_dir: PathBuf::from("target/todoprobe"),
            screenshots: true,
            driver: DriverKind::Memory,
            assertion_mode: AssertionMode::Collect,
            quirks: Vec::new(),
            browser: BrowserSettings::default(),
            timeouts: Timeouts::default(),
        }
    }
}

impl RunConfig {
    /// Parse YAML; missing keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        Ok(serde_yaml_ng::from_str(yaml)?)
    }

    /// Read a YAML file
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            ProbeError::config(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_yaml_str(&text)
    }

    /// Defaults overlaid with `explicit`, or with `todoprobe.yaml` in `dir` if present
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> ProbeResult<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = dir.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    Self::from_file(&candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Apply overrides from an environment lookup
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> ProbeResult<()> {
        if let Some(url) = lookup(ENV_BASE_URL).filter(|v| !v.is_empty()) {
            self.base_url = url;
        }
        if let Some(seed) = lookup(ENV_SEED).filter(|v| !v.is_empty()) {
            let parsed = seed
                .trim()
                .parse()
                .map_err(|_| ProbeError::config(format!("{ENV_SEED} must be an integer, got '{seed}'")))?;
            self.seed = Some(parsed);
        }
        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_process_env(&mut self) -> ProbeResult<()> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Reject values no run can use
    pub fn validate(&self) -> ProbeResult<()> {
        if self.workers == 0 {
            return Err(ProbeError::config("workers must be at least 1"));
        }
        if self.workers > MAX_WORKERS {
            return Err(ProbeError::config(format!(
                "workers must be at most {MAX_WORKERS}, got {}",
                self.workers
            )));
        }
        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            return Err(ProbeError::config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }
        if self.timeouts.poll_interval.is_zero() {
            return Err(ProbeError::config("timeouts.poll_interval must be positive"));
        }
        if !self.quirks.is_empty() && self.driver != DriverKind::Memory {
            return Err(ProbeError::config(
                "quirks only apply to the memory driver",
            ));
        }
        Ok(())
    }

    /// Serialize as YAML
    pub fn to_yaml(&self) -> ProbeResult<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }
}
