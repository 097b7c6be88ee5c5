//! Result and error types for todoprobe.

use thiserror::Error;

/// Result type for todoprobe operations
pub type ProbeResult<T> = Result<T, ProbeError>;

/// Errors that can occur while driving the application under test.
///
/// Every variant is fatal to the scenario that raised it. Expectation
/// failures are not errors: they are collected by
/// [`SoftAssertions`](crate::SoftAssertions) and evaluated when the
/// scenario ends.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// Browser executable not found
    #[error("Browser not found. Install Chromium or set CHROMIUM_PATH")]
    BrowserNotFound,

    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunch {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    Page {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    Navigation {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// No element matched the locator within the element timeout
    #[error("Control not found: {locator} (waited {timeout_ms}ms)")]
    ControlNotFound {
        /// Locator description
        locator: String,
        /// Timeout in milliseconds
        timeout_ms: u64,
    },

    /// The element matched but could not receive the interaction
    #[error("Control not interactable: {locator}: {reason}")]
    NotInteractable {
        /// Locator description
        locator: String,
        /// Why the interaction was refused
        reason: String,
    },

    /// An action locator resolved to more than one element
    #[error("Strict mode violation: {locator} resolved to {count} elements")]
    StrictModeViolation {
        /// Locator description
        locator: String,
        /// Number of matched elements
        count: usize,
    },

    /// Selector could not be parsed or evaluated
    #[error("Invalid selector '{selector}': {message}")]
    InvalidSelector {
        /// Selector source
        selector: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// Script evaluation error
    #[error("Script evaluation failed: {message}")]
    Script {
        /// Error message
        message: String,
    },

    /// Expectation failed while assertions run in fail-fast mode
    #[error("Assertion failed: {message}")]
    Assertion {
        /// Failure message
        message: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    Screenshot {
        /// Error message
        message: String,
    },

    /// Session setup or teardown failed
    #[error("Session error: {message}")]
    Session {
        /// Error message
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
}

impl ProbeError {
    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::Page {
            message: message.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether this error comes from resolving or acting on a control
    #[must_use]
    pub const fn is_control_failure(&self) -> bool {
        matches!(
            self,
            Self::ControlNotFound { .. }
                | Self::NotInteractable { .. }
                | Self::StrictModeViolation { .. }
                | Self::Timeout { .. }
        )
    }
}
