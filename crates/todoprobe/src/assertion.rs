//! Soft assertions.
//!
//! Collect assertion failures without stopping the scenario. Each failure
//! remembers the step it was recorded in, so a failed scenario can report
//! which step and which expectation broke.

use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What one evaluation of an expectation found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// The page shows what was expected
    Holds,
    /// It does not, and this is what was seen instead
    Broken(String),
}

impl Verdict {
    /// `Holds` iff `condition`; the message is only built on failure
    pub fn holds_if(condition: bool, describe: impl FnOnce() -> String) -> Self {
        if condition {
            Self::Holds
        } else {
            Self::Broken(describe())
        }
    }

    /// Whether the expectation held
    #[must_use]
    pub const fn holds(&self) -> bool {
        matches!(self, Self::Holds)
    }
}

/// A broken expectation, attributed to the step that was running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionFailure {
    /// What was expected and what was seen
    pub message: String,
    /// Step running when it broke
    pub step: Option<String>,
    /// Position among this scenario's failures
    pub index: usize,
}

impl AssertionFailure {
    /// Failure outside any step
    #[must_use]
    pub fn new(message: impl Into<String>, index: usize) -> Self {
        Self {
            message: message.into(),
            step: None,
            index,
        }
    }

    /// Attribute to a step
    #[must_use]
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }
}

impl fmt::Display for AssertionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            Some(step) => write!(f, "[{step}] {}", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// How a broken expectation affects its scenario
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AssertionMode {
    /// Record it and keep going
    #[default]
    Collect,
    /// The first one ends the scenario
    FailFast,
}

/// Per-scenario collector of expectation outcomes
///
/// ```
/// use todoprobe::{SoftAssertions, Verdict};
///
/// let mut soft = SoftAssertions::new();
/// soft.set_step("Adds a new item");
/// soft.record(Verdict::Broken("expected first item 'Desk Lamp', found 'Lamp'".into()));
/// soft.record(Verdict::Holds);
/// assert_eq!(soft.summary().failed, 1);
/// assert_eq!(soft.failures()[0].step.as_deref(), Some("Adds a new item"));
/// ```
#[derive(Debug, Default)]
pub struct SoftAssertions {
    failures: Vec<AssertionFailure>,
    mode: AssertionMode,
    checked: usize,
    step: Option<String>,
}

impl SoftAssertions {
    /// Collecting collector
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Collector with an explicit mode
    #[must_use]
    pub fn with_mode(mode: AssertionMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    /// The assertion mode
    #[must_use]
    pub const fn mode(&self) -> AssertionMode {
        self.mode
    }

    /// Attribute subsequent failures to `step`
    pub fn set_step(&mut self, step: impl Into<String>) {
        self.step = Some(step.into());
    }

    /// Count one evaluated expectation, keeping it if broken
    pub fn record(&mut self, verdict: Verdict) {
        self.checked += 1;
        if let Verdict::Broken(message) = verdict {
            self.push(message);
        }
    }

    /// Record a failure that was not produced by a polled expectation
    pub fn fail(&mut self, message: impl Into<String>) {
        self.checked += 1;
        self.push(message.into());
    }

    fn push(&mut self, message: String) {
        tracing::warn!(step = self.step.as_deref().unwrap_or(""), %message, "soft assertion failed");
        let failure = AssertionFailure {
            message,
            step: self.step.clone(),
            index: self.failures.len(),
        };
        self.failures.push(failure);
    }

    /// In fail-fast mode, escalate the first failure to an error
    pub fn check_fail_fast(&self) -> ProbeResult<()> {
        match (self.mode, self.failures.first()) {
            (AssertionMode::FailFast, Some(first)) => Err(ProbeError::Assertion {
                message: first.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Failures so far, in order
    #[must_use]
    pub fn failures(&self) -> &[AssertionFailure] {
        &self.failures
    }

    /// Hand the failures over to the outcome, leaving the collector empty
    pub fn take_failures(&mut self) -> Vec<AssertionFailure> {
        std::mem::take(&mut self.failures)
    }

    /// Number of failures so far
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    /// No expectation broke
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failures.is_empty()
    }

    /// Counts of checked, passed and failed expectations
    #[must_use]
    pub fn summary(&self) -> AssertionSummary {
        AssertionSummary {
            total: self.checked,
            passed: self.checked - self.failures.len(),
            failed: self.failures.len(),
        }
    }
}

/// Expectation counts for one scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssertionSummary {
    /// Expectations evaluated
    pub total: usize,
    /// Of those, held
    pub passed: usize,
    /// Of those, broke
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    mod collecting {
        use super::*;

        #[test]
        fn test_new_collector_is_clean() {
            let soft = SoftAssertions::new();
            assert!(soft.all_passed());
            assert_eq!(soft.summary(), AssertionSummary::default());
            assert_eq!(soft.mode(), AssertionMode::Collect);
        }

        #[test]
        fn test_broken_expectations_do_not_stop_collection() {
            let mut soft = SoftAssertions::new();
            soft.record(Verdict::Broken("expected 2 rendered items, found 1".into()));
            soft.record(Verdict::Holds);
            soft.fail("counter missing");
            assert_eq!(
                soft.summary(),
                AssertionSummary {
                    total: 3,
                    passed: 1,
                    failed: 2
                }
            );
            assert_eq!(soft.failures()[1].index, 1);
            assert!(soft.check_fail_fast().is_ok());
        }

        #[test]
        fn test_take_failures_empties_the_collector() {
            let mut soft = SoftAssertions::new();
            soft.fail("a");
            assert_eq!(soft.take_failures().len(), 1);
            assert!(soft.all_passed());
            assert_eq!(soft.summary().total, 1);
        }
    }

    mod step_attribution {
        use super::*;

        #[test]
        fn test_failure_carries_current_step() {
            let mut soft = SoftAssertions::new();
            soft.fail("before any step");
            soft.set_step("Adds the item");
            soft.fail("counter missing");
            assert_eq!(soft.failures()[0].step, None);
            assert_eq!(soft.failures()[1].to_string(), "[Adds the item] counter missing");
        }
    }

    mod verdicts {
        use super::*;

        #[test]
        fn test_holds_if_builds_message_only_on_failure() {
            assert!(Verdict::holds_if(true, || unreachable!()).holds());
            assert_eq!(
                Verdict::holds_if(false, || "found 0".to_string()),
                Verdict::Broken("found 0".into())
            );
        }
    }

    mod fail_fast {
        use super::*;

        #[test]
        fn test_fail_fast_surfaces_first_failure() {
            let mut soft = SoftAssertions::with_mode(AssertionMode::FailFast);
            soft.record(Verdict::Holds);
            assert!(soft.check_fail_fast().is_ok());
            soft.set_step("Checks counter");
            soft.record(Verdict::Broken("boom".into()));
            soft.record(Verdict::Broken("later".into()));
            let err = soft.check_fail_fast().unwrap_err();
            assert!(matches!(err, ProbeError::Assertion { ref message } if message == "[Checks counter] boom"));
        }
    }
}
