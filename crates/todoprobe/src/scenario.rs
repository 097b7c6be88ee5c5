//! Scenario context, steps and hooks.
//!
//! A [`ScenarioContext`] owns everything one scenario touches: its session,
//! its random stream, its fixture counters, its soft-assertion collector and
//! its attachments. Nothing in it is shared with other scenarios.

use crate::assertion::{AssertionMode, SoftAssertions};
use crate::data::{DataUtils, ScenarioRng};
use crate::expectations::Expectations;
use crate::navigation::TodoActions;
use crate::reporter::{Attachment, StepRecord, TestStatus};
use crate::result::ProbeResult;
use crate::session::Session;
use futures::future::BoxFuture;
use std::time::Instant;
use tracing::info;

/// Scenario body or hook
pub type ScenarioFn = for<'a> fn(&'a mut ScenarioContext) -> BoxFuture<'a, ProbeResult<()>>;

/// Counters the scenario keeps alongside its actions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixtureState {
    /// Items expected in the full list
    pub item_count: usize,
    /// Of those, how many are expected to be completed
    pub completed_count: usize,
}

impl FixtureState {
    /// Items expected to be active
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.item_count.saturating_sub(self.completed_count)
    }
}

#[derive(Debug)]
struct OpenStep {
    name: String,
    started: Instant,
    failures_before: usize,
}

/// Everything one running scenario owns
#[derive(Debug)]
pub struct ScenarioContext {
    /// Browser session
    pub session: Session,
    /// Expectation outcomes
    pub soft: SoftAssertions,
    /// Random stream
    pub rng: ScenarioRng,
    /// Expected counts
    pub fixture: FixtureState,
    name: String,
    screenshots: bool,
    steps: Vec<StepRecord>,
    open_step: Option<OpenStep>,
    attachments: Vec<Attachment>,
}

/// What a finished scenario leaves behind
#[derive(Debug)]
pub struct ScenarioRecord {
    /// The session, still open
    pub session: Session,
    /// Expectation outcomes
    pub soft: SoftAssertions,
    /// Closed steps
    pub steps: Vec<StepRecord>,
    /// Attachments in capture order
    pub attachments: Vec<Attachment>,
}

impl ScenarioContext {
    /// Context for the scenario `name`
    #[must_use]
    pub fn new(name: impl Into<String>, session: Session, rng: ScenarioRng) -> Self {
        Self {
            session,
            soft: SoftAssertions::new(),
            rng,
            fixture: FixtureState::default(),
            name: name.into(),
            screenshots: true,
            steps: Vec::new(),
            open_step: None,
            attachments: Vec::new(),
        }
    }

    /// Set the assertion mode
    #[must_use]
    pub fn with_assertion_mode(mut self, mode: AssertionMode) -> Self {
        self.soft = SoftAssertions::with_mode(mode);
        self
    }

    /// Enable or disable screenshot capture
    #[must_use]
    pub const fn with_screenshots(mut self, enabled: bool) -> Self {
        self.screenshots = enabled;
        self
    }

    /// Scenario name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the running step
    #[must_use]
    pub fn current_step(&self) -> Option<&str> {
        self.open_step.as_ref().map(|s| s.name.as_str())
    }

    /// Close the running step, if any, and open `name`
    pub fn step(&mut self, name: impl Into<String>) {
        self.close_step(None);
        let name = name.into();
        info!(scenario = %self.name, step = %name, "step");
        self.soft.set_step(name.clone());
        self.open_step = Some(OpenStep {
            name,
            started: Instant::now(),
            failures_before: self.soft.failure_count(),
        });
    }

    fn close_step(&mut self, error: Option<String>) {
        let Some(open) = self.open_step.take() else {
            return;
        };
        let failures = self.soft.failure_count() - open.failures_before;
        let status = if failures > 0 || error.is_some() {
            TestStatus::Failed
        } else {
            TestStatus::Passed
        };
        self.steps.push(StepRecord {
            name: open.name,
            status,
            duration: open.started.elapsed(),
            failures,
            error,
        });
    }

    /// Attach a text value to the running step
    pub fn attach_text(&mut self, name: impl Into<String>, body: impl ToString) {
        let attachment = Attachment::text(name, body.to_string())
            .with_step(self.current_step().map(str::to_string));
        self.attachments.push(attachment);
    }

    /// Capture the page and attach it to the running step.
    ///
    /// Does nothing when screenshots are disabled.
    pub async fn attach_screenshot(&mut self, name: impl Into<String>) -> ProbeResult<()> {
        if !self.screenshots {
            return Ok(());
        }
        let screenshot = self.session.screenshot().await?;
        let attachment = Attachment::screenshot(name, &screenshot)
            .with_step(self.current_step().map(str::to_string));
        self.attachments.push(attachment);
        Ok(())
    }

    /// Navigation actions on this scenario's page
    pub fn todo(&mut self) -> TodoActions<'_> {
        TodoActions::new(&mut self.session)
    }

    /// Expectations recorded into this scenario's collector
    pub fn expect(&mut self) -> Expectations<'_> {
        Expectations::new(&self.session, &mut self.soft)
    }

    /// Data helpers drawing from this scenario's random stream
    pub fn data(&mut self) -> DataUtils<'_> {
        DataUtils::new(&mut self.session, &mut self.rng, &mut self.fixture)
    }

    /// Close the running step, failing it with `error` if given
    #[must_use]
    pub fn finish(mut self, error: Option<String>) -> ScenarioRecord {
        if error.is_some() && self.open_step.is_none() {
            self.open_step = Some(OpenStep {
                name: "setup".to_string(),
                started: Instant::now(),
                failures_before: self.soft.failure_count(),
            });
        }
        self.close_step(error);
        ScenarioRecord {
            session: self.session,
            soft: self.soft,
            steps: self.steps,
            attachments: self.attachments,
        }
    }
}

/// Setup run before a scenario body
#[derive(Clone, Copy)]
pub struct Hook {
    /// Hook name, reported as a step
    pub name: &'static str,
    /// Hook body
    pub run: ScenarioFn,
}

impl std::fmt::Debug for Hook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Hook").field("name", &self.name).finish()
    }
}

/// One independently runnable end-to-end case
#[derive(Clone)]
pub struct Scenario {
    /// Group the scenario is listed under
    pub group: Option<&'static str>,
    /// Scenario name
    pub name: &'static str,
    /// Hooks run in order before the body
    pub hooks: Vec<Hook>,
    /// Scenario body
    pub body: ScenarioFn,
}

impl std::fmt::Debug for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scenario")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

impl Scenario {
    /// An ungrouped scenario
    #[must_use]
    pub fn new(name: &'static str, body: ScenarioFn) -> Self {
        Self {
            group: None,
            name,
            hooks: Vec::new(),
            body,
        }
    }

    /// List under `group`
    #[must_use]
    pub const fn in_group(mut self, group: &'static str) -> Self {
        self.group = Some(group);
        self
    }

    /// Run `hooks` before the body
    #[must_use]
    pub fn with_hooks(mut self, hooks: &[Hook]) -> Self {
        self.hooks.extend_from_slice(hooks);
        self
    }

    /// `group > name`, or just the name when ungrouped
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.group {
            Some(group) => format!("{group} > {}", self.name),
            None => self.name.to_string(),
        }
    }

    /// Case-insensitive substring match on the full name
    #[must_use]
    pub fn matches_filter(&self, filter: &str) -> bool {
        self.full_name()
            .to_lowercase()
            .contains(&filter.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Timeouts;
    use crate::mock::{InMemoryDriver, TodoApp};

    fn context() -> ScenarioContext {
        let session = Session::new(
            Box::new(InMemoryDriver::new(TodoApp::new())),
            Timeouts::fast(),
        );
        ScenarioContext::new("demo", session, ScenarioRng::from_seed(1))
    }

    fn noop(_ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
        Box::pin(async { Ok(()) })
    }

    mod step_tests {
        use super::*;

        #[test]
        fn test_steps_close_in_order() {
            let mut ctx = context();
            ctx.step("first");
            ctx.step("second");
            ctx.soft.fail("broken");
            let record = ctx.finish(None);
            let names: Vec<&str> = record.steps.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(names, ["first", "second"]);
            assert_eq!(record.steps[0].status, TestStatus::Passed);
            assert_eq!(record.steps[1].status, TestStatus::Failed);
            assert_eq!(record.steps[1].failures, 1);
        }

        #[test]
        fn test_error_fails_open_step() {
            let mut ctx = context();
            ctx.step("Removes the item");
            let record = ctx.finish(Some("Control not found".into()));
            assert_eq!(record.steps[0].error.as_deref(), Some("Control not found"));
            assert!(record.steps[0].status.is_failed());
        }

        #[test]
        fn test_error_before_any_step_is_setup() {
            let record = context().finish(Some("Navigation failed".into()));
            assert_eq!(record.steps[0].name, "setup");
        }
    }

    mod attachment_tests {
        use super::*;

        #[test]
        fn test_text_attachment_records_step() {
            let mut ctx = context();
            ctx.step("Marks items");
            ctx.attach_text("Items marked", 3);
            let record = ctx.finish(None);
            assert_eq!(record.attachments[0].step.as_deref(), Some("Marks items"));
            assert_eq!(record.attachments[0].body, b"3");
        }

        #[tokio::test]
        async fn test_screenshots_can_be_disabled() {
            let mut ctx = context().with_screenshots(false);
            ctx.session.goto("https://todo.test/#/").await.unwrap();
            ctx.attach_screenshot("Initial state").await.unwrap();
            assert!(ctx.finish(None).attachments.is_empty());
        }

        #[tokio::test]
        async fn test_screenshot_attachment() {
            let mut ctx = context();
            ctx.session.goto("https://todo.test/#/").await.unwrap();
            ctx.attach_screenshot("Initial state").await.unwrap();
            let record = ctx.finish(None);
            assert_eq!(record.attachments[0].content_type, "text/html");
        }
    }

    mod scenario_tests {
        use super::*;

        #[test]
        fn test_full_name_and_filter() {
            let s = Scenario::new("Adds new item to the list", noop)
                .in_group("Adding items to the list");
            assert_eq!(s.full_name(), "Adding items to the list > Adds new item to the list");
            assert!(s.matches_filter("adding items"));
            assert!(!s.matches_filter("filtering"));
        }

        #[test]
        fn test_hooks_keep_order() {
            let hooks = [
                Hook { name: "first", run: noop },
                Hook { name: "second", run: noop },
            ];
            let s = Scenario::new("x", noop).with_hooks(&hooks);
            let names: Vec<&str> = s.hooks.iter().map(|h| h.name).collect();
            assert_eq!(names, ["first", "second"]);
        }

        #[test]
        fn test_fixture_active_count() {
            let fixture = FixtureState {
                item_count: 5,
                completed_count: 2,
            };
            assert_eq!(fixture.active_count(), 3);
        }
    }
}
