//! Todoprobe: end-to-end suite for the TodoMVC reference application
//!
//! Scenarios drive the application the way a user would: type into the new
//! item field, hover rows, click checkboxes and filters. Expectations are
//! soft: a failed check is recorded against the running step and the
//! scenario keeps going, so one run reports every broken behaviour.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                    TODOPROBE Architecture                       │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────────────┐    │
//! │   │ Scenarios  │    │ Session    │    │ PageDriver         │    │
//! │   │ (suite)    │───►│ auto-wait  │───►│  chromium (CDP)    │    │
//! │   │            │    │ + expect   │    │  memory (mini DOM) │    │
//! │   └────────────┘    └────────────┘    └────────────────────┘    │
//! │         │                                                       │
//! │         ▼                                                       │
//! │   ┌────────────┐                                                │
//! │   │ Reporter   │──► report.json  report.html  junit.xml         │
//! │   └────────────┘                                                │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use todoprobe::prelude::*;
//!
//! # async fn demo() -> ProbeResult<()> {
//! let config = RunConfig::default();
//! let options = RunnerOptions::from_config(&config, 7);
//! let runner = SuiteRunner::new(Arc::new(InMemorySessionFactory::new()), options);
//! let report = runner.run(todomvc_suite()).await?;
//! assert!(report.all_passed());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

mod assertion;
#[cfg(feature = "browser")]
mod browser;
mod config;
mod data;
mod dom;
mod driver;
mod expectations;
mod locator;
mod navigation;
mod page;
mod reporter;
mod result;
mod runner;
mod scenario;
mod session;
mod suite;

/// In-memory TodoMVC backend
pub mod mock;

pub use assertion::{AssertionFailure, AssertionMode, AssertionSummary, SoftAssertions, Verdict};
#[cfg(feature = "browser")]
pub use browser::{ChromiumDriver, ChromiumSessionFactory};
pub use config::{
    BrowserSettings, DriverKind, RunConfig, DEFAULT_BASE_URL, DEFAULT_CONFIG_FILE, ENV_BASE_URL,
    ENV_SEED, MAX_WORKERS,
};
pub use data::{random_run_seed, DataUtils, ScenarioRng};
pub use dom::{Dom, Element, NodeId};
pub use driver::{
    ElementState, PageDriver, Screenshot, ScreenshotFormat, SessionFactory, Timeouts,
};
pub use expectations::Expectations;
pub use locator::{normalize_text, text_matches, Locator, LocatorStep, Selector};
pub use navigation::TodoActions;
pub use page::{FilterMode, TodoPage};
pub use reporter::{
    Attachment, FailureMode, ReportPaths, Reporter, ScenarioOutcome, StepRecord, TestStatus,
};
pub use result::{ProbeError, ProbeResult};
pub use runner::{run_scenario, OutcomeHook, RunnerOptions, SuiteRunner, SUITE_NAME};
pub use scenario::{FixtureState, Hook, Scenario, ScenarioContext, ScenarioFn, ScenarioRecord};
pub use session::{Poller, Session};
pub use suite::{
    before_each, mark_random_hook, populate_hook, todomvc_suite, GROUP_ADDING, GROUP_FILTERING,
    GROUP_MARKING, GROUP_REMOVING, LIST_SIZE,
};

/// Open a session factory for the configured backend
pub fn session_factory(config: &RunConfig) -> ProbeResult<std::sync::Arc<dyn SessionFactory>> {
    match config.driver {
        DriverKind::Memory => {
            let quirks = config.quirks.iter().copied().collect();
            Ok(std::sync::Arc::new(mock::InMemorySessionFactory::with_quirks(quirks)))
        }
        #[cfg(feature = "browser")]
        DriverKind::Chromium => Ok(std::sync::Arc::new(ChromiumSessionFactory::new(
            config.browser.clone(),
        ))),
        #[cfg(not(feature = "browser"))]
        DriverKind::Chromium => Err(ProbeError::config(
            "the chromium driver needs todoprobe built with the `browser` feature",
        )),
    }
}

/// Prelude for convenient imports
pub mod prelude {
    pub use super::mock::{InMemorySessionFactory, Quirk, Quirks};
    pub use super::{
        session_factory, todomvc_suite, Expectations, FilterMode, Locator, ProbeError,
        ProbeResult, Reporter, RunConfig, RunnerOptions, Scenario, ScenarioContext,
        ScenarioOutcome, Session, SoftAssertions, SuiteRunner, TestStatus, TodoActions, TodoPage,
    };
}
