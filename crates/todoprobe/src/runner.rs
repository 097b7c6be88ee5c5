//! Suite runner.
//!
//! Every scenario gets its own session from the [`SessionFactory`], its own
//! random stream derived from the run seed, and its own soft-assertion
//! collector. Up to `workers` scenarios run at once. Outcomes are reported
//! in suite order regardless of completion order.

use crate::assertion::AssertionMode;
use crate::config::RunConfig;
use crate::data::ScenarioRng;
use crate::driver::{SessionFactory, Timeouts};
use crate::reporter::{FailureMode, Reporter, ScenarioOutcome, StepRecord, TestStatus};
use crate::result::{ProbeError, ProbeResult};
use crate::scenario::{Scenario, ScenarioContext};
use crate::session::Session;
use crate::suite;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

/// Name of the report produced by [`SuiteRunner::run`]
pub const SUITE_NAME: &str = "TodoMVC";

/// Called once per scenario as soon as its outcome is known
pub type OutcomeHook = Arc<dyn Fn(&ScenarioOutcome) + Send + Sync>;

/// Settings the runner needs from a [`RunConfig`]
#[derive(Debug, Clone)]
pub struct RunnerOptions {
    /// Address every scenario starts from
    pub base_url: String,
    /// Run seed
    pub seed: u64,
    /// Scenarios run at once
    pub workers: usize,
    /// Skip what has not started after the first failure
    pub fail_fast: bool,
    /// Capture screenshots at checkpoints
    pub screenshots: bool,
    /// Wait tuning
    pub timeouts: Timeouts,
    /// Soft assertion behaviour
    pub assertion_mode: AssertionMode,
    /// Case-insensitive substring on full scenario names
    pub filter: Option<String>,
}

impl RunnerOptions {
    /// Options for `config`, with the seed already resolved
    #[must_use]
    pub fn from_config(config: &RunConfig, seed: u64) -> Self {
        Self {
            base_url: config.base_url.clone(),
            seed,
            workers: config.workers.max(1),
            fail_fast: config.fail_fast,
            screenshots: config.screenshots,
            timeouts: config.timeouts,
            assertion_mode: config.assertion_mode,
            filter: None,
        }
    }

    /// Only run scenarios whose full name contains `filter`
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// Runs scenarios against sessions from one factory
pub struct SuiteRunner {
    factory: Arc<dyn SessionFactory>,
    options: RunnerOptions,
    on_outcome: Option<OutcomeHook>,
}

impl std::fmt::Debug for SuiteRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SuiteRunner")
            .field("backend", &self.factory.backend())
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl SuiteRunner {
    /// Runner over `factory`
    #[must_use]
    pub fn new(factory: Arc<dyn SessionFactory>, options: RunnerOptions) -> Self {
        Self {
            factory,
            options,
            on_outcome: None,
        }
    }

    /// Call `hook` with every outcome as it completes
    #[must_use]
    pub fn with_outcome_hook(mut self, hook: OutcomeHook) -> Self {
        self.on_outcome = Some(hook);
        self
    }

    /// Options in effect
    #[must_use]
    pub const fn options(&self) -> &RunnerOptions {
        &self.options
    }

    /// Scenarios of `suite` selected by the filter, in order
    #[must_use]
    pub fn select(&self, suite: Vec<Scenario>) -> Vec<Scenario> {
        match &self.options.filter {
            Some(filter) => suite
                .into_iter()
                .filter(|s| s.matches_filter(filter))
                .collect(),
            None => suite,
        }
    }

    /// Run the selected scenarios of `suite`
    pub async fn run(&self, suite: Vec<Scenario>) -> ProbeResult<Reporter> {
        let scenarios = self.select(suite);
        let mode = if self.options.fail_fast {
            FailureMode::AndonCord
        } else {
            FailureMode::CollectAll
        };
        let mut reporter = Reporter::new(SUITE_NAME)
            .with_failure_mode(mode)
            .with_run_info(&self.options.base_url, self.factory.backend(), self.options.seed);

        info!(
            scenarios = scenarios.len(),
            workers = self.options.workers,
            seed = self.options.seed,
            backend = self.factory.backend(),
            "suite started"
        );

        if self.options.workers <= 1 {
            let mut stopped = false;
            for scenario in &scenarios {
                let outcome = if stopped {
                    skipped(scenario, self.options.seed)
                } else {
                    run_scenario(self.factory.as_ref(), scenario, &self.options).await
                };
                self.notify(&outcome);
                stopped |= reporter.record(outcome);
            }
        } else {
            for outcome in self.run_concurrently(scenarios).await? {
                let _ = reporter.record(outcome);
            }
        }

        info!(summary = %reporter.summary(), "suite finished");
        Ok(reporter)
    }

    async fn run_concurrently(&self, scenarios: Vec<Scenario>) -> ProbeResult<Vec<ScenarioOutcome>> {
        let permits = Arc::new(Semaphore::new(
            self.options.workers.clamp(1, scenarios.len().max(1)),
        ));
        let stop = Arc::new(AtomicBool::new(false));
        let mut handles = Vec::with_capacity(scenarios.len());

        for scenario in scenarios {
            let permits = Arc::clone(&permits);
            let stop = Arc::clone(&stop);
            let factory = Arc::clone(&self.factory);
            let options = self.options.clone();
            let on_outcome = self.on_outcome.clone();

            handles.push(tokio::spawn(async move {
                let outcome = match permits.acquire_owned().await {
                    Ok(_permit) if !stop.load(Ordering::SeqCst) => {
                        run_scenario(factory.as_ref(), &scenario, &options).await
                    }
                    _ => skipped(&scenario, options.seed),
                };
                if options.fail_fast && outcome.status.is_failed() {
                    stop.store(true, Ordering::SeqCst);
                }
                if let Some(hook) = &on_outcome {
                    hook(&outcome);
                }
                outcome
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            let outcome = handle.await.map_err(|e| ProbeError::Session {
                message: format!("scenario task failed: {e}"),
            })?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    fn notify(&self, outcome: &ScenarioOutcome) {
        if let Some(hook) = &self.on_outcome {
            hook(outcome);
        }
    }
}

fn skipped(scenario: &Scenario, run_seed: u64) -> ScenarioOutcome {
    let seed = ScenarioRng::derive(run_seed, &scenario.full_name()).seed();
    ScenarioOutcome::skipped(scenario.group, scenario.name, seed)
}

/// Run one scenario in a fresh session and report how it went.
///
/// Never fails: a fatal error becomes a failed outcome.
pub async fn run_scenario(
    factory: &dyn SessionFactory,
    scenario: &Scenario,
    options: &RunnerOptions,
) -> ScenarioOutcome {
    let full_name = scenario.full_name();
    let rng = ScenarioRng::derive(options.seed, &full_name);
    let seed = rng.seed();
    let started = Instant::now();
    info!(scenario = %full_name, seed, "scenario started");

    let driver = match factory.open().await {
        Ok(driver) => driver,
        Err(e) => {
            error!(scenario = %full_name, error = %e, "could not open session");
            return unopened(scenario, seed, started.elapsed(), e.to_string());
        }
    };

    let session = Session::new(driver, options.timeouts);
    let mut ctx = ScenarioContext::new(full_name.clone(), session, rng)
        .with_assertion_mode(options.assertion_mode)
        .with_screenshots(options.screenshots);

    let error = match drive(&mut ctx, scenario, &options.base_url).await {
        Ok(()) => None,
        Err(e) => {
            warn!(scenario = %full_name, step = ?ctx.current_step(), error = %e, "scenario aborted");
            if let Err(shot) = ctx.attach_screenshot("Failure state").await {
                warn!(error = %shot, "could not capture failure state");
            }
            Some(e.to_string())
        }
    };

    let mut record = ctx.finish(error.clone());
    if let Err(e) = record.session.close().await {
        warn!(scenario = %full_name, error = %e, "session did not close cleanly");
    }

    let assertions = record.soft.summary();
    let failures = record.soft.take_failures();
    let status = if error.is_some() || !failures.is_empty() {
        TestStatus::Failed
    } else {
        TestStatus::Passed
    };
    let duration = started.elapsed();
    info!(scenario = %full_name, ?status, ?duration, failures = failures.len(), "scenario finished");

    ScenarioOutcome {
        group: scenario.group.map(str::to_string),
        name: scenario.name.to_string(),
        status,
        duration,
        seed,
        steps: record.steps,
        failures,
        assertions,
        error,
        attachments: record.attachments,
    }
}

async fn drive(ctx: &mut ScenarioContext, scenario: &Scenario, base_url: &str) -> ProbeResult<()> {
    suite::before_each(ctx, base_url).await?;
    for hook in &scenario.hooks {
        ctx.step(hook.name);
        (hook.run)(ctx).await?;
    }
    (scenario.body)(ctx).await
}

fn unopened(scenario: &Scenario, seed: u64, duration: Duration, error: String) -> ScenarioOutcome {
    let mut outcome = ScenarioOutcome::skipped(scenario.group, scenario.name, seed);
    outcome.status = TestStatus::Failed;
    outcome.duration = duration;
    outcome.steps.push(StepRecord {
        name: "setup".to_string(),
        status: TestStatus::Failed,
        duration,
        failures: 0,
        error: Some(error.clone()),
    });
    outcome.error = Some(error);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::PageDriver;
    use crate::mock::{InMemorySessionFactory, Quirk, Quirks};
    use async_trait::async_trait;
    use futures::future::BoxFuture;
    use std::sync::Mutex;

    fn options() -> RunnerOptions {
        RunnerOptions {
            base_url: "https://todo.test/#/".to_string(),
            seed: 42,
            workers: 1,
            fail_fast: false,
            screenshots: true,
            timeouts: Timeouts::fast(),
            assertion_mode: AssertionMode::Collect,
            filter: None,
        }
    }

    fn runner(quirks: Quirks, options: RunnerOptions) -> SuiteRunner {
        SuiteRunner::new(Arc::new(InMemorySessionFactory::with_quirks(quirks)), options)
    }

    fn always_fails(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
        Box::pin(async move {
            ctx.step("Checks nothing");
            ctx.soft.fail("deliberate");
            Ok(())
        })
    }

    fn passes(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
        Box::pin(async move {
            ctx.step("Does nothing");
            Ok(())
        })
    }

    fn aborts(ctx: &mut ScenarioContext) -> BoxFuture<'_, ProbeResult<()>> {
        Box::pin(async move {
            ctx.step("Clicks a missing control");
            ctx.todo().clear_completed().await
        })
    }

    struct BrokenFactory;

    #[async_trait]
    impl SessionFactory for BrokenFactory {
        fn backend(&self) -> &'static str {
            "broken"
        }

        async fn open(&self) -> ProbeResult<Box<dyn PageDriver>> {
            Err(ProbeError::BrowserNotFound)
        }
    }

    mod scenario_tests {
        use super::*;

        #[tokio::test]
        async fn test_passing_scenario_has_before_each_step() {
            let factory = InMemorySessionFactory::new();
            let outcome = run_scenario(&factory, &Scenario::new("ok", passes), &options()).await;
            assert_eq!(outcome.status, TestStatus::Passed);
            let steps: Vec<&str> = outcome.steps.iter().map(|s| s.name.as_str()).collect();
            assert_eq!(steps, ["Going to TodoMVC website", "Does nothing"]);
            assert_eq!(outcome.attachments[0].name, "Initial state");
        }

        #[tokio::test]
        async fn test_fatal_error_fails_scenario_and_step() {
            let factory = InMemorySessionFactory::new();
            let outcome = run_scenario(&factory, &Scenario::new("abort", aborts), &options()).await;
            assert_eq!(outcome.status, TestStatus::Failed);
            let step = outcome.failed_step().unwrap();
            assert_eq!(step.name, "Clicks a missing control");
            assert!(outcome.error.as_deref().unwrap().contains("clear-completed"));
            assert!(outcome.attachments.iter().any(|a| a.name == "Failure state"));
        }

        #[tokio::test]
        async fn test_unopened_session_is_failed_setup() {
            let outcome = run_scenario(&BrokenFactory, &Scenario::new("x", passes), &options()).await;
            assert_eq!(outcome.status, TestStatus::Failed);
            assert_eq!(outcome.steps[0].name, "setup");
        }

        #[tokio::test]
        async fn test_seed_is_derived_from_run_seed_and_name() {
            let factory = InMemorySessionFactory::new();
            let scenario = Scenario::new("ok", passes);
            let outcome = run_scenario(&factory, &scenario, &options()).await;
            assert_eq!(outcome.seed, ScenarioRng::derive(42, "ok").seed());
        }
    }

    mod suite_tests {
        use super::*;

        #[tokio::test]
        async fn test_fail_fast_skips_the_rest() {
            let suite = vec![
                Scenario::new("first", passes),
                Scenario::new("second", always_fails),
                Scenario::new("third", passes),
            ];
            let options = RunnerOptions {
                fail_fast: true,
                ..options()
            };
            let report = runner(Quirks::default(), options).run(suite).await.unwrap();
            let statuses: Vec<TestStatus> = report.results.iter().map(|r| r.status).collect();
            assert_eq!(
                statuses,
                [TestStatus::Passed, TestStatus::Failed, TestStatus::Skipped]
            );
        }

        #[tokio::test]
        async fn test_collect_all_runs_everything() {
            let suite = vec![
                Scenario::new("first", always_fails),
                Scenario::new("second", passes),
            ];
            let report = runner(Quirks::default(), options()).run(suite).await.unwrap();
            assert_eq!(report.failed_count(), 1);
            assert_eq!(report.passed_count(), 1);
        }

        #[tokio::test]
        async fn test_filter_selects_by_full_name() {
            let options = options().with_filter("removing");
            let report = runner(Quirks::default(), options)
                .run(suite::todomvc_suite())
                .await
                .unwrap();
            assert_eq!(report.total_count(), 2);
            assert!(report.all_passed(), "{}", report.summary());
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn test_concurrent_results_keep_suite_order() {
            let options = RunnerOptions {
                workers: 4,
                ..options()
            };
            let seen = Arc::new(Mutex::new(0usize));
            let counter = Arc::clone(&seen);
            let report = runner(Quirks::default(), options)
                .with_outcome_hook(Arc::new(move |_: &ScenarioOutcome| *counter.lock().unwrap() += 1))
                .run(suite::todomvc_suite())
                .await
                .unwrap();
            let names: Vec<String> = report.results.iter().map(ScenarioOutcome::full_name).collect();
            let expected: Vec<String> = suite::todomvc_suite().iter().map(Scenario::full_name).collect();
            assert_eq!(names, expected);
            assert_eq!(*seen.lock().unwrap(), 12);
            assert!(report.all_passed(), "{}", report.summary());
        }

        #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
        async fn test_more_workers_than_scenarios() {
            let options = RunnerOptions {
                workers: usize::MAX,
                ..options().with_filter("removing")
            };
            let report = runner(Quirks::default(), options)
                .run(suite::todomvc_suite())
                .await
                .unwrap();
            assert_eq!(report.total_count(), 2);
            assert!(report.all_passed(), "{}", report.summary());
        }

        #[tokio::test]
        async fn test_quirk_is_caught() {
            let quirks = Quirks::default().with(Quirk::AcceptEmpty);
            let options = options().with_filter("empty item");
            let report = runner(quirks, options).run(suite::todomvc_suite()).await.unwrap();
            assert_eq!(report.failed_count(), 1);
        }
    }
}
