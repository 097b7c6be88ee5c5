//! Command execution

use crate::commands::{ConfigArgs, ListArgs, RunArgs};
use crate::config::CliConfig;
use crate::error::{CliError, CliResult};
use crate::output::ProgressReporter;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use todoprobe::{
    random_run_seed, session_factory, todomvc_suite, RunConfig, RunnerOptions, Scenario,
    ScenarioOutcome, SuiteRunner,
};
use tracing::info;

/// Layer file, environment and flags into the effective configuration
pub fn resolve_config(args: &RunArgs, cwd: &Path) -> CliResult<RunConfig> {
    let mut config = RunConfig::discover(args.config.as_deref(), cwd)?;
    config.apply_process_env()?;
    apply_args(&mut config, args);
    config.validate()?;
    Ok(config)
}

/// Apply command-line overrides
pub fn apply_args(config: &mut RunConfig, args: &RunArgs) {
    if let Some(url) = &args.base_url {
        config.base_url.clone_from(url);
    }
    if let Some(driver) = args.driver {
        config.driver = driver;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(mode) = args.assertions {
        config.assertion_mode = mode.into();
    }
    if let Some(output) = &args.output {
        config.output_dir.clone_from(output);
    }
    if let Some(path) = &args.chromium_path {
        config.browser.chromium_path = Some(path.clone());
    }
    config.fail_fast |= args.fail_fast;
    config.screenshots &= !args.no_screenshots;
    config.browser.headless &= !args.headed;
    config.browser.sandbox &= !args.no_sandbox;
    if !args.quirks.is_empty() {
        config.quirks.clone_from(&args.quirks);
    }
}

/// Run the suite. Returns whether every scenario passed.
pub fn execute_run(cli: &CliConfig, args: &RunArgs) -> CliResult<bool> {
    let config = resolve_config(args, &std::env::current_dir()?)?;
    let seed = config.seed.unwrap_or_else(random_run_seed);
    let factory = session_factory(&config)?;

    let mut options = RunnerOptions::from_config(&config, seed);
    if let Some(filter) = &args.filter {
        options = options.with_filter(filter.clone());
    }

    let mut ui = ProgressReporter::new(cli.color.should_color(), cli.verbosity.is_quiet());
    ui.header(&format!("TodoMVC @ {}", config.base_url));
    ui.info(&format!("driver {}, seed {seed}, workers {}", config.driver, config.workers));
    if !config.quirks.is_empty() {
        let names: Vec<String> = config.quirks.iter().map(ToString::to_string).collect();
        ui.warning(&format!("injected quirks: {}", names.join(", ")));
    }

    let started = Instant::now();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let outcome = runtime.block_on(async move {
        let suite_runner = SuiteRunner::new(factory, options);
        let selected = suite_runner.select(todomvc_suite()).len();
        if selected == 0 {
            return Err(CliError::config("no scenario matches the filter"));
        }
        ui.start_progress(selected as u64, "TodoMVC");
        let ui = Arc::new(ui);
        let hook_ui = Arc::clone(&ui);
        let suite_runner = suite_runner.with_outcome_hook(Arc::new(move |outcome: &ScenarioOutcome| {
            hook_ui.scenario_finished(outcome);
        }));
        let report = suite_runner.run(todomvc_suite()).await?;
        ui.finish();
        Ok((report, ui))
    });
    let (mut report, ui) = outcome?;

    let paths = report
        .write(&config.output_dir)
        .map_err(|e| CliError::report_generation(e.to_string()))?;
    info!(json = %paths.json.display(), "reports written");

    ui.summary(&report, started.elapsed());
    ui.info(&format!("HTML report: {}", paths.html.display()));
    ui.info(&format!("JUnit report: {}", paths.junit.display()));
    if !report.all_passed() {
        ui.info(&format!("replay with: todoprobe run --seed {seed}"));
    }
    Ok(report.all_passed())
}

/// Print scenario names, grouped
pub fn execute_list(cli: &CliConfig, args: &ListArgs) {
    let suite: Vec<Scenario> = todomvc_suite()
        .into_iter()
        .filter(|s| args.filter.as_deref().map_or(true, |f| s.matches_filter(f)))
        .collect();

    let mut current_group = None;
    for scenario in &suite {
        if scenario.group != current_group {
            current_group = scenario.group;
            match current_group {
                Some(group) => println!("{group}"),
                None => println!("(ungrouped)"),
            }
        }
        println!("  {}", scenario.name);
        if cli.verbosity.is_verbose() {
            for hook in &scenario.hooks {
                println!("    before: {}", hook.name);
            }
        }
    }
    if !cli.verbosity.is_quiet() {
        eprintln!("{} scenarios", suite.len());
    }
}

/// Print the effective configuration as YAML
pub fn execute_config(args: &ConfigArgs) -> CliResult<()> {
    let config = if args.defaults {
        RunConfig::default()
    } else {
        let mut config = RunConfig::discover(args.config.as_deref(), &std::env::current_dir()?)?;
        config.apply_process_env()?;
        config
    };
    print!("{}", config.to_yaml()?);
    Ok(())
}
