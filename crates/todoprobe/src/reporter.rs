//! Reporter - scenario outcomes, attachments and suite reports.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Reporter                                                     │
//! │                                                               │
//! │  ScenarioOutcome ── steps: StepRecord*                        │
//! │                  ── failures: AssertionFailure*               │
//! │                  ── attachments: Attachment*                  │
//! │                                                               │
//! │  write(dir) ──► report.json  report.html  junit.xml           │
//! │                 attachments/<scenario>/<nn>-<name>.<ext>      │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! With [`FailureMode::AndonCord`] the first failed scenario stops the line:
//! [`Reporter::record`] reports that remaining scenarios should be skipped.

use crate::assertion::{AssertionFailure, AssertionSummary};
use crate::driver::Screenshot;
use crate::result::ProbeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use uuid::Uuid;

/// Failure mode for the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FailureMode {
    /// Stop on first failed scenario
    AndonCord,
    /// Run every scenario (default)
    #[default]
    CollectAll,
}

/// Scenario or step status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    /// Passed
    Passed,
    /// Failed
    Failed,
    /// Not run
    Skipped,
}

impl TestStatus {
    /// Check if status is passing
    #[must_use]
    pub const fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Check if status is failing
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

/// Named diagnostic artifact
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    /// Display name
    pub name: String,
    /// MIME type of `body`
    pub content_type: String,
    /// Step that was running when the attachment was taken
    pub step: Option<String>,
    /// Location relative to the report directory, once written
    pub path: Option<String>,
    /// Raw content
    #[serde(skip)]
    pub body: Vec<u8>,
}

impl Attachment {
    /// Plain text attachment
    #[must_use]
    pub fn text(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_type: "text/plain".to_string(),
            step: None,
            path: None,
            body: body.into().into_bytes(),
        }
    }

    /// Screenshot attachment; the content type follows the screenshot format
    #[must_use]
    pub fn screenshot(name: impl Into<String>, screenshot: &Screenshot) -> Self {
        Self {
            name: name.into(),
            content_type: screenshot.format.content_type().to_string(),
            step: None,
            path: None,
            body: screenshot.data.clone(),
        }
    }

    /// Attribute to a step
    #[must_use]
    pub fn with_step(mut self, step: Option<String>) -> Self {
        self.step = step;
        self
    }

    fn extension(&self) -> &'static str {
        match self.content_type.as_str() {
            "image/png" => "png",
            "text/html" => "html",
            _ => "txt",
        }
    }
}

/// One named step of a scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step name
    pub name: String,
    /// Outcome of the step
    pub status: TestStatus,
    /// Time spent in the step
    pub duration: Duration,
    /// Soft assertion failures recorded during the step
    pub failures: usize,
    /// Fatal error that aborted the step
    pub error: Option<String>,
}

/// Result of one scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Group the scenario belongs to
    pub group: Option<String>,
    /// Scenario name
    pub name: String,
    /// Final status
    pub status: TestStatus,
    /// Wall-clock duration
    pub duration: Duration,
    /// Seed of the scenario's random stream
    pub seed: u64,
    /// Steps, in order
    pub steps: Vec<StepRecord>,
    /// Soft assertion failures
    pub failures: Vec<AssertionFailure>,
    /// Assertion counts
    pub assertions: AssertionSummary,
    /// Fatal error, if the scenario aborted
    pub error: Option<String>,
    /// Diagnostic artifacts
    pub attachments: Vec<Attachment>,
}

impl ScenarioOutcome {
    /// Outcome for a scenario that never started
    #[must_use]
    pub fn skipped(group: Option<&str>, name: impl Into<String>, seed: u64) -> Self {
        Self {
            group: group.map(str::to_string),
            name: name.into(),
            status: TestStatus::Skipped,
            duration: Duration::ZERO,
            seed,
            steps: Vec::new(),
            failures: Vec::new(),
            assertions: AssertionSummary::default(),
            error: None,
            attachments: Vec::new(),
        }
    }

    /// `group > name`, or just the name when ungrouped
    #[must_use]
    pub fn full_name(&self) -> String {
        match &self.group {
            Some(group) => format!("{group} > {}", self.name),
            None => self.name.clone(),
        }
    }

    /// First step that failed
    #[must_use]
    pub fn failed_step(&self) -> Option<&StepRecord> {
        self.steps.iter().find(|s| s.status.is_failed())
    }

    /// One-line reason for a failure
    #[must_use]
    pub fn failure_reason(&self) -> Option<String> {
        if let Some(error) = &self.error {
            let step = self.failed_step().map_or("setup", |s| s.name.as_str());
            return Some(format!("[{step}] {error}"));
        }
        self.failures.first().map(ToString::to_string)
    }
}

/// Files produced by [`Reporter::write`]
#[derive(Debug, Clone)]
pub struct ReportPaths {
    /// Machine-readable report
    pub json: PathBuf,
    /// Human-readable report
    pub html: PathBuf,
    /// CI report
    pub junit: PathBuf,
}

/// Collects scenario outcomes for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reporter {
    /// Unique id of the run
    pub run_id: Uuid,
    /// Suite name
    pub suite_name: String,
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Application address
    pub base_url: String,
    /// Driver backend
    pub backend: String,
    /// Run seed
    pub seed: u64,
    /// Outcomes, in suite order once sorted
    pub results: Vec<ScenarioOutcome>,
    #[serde(skip)]
    failure_mode: FailureMode,
}

impl Reporter {
    /// Create a reporter in collect-all mode
    #[must_use]
    pub fn new(suite_name: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            suite_name: suite_name.into(),
            started_at: Utc::now(),
            base_url: String::new(),
            backend: String::new(),
            seed: 0,
            results: Vec::new(),
            failure_mode: FailureMode::CollectAll,
        }
    }

    /// Set failure mode
    #[must_use]
    pub const fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Record run metadata
    #[must_use]
    pub fn with_run_info(mut self, base_url: &str, backend: &str, seed: u64) -> Self {
        self.base_url = base_url.to_string();
        self.backend = backend.to_string();
        self.seed = seed;
        self
    }

    /// Record an outcome. Returns `true` when the line should stop.
    pub fn record(&mut self, outcome: ScenarioOutcome) -> bool {
        let failed = outcome.status.is_failed();
        self.results.push(outcome);
        failed && self.failure_mode == FailureMode::AndonCord
    }

    /// Get number of passed scenarios
    #[must_use]
    pub fn passed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_passed()).count()
    }

    /// Get number of failed scenarios
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| r.status.is_failed()).count()
    }

    /// Get number of skipped scenarios
    #[must_use]
    pub fn skipped_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.status == TestStatus::Skipped)
            .count()
    }

    /// Get total scenario count
    #[must_use]
    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    /// Get pass rate (0.0 to 1.0)
    #[must_use]
    pub fn pass_rate(&self) -> f64 {
        if self.results.is_empty() {
            return 1.0;
        }
        self.passed_count() as f64 / self.results.len() as f64
    }

    /// Check if no scenario failed
    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed_count() == 0
    }

    /// Sum of scenario durations
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        self.results.iter().map(|r| r.duration).sum()
    }

    /// Failed scenarios
    #[must_use]
    pub fn failures(&self) -> Vec<&ScenarioOutcome> {
        self.results
            .iter()
            .filter(|r| r.status.is_failed())
            .collect()
    }

    /// Generate summary string
    #[must_use]
    pub fn summary(&self) -> String {
        format!(
            "{}: {}/{} passed ({:.1}%), seed {}",
            self.suite_name,
            self.passed_count(),
            self.total_count(),
            self.pass_rate() * 100.0,
            self.seed
        )
    }

    /// Write attachments, JSON, HTML and JUnit reports under `dir`
    ///
    /// # Errors
    ///
    /// Returns error if a file cannot be written
    pub fn write(&mut self, dir: &Path) -> ProbeResult<ReportPaths> {
        std::fs::create_dir_all(dir)?;
        for outcome in &mut self.results {
            let slug = slugify(&outcome.full_name());
            for (i, attachment) in outcome.attachments.iter_mut().enumerate() {
                let relative = format!(
                    "attachments/{slug}/{:02}-{}.{}",
                    i + 1,
                    slugify(&attachment.name),
                    attachment.extension()
                );
                let path = dir.join(&relative);
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(&path, &attachment.body)?;
                attachment.path = Some(relative);
            }
        }

        let paths = ReportPaths {
            json: dir.join("report.json"),
            html: dir.join("report.html"),
            junit: dir.join("junit.xml"),
        };
        std::fs::write(&paths.json, serde_json::to_string_pretty(self)?)?;
        std::fs::write(&paths.html, self.render_html())?;
        std::fs::write(&paths.junit, self.render_junit())?;
        Ok(paths)
    }

    /// Render HTML report content
    #[must_use]
    pub fn render_html(&self) -> String {
        let mut html = String::new();

        html.push_str(
            r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>todoprobe report</title>
    <style>
        body { font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 20px; }
        .summary { background: #f5f5f5; padding: 20px; border-radius: 8px; margin-bottom: 20px; }
        .progress-bar { background: #ddd; height: 20px; border-radius: 10px; overflow: hidden; }
        .passed { background: #4caf50; height: 100%; }
        .test { padding: 10px; margin: 5px 0; border-radius: 4px; }
        .test.pass { background: #e8f5e9; border-left: 4px solid #4caf50; }
        .test.fail { background: #ffebee; border-left: 4px solid #f44336; }
        .test.skip { background: #fff3e0; border-left: 4px solid #ff9800; }
        .error { color: #d32f2f; font-family: monospace; white-space: pre-wrap; }
        .steps li.fail { color: #d32f2f; }
    </style>
</head>
<body>
"#,
        );

        let _ = write!(
            html,
            r#"<div class="summary">
    <h1>{}</h1>
    <h2>Results: {}/{} passed ({:.1}%)</h2>
    <div class="progress-bar">
        <div class="passed" style="width: {:.1}%"></div>
    </div>
    <p>Run {} against {} ({} backend), seed {}, started {}</p>
    <p>Duration: {:.2}s</p>
</div>
"#,
            escape_xml(&self.suite_name),
            self.passed_count(),
            self.total_count(),
            self.pass_rate() * 100.0,
            self.pass_rate() * 100.0,
            self.run_id,
            escape_xml(&self.base_url),
            escape_xml(&self.backend),
            self.seed,
            self.started_at.to_rfc3339(),
            self.total_duration().as_secs_f64()
        );

        html.push_str("<h2>Scenarios</h2>\n");
        for result in &self.results {
            let class = match result.status {
                TestStatus::Passed => "pass",
                TestStatus::Failed => "fail",
                TestStatus::Skipped => "skip",
            };
            let _ = write!(
                html,
                r#"<div class="test {class}">
    <strong>{}</strong> - {:?} ({:.2}ms, seed {})
"#,
                escape_xml(&result.full_name()),
                result.status,
                result.duration.as_secs_f64() * 1000.0,
                result.seed
            );

            if !result.steps.is_empty() {
                html.push_str("    <ol class=\"steps\">\n");
                for step in &result.steps {
                    let step_class = if step.status.is_failed() { "fail" } else { "pass" };
                    let _ = writeln!(
                        html,
                        r#"        <li class="{step_class}">{}</li>"#,
                        escape_xml(&step.name)
                    );
                }
                html.push_str("    </ol>\n");
            }

            if let Some(reason) = result.failure_reason() {
                let _ = writeln!(html, r#"    <div class="error">{}</div>"#, escape_xml(&reason));
            }
            for failure in result.failures.iter().skip(1) {
                let _ = writeln!(
                    html,
                    r#"    <div class="error">{}</div>"#,
                    escape_xml(&failure.to_string())
                );
            }

            for attachment in &result.attachments {
                if let Some(path) = &attachment.path {
                    let _ = writeln!(
                        html,
                        r#"    <div><a href="{}">{}</a> ({})</div>"#,
                        escape_xml(path),
                        escape_xml(&attachment.name),
                        attachment.content_type
                    );
                }
            }

            html.push_str("</div>\n");
        }

        html.push_str(
            r"
<footer>
    <p>Generated by todoprobe</p>
</footer>
</body>
</html>
",
        );

        html
    }

    /// Render JUnit XML content
    #[must_use]
    pub fn render_junit(&self) -> String {
        let mut xml = String::new();

        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        xml.push('\n');
        let _ = writeln!(
            xml,
            r#"<testsuite name="{}" tests="{}" failures="{}" skipped="{}" time="{:.3}">"#,
            escape_xml(&self.suite_name),
            self.total_count(),
            self.failed_count(),
            self.skipped_count(),
            self.total_duration().as_secs_f64()
        );

        for result in &self.results {
            let _ = writeln!(
                xml,
                r#"  <testcase classname="{}" name="{}" time="{:.3}">"#,
                escape_xml(result.group.as_deref().unwrap_or("todomvc")),
                escape_xml(&result.name),
                result.duration.as_secs_f64()
            );
            if let Some(reason) = result.failure_reason() {
                let _ = writeln!(
                    xml,
                    r#"    <failure message="{}">{}</failure>"#,
                    escape_xml(&reason),
                    escape_xml(&reason)
                );
            } else if result.status == TestStatus::Skipped {
                xml.push_str("    <skipped/>\n");
            }
            xml.push_str("  </testcase>\n");
        }

        xml.push_str("</testsuite>\n");
        xml
    }
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

fn slugify(s: &str) -> String {
    let mut slug = String::with_capacity(s.len());
    for c in s.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}
