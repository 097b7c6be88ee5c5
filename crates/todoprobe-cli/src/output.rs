//! Terminal output for a run: progress bar, one line per finished scenario,
//! and the closing summary. Everything goes to stderr.

use console::{style, StyledObject, Term};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use todoprobe::{Reporter, ScenarioOutcome, TestStatus};

#[derive(Debug, Clone, Copy)]
enum Mark {
    Pass,
    Fail,
    Skip,
    Warn,
    Info,
}

impl Mark {
    const fn plain(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Fail => "FAIL",
            Self::Skip => "SKIP",
            Self::Warn => "WARN",
            Self::Info => "INFO",
        }
    }

    fn styled(self) -> StyledObject<&'static str> {
        match self {
            Self::Pass => style("✓").green().bold(),
            Self::Fail => style("✗").red().bold(),
            Self::Skip => style("-").yellow(),
            Self::Warn => style("⚠").yellow().bold(),
            Self::Info => style("ℹ").blue().bold(),
        }
    }
}

/// Progress reporter for suite execution
#[derive(Debug)]
pub struct ProgressReporter {
    term: Term,
    progress_bar: Option<ProgressBar>,
    /// Whether to use colors
    pub use_color: bool,
    /// Only failures and a failed summary
    pub quiet: bool,
}

impl ProgressReporter {
    /// Reporter writing to stderr
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            progress_bar: None,
            use_color,
            quiet,
        }
    }

    /// Show a bar over `total` scenarios
    pub fn start_progress(&mut self, total: u64, message: &str) {
        if self.quiet {
            return;
        }
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        pb.set_message(message.to_string());
        self.progress_bar = Some(pb);
    }

    /// Remove the bar
    pub fn finish(&self) {
        if let Some(pb) = &self.progress_bar {
            pb.finish_and_clear();
        }
    }

    /// Lines go above the bar while it is drawn
    fn line(&self, text: &str) {
        match &self.progress_bar {
            Some(pb) if !pb.is_hidden() => pb.println(text),
            _ => {
                let _ = self.term.write_line(text);
            }
        }
    }

    fn marked(&self, mark: Mark, text: &str) -> String {
        if self.use_color {
            format!("{} {text}", mark.styled())
        } else {
            format!("{} {text}", mark.plain())
        }
    }

    /// Report one finished scenario and advance the bar
    pub fn scenario_finished(&self, outcome: &ScenarioOutcome) {
        if let Some(pb) = &self.progress_bar {
            pb.inc(1);
        }
        let name = outcome.full_name();
        match outcome.status {
            TestStatus::Passed if !self.quiet => {
                let secs = outcome.duration.as_secs_f64();
                self.line(&self.marked(Mark::Pass, &format!("{name} ({secs:.2}s)")));
            }
            TestStatus::Skipped if !self.quiet => self.line(&self.marked(Mark::Skip, &name)),
            TestStatus::Failed => {
                self.line(&self.marked(Mark::Fail, &name));
                if let Some(reason) = outcome.failure_reason() {
                    self.line(&format!("    {reason}"));
                }
                for failure in outcome.failures.iter().skip(1) {
                    self.line(&format!("    {failure}"));
                }
            }
            TestStatus::Passed | TestStatus::Skipped => {}
        }
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.line(&self.marked(Mark::Warn, message));
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.line(&self.marked(Mark::Info, message));
        }
    }

    /// Print a section header
    pub fn header(&self, title: &str) {
        if self.quiet {
            return;
        }
        let title = if self.use_color {
            style(title).bold().underlined().to_string()
        } else {
            format!("=== {title} ===")
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&title);
    }

    /// Closing summary: totals, then each failed scenario with the step that
    /// broke and the seed its data came from
    pub fn summary(&self, report: &Reporter, elapsed: Duration) {
        let failed = report.failed_count();
        if self.quiet && failed == 0 {
            return;
        }
        let verdict = if failed > 0 { "FAILED" } else { "PASSED" };
        let verdict = match (self.use_color, failed > 0) {
            (false, _) => verdict.to_string(),
            (true, true) => style(verdict).red().bold().to_string(),
            (true, false) => style(verdict).green().bold().to_string(),
        };
        let _ = self.term.write_line("");
        let _ = self.term.write_line(&format!(
            "{verdict} {} scenarios in {:.2}s ({} passed, {failed} failed, {} skipped)",
            report.total_count(),
            elapsed.as_secs_f64(),
            report.passed_count(),
            report.skipped_count(),
        ));
        for outcome in report.failures() {
            let step = outcome.failed_step().map_or("-", |s| s.name.as_str());
            let _ = self.term.write_line(&format!(
                "  {}  (step: {step}, scenario seed {})",
                outcome.full_name(),
                outcome.seed
            ));
        }
    }
}
