//! Auto-waiting session over a [`PageDriver`].
//!
//! Actions wait until their target resolves to exactly one visible element,
//! then act. If that never happens within the element timeout the action
//! fails, and the failure is fatal to the scenario. There is no retry of the
//! action itself.

use crate::driver::{ElementState, PageDriver, Screenshot, Timeouts};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use std::time::{Duration, Instant};
use tracing::debug;

/// Poll loop bounded by a deadline
#[derive(Debug, Clone, Copy)]
pub struct Poller {
    deadline: Instant,
    interval: Duration,
}

impl Poller {
    /// Start polling now, for at most `timeout`
    #[must_use]
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            interval,
        }
    }

    /// Whether the deadline has passed
    #[must_use]
    pub fn expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Sleep until the next attempt. Returns `false` once the deadline has passed.
    pub async fn next(&mut self) -> bool {
        if self.expired() {
            return false;
        }
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        tokio::time::sleep(self.interval.min(remaining)).await;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Actionability {
    Missing,
    Hidden,
    Ready,
}

/// A browser session owned by exactly one scenario
pub struct Session {
    driver: Box<dyn PageDriver>,
    timeouts: Timeouts,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("timeouts", &self.timeouts)
            .finish_non_exhaustive()
    }
}

impl Session {
    /// Wrap a driver
    #[must_use]
    pub fn new(driver: Box<dyn PageDriver>, timeouts: Timeouts) -> Self {
        Self { driver, timeouts }
    }

    /// Wait tuning for this session
    #[must_use]
    pub const fn timeouts(&self) -> &Timeouts {
        &self.timeouts
    }

    /// A poller for expectations
    #[must_use]
    pub fn expect_poller(&self) -> Poller {
        Poller::new(self.timeouts.expect, self.timeouts.poll_interval)
    }

    /// Navigate to `url`, waiting for the page to load
    pub async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        debug!(url, "goto");
        let budget = self.timeouts.navigation;
        tokio::time::timeout(budget, self.driver.goto(url))
            .await
            .map_err(|_| ProbeError::Navigation {
                url: url.to_string(),
                message: format!("load not reached within {}ms", budget.as_millis()),
            })?
    }

    /// Reload the current page
    pub async fn reload(&mut self) -> ProbeResult<()> {
        debug!("reload");
        let budget = self.timeouts.navigation;
        tokio::time::timeout(budget, self.driver.reload())
            .await
            .map_err(|_| ProbeError::Timeout {
                ms: budget.as_millis() as u64,
            })?
    }

    /// Current URL
    pub async fn current_url(&self) -> ProbeResult<String> {
        self.driver.current_url().await
    }

    /// Capture the page
    pub async fn screenshot(&self) -> ProbeResult<Screenshot> {
        self.driver.screenshot().await
    }

    /// State of every element the locator matches right now
    pub async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        self.driver.query(locator).await
    }

    /// Number of elements the locator matches right now
    pub async fn count(&self, locator: &Locator) -> ProbeResult<usize> {
        Ok(self.driver.query(locator).await?.len())
    }

    /// Computed style property of every match
    pub async fn css_values(&self, locator: &Locator, property: &str) -> ProbeResult<Vec<String>> {
        self.driver.css_values(locator, property).await
    }

    async fn actionability(&self, locator: &Locator) -> ProbeResult<Actionability> {
        let matches = self.driver.query(locator).await?;
        match matches.as_slice() {
            [] => Ok(Actionability::Missing),
            [one] if one.visible => Ok(Actionability::Ready),
            [_] => Ok(Actionability::Hidden),
            many => Err(ProbeError::StrictModeViolation {
                locator: locator.to_string(),
                count: many.len(),
            }),
        }
    }

    /// Wait until `locator` resolves to one visible element
    pub async fn wait_actionable(&self, locator: &Locator) -> ProbeResult<()> {
        let mut poller = Poller::new(self.timeouts.element, self.timeouts.poll_interval);
        let mut last = Actionability::Missing;
        loop {
            last = match self.actionability(locator).await? {
                Actionability::Ready => return Ok(()),
                other => other.max_seen(last),
            };
            if !poller.next().await {
                break;
            }
        }
        Err(match last {
            Actionability::Hidden => ProbeError::NotInteractable {
                locator: locator.to_string(),
                reason: "element is not visible".to_string(),
            },
            _ => ProbeError::ControlNotFound {
                locator: locator.to_string(),
                timeout_ms: self.timeouts.element.as_millis() as u64,
            },
        })
    }

    /// Fill a text input
    pub async fn fill(&mut self, locator: &Locator, text: &str) -> ProbeResult<()> {
        self.wait_actionable(locator).await?;
        debug!(%locator, text, "fill");
        self.driver.fill(locator, text).await
    }

    /// Press a key on an element
    pub async fn press(&mut self, locator: &Locator, key: &str) -> ProbeResult<()> {
        self.wait_actionable(locator).await?;
        debug!(%locator, key, "press");
        self.driver.press(locator, key).await
    }

    /// Hover an element
    pub async fn hover(&mut self, locator: &Locator) -> ProbeResult<()> {
        self.wait_actionable(locator).await?;
        debug!(%locator, "hover");
        self.driver.hover(locator).await
    }

    /// Click an element
    pub async fn click(&mut self, locator: &Locator) -> ProbeResult<()> {
        self.wait_actionable(locator).await?;
        debug!(%locator, "click");
        self.driver.click(locator).await
    }

    /// Check or uncheck a checkbox
    pub async fn set_checked(&mut self, locator: &Locator, checked: bool) -> ProbeResult<()> {
        self.wait_actionable(locator).await?;
        debug!(%locator, checked, "set_checked");
        self.driver.set_checked(locator, checked).await
    }

    /// Close the underlying driver
    pub async fn close(mut self) -> ProbeResult<()> {
        self.driver.close().await
    }
}

impl Actionability {
    /// Hidden beats missing: an element that showed up at least once is
    /// reported as not interactable rather than not found.
    fn max_seen(self, previous: Self) -> Self {
        if self == Self::Hidden || previous == Self::Hidden {
            Self::Hidden
        } else {
            self
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{InMemoryDriver, TodoApp};

    fn session() -> Session {
        Session::new(Box::new(InMemoryDriver::new(TodoApp::new())), Timeouts::fast())
    }

    mod poller_tests {
        use super::*;

        #[tokio::test]
        async fn test_poller_expires() {
            let mut poller = Poller::new(Duration::from_millis(20), Duration::from_millis(5));
            let mut ticks = 0;
            while poller.next().await {
                ticks += 1;
            }
            assert!(ticks >= 1);
            assert!(poller.expired());
        }

        #[tokio::test]
        async fn test_zero_timeout_never_sleeps() {
            let mut poller = Poller::new(Duration::ZERO, Duration::from_secs(10));
            assert!(!poller.next().await);
        }
    }

    mod action_tests {
        use super::*;

        #[tokio::test]
        async fn test_missing_control_fails_fast_with_not_found() {
            let mut s = session();
            s.goto("https://todo.test/#/").await.unwrap();
            let err = s
                .click(&Locator::new("button[class='clear-completed']"))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::ControlNotFound { .. }));
        }

        #[tokio::test]
        async fn test_hidden_control_is_not_interactable() {
            let mut s = session();
            s.goto("https://todo.test/#/").await.unwrap();
            let input = Locator::new("input[class='new-todo']");
            s.fill(&input, "Desk Lamp").await.unwrap();
            s.press(&input, "Enter").await.unwrap();

            let err = s
                .click(&Locator::by_label("Delete").nth(0))
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::NotInteractable { .. }));
        }

        #[tokio::test]
        async fn test_ambiguous_action_is_strict_violation() {
            let mut s = session();
            s.goto("https://todo.test/#/").await.unwrap();
            let input = Locator::new("input[class='new-todo']");
            for name in ["A", "B"] {
                s.fill(&input, name).await.unwrap();
                s.press(&input, "Enter").await.unwrap();
            }
            let err = s
                .set_checked(&Locator::by_label("Toggle Todo"), true)
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ProbeError::StrictModeViolation { count: 2, .. }
            ));
        }

        #[tokio::test]
        async fn test_count_tolerates_zero_matches() {
            let mut s = session();
            s.goto("https://todo.test/#/").await.unwrap();
            assert_eq!(s.count(&Locator::new("span[class='todo-count']")).await.unwrap(), 0);
        }
    }
}
