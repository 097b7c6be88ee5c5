//! TodoMVC expectations.
//!
//! Each expectation re-checks the page until it holds or the expect timeout
//! runs out, then records one outcome in the scenario's
//! [`SoftAssertions`]. A failed expectation does not stop the scenario.
//! Driver errors raised while checking still propagate.

use crate::assertion::{SoftAssertions, Verdict};
use crate::locator::text_matches;
use crate::page::TodoPage;
use crate::result::{ProbeError, ProbeResult};
use crate::session::Session;
use regex::Regex;
use tracing::debug;

#[derive(Debug)]
enum Check<'c> {
    ItemCreated(&'c str),
    ItemListed(&'c str),
    CountText(usize),
    CounterAbsent,
    Decoration { index: usize, completed: bool },
    RenderedRows(usize),
}

/// Expectations bound to one scenario
#[derive(Debug)]
pub struct Expectations<'a> {
    session: &'a Session,
    soft: &'a mut SoftAssertions,
}

impl<'a> Expectations<'a> {
    /// Bind to a session and a collector
    pub fn new(session: &'a Session, soft: &'a mut SoftAssertions) -> Self {
        Self { session, soft }
    }

    /// The first rendered item is visible and reads `text`
    pub async fn item_created(&mut self, text: &str) -> ProbeResult<()> {
        self.expect(Check::ItemCreated(text)).await
    }

    /// Some rendered item containing `text` is visible
    pub async fn item_listed(&mut self, text: &str) -> ProbeResult<()> {
        self.expect(Check::ItemListed(text)).await
    }

    /// The counter is visible and reads "`count` item left" or "`count` items left"
    pub async fn item_count_matches(&mut self, count: usize) -> ProbeResult<()> {
        self.expect(Check::CountText(count)).await
    }

    /// The counter is not rendered at all
    pub async fn counter_absent(&mut self) -> ProbeResult<()> {
        self.expect(Check::CounterAbsent).await
    }

    /// The label of the rendered row at `index` is struck through
    pub async fn item_marked_completed(&mut self, index: usize) -> ProbeResult<()> {
        self.expect(Check::Decoration {
            index,
            completed: true,
        })
        .await
    }

    /// The label of the rendered row at `index` is not struck through
    pub async fn item_marked_active(&mut self, index: usize) -> ProbeResult<()> {
        self.expect(Check::Decoration {
            index,
            completed: false,
        })
        .await
    }

    /// Exactly `count` rows are rendered
    pub async fn rendered_item_count(&mut self, count: usize) -> ProbeResult<()> {
        self.expect(Check::RenderedRows(count)).await
    }

    async fn expect(&mut self, check: Check<'_>) -> ProbeResult<()> {
        let mut poller = self.session.expect_poller();
        let result = loop {
            let result = self.evaluate(&check).await?;
            if result.holds() || !poller.next().await {
                break result;
            }
        };
        debug!(?check, passed = result.holds(), "expectation");
        self.soft.record(result);
        self.soft.check_fail_fast()
    }

    async fn evaluate(&self, check: &Check<'_>) -> ProbeResult<Verdict> {
        let session = self.session;
        Ok(match check {
            Check::ItemCreated(text) => {
                let rows = session.query(&TodoPage::todo_items()).await?;
                match rows.first() {
                    None => Verdict::Broken(format!(
                        "expected first item '{text}', but no items are rendered"
                    )),
                    Some(row) => Verdict::holds_if(
                        row.visible && text_matches(&row.text, text, true),
                        || {
                            format!(
                                "expected first item '{text}', found '{}'{}",
                                row.text,
                                if row.visible { "" } else { " (hidden)" }
                            )
                        },
                    ),
                }
            }
            Check::ItemListed(text) => {
                let rows = session.query(&TodoPage::todo_items()).await?;
                Verdict::holds_if(
                    rows.iter()
                        .any(|r| r.visible && text_matches(&r.text, text, false)),
                    || {
                        let seen: Vec<&str> = rows.iter().map(|r| r.text.as_str()).collect();
                        format!("expected an item containing '{text}', rendered items: {seen:?}")
                    },
                )
            }
            Check::CountText(count) => {
                let pattern = count_pattern(*count)?;
                let counters = session.query(&TodoPage::todo_count()).await?;
                match counters.as_slice() {
                    [counter] if counter.visible => Verdict::holds_if(
                        pattern.is_match(&counter.text),
                        || {
                            format!(
                                "expected counter to match /{}/, found '{}'",
                                pattern.as_str(),
                                counter.text
                            )
                        },
                    ),
                    [_] => Verdict::Broken("expected a visible counter, it is hidden".into()),
                    other => Verdict::Broken(format!(
                        "expected one counter reading '{count} item(s) left', found {}",
                        other.len()
                    )),
                }
            }
            Check::CounterAbsent => {
                let counters = session.query(&TodoPage::todo_count()).await?;
                Verdict::holds_if(counters.is_empty(), || {
                    let texts: Vec<&str> = counters.iter().map(|c| c.text.as_str()).collect();
                    format!("expected no counter, found {texts:?}")
                })
            }
            Check::Decoration { index, completed } => {
                let values = session
                    .css_values(&TodoPage::todo_item_label(*index), "text-decoration")
                    .await?;
                match values.first() {
                    None => Verdict::Broken(format!("expected an item at position {index}")),
                    Some(value) => {
                        let struck = value.contains("line-through");
                        Verdict::holds_if(struck == *completed, || {
                            let wanted = if *completed { "completed" } else { "active" };
                            format!(
                                "expected item {index} to be marked {wanted}, text-decoration is '{value}'"
                            )
                        })
                    }
                }
            }
            Check::RenderedRows(count) => {
                let rendered = session.count(&TodoPage::todo_items()).await?;
                Verdict::holds_if(rendered == *count, || {
                    format!("expected {count} rendered items, found {rendered}")
                })
            }
        })
    }
}

/// `^{count} items? left$`, case-sensitive
fn count_pattern(count: usize) -> ProbeResult<Regex> {
    Regex::new(&format!(r"^{count} items? left$")).map_err(|e| ProbeError::Assertion {
        message: e.to_string(),
    })
}
