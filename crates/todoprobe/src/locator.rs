//! Locator abstraction for element selection.
//!
//! A [`Locator`] is a lazy chain of query steps. Nothing is resolved until a
//! driver evaluates it against the live page, so the same locator can be
//! reused before and after the page re-renders.
//!
//! # Design Philosophy
//!
//! - **Semantic first**: test ids, accessible labels and visible text are
//!   preferred over structural paths
//! - **Zero matches is not an error**: resolution yields an empty collection;
//!   only actions demand a match
//! - **Fluent API**: chainable `locator`/`get_by_*`/`nth` calls, mirroring the
//!   way page objects read

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single query against the page or against the elements matched so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Selector {
    /// CSS selector (e.g., "input[class='new-todo']")
    Css(String),
    /// Test ID selector (`data-testid` attribute)
    TestId(String),
    /// Accessible label (`aria-label` or an associated `<label for>`)
    Label(String),
    /// Smallest elements whose text matches
    Text {
        /// Text to look for
        text: String,
        /// Whole-string, case-sensitive match instead of substring
        exact: bool,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    /// Create a test ID selector
    #[must_use]
    pub fn test_id(id: impl Into<String>) -> Self {
        Self::TestId(id.into())
    }

    /// Create an accessible label selector
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self::Label(label.into())
    }

    /// Create a substring, case-insensitive text selector
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: false,
        }
    }

    /// Create an exact text selector
    #[must_use]
    pub fn exact_text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            exact: true,
        }
    }

    fn to_js_step(&self) -> String {
        match self {
            Self::Css(s) => format!("els = P.css(els, {});", js_string(s)),
            Self::TestId(id) => format!("els = P.testId(els, {});", js_string(id)),
            Self::Label(label) => format!("els = P.label(els, {});", js_string(label)),
            Self::Text { text, exact } => {
                format!("els = P.text(els, {}, {exact});", js_string(text))
            }
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Css(s) => write!(f, "locator({s:?})"),
            Self::TestId(id) => write!(f, "get_by_test_id({id:?})"),
            Self::Label(label) => write!(f, "get_by_label({label:?})"),
            Self::Text { text, exact: false } => write!(f, "get_by_text({text:?})"),
            Self::Text { text, exact: true } => write!(f, "get_by_text_exact({text:?})"),
        }
    }
}

/// One link in a locator chain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocatorStep {
    /// Query descendants of every element matched so far
    Select(Selector),
    /// Keep only the element at this position (0-indexed, document order)
    Nth(usize),
}

/// A lazily-resolved reference to zero or more elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    steps: Vec<LocatorStep>,
}

impl Locator {
    /// Create a new locator with a CSS selector
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self::from_selector(Selector::Css(selector.into()))
    }

    /// Create a locator from a selector
    #[must_use]
    pub fn from_selector(selector: Selector) -> Self {
        Self {
            steps: vec![LocatorStep::Select(selector)],
        }
    }

    /// Elements carrying `data-testid="<id>"`
    #[must_use]
    pub fn by_test_id(id: impl Into<String>) -> Self {
        Self::from_selector(Selector::test_id(id))
    }

    /// Elements with the given accessible label
    #[must_use]
    pub fn by_label(label: impl Into<String>) -> Self {
        Self::from_selector(Selector::label(label))
    }

    fn push(mut self, step: LocatorStep) -> Self {
        self.steps.push(step);
        self
    }

    /// Narrow to descendants matching a CSS selector
    #[must_use]
    pub fn locator(self, selector: impl Into<String>) -> Self {
        self.push(LocatorStep::Select(Selector::Css(selector.into())))
    }

    /// Narrow to descendants with the given test id
    #[must_use]
    pub fn get_by_test_id(self, id: impl Into<String>) -> Self {
        self.push(LocatorStep::Select(Selector::test_id(id)))
    }

    /// Narrow to descendants containing `text` (case-insensitive)
    #[must_use]
    pub fn get_by_text(self, text: impl Into<String>) -> Self {
        self.push(LocatorStep::Select(Selector::text(text)))
    }

    /// Narrow to descendants whose whole text is `text`
    #[must_use]
    pub fn get_by_text_exact(self, text: impl Into<String>) -> Self {
        self.push(LocatorStep::Select(Selector::exact_text(text)))
    }

    /// Keep only the match at `index`
    #[must_use]
    pub fn nth(self, index: usize) -> Self {
        self.push(LocatorStep::Nth(index))
    }

    /// Keep only the first match
    #[must_use]
    pub fn first(self) -> Self {
        self.nth(0)
    }

    /// The steps of this chain, in evaluation order
    #[must_use]
    pub fn steps(&self) -> &[LocatorStep] {
        &self.steps
    }

    /// Whether the chain ends with a positional filter, i.e. targets at most one element
    #[must_use]
    pub fn is_positional(&self) -> bool {
        matches!(self.steps.last(), Some(LocatorStep::Nth(_)))
    }

    /// Compile the chain into a JavaScript expression evaluating to an array of elements
    #[must_use]
    pub fn to_js(&self) -> String {
        let mut body = String::new();
        for step in &self.steps {
            match step {
                LocatorStep::Select(selector) => body.push_str(&selector.to_js_step()),
                LocatorStep::Nth(i) => {
                    body.push_str(&format!("els = els.length > {i} ? [els[{i}]] : [];"));
                }
            }
        }
        format!("(() => {{ const P = {JS_PRELUDE}; let els = [document]; {body} return els; }})()")
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match step {
                LocatorStep::Select(selector) => write!(f, "{selector}")?,
                LocatorStep::Nth(n) => write!(f, "nth({n})")?,
            }
        }
        Ok(())
    }
}

/// Collapse runs of whitespace and trim, the way rendered text is compared
#[must_use]
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Text matching shared by every backend.
///
/// Exact matching compares whole normalized strings, case-sensitively.
/// Otherwise the needle is a case-insensitive substring.
#[must_use]
pub fn text_matches(haystack: &str, needle: &str, exact: bool) -> bool {
    let haystack = normalize_text(haystack);
    let needle = normalize_text(needle);
    if exact {
        haystack == needle
    } else {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    }
}

fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// Query helpers evaluated in the page; mirror the semantics of the in-memory resolver.
const JS_PRELUDE: &str = r"{
  norm: (s) => (s || '').replace(/\s+/g, ' ').trim(),
  textMatch: (el, t, exact) => {
    const s = P.norm(el.textContent);
    const n = P.norm(t);
    return exact ? s === n : s.toLowerCase().includes(n.toLowerCase());
  },
  ordered: (els) => Array.from(new Set(els)).sort((a, b) =>
    (a.compareDocumentPosition(b) & Node.DOCUMENT_POSITION_FOLLOWING) ? -1 : 1),
  within: (roots, f) => P.ordered(roots.flatMap((r) => Array.from(r.querySelectorAll('*')).filter(f))),
  css: (roots, sel) => P.ordered(roots.flatMap((r) => Array.from(r.querySelectorAll(sel)))),
  testId: (roots, id) => P.within(roots, (el) => el.getAttribute('data-testid') === id),
  label: (roots, l) => P.within(roots, (el) =>
    P.norm(el.getAttribute('aria-label')) === l ||
    (!!el.id && Array.from(document.querySelectorAll('label[for]'))
      .some((lb) => lb.htmlFor === el.id && P.norm(lb.textContent) === l))),
  text: (roots, t, exact) => P.within(roots, (el) =>
    P.textMatch(el, t, exact) && !Array.from(el.children).some((c) => P.textMatch(c, t, exact))),
}";

#[cfg(test)]
mod tests {
    use super::*;

    mod chain_tests {
        use super::*;

        #[test]
        fn test_new_is_single_css_step() {
            let loc = Locator::new("span[class='todo-count']");
            assert_eq!(
                loc.steps(),
                &[LocatorStep::Select(Selector::css("span[class='todo-count']"))]
            );
            assert!(!loc.is_positional());
        }

        #[test]
        fn test_chaining_appends_in_order() {
            let loc = Locator::by_test_id("todo-item").nth(2).locator("label");
            assert_eq!(loc.steps().len(), 3);
            assert_eq!(loc.steps()[1], LocatorStep::Nth(2));
            assert!(!loc.is_positional());
            assert!(Locator::by_label("Delete").nth(0).is_positional());
        }

        #[test]
        fn test_first_is_nth_zero() {
            assert_eq!(
                Locator::by_test_id("todo-item").first(),
                Locator::by_test_id("todo-item").nth(0)
            );
        }
    }

    mod display_tests {
        use super::*;

        #[test]
        fn test_display_reads_like_the_call_chain() {
            let loc = Locator::new("li").get_by_text_exact("Active");
            assert_eq!(loc.to_string(), "locator(\"li\").get_by_text_exact(\"Active\")");

            let loc = Locator::by_label("Toggle Todo").nth(4);
            assert_eq!(loc.to_string(), "get_by_label(\"Toggle Todo\").nth(4)");
        }
    }

    mod js_tests {
        use super::*;

        #[test]
        fn test_js_contains_each_step() {
            let js = Locator::by_test_id("todo-item").nth(1).locator("label").to_js();
            assert!(js.contains("P.testId(els, \"todo-item\")"));
            assert!(js.contains("els.length > 1 ? [els[1]]"));
            assert!(js.contains("P.css(els, \"label\")"));
            assert!(js.starts_with("(() => {"));
            assert!(js.ends_with("})()"));
        }

        #[test]
        fn test_js_escapes_quotes() {
            let js = Locator::new("input[class='new-todo']")
                .get_by_text("say \"hi\"")
                .to_js();
            assert!(js.contains(r#"P.text(els, "say \"hi\"", false)"#));
        }
    }

    mod text_match_tests {
        use super::*;

        #[test]
        fn test_normalize_collapses_whitespace() {
            assert_eq!(normalize_text("  3 \n items   left "), "3 items left");
        }

        #[test]
        fn test_substring_is_case_insensitive() {
            assert!(text_matches("Clear completed", "COMPLETED", false));
            assert!(!text_matches("Clear completed", "COMPLETED", true));
        }

        #[test]
        fn test_exact_requires_whole_string() {
            assert!(text_matches(" Completed ", "Completed", true));
            assert!(!text_matches("Clear completed", "Completed", true));
        }
    }
}
