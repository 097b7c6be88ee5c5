//! TodoMVC page object.
//!
//! Maps the semantic controls of the application to locators. Nothing here
//! touches the page: a locator is only resolved when an action or an
//! expectation uses it.

use crate::locator::Locator;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which subset of the list is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Every item
    #[default]
    All,
    /// Items not yet completed
    Active,
    /// Completed items
    Completed,
}

impl FilterMode {
    /// All modes, in footer order
    pub const ALL: [Self; 3] = [Self::All, Self::Active, Self::Completed];

    /// Text of the filter control
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }

    /// Route fragment the application uses for this filter
    #[must_use]
    pub const fn route(self) -> &'static str {
        match self {
            Self::All => "#/",
            Self::Active => "#/active",
            Self::Completed => "#/completed",
        }
    }

    /// Filter selected by a URL; unknown routes fall back to [`FilterMode::All`]
    #[must_use]
    pub fn from_url(url: &str) -> Self {
        match url.split_once('#').map(|(_, fragment)| fragment) {
            Some("/active") => Self::Active,
            Some("/completed") => Self::Completed,
            _ => Self::All,
        }
    }

    /// Whether an item with this completion flag is shown
    #[must_use]
    pub const fn shows(self, completed: bool) -> bool {
        match self {
            Self::All => true,
            Self::Active => !completed,
            Self::Completed => completed,
        }
    }
}

impl fmt::Display for FilterMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "all" => Ok(Self::All),
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            other => Err(format!("unknown filter '{other}'")),
        }
    }
}

/// Locator registry for the TodoMVC application
#[derive(Debug, Clone, Copy, Default)]
pub struct TodoPage;

impl TodoPage {
    /// Entry field for new items
    #[must_use]
    pub fn new_todo_input() -> Locator {
        Locator::new("input[class='new-todo']")
    }

    /// Every rendered item row
    #[must_use]
    pub fn todo_items() -> Locator {
        Locator::by_test_id("todo-item")
    }

    /// The row at `index` of the rendered list
    #[must_use]
    pub fn todo_item(index: usize) -> Locator {
        Self::todo_items().nth(index)
    }

    /// Text label of the row at `index`
    #[must_use]
    pub fn todo_item_label(index: usize) -> Locator {
        Self::todo_item(index).locator("label")
    }

    /// Every per-row delete control
    #[must_use]
    pub fn delete_buttons() -> Locator {
        Locator::by_label("Delete")
    }

    /// Checkbox that sets every item at once
    #[must_use]
    pub fn toggle_all() -> Locator {
        Locator::new("input[id='toggle-all']")
    }

    /// Every per-row completion checkbox
    #[must_use]
    pub fn item_toggles() -> Locator {
        Locator::by_label("Toggle Todo")
    }

    /// Footer control for a filter
    #[must_use]
    pub fn filter(mode: FilterMode) -> Locator {
        Locator::new("li").get_by_text_exact(mode.label())
    }

    /// "N items left" counter
    #[must_use]
    pub fn todo_count() -> Locator {
        Locator::new("span[class='todo-count']")
    }

    /// Bulk removal of completed items
    #[must_use]
    pub fn clear_completed() -> Locator {
        Locator::new("button[class='clear-completed']")
    }
}
