//! TodoMVC application model.
//!
//! Holds the list, the selected filter, the entry field draft and the hovered
//! row, and renders them into a [`Dom`] with the markup the reference
//! application serves. Storage is shared through an `Arc` so it outlives page
//! loads the same way `localStorage` does.

use super::Quirks;
use crate::dom::{Dom, NodeId};
use crate::page::FilterMode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

const COMPLETED_DECORATION: &str = "line-through solid rgb(148, 148, 148)";
const ACTIVE_DECORATION: &str = "none solid rgb(72, 72, 72)";

/// One entry of the list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoItem {
    /// Display text
    pub title: String,
    /// Completion flag
    pub completed: bool,
}

impl TodoItem {
    /// A new active item
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            completed: false,
        }
    }
}

/// What an element does when interacted with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    /// The entry field
    NewTodo,
    /// Toggle-all checkbox or its label
    ToggleAll,
    /// Row of the item at this list position
    ItemRow(usize),
    /// Completion checkbox of the item at this list position
    ItemToggle(usize),
    /// Delete control of the item at this list position
    ItemDestroy(usize),
    /// Footer filter link
    Filter(FilterMode),
    /// Bulk clear control
    ClearCompleted,
}

/// A rendered page plus the interactive elements in it
#[derive(Debug, Clone)]
pub struct Rendered {
    /// The document
    pub dom: Dom,
    /// Interaction targets by element
    pub targets: HashMap<NodeId, Target>,
}

impl Rendered {
    /// Target of `id`, an ancestor of it, or its first interactive descendant
    #[must_use]
    pub fn target_for(&self, id: NodeId) -> Option<Target> {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if let Some(target) = self.targets.get(&node) {
                return Some(*target);
            }
            cursor = self.dom.parent(node);
        }
        self.dom
            .descendants(id)
            .into_iter()
            .find_map(|d| self.targets.get(&d).copied())
    }

    /// List position of the row containing `id`
    #[must_use]
    pub fn row_of(&self, id: NodeId) -> Option<usize> {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if let Some(Target::ItemRow(i)) = self.targets.get(&node) {
                return Some(*i);
            }
            cursor = self.dom.parent(node);
        }
        None
    }
}

/// In-memory TodoMVC
#[derive(Debug, Clone)]
pub struct TodoApp {
    storage: Arc<Mutex<Vec<TodoItem>>>,
    items: Vec<TodoItem>,
    filter: FilterMode,
    draft: String,
    hovered: Option<usize>,
    loads: usize,
    quirks: Quirks,
}

impl Default for TodoApp {
    fn default() -> Self {
        Self::new()
    }
}

impl TodoApp {
    /// A well-behaved application with empty storage
    #[must_use]
    pub fn new() -> Self {
        Self::with_quirks(Quirks::default())
    }

    /// An application with injected defects
    #[must_use]
    pub fn with_quirks(quirks: Quirks) -> Self {
        Self {
            storage: Arc::new(Mutex::new(Vec::new())),
            items: Vec::new(),
            filter: FilterMode::All,
            draft: String::new(),
            hovered: None,
            loads: 0,
            quirks,
        }
    }

    /// Injected defects
    #[must_use]
    pub const fn quirks(&self) -> Quirks {
        self.quirks
    }

    /// Load the page at `url`, restoring the list from storage
    pub fn load(&mut self, url: &str) {
        let mut stored = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        if self.loads > 0 && self.quirks.forget_on_reload {
            stored.clear();
        }
        self.items = stored.clone();
        drop(stored);
        self.loads += 1;
        self.filter = FilterMode::from_url(url);
        self.draft.clear();
        self.hovered = None;
    }

    fn persist(&self) {
        let mut stored = self.storage.lock().unwrap_or_else(PoisonError::into_inner);
        stored.clone_from(&self.items);
    }

    /// Every item, in insertion order
    #[must_use]
    pub fn items(&self) -> &[TodoItem] {
        &self.items
    }

    /// Number of items not yet completed
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.items.iter().filter(|i| !i.completed).count()
    }

    /// Selected filter
    #[must_use]
    pub const fn filter(&self) -> FilterMode {
        self.filter
    }

    /// Select a filter
    pub fn set_filter(&mut self, filter: FilterMode) {
        self.filter = filter;
        self.hovered = None;
    }

    /// Current content of the entry field
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the content of the entry field
    pub fn set_draft(&mut self, text: &str) {
        self.draft = text.to_string();
    }

    /// Commit the entry field. Blank titles are dropped.
    pub fn commit_draft(&mut self) {
        let title = self.draft.trim().to_string();
        self.draft.clear();
        if title.is_empty() && !self.quirks.accept_empty {
            return;
        }
        self.items.push(TodoItem::new(title));
        self.persist();
    }

    /// Move the pointer over a row, or off every row
    pub fn hover(&mut self, row: Option<usize>) {
        self.hovered = row;
    }

    /// Flip one item
    pub fn toggle(&mut self, index: usize) {
        if let Some(item) = self.items.get_mut(index) {
            item.completed = !item.completed;
            self.persist();
        }
    }

    /// Complete every item, or reopen every item if all are complete
    pub fn toggle_all(&mut self) {
        let target = !self.all_completed();
        for item in &mut self.items {
            item.completed = target;
        }
        self.persist();
    }

    fn all_completed(&self) -> bool {
        !self.items.is_empty() && self.items.iter().all(|i| i.completed)
    }

    /// Delete one item
    pub fn destroy(&mut self, index: usize) {
        if index < self.items.len() {
            let _ = self.items.remove(index);
            self.hovered = None;
            self.persist();
        }
    }

    /// Delete every completed item
    pub fn clear_completed(&mut self) {
        if self.quirks.ignore_clear_completed {
            return;
        }
        self.items.retain(|i| !i.completed);
        self.hovered = None;
        self.persist();
    }

    /// Render the current state
    #[must_use]
    pub fn render(&self) -> Rendered {
        let mut dom = Dom::new();
        let mut targets = HashMap::new();
        let root = dom.root();
        let html = dom.append_element(root, "html", &[]);
        let body = dom.append_element(html, "body", &[]);
        let app = dom.append_element(body, "section", &[("class", "todoapp")]);

        let header = dom.append_element(app, "header", &[("class", "header")]);
        let h1 = dom.append_element(header, "h1", &[]);
        let _ = dom.append_text(h1, "todos");
        let input = dom.append_element(
            header,
            "input",
            &[
                ("class", "new-todo"),
                ("placeholder", "What needs to be done?"),
            ],
        );
        if let Some(el) = dom.element_mut(input) {
            el.value.clone_from(&self.draft);
        }
        let _ = targets.insert(input, Target::NewTodo);

        if !self.items.is_empty() {
            self.render_main(&mut dom, &mut targets, app);
        }
        if !self.items.is_empty() || self.quirks.zero_counter {
            self.render_footer(&mut dom, &mut targets, app);
        }
        Rendered { dom, targets }
    }

    fn render_main(&self, dom: &mut Dom, targets: &mut HashMap<NodeId, Target>, app: NodeId) {
        let main = dom.append_element(app, "section", &[("class", "main")]);
        let toggle_all = dom.append_element(
            main,
            "input",
            &[("id", "toggle-all"), ("class", "toggle-all"), ("type", "checkbox")],
        );
        if let Some(el) = dom.element_mut(toggle_all) {
            el.checked = self.all_completed();
        }
        let _ = targets.insert(toggle_all, Target::ToggleAll);
        let toggle_label = dom.append_element(main, "label", &[("for", "toggle-all")]);
        let _ = dom.append_text(toggle_label, "Mark all as complete");
        let _ = targets.insert(toggle_label, Target::ToggleAll);

        let list = dom.append_element(main, "ul", &[("class", "todo-list")]);
        for (index, item) in self.items.iter().enumerate() {
            if !self.filter.shows(item.completed) {
                continue;
            }
            let class = if item.completed { "completed" } else { "" };
            let row = dom.append_element(list, "li", &[("data-testid", "todo-item"), ("class", class)]);
            let _ = targets.insert(row, Target::ItemRow(index));
            let view = dom.append_element(row, "div", &[("class", "view")]);

            let toggle = dom.append_element(
                view,
                "input",
                &[("class", "toggle"), ("type", "checkbox"), ("aria-label", "Toggle Todo")],
            );
            if let Some(el) = dom.element_mut(toggle) {
                el.checked = item.completed;
            }
            let _ = targets.insert(toggle, Target::ItemToggle(index));

            let label = dom.append_element(view, "label", &[("data-testid", "todo-title")]);
            let _ = dom.append_text(label, &item.title);
            let decoration = if item.completed {
                COMPLETED_DECORATION
            } else {
                ACTIVE_DECORATION
            };
            dom.set_style(label, "text-decoration", decoration);

            let destroy = dom.append_element(
                view,
                "button",
                &[("class", "destroy"), ("aria-label", "Delete")],
            );
            if self.hovered != Some(index) {
                dom.set_style(destroy, "display", "none");
            }
            let _ = targets.insert(destroy, Target::ItemDestroy(index));
        }
    }

    fn render_footer(&self, dom: &mut Dom, targets: &mut HashMap<NodeId, Target>, app: NodeId) {
        let footer = dom.append_element(app, "footer", &[("class", "footer")]);
        let count = dom.append_element(footer, "span", &[("class", "todo-count")]);
        let remaining = self.remaining();
        let strong = dom.append_element(count, "strong", &[]);
        let _ = dom.append_text(strong, &remaining.to_string());
        let noun = if remaining == 1 { "item" } else { "items" };
        let _ = dom.append_text(count, &format!(" {noun} left"));

        let filters = dom.append_element(footer, "ul", &[("class", "filters")]);
        for mode in FilterMode::ALL {
            let li = dom.append_element(filters, "li", &[]);
            let class = if mode == self.filter { "selected" } else { "" };
            let link = dom.append_element(li, "a", &[("class", class), ("href", mode.route())]);
            let _ = dom.append_text(link, mode.label());
            let _ = targets.insert(link, Target::Filter(mode));
        }

        if self.items.iter().any(|i| i.completed) {
            let clear = dom.append_element(footer, "button", &[("class", "clear-completed")]);
            let _ = dom.append_text(clear, "Clear completed");
            let _ = targets.insert(clear, Target::ClearCompleted);
        }
    }
}
