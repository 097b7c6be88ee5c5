//! Minimal document model for the in-memory backend.
//!
//! Nodes live in an arena indexed by [`NodeId`]. Only what the suite observes
//! is modelled: tags, attributes, text, checkbox state and a handful of
//! computed style properties. CSS selectors are matched by `scraper` against
//! the serialized document, each element tagged with its arena index.

use crate::driver::ElementState;
use crate::locator::{normalize_text, text_matches, Locator, LocatorStep, Selector};
use crate::result::{ProbeError, ProbeResult};
use scraper::{Html, Selector as CssSelector};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;

/// Carries the arena index through serialization for CSS matching
const NODE_ATTR: &str = "data-todoprobe-node";

/// Index of a node in its [`Dom`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
enum NodeKind {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

/// An element node
#[derive(Debug, Clone, Default)]
pub struct Element {
    /// Lowercase tag name
    pub tag_name: String,
    /// Attributes in source order-independent form
    pub attrs: BTreeMap<String, String>,
    /// Checkbox state
    pub checked: bool,
    /// Current value of text inputs
    pub value: String,
    /// Computed style overrides
    pub style: BTreeMap<String, String>,
}

impl Element {
    fn is_checkbox(&self) -> bool {
        self.tag_name == "input" && self.attrs.get("type").map(String::as_str) == Some("checkbox")
    }
}

/// An arena-backed document
#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create an empty document
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
        }
    }

    /// The document node
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn push(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: Some(parent),
            children: Vec::new(),
            kind,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Append an element to `parent`
    pub fn append_element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let element = Element {
            tag_name: tag.to_ascii_lowercase(),
            attrs: attrs
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect(),
            ..Element::default()
        };
        self.push(parent, NodeKind::Element(element))
    }

    /// Append a text node to `parent`
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.push(parent, NodeKind::Text(text.to_string()))
    }

    /// Element data, if `id` is an element
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Mutable element data, if `id` is an element
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.kind {
            NodeKind::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Set a computed style property
    pub fn set_style(&mut self, id: NodeId, property: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            let _ = el.style.insert(property.to_string(), value.to_string());
        }
    }

    /// Parent node
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0)?.parent
    }

    /// Concatenated text of all descendant text nodes
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Text(t) => out.push_str(t),
            _ => {
                for child in &self.nodes[id.0].children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    /// Element children of `id`
    #[must_use]
    pub fn element_children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes[id.0]
            .children
            .iter()
            .copied()
            .filter(|c| self.element(*c).is_some())
            .collect()
    }

    /// Element descendants of `id` in document order, excluding `id`
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id.0].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            if self.element(next).is_some() {
                out.push(next);
            }
            stack.extend(self.nodes[next.0].children.iter().rev().copied());
        }
        out
    }

    /// Computed style of an element; unset properties use the initial value
    #[must_use]
    pub fn computed_style(&self, id: NodeId, property: &str) -> String {
        self.element(id)
            .and_then(|el| el.style.get(property).cloned())
            .unwrap_or_else(|| match property {
                "display" => "block".to_string(),
                "text-decoration" => "none solid rgb(0, 0, 0)".to_string(),
                _ => String::new(),
            })
    }

    /// Rendered iff neither the element nor an ancestor is `display: none` or `hidden`
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(node) = cursor {
            if let Some(el) = self.element(node) {
                if el.attrs.contains_key("hidden")
                    || el.style.get("display").map(String::as_str) == Some("none")
                {
                    return false;
                }
            }
            cursor = self.parent(node);
        }
        self.element(id).is_some()
    }

    /// Observable state of an element
    #[must_use]
    pub fn element_state(&self, id: NodeId) -> ElementState {
        let el = self.element(id);
        ElementState {
            tag_name: el.map(|e| e.tag_name.clone()).unwrap_or_default(),
            text: normalize_text(&self.text_content(id)),
            visible: self.is_visible(id),
            checked: el.filter(|e| e.is_checkbox()).map(|e| e.checked),
        }
    }

    /// Every element in the document matching a CSS selector list
    fn css_matches(&self, selector: &str) -> ProbeResult<HashSet<NodeId>> {
        let parsed = CssSelector::parse(selector).map_err(|e| ProbeError::InvalidSelector {
            selector: selector.to_string(),
            message: e.to_string(),
        })?;
        let document = Html::parse_document(&self.render_html(true));
        Ok(document
            .select(&parsed)
            .filter_map(|el| el.value().attr(NODE_ATTR)?.parse().ok())
            .map(NodeId)
            .collect())
    }

    /// Resolve a locator chain from the document root
    pub fn resolve(&self, locator: &Locator) -> ProbeResult<Vec<NodeId>> {
        let mut current = vec![self.root()];
        for step in locator.steps() {
            current = match step {
                LocatorStep::Select(selector) => self.select(&current, selector)?,
                LocatorStep::Nth(i) => current.get(*i).copied().into_iter().collect(),
            };
        }
        Ok(current)
    }

    fn select(&self, roots: &[NodeId], selector: &Selector) -> ProbeResult<Vec<NodeId>> {
        let css = match selector {
            Selector::Css(src) => self.css_matches(src)?,
            _ => HashSet::new(),
        };
        let mut hits = HashSet::new();
        for root in roots {
            for id in self.descendants(*root) {
                let matched = match selector {
                    Selector::Css(_) => css.contains(&id),
                    Selector::TestId(test_id) => self
                        .element(id)
                        .is_some_and(|el| el.attrs.get("data-testid") == Some(test_id)),
                    Selector::Label(label) => self.has_label(id, label),
                    Selector::Text { text, exact } => self.is_smallest_text_match(id, text, *exact),
                };
                if matched {
                    let _ = hits.insert(id);
                }
            }
        }
        Ok(self
            .descendants(self.root())
            .into_iter()
            .filter(|id| hits.contains(id))
            .collect())
    }

    fn has_label(&self, id: NodeId, label: &str) -> bool {
        let Some(el) = self.element(id) else {
            return false;
        };
        if el
            .attrs
            .get("aria-label")
            .is_some_and(|l| normalize_text(l) == label)
        {
            return true;
        }
        let Some(own_id) = el.attrs.get("id") else {
            return false;
        };
        self.descendants(self.root()).into_iter().any(|candidate| {
            self.element(candidate).is_some_and(|lb| {
                lb.tag_name == "label" && lb.attrs.get("for") == Some(own_id)
            }) && normalize_text(&self.text_content(candidate)) == label
        })
    }

    fn is_smallest_text_match(&self, id: NodeId, text: &str, exact: bool) -> bool {
        text_matches(&self.text_content(id), text, exact)
            && !self
                .element_children(id)
                .into_iter()
                .any(|c| text_matches(&self.text_content(c), text, exact))
    }

    /// Serialize the document as HTML
    #[must_use]
    pub fn to_html(&self) -> String {
        self.render_html(false)
    }

    fn render_html(&self, indexed: bool) -> String {
        let mut out = String::from("<!DOCTYPE html>");
        for child in &self.nodes[0].children {
            self.write_html(*child, indexed, &mut out);
        }
        out
    }

    fn write_html(&self, id: NodeId, indexed: bool, out: &mut String) {
        match &self.nodes[id.0].kind {
            NodeKind::Document => {}
            NodeKind::Text(t) => out.push_str(&escape_html(t)),
            NodeKind::Element(el) => {
                let _ = write!(out, "<{}", el.tag_name);
                if indexed {
                    let _ = write!(out, " {NODE_ATTR}=\"{}\"", id.0);
                }
                for (k, v) in &el.attrs {
                    let _ = write!(out, " {k}=\"{}\"", escape_html(v));
                }
                if el.checked {
                    out.push_str(" checked");
                }
                if !el.value.is_empty() {
                    let _ = write!(out, " value=\"{}\"", escape_html(&el.value));
                }
                if !el.style.is_empty() {
                    let style: Vec<String> =
                        el.style.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                    let _ = write!(out, " style=\"{}\"", style.join("; "));
                }
                out.push('>');
                if el.tag_name == "input" {
                    return;
                }
                for child in &self.nodes[id.0].children {
                    self.write_html(*child, indexed, out);
                }
                let _ = write!(out, "</{}>", el.tag_name);
            }
        }
    }
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `<ul class="filters"><li><a>All</a></li><li><a>Active</a></li></ul>`
    /// plus a labelled checkbox and a hidden button.
    fn sample() -> Dom {
        let mut dom = Dom::new();
        let root = dom.root();
        let body = dom.append_element(root, "body", &[]);
        let ul = dom.append_element(body, "ul", &[("class", "filters")]);
        for name in ["All", "Active", "Completed"] {
            let li = dom.append_element(ul, "li", &[]);
            let a = dom.append_element(li, "a", &[("href", "#/")]);
            let _ = dom.append_text(a, name);
        }
        let input = dom.append_element(
            body,
            "input",
            &[("id", "toggle-all"), ("class", "toggle-all"), ("type", "checkbox")],
        );
        dom.element_mut(input).unwrap().checked = true;
        let label = dom.append_element(body, "label", &[("for", "toggle-all")]);
        let _ = dom.append_text(label, "Mark all as complete");
        let button = dom.append_element(
            body,
            "button",
            &[("class", "destroy"), ("aria-label", "Delete")],
        );
        dom.set_style(button, "display", "none");
        dom
    }

    mod css_tests {
        use super::*;

        fn count(dom: &Dom, css: &str) -> usize {
            dom.resolve(&Locator::new(css)).unwrap().len()
        }

        #[test]
        fn test_attribute_equality() {
            let dom = sample();
            assert_eq!(count(&dom, "input[id='toggle-all']"), 1);
            assert_eq!(count(&dom, "input[id=\"other\"]"), 0);
        }

        #[test]
        fn test_class_and_combinators() {
            let dom = sample();
            assert_eq!(count(&dom, "ul.filters a"), 3);
            assert_eq!(count(&dom, ".filters > li"), 3);
            assert_eq!(count(&dom, ".filters > a"), 0);
        }

        #[test]
        fn test_selector_list_and_universal() {
            let dom = sample();
            assert_eq!(count(&dom, "label, button"), 2);
            assert_eq!(count(&dom, "body > *"), 4);
        }

        #[test]
        fn test_node_tags_stay_out_of_visible_markup() {
            let dom = sample();
            assert!(!dom.to_html().contains(NODE_ATTR));
            assert!(dom.render_html(true).contains(NODE_ATTR));
        }

        #[test]
        fn test_invalid_selectors_are_errors() {
            let dom = sample();
            for bad in ["", "li[", "#", "li $"] {
                let err = dom.resolve(&Locator::new(bad)).unwrap_err();
                assert!(
                    matches!(err, ProbeError::InvalidSelector { .. }),
                    "{bad} should be rejected"
                );
            }
        }
    }

    mod locator_resolution_tests {
        use super::*;

        #[test]
        fn test_text_picks_smallest_element() {
            let dom = sample();
            let hits = dom.resolve(&Locator::new("li").get_by_text_exact("Active")).unwrap();
            assert_eq!(hits.len(), 1);
            assert_eq!(dom.element(hits[0]).unwrap().tag_name, "a");
        }

        #[test]
        fn test_label_by_aria_and_for() {
            let dom = sample();
            assert_eq!(dom.resolve(&Locator::by_label("Delete")).unwrap().len(), 1);
            let hits = dom.resolve(&Locator::by_label("Mark all as complete")).unwrap();
            assert_eq!(dom.element(hits[0]).unwrap().attrs["id"], "toggle-all");
        }

        #[test]
        fn test_nth_out_of_range_is_empty() {
            let dom = sample();
            assert!(dom.resolve(&Locator::new("li").nth(7)).unwrap().is_empty());
            assert_eq!(dom.resolve(&Locator::new("li").nth(2)).unwrap().len(), 1);
        }

        #[test]
        fn test_results_in_document_order_without_duplicates() {
            let dom = sample();
            let hits = dom.resolve(&Locator::new("ul").locator("li a")).unwrap();
            let texts: Vec<String> = hits.iter().map(|h| dom.text_content(*h)).collect();
            assert_eq!(texts, ["All", "Active", "Completed"]);
        }
    }

    mod state_tests {
        use super::*;

        #[test]
        fn test_hidden_element_state() {
            let dom = sample();
            let hits = dom.resolve(&Locator::by_label("Delete")).unwrap();
            let state = dom.element_state(hits[0]);
            assert!(!state.visible);
            assert_eq!(state.tag_name, "button");
        }

        #[test]
        fn test_checkbox_state() {
            let dom = sample();
            let hits = dom.resolve(&Locator::new("#toggle-all")).unwrap();
            assert_eq!(dom.element_state(hits[0]).checked, Some(true));
        }

        #[test]
        fn test_html_serialization_escapes_text() {
            let mut dom = Dom::new();
            let root = dom.root();
            let p = dom.append_element(root, "p", &[]);
            let _ = dom.append_text(p, "a < b & c");
            assert_eq!(dom.to_html(), "<!DOCTYPE html><p>a &lt; b &amp; c</p>");
        }
    }
}
