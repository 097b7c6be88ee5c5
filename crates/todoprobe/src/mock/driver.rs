//! [`PageDriver`] over the in-memory TodoMVC model.

use super::app::{Rendered, Target, TodoApp};
use crate::dom::NodeId;
use crate::driver::{ElementState, PageDriver, Screenshot};
use crate::locator::Locator;
use crate::page::FilterMode;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;

/// Driver that renders [`TodoApp`] into a mini DOM on every query
#[derive(Debug, Clone)]
pub struct InMemoryDriver {
    app: TodoApp,
    url: Option<String>,
    /// Interactions performed, for verification
    pub call_history: Vec<String>,
}

impl InMemoryDriver {
    /// Drive `app`; nothing is loaded until the first `goto`
    #[must_use]
    pub fn new(app: TodoApp) -> Self {
        Self {
            app,
            url: None,
            call_history: Vec::new(),
        }
    }

    /// The application model
    #[must_use]
    pub const fn app(&self) -> &TodoApp {
        &self.app
    }

    fn loaded_url(&self) -> ProbeResult<&str> {
        self.url
            .as_deref()
            .ok_or_else(|| ProbeError::page("no page loaded"))
    }

    /// Resolve an action target: exactly one visible element
    fn actionable(&self, locator: &Locator) -> ProbeResult<(Rendered, NodeId)> {
        let _ = self.loaded_url()?;
        let rendered = self.app.render();
        let hits = rendered.dom.resolve(locator)?;
        let id = match hits.as_slice() {
            [] => {
                return Err(ProbeError::ControlNotFound {
                    locator: locator.to_string(),
                    timeout_ms: 0,
                })
            }
            [one] => *one,
            many => {
                return Err(ProbeError::StrictModeViolation {
                    locator: locator.to_string(),
                    count: many.len(),
                })
            }
        };
        if !rendered.dom.is_visible(id) {
            return Err(ProbeError::NotInteractable {
                locator: locator.to_string(),
                reason: "element is not visible".to_string(),
            });
        }
        Ok((rendered, id))
    }

    fn navigate_to_filter(&mut self, mode: FilterMode) {
        if let Some(url) = &self.url {
            let base = url.split_once('#').map_or(url.as_str(), |(base, _)| base);
            self.url = Some(format!("{base}{}", mode.route()));
        }
        self.app.set_filter(mode);
    }

    fn activate(&mut self, target: Option<Target>) {
        match target {
            Some(Target::ToggleAll) => self.app.toggle_all(),
            Some(Target::ItemToggle(i)) => self.app.toggle(i),
            Some(Target::ItemDestroy(i)) => self.app.destroy(i),
            Some(Target::Filter(mode)) => self.navigate_to_filter(mode),
            Some(Target::ClearCompleted) => self.app.clear_completed(),
            Some(Target::NewTodo | Target::ItemRow(_)) | None => {}
        }
    }
}

#[async_trait]
impl PageDriver for InMemoryDriver {
    async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        self.call_history.push(format!("goto:{url}"));
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ProbeError::Navigation {
                url: url.to_string(),
                message: "only http(s) URLs are served".to_string(),
            });
        }
        self.app.load(url);
        self.url = Some(url.to_string());
        Ok(())
    }

    async fn reload(&mut self) -> ProbeResult<()> {
        self.call_history.push("reload".to_string());
        let url = self.loaded_url()?.to_string();
        self.app.load(&url);
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        self.loaded_url().map(str::to_string)
    }

    async fn screenshot(&self) -> ProbeResult<Screenshot> {
        let _ = self.loaded_url()?;
        Ok(Screenshot::html(self.app.render().dom.to_html()))
    }

    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        if self.url.is_none() {
            return Ok(Vec::new());
        }
        let rendered = self.app.render();
        Ok(rendered
            .dom
            .resolve(locator)?
            .into_iter()
            .map(|id| rendered.dom.element_state(id))
            .collect())
    }

    async fn css_values(&self, locator: &Locator, property: &str) -> ProbeResult<Vec<String>> {
        if self.url.is_none() {
            return Ok(Vec::new());
        }
        let rendered = self.app.render();
        Ok(rendered
            .dom
            .resolve(locator)?
            .into_iter()
            .map(|id| rendered.dom.computed_style(id, property))
            .collect())
    }

    async fn fill(&mut self, locator: &Locator, text: &str) -> ProbeResult<()> {
        self.call_history.push(format!("fill:{locator}:{text}"));
        let (rendered, id) = self.actionable(locator)?;
        match rendered.target_for(id) {
            Some(Target::NewTodo) => {
                self.app.set_draft(text);
                Ok(())
            }
            _ => Err(ProbeError::NotInteractable {
                locator: locator.to_string(),
                reason: "element is not an editable text field".to_string(),
            }),
        }
    }

    async fn press(&mut self, locator: &Locator, key: &str) -> ProbeResult<()> {
        self.call_history.push(format!("press:{locator}:{key}"));
        let (rendered, id) = self.actionable(locator)?;
        if rendered.target_for(id) == Some(Target::NewTodo) {
            match key {
                "Enter" => self.app.commit_draft(),
                "Escape" => self.app.set_draft(""),
                _ => {}
            }
        }
        Ok(())
    }

    async fn hover(&mut self, locator: &Locator) -> ProbeResult<()> {
        self.call_history.push(format!("hover:{locator}"));
        let (rendered, id) = self.actionable(locator)?;
        self.app.hover(rendered.row_of(id));
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> ProbeResult<()> {
        self.call_history.push(format!("click:{locator}"));
        let (rendered, id) = self.actionable(locator)?;
        self.app.hover(rendered.row_of(id));
        self.activate(rendered.target_for(id));
        Ok(())
    }

    async fn set_checked(&mut self, locator: &Locator, checked: bool) -> ProbeResult<()> {
        self.call_history.push(format!("set_checked:{locator}:{checked}"));
        let (rendered, id) = self.actionable(locator)?;
        let Some(current) = rendered.dom.element_state(id).checked else {
            return Err(ProbeError::NotInteractable {
                locator: locator.to_string(),
                reason: "element is not a checkbox".to_string(),
            });
        };
        self.app.hover(rendered.row_of(id));
        if current == checked {
            return Ok(());
        }
        self.activate(rendered.target_for(id));

        let after = self.query(locator).await?;
        match after.first().and_then(|s| s.checked) {
            Some(state) if state != checked => Err(ProbeError::NotInteractable {
                locator: locator.to_string(),
                reason: "clicking the checkbox did not change its state".to_string(),
            }),
            _ => Ok(()),
        }
    }

    async fn close(&mut self) -> ProbeResult<()> {
        self.call_history.push("close".to_string());
        self.url = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::TodoPage;

    const URL: &str = "https://todo.test/#/";

    async fn loaded(titles: &[&str]) -> InMemoryDriver {
        let mut driver = InMemoryDriver::new(TodoApp::new());
        driver.goto(URL).await.unwrap();
        for title in titles {
            driver.fill(&TodoPage::new_todo_input(), title).await.unwrap();
            driver.press(&TodoPage::new_todo_input(), "Enter").await.unwrap();
        }
        driver
    }

    mod navigation_tests {
        use super::*;

        #[tokio::test]
        async fn test_queries_before_goto_are_empty() {
            let driver = InMemoryDriver::new(TodoApp::new());
            assert!(driver.query(&TodoPage::new_todo_input()).await.unwrap().is_empty());
            assert!(driver.current_url().await.is_err());
        }

        #[tokio::test]
        async fn test_non_http_url_is_navigation_error() {
            let mut driver = InMemoryDriver::new(TodoApp::new());
            let err = driver.goto("file:///tmp/x").await.unwrap_err();
            assert!(matches!(err, ProbeError::Navigation { .. }));
        }

        #[tokio::test]
        async fn test_filter_click_updates_url() {
            let mut driver = loaded(&["a"]).await;
            driver.click(&TodoPage::filter(FilterMode::Completed)).await.unwrap();
            assert_eq!(
                driver.current_url().await.unwrap(),
                "https://todo.test/#/completed"
            );
            assert!(driver.query(&TodoPage::todo_items()).await.unwrap().is_empty());
        }

        #[tokio::test]
        async fn test_reload_keeps_items() {
            let mut driver = loaded(&["Desk Lamp"]).await;
            driver.reload().await.unwrap();
            let rows = driver.query(&TodoPage::todo_items()).await.unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].text, "Desk Lamp");
        }
    }

    mod interaction_tests {
        use super::*;

        #[tokio::test]
        async fn test_enter_adds_item_and_clears_field() {
            let driver = loaded(&["Desk Lamp"]).await;
            assert_eq!(driver.app().items().len(), 1);
            assert_eq!(driver.app().draft(), "");
        }

        #[tokio::test]
        async fn test_hover_reveals_delete() {
            let mut driver = loaded(&["a", "b"]).await;
            driver.hover(&TodoPage::todo_item(1)).await.unwrap();
            driver.click(&TodoPage::delete_buttons().nth(1)).await.unwrap();
            let titles: Vec<&str> = driver.app().items().iter().map(|i| i.title.as_str()).collect();
            assert_eq!(titles, ["a"]);
        }

        #[tokio::test]
        async fn test_set_checked_is_idempotent() {
            let mut driver = loaded(&["a"]).await;
            let toggle = TodoPage::item_toggles().nth(0);
            driver.set_checked(&toggle, true).await.unwrap();
            driver.set_checked(&toggle, true).await.unwrap();
            assert!(driver.app().items()[0].completed);
            driver.set_checked(&toggle, false).await.unwrap();
            assert!(!driver.app().items()[0].completed);
        }

        #[tokio::test]
        async fn test_set_checked_on_non_checkbox_fails() {
            let mut driver = loaded(&["a"]).await;
            let err = driver
                .set_checked(&TodoPage::new_todo_input(), true)
                .await
                .unwrap_err();
            assert!(matches!(err, ProbeError::NotInteractable { .. }));
        }

        #[tokio::test]
        async fn test_screenshot_is_dom_snapshot() {
            let driver = loaded(&["Desk Lamp"]).await;
            let shot = driver.screenshot().await.unwrap();
            let html = String::from_utf8(shot.data).unwrap();
            assert!(html.contains("Desk Lamp"));
            assert!(html.contains("todo-count"));
        }

        #[tokio::test]
        async fn test_call_history_records_actions() {
            let mut driver = loaded(&[]).await;
            driver.close().await.unwrap();
            assert_eq!(driver.call_history.first().map(String::as_str), Some("goto:https://todo.test/#/"));
            assert_eq!(driver.call_history.last().map(String::as_str), Some("close"));
        }
    }
}
