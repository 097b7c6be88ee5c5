//! User-intent actions on the TodoMVC page.
//!
//! Each action composes locators from [`TodoPage`] with the auto-waiting
//! primitives of [`Session`]. A control that never becomes actionable fails
//! the action, and the error propagates to the scenario boundary.

use crate::page::{FilterMode, TodoPage};
use crate::result::ProbeResult;
use crate::session::Session;
use tracing::debug;

/// Actions bound to one session
#[derive(Debug)]
pub struct TodoActions<'a> {
    session: &'a mut Session,
}

impl<'a> TodoActions<'a> {
    /// Bind actions to a session
    pub fn new(session: &'a mut Session) -> Self {
        Self { session }
    }

    /// Type `text` into the entry field and submit it
    pub async fn add_item(&mut self, text: &str) -> ProbeResult<()> {
        debug!(text, "add item");
        let input = TodoPage::new_todo_input();
        self.session.fill(&input, text).await?;
        self.session.press(&input, "Enter").await
    }

    /// Delete the rendered row at `index`.
    ///
    /// The delete control is only shown while its row is hovered.
    pub async fn remove_item(&mut self, index: usize) -> ProbeResult<()> {
        debug!(index, "remove item");
        self.session.hover(&TodoPage::todo_item(index)).await?;
        self.session
            .click(&TodoPage::delete_buttons().nth(index))
            .await
    }

    /// Check or uncheck the toggle-all control
    pub async fn set_all_completed(&mut self, completed: bool) -> ProbeResult<()> {
        debug!(completed, "set all completed");
        self.session
            .set_checked(&TodoPage::toggle_all(), completed)
            .await
    }

    /// Check or uncheck the completion box of the rendered row at `index`
    pub async fn set_item_completed(&mut self, index: usize, completed: bool) -> ProbeResult<()> {
        debug!(index, completed, "set item completed");
        self.session
            .set_checked(&TodoPage::item_toggles().nth(index), completed)
            .await
    }

    /// Switch the rendered subset
    pub async fn set_filter(&mut self, mode: FilterMode) -> ProbeResult<()> {
        debug!(%mode, "set filter");
        self.session.click(&TodoPage::filter(mode)).await
    }

    /// Remove every completed item
    pub async fn clear_completed(&mut self) -> ProbeResult<()> {
        debug!("clear completed");
        self.session.click(&TodoPage::clear_completed()).await
    }
}
