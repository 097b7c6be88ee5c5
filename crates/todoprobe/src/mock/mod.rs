//! In-memory TodoMVC backend.
//!
//! A faithful model of the reference application rendered into
//! [`Dom`](crate::dom::Dom), so the whole suite runs without a browser.
//! [`Quirks`] inject known application defects to check that the suite
//! actually catches them.

mod app;
mod driver;

pub use app::{Rendered, Target, TodoApp, TodoItem};
pub use driver::InMemoryDriver;

use crate::driver::{PageDriver, SessionFactory};
use crate::result::ProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A single injectable defect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Quirk {
    /// Blank titles become items
    AcceptEmpty,
    /// Every load after the first starts from empty storage
    ForgetOnReload,
    /// Footer shows "0 items left" on an empty list
    ZeroCounter,
    /// Clear completed does nothing
    IgnoreClearCompleted,
}

impl Quirk {
    /// Every quirk
    pub const ALL: [Self; 4] = [
        Self::AcceptEmpty,
        Self::ForgetOnReload,
        Self::ZeroCounter,
        Self::IgnoreClearCompleted,
    ];

    /// Command-line name
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::AcceptEmpty => "accept-empty",
            Self::ForgetOnReload => "forget-on-reload",
            Self::ZeroCounter => "zero-counter",
            Self::IgnoreClearCompleted => "ignore-clear-completed",
        }
    }
}

impl fmt::Display for Quirk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Quirk {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|q| q.name()).collect();
                format!("unknown quirk '{s}' (expected one of: {})", known.join(", "))
            })
    }
}

/// Defects enabled on an application
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quirks {
    /// See [`Quirk::AcceptEmpty`]
    pub accept_empty: bool,
    /// See [`Quirk::ForgetOnReload`]
    pub forget_on_reload: bool,
    /// See [`Quirk::ZeroCounter`]
    pub zero_counter: bool,
    /// See [`Quirk::IgnoreClearCompleted`]
    pub ignore_clear_completed: bool,
}

impl Quirks {
    /// Enable one more quirk
    #[must_use]
    pub const fn with(mut self, quirk: Quirk) -> Self {
        match quirk {
            Quirk::AcceptEmpty => self.accept_empty = true,
            Quirk::ForgetOnReload => self.forget_on_reload = true,
            Quirk::ZeroCounter => self.zero_counter = true,
            Quirk::IgnoreClearCompleted => self.ignore_clear_completed = true,
        }
        self
    }

    /// Whether no quirk is enabled
    #[must_use]
    pub fn is_clean(&self) -> bool {
        *self == Self::default()
    }
}

impl FromIterator<Quirk> for Quirks {
    fn from_iter<I: IntoIterator<Item = Quirk>>(iter: I) -> Self {
        iter.into_iter().fold(Self::default(), Self::with)
    }
}

/// Opens an [`InMemoryDriver`] with fresh storage per session
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemorySessionFactory {
    quirks: Quirks,
}

impl InMemorySessionFactory {
    /// A factory for the well-behaved application
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A factory whose sessions carry `quirks`
    #[must_use]
    pub const fn with_quirks(quirks: Quirks) -> Self {
        Self { quirks }
    }
}

#[async_trait]
impl SessionFactory for InMemorySessionFactory {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn open(&self) -> ProbeResult<Box<dyn PageDriver>> {
        Ok(Box::new(InMemoryDriver::new(TodoApp::with_quirks(self.quirks))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quirk_names_round_trip() {
        for quirk in Quirk::ALL {
            assert_eq!(quirk.name().parse::<Quirk>(), Ok(quirk));
        }
        let err = "flaky".parse::<Quirk>().unwrap_err();
        assert!(err.contains("zero-counter"));
    }

    #[test]
    fn test_quirks_collect() {
        let quirks: Quirks = [Quirk::ZeroCounter, Quirk::AcceptEmpty].into_iter().collect();
        assert!(quirks.zero_counter && quirks.accept_empty);
        assert!(!quirks.forget_on_reload);
        assert!(Quirks::default().is_clean());
    }

    #[tokio::test]
    async fn test_factory_sessions_do_not_share_storage() {
        let factory = InMemorySessionFactory::new();
        let mut first = factory.open().await.unwrap();
        first.goto("https://todo.test/#/").await.unwrap();
        let input = crate::page::TodoPage::new_todo_input();
        first.fill(&input, "Desk Lamp").await.unwrap();
        first.press(&input, "Enter").await.unwrap();

        let mut second = factory.open().await.unwrap();
        second.goto("https://todo.test/#/").await.unwrap();
        let rows = second
            .query(&crate::page::TodoPage::todo_items())
            .await
            .unwrap();
        assert!(rows.is_empty());
        assert_eq!(factory.backend(), "memory");
    }
}
