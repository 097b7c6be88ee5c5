//! PageDriver - Abstract Browser Automation Trait
//!
//! The suite never talks to a browser directly. Every interaction goes through
//! [`PageDriver`], so the same scenarios run against a real Chromium session
//! (`browser` feature) or the in-memory TodoMVC model.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  PageDriver (Abstract Trait)                                  │
//! ├───────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────┐   │
//! │  │  ChromiumDriver     │        │  InMemoryDriver         │   │
//! │  │  CDP via            │        │  TodoMVC model rendered │   │
//! │  │  chromiumoxide      │        │  into a mini DOM        │   │
//! │  └─────────────────────┘        └─────────────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Driver primitives act immediately and never wait. Auto-waiting lives one
//! layer up, in [`Session`](crate::Session).

use crate::locator::Locator;
use crate::result::ProbeResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime};

/// Observable state of one resolved element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Element tag name (lowercase)
    pub tag_name: String,
    /// Normalized text content
    pub text: String,
    /// Whether the element and all of its ancestors are rendered
    pub visible: bool,
    /// Checkbox state, for checkable inputs
    pub checked: Option<bool>,
}

/// Encoding of a captured page image
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScreenshotFormat {
    /// PNG bitmap from a real browser
    Png,
    /// Serialized DOM, for backends without a rasterizer
    Html,
}

impl ScreenshotFormat {
    /// MIME type of the encoded data
    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Html => "text/html",
        }
    }

    /// File extension for stored attachments
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Html => "html",
        }
    }
}

/// Screenshot data with metadata
#[derive(Debug, Clone)]
pub struct Screenshot {
    /// Encoded data
    pub data: Vec<u8>,
    /// Encoding of `data`
    pub format: ScreenshotFormat,
    /// Timestamp when screenshot was taken
    pub timestamp: SystemTime,
}

impl Screenshot {
    /// Create a PNG screenshot
    #[must_use]
    pub fn png(data: Vec<u8>) -> Self {
        Self {
            data,
            format: ScreenshotFormat::Png,
            timestamp: SystemTime::now(),
        }
    }

    /// Create a DOM snapshot standing in for a screenshot
    #[must_use]
    pub fn html(markup: impl Into<String>) -> Self {
        Self {
            data: markup.into().into_bytes(),
            format: ScreenshotFormat::Html,
            timestamp: SystemTime::now(),
        }
    }

    /// Get the size in bytes
    #[must_use]
    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }

    /// Check if screenshot has data
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.data.is_empty()
    }
}

/// Wait tuning for one session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    /// How long an action waits for its target to become actionable
    #[serde(with = "millis")]
    pub element: Duration,
    /// How long an expectation keeps re-checking before recording a failure
    #[serde(with = "millis")]
    pub expect: Duration,
    /// Navigation and reload budget
    #[serde(with = "millis")]
    pub navigation: Duration,
    /// Delay between polls
    #[serde(with = "millis")]
    pub poll_interval: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element: Duration::from_secs(5),
            expect: Duration::from_secs(5),
            navigation: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl Timeouts {
    /// Short timeouts for deterministic backends
    #[must_use]
    pub const fn fast() -> Self {
        Self {
            element: Duration::from_millis(200),
            expect: Duration::from_millis(200),
            navigation: Duration::from_secs(1),
            poll_interval: Duration::from_millis(10),
        }
    }

    /// Set the expect timeout
    #[must_use]
    pub const fn with_expect(mut self, timeout: Duration) -> Self {
        self.expect = timeout;
        self
    }
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

/// Abstract driver trait for browser automation
///
/// Query methods resolve the locator at call time and never fail on zero
/// matches. Action methods require the locator to resolve to exactly one
/// element and fail immediately otherwise.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for the `load` event
    async fn goto(&mut self, url: &str) -> ProbeResult<()>;

    /// Reload the current page
    async fn reload(&mut self) -> ProbeResult<()>;

    /// Get current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Capture the page
    async fn screenshot(&self) -> ProbeResult<Screenshot>;

    /// Resolve a locator into the state of every matched element
    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>>;

    /// Computed style property of every matched element
    async fn css_values(&self, locator: &Locator, property: &str) -> ProbeResult<Vec<String>>;

    /// Replace the value of a text input
    async fn fill(&mut self, locator: &Locator, text: &str) -> ProbeResult<()>;

    /// Press a named key ("Enter", "Escape", ...) on the element
    async fn press(&mut self, locator: &Locator, key: &str) -> ProbeResult<()>;

    /// Move the pointer over the element
    async fn hover(&mut self, locator: &Locator) -> ProbeResult<()>;

    /// Click the element
    async fn click(&mut self, locator: &Locator) -> ProbeResult<()>;

    /// Bring a checkbox to the requested state, clicking only if needed
    async fn set_checked(&mut self, locator: &Locator, checked: bool) -> ProbeResult<()>;

    /// Close the session
    async fn close(&mut self) -> ProbeResult<()>;
}

/// Opens isolated browser sessions, one per scenario
#[async_trait]
pub trait SessionFactory: Send + Sync {
    /// Short backend name for logs and reports
    fn backend(&self) -> &'static str;

    /// Open a fresh session with empty application state
    async fn open(&self) -> ProbeResult<Box<dyn PageDriver>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    mod screenshot_tests {
        use super::*;

        #[test]
        fn test_png_screenshot() {
            let data = vec![0x89, 0x50, 0x4E, 0x47];
            let screenshot = Screenshot::png(data.clone());
            assert_eq!(screenshot.data, data);
            assert_eq!(screenshot.format.content_type(), "image/png");
            assert_eq!(screenshot.size_bytes(), 4);
            assert!(screenshot.is_valid());
        }

        #[test]
        fn test_html_snapshot() {
            let screenshot = Screenshot::html("<ul></ul>");
            assert_eq!(screenshot.format, ScreenshotFormat::Html);
            assert_eq!(screenshot.format.extension(), "html");
            assert!(!Screenshot::png(vec![]).is_valid());
        }
    }

    mod timeouts_tests {
        use super::*;

        #[test]
        fn test_default_timeouts() {
            let t = Timeouts::default();
            assert_eq!(t.element, Duration::from_secs(5));
            assert_eq!(t.expect, Duration::from_secs(5));
            assert_eq!(t.poll_interval, Duration::from_millis(50));
        }

        #[test]
        fn test_builder() {
            let t = Timeouts::fast().with_expect(Duration::from_millis(20));
            assert_eq!(t.expect, Duration::from_millis(20));
            assert_eq!(t.element, Duration::from_millis(200));
        }

        #[test]
        fn test_timeouts_serialize_as_millis() {
            let yaml = serde_yaml_ng::to_string(&Timeouts::fast()).unwrap();
            assert!(yaml.contains("element: 200"));
            let back: Timeouts = serde_yaml_ng::from_str(&yaml).unwrap();
            assert_eq!(back, Timeouts::fast());
        }
    }
}
