//! Chromium backend over CDP.
//!
//! Each session launches its own browser with a throwaway profile directory,
//! so application storage never leaks between scenarios. Locators are
//! compiled to JavaScript and resolved inside the page; actions then go
//! through real CDP input on the single element the locator resolved to.

use crate::config::BrowserSettings;
use crate::driver::{ElementState, PageDriver, Screenshot, SessionFactory};
use crate::locator::Locator;
use crate::result::{ProbeError, ProbeResult};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::cdp::browser_protocol::page::{
    CaptureScreenshotFormat, CaptureScreenshotParams,
};
use chromiumoxide::element::Element;
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use std::path::Path;
use tempfile::TempDir;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Attribute marking the element an action is about to hit
const TARGET_ATTR: &str = "data-todoprobe-target";

const VISIBLE_JS: &str = r"(e) => {
  for (let n = e; n && n.nodeType === 1; n = n.parentElement) {
    const s = getComputedStyle(n);
    if (s.display === 'none' || s.visibility === 'hidden' || n.hidden) return false;
  }
  return e.getClientRects().length > 0;
}";

/// Opens one Chromium instance per session
#[derive(Debug, Clone)]
pub struct ChromiumSessionFactory {
    settings: BrowserSettings,
}

impl ChromiumSessionFactory {
    /// Factory launching browsers with `settings`
    #[must_use]
    pub const fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SessionFactory for ChromiumSessionFactory {
    fn backend(&self) -> &'static str {
        "chromium"
    }

    async fn open(&self) -> ProbeResult<Box<dyn PageDriver>> {
        Ok(Box::new(ChromiumDriver::launch(&self.settings).await?))
    }
}

/// A page in a dedicated Chromium process
pub struct ChromiumDriver {
    browser: Mutex<CdpBrowser>,
    page: CdpPage,
    handler: tokio::task::JoinHandle<()>,
    /// Removed when dropped; taken by `close` to remove it after the browser exits
    profile: Option<TempDir>,
}

impl std::fmt::Debug for ChromiumDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChromiumDriver")
            .field("profile", &self.profile.as_ref().map(TempDir::path))
            .finish_non_exhaustive()
    }
}

impl ChromiumDriver {
    /// Launch a browser and open a blank page
    pub async fn launch(settings: &BrowserSettings) -> ProbeResult<Self> {
        Self::launch_in(settings, &std::env::temp_dir()).await
    }

    /// Launch with the profile directory created under `root`
    async fn launch_in(settings: &BrowserSettings, root: &Path) -> ProbeResult<Self> {
        let profile = tempfile::Builder::new()
            .prefix("todoprobe-")
            .tempdir_in(root)
            .map_err(|e| ProbeError::BrowserLaunch {
                message: format!("profile directory: {e}"),
            })?;
        let mut builder = CdpConfig::builder()
            .user_data_dir(profile.path())
            .window_size(settings.viewport_width, settings.viewport_height);

        if !settings.headless {
            builder = builder.with_head();
        }

        if !settings.sandbox {
            builder = builder.no_sandbox();
        }

        if let Some(ref path) = settings.chromium_path {
            builder = builder.chrome_executable(path);
        }

        let cdp_config = builder.build().map_err(|message| {
            if message.contains("Could not auto detect") {
                ProbeError::BrowserNotFound
            } else {
                ProbeError::BrowserLaunch { message }
            }
        })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunch {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;

        info!(profile = %profile.path().display(), headless = settings.headless, "chromium launched");
        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            profile: Some(profile),
        })
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, expr: String) -> ProbeResult<T> {
        let result = self
            .page
            .evaluate(expr)
            .await
            .map_err(|e| ProbeError::Script {
                message: e.to_string(),
            })?;
        result.into_value().map_err(|e| ProbeError::Script {
            message: e.to_string(),
        })
    }

    /// Mark the single visible element `locator` resolves to and return it
    async fn target(&self, locator: &Locator) -> ProbeResult<Element> {
        let expr = format!(
            "(() => {{ \
               document.querySelectorAll('[{TARGET_ATTR}]').forEach(e => e.removeAttribute('{TARGET_ATTR}')); \
               const els = {els}; \
               if (els.length === 0) return 'missing'; \
               if (els.length > 1) return 'many:' + els.length; \
               if (!({VISIBLE_JS})(els[0])) return 'hidden'; \
               els[0].setAttribute('{TARGET_ATTR}', ''); \
               return 'ok'; \
             }})()",
            els = locator.to_js(),
        );
        let status: String = self.eval(expr).await?;
        match status.as_str() {
            "ok" => {}
            "missing" => {
                return Err(ProbeError::ControlNotFound {
                    locator: locator.to_string(),
                    timeout_ms: 0,
                })
            }
            "hidden" => {
                return Err(ProbeError::NotInteractable {
                    locator: locator.to_string(),
                    reason: "element is not visible".to_string(),
                })
            }
            other => {
                let count = other
                    .strip_prefix("many:")
                    .and_then(|n| n.parse().ok())
                    .unwrap_or(2);
                return Err(ProbeError::StrictModeViolation {
                    locator: locator.to_string(),
                    count,
                });
            }
        }
        self.page
            .find_element(format!("[{TARGET_ATTR}]"))
            .await
            .map_err(|e| ProbeError::NotInteractable {
                locator: locator.to_string(),
                reason: e.to_string(),
            })
    }

    fn action_error(locator: &Locator, e: impl std::fmt::Display) -> ProbeError {
        ProbeError::NotInteractable {
            locator: locator.to_string(),
            reason: e.to_string(),
        }
    }
}

#[async_trait]
impl PageDriver for ChromiumDriver {
    async fn goto(&mut self, url: &str) -> ProbeResult<()> {
        debug!(%url, "goto");
        self.page
            .goto(url)
            .await
            .map_err(|e| ProbeError::Navigation {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }

    async fn reload(&mut self) -> ProbeResult<()> {
        self.page
            .reload()
            .await
            .map_err(|e| ProbeError::page(format!("reload failed: {e}")))?;
        Ok(())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        let url = self
            .page
            .url()
            .await
            .map_err(|e| ProbeError::page(e.to_string()))?;
        Ok(url.unwrap_or_default())
    }

    async fn screenshot(&self) -> ProbeResult<Screenshot> {
        use base64::Engine;

        let params = CaptureScreenshotParams::builder()
            .format(CaptureScreenshotFormat::Png)
            .build();
        let shot = self
            .page
            .execute(params)
            .await
            .map_err(|e| ProbeError::Screenshot {
                message: e.to_string(),
            })?;
        let data = base64::engine::general_purpose::STANDARD
            .decode(&shot.data)
            .map_err(|e| ProbeError::Screenshot {
                message: e.to_string(),
            })?;
        Ok(Screenshot::png(data))
    }

    async fn query(&self, locator: &Locator) -> ProbeResult<Vec<ElementState>> {
        let expr = format!(
            "(() => {{ \
               const visible = {VISIBLE_JS}; \
               return {els}.map(e => ({{ \
                 tag_name: e.tagName.toLowerCase(), \
                 text: (e.textContent || '').replace(/\\s+/g, ' ').trim(), \
                 visible: visible(e), \
                 checked: (e.type === 'checkbox' || e.type === 'radio') ? e.checked : null \
               }})); \
             }})()",
            els = locator.to_js(),
        );
        self.eval(expr).await
    }

    async fn css_values(&self, locator: &Locator, property: &str) -> ProbeResult<Vec<String>> {
        let expr = format!(
            "{els}.map(e => getComputedStyle(e).getPropertyValue({prop}))",
            els = locator.to_js(),
            prop = serde_json::to_string(property)?,
        );
        self.eval(expr).await
    }

    async fn fill(&mut self, locator: &Locator, text: &str) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        element
            .focus()
            .await
            .map_err(|e| Self::action_error(locator, e))?;
        let expr = format!(
            "(() => {{ \
               const e = document.querySelector('[{TARGET_ATTR}]'); \
               const proto = Object.getPrototypeOf(e); \
               Object.getOwnPropertyDescriptor(proto, 'value').set.call(e, {value}); \
               e.dispatchEvent(new Event('input', {{ bubbles: true }})); \
               return true; \
             }})()",
            value = serde_json::to_string(text)?,
        );
        let _: bool = self.eval(expr).await?;
        Ok(())
    }

    async fn press(&mut self, locator: &Locator, key: &str) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        element
            .press_key(key)
            .await
            .map_err(|e| Self::action_error(locator, e))?;
        Ok(())
    }

    async fn hover(&mut self, locator: &Locator) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        element
            .hover()
            .await
            .map_err(|e| Self::action_error(locator, e))?;
        Ok(())
    }

    async fn click(&mut self, locator: &Locator) -> ProbeResult<()> {
        let element = self.target(locator).await?;
        element
            .click()
            .await
            .map_err(|e| Self::action_error(locator, e))?;
        Ok(())
    }

    async fn set_checked(&mut self, locator: &Locator, checked: bool) -> ProbeResult<()> {
        let current = self.query(locator).await?;
        if current.first().and_then(|s| s.checked) == Some(checked) {
            return Ok(());
        }
        self.click(locator).await?;
        let after = self.query(locator).await?;
        if after.first().and_then(|s| s.checked) == Some(checked) {
            Ok(())
        } else {
            Err(Self::action_error(locator, "clicking did not change the checked state"))
        }
    }

    async fn close(&mut self) -> ProbeResult<()> {
        let mut browser = self.browser.lock().await;
        let closed = browser
            .close()
            .await
            .map(|_| ())
            .map_err(|e| ProbeError::Session {
                message: e.to_string(),
            });
        if let Err(e) = browser.wait().await {
            warn!(error = %e, "chromium did not exit cleanly");
        }
        self.handler.abort();
        if let Some(profile) = self.profile.take() {
            if let Err(e) = profile.close() {
                debug!(error = %e, "profile directory not removed");
            }
        }
        closed
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod launch_tests {
        use super::*;

        #[tokio::test]
        async fn test_failed_launch_removes_profile_directory() {
            let root = tempfile::tempdir().unwrap();
            let settings = BrowserSettings {
                chromium_path: Some(root.path().join("no-such-chromium")),
                ..BrowserSettings::default()
            };
            let err = ChromiumDriver::launch_in(&settings, root.path()).await.unwrap_err();
            assert!(matches!(err, ProbeError::BrowserLaunch { .. } | ProbeError::BrowserNotFound));
            let leftover: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
            assert!(leftover.is_empty());
        }
    }
}
