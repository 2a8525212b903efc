//! Chrome `DevTools` Protocol page driver.
//!
//! With the `browser` feature, [`CdpDriver`] launches Chromium through
//! chromiumoxide and implements [`PageDriver`](crate::driver::PageDriver).
//! Queries run as page-side JavaScript built from the locator; actions tag the
//! resolved element with a marker attribute and drive it through CDP input
//! events so the page sees real clicks and keystrokes.

use serde::{Deserialize, Serialize};

/// Browser launch settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run without a window
    pub headless: bool,
    /// Window width
    pub viewport_width: u32,
    /// Window height
    pub viewport_height: u32,
    /// Path to the Chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// User agent override
    pub user_agent: Option<String>,
    /// Chromium sandbox (disable in containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport_width: 1440,
            viewport_height: 900,
            chromium_path: None,
            user_agent: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set window dimensions
    #[must_use]
    pub const fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }
}

#[cfg(feature = "browser")]
pub use driver::CdpDriver;

#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::significant_drop_tightening)]
mod driver {
    use super::BrowserConfig;
    use crate::driver::PageDriver;
    use crate::locator::{js_string, Locator, VISIBLE_JS};
    use crate::result::{TradeInError, TradeInResult};

    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser, BrowserConfig as CdpConfig};
    use chromiumoxide::element::Element;
    use chromiumoxide::page::Page;
    use futures::StreamExt;
    use serde::de::DeserializeOwned;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tracing::{debug, info, warn};

    const TARGET_ATTR: &str = "data-tradein-target";

    /// Chromium-backed page
    #[derive(Debug)]
    pub struct CdpDriver {
        browser: Arc<Mutex<Browser>>,
        page: Page,
        next_target: AtomicU64,
        handle: tokio::task::JoinHandle<()>,
    }

    fn driver_err(e: impl std::fmt::Display) -> TradeInError {
        TradeInError::driver(e.to_string())
    }

    impl CdpDriver {
        /// Launch Chromium and open a blank page
        pub async fn launch(config: &BrowserConfig) -> TradeInResult<Self> {
            let mut builder =
                CdpConfig::builder().window_size(config.viewport_width, config.viewport_height);
            if !config.headless {
                builder = builder.with_head();
            }
            if !config.sandbox {
                builder = builder.no_sandbox();
            }
            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }
            if let Some(ref ua) = config.user_agent {
                builder = builder.arg(format!("--user-agent={ua}"));
            }
            let cdp_config = builder
                .build()
                .map_err(|e| TradeInError::config(format!("browser config: {e}")))?;

            let (browser, mut handler) = Browser::launch(cdp_config).await.map_err(driver_err)?;
            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if let Err(err) = event {
                        warn!(%err, "CDP handler stopped");
                        break;
                    }
                }
            });
            let page = browser.new_page("about:blank").await.map_err(driver_err)?;
            info!(headless = config.headless, "browser launched");

            Ok(Self {
                browser: Arc::new(Mutex::new(browser)),
                page,
                next_target: AtomicU64::new(0),
                handle,
            })
        }

        /// Navigate and wait for the load to finish
        pub async fn goto(&self, url: &str) -> TradeInResult<()> {
            self.page
                .goto(url)
                .await
                .map_err(|e| TradeInError::driver(format!("navigation to {url} failed: {e}")))?;
            info!(url, "page loaded");
            Ok(())
        }

        /// Close the browser and stop the event handler
        pub async fn close(&self) -> TradeInResult<()> {
            let mut browser = self.browser.lock().await;
            browser.close().await.map_err(driver_err)?;
            self.handle.abort();
            Ok(())
        }

        async fn eval<T: DeserializeOwned>(&self, js: String) -> TradeInResult<T> {
            self.page
                .evaluate(js)
                .await
                .map_err(driver_err)?
                .into_value()
                .map_err(driver_err)
        }

        fn nth(locator: &Locator, index: usize) -> String {
            format!("({})[{index}]", locator.to_elements_js())
        }

        async fn element(&self, locator: &Locator, index: usize) -> TradeInResult<Element> {
            let id = self.next_target.fetch_add(1, Ordering::Relaxed).to_string();
            let tagged: bool = self
                .eval(format!(
                    "(() => {{ const el = {}; if (!el) return false; el.setAttribute({}, {}); return true; }})()",
                    Self::nth(locator, index),
                    js_string(TARGET_ATTR),
                    js_string(&id),
                ))
                .await?;
            if !tagged {
                return Err(TradeInError::driver(format!(
                    "no element {} [{index}]",
                    locator.describe()
                )));
            }
            self.page
                .find_element(format!(r#"[{TARGET_ATTR}="{id}"]"#))
                .await
                .map_err(driver_err)
        }
    }

    #[async_trait]
    impl PageDriver for CdpDriver {
        async fn count(&self, locator: &Locator) -> TradeInResult<usize> {
            self.eval(format!("({}).length", locator.to_elements_js()))
                .await
        }

        async fn is_visible(&self, locator: &Locator, index: usize) -> TradeInResult<bool> {
            self.eval(format!(
                "(() => {{ const el = {}; return !!el && ({VISIBLE_JS})(el); }})()",
                Self::nth(locator, index)
            ))
            .await
        }

        async fn is_enabled(&self, locator: &Locator, index: usize) -> TradeInResult<bool> {
            self.eval(format!(
                "(() => {{ const el = {}; return !!el && !el.disabled && el.getAttribute('aria-disabled') !== 'true'; }})()",
                Self::nth(locator, index)
            ))
            .await
        }

        async fn attribute(
            &self,
            locator: &Locator,
            index: usize,
            name: &str,
        ) -> TradeInResult<Option<String>> {
            self.eval(format!(
                "(() => {{ const el = {}; return el ? el.getAttribute({}) : null; }})()",
                Self::nth(locator, index),
                js_string(name)
            ))
            .await
        }

        async fn text_content(
            &self,
            locator: &Locator,
            index: usize,
        ) -> TradeInResult<Option<String>> {
            self.eval(format!(
                "(() => {{ const el = {}; return el ? (el.textContent ?? null) : null; }})()",
                Self::nth(locator, index)
            ))
            .await
        }

        async fn click(&self, locator: &Locator, index: usize) -> TradeInResult<()> {
            let element = self.element(locator, index).await?;
            element.click().await.map_err(driver_err)?;
            debug!(locator = %locator.describe(), index, "clicked");
            Ok(())
        }

        async fn scroll_into_view(&self, locator: &Locator, index: usize) -> TradeInResult<()> {
            let element = self.element(locator, index).await?;
            element.scroll_into_view().await.map_err(driver_err)?;
            Ok(())
        }

        async fn fill(&self, locator: &Locator, index: usize, text: &str) -> TradeInResult<()> {
            if !self.is_enabled(locator, index).await? {
                return Err(TradeInError::driver(format!(
                    "cannot fill disabled {}",
                    locator.describe()
                )));
            }
            let element = self.element(locator, index).await?;
            element
                .call_js_fn("function() { this.value = ''; }", false)
                .await
                .map_err(driver_err)?;
            element.focus().await.map_err(driver_err)?;
            element.type_str(text).await.map_err(driver_err)?;
            Ok(())
        }

        async fn press(&self, locator: &Locator, index: usize, key: &str) -> TradeInResult<()> {
            let element = self.element(locator, index).await?;
            element.press_key(key).await.map_err(driver_err)?;
            Ok(())
        }
    }
}
