use anyhow::{Context, Result};
use headless_chrome::browser::tab::NoElementFound;
use headless_chrome::browser::tab::element::Element;
use headless_chrome::protocol::cdp::Runtime::RemoteObject;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{BrowserError, BrowserHandle, ElementHandle};
use crate::config::BrowserConfig;
use crate::dom;
use crate::types::{Key, NodeKey, SelectorKind, SelectorStrategy};

/// One Chrome session, exclusively owned by one run.
pub struct ChromeBrowser {
    browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeBrowser {
    pub fn launch(config: &BrowserConfig) -> Result<Self> {
        if let Some(url) = &config.attach_url {
            info!(%url, "attaching to existing Chrome");
            match Browser::connect(url.clone()) {
                Ok(browser) => return Self::from_attached(browser, config),
                Err(e) => warn!(error = %e, "could not attach, launching a new Chrome"),
            }
        }

        if let Some(dir) = &config.profile_dir {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("creating profile dir {}", dir.display()))?;
            debug!(profile = %dir.display(), "using persistent profile");
        }

        let mut args: Vec<&OsStr> = vec![
            OsStr::new("--no-first-run"),
            OsStr::new("--no-default-browser-check"),
            OsStr::new("--disable-blink-features=AutomationControlled"),
            OsStr::new("--disable-infobars"),
            OsStr::new("--password-store=basic"),
        ];
        if config.headless {
            args.extend([
                OsStr::new("--disable-gpu"),
                OsStr::new("--disable-dev-shm-usage"),
                OsStr::new("--disable-extensions"),
                OsStr::new("--disable-setuid-sandbox"),
                OsStr::new("--ignore-certificate-errors"),
            ]);
        }

        let options = LaunchOptions {
            headless: config.headless,
            sandbox: !config.headless,
            path: config.chrome_path.clone(),
            user_data_dir: config.profile_dir.clone(),
            window_size: Some(config.window_size),
            args,
            idle_browser_timeout: Duration::from_secs(300),
            ..Default::default()
        };

        info!(headless = config.headless, "starting Chrome");
        let browser = Browser::new(options).context("browser launch failed")?;
        let tab = browser.new_tab()?;
        Self::prepare_tab(&tab, config)?;
        info!("Chrome ready");

        Ok(Self { browser, tab })
    }

    fn from_attached(browser: Browser, config: &BrowserConfig) -> Result<Self> {
        let existing = {
            let tabs = browser.get_tabs();
            let tabs = tabs
                .lock()
                .map_err(|_| anyhow::anyhow!("tab list lock poisoned"))?;
            tabs.first().cloned()
        };
        let tab = match existing {
            Some(t) => t,
            None => browser.new_tab()?,
        };
        Self::prepare_tab(&tab, config)?;
        Ok(Self { browser, tab })
    }

    fn prepare_tab(tab: &Arc<Tab>, config: &BrowserConfig) -> Result<()> {
        tab.set_user_agent(&config.user_agent, None, None)?;
        tab.set_default_timeout(Duration::from_secs(30));
        Ok(())
    }

    pub fn tab(&self) -> &Arc<Tab> {
        &self.tab
    }

    /// A failure with the browser still answering is the caller's problem;
    /// without it, the session is gone.
    fn fault(&self, e: anyhow::Error, wrap: impl FnOnce(String) -> BrowserError) -> BrowserError {
        if self.browser.get_version().is_err() {
            BrowserError::Disconnected(format!("{:#}", e))
        } else {
            wrap(format!("{:#}", e))
        }
    }
}

pub struct ChromeElement<'a> {
    inner: Element<'a>,
    session: &'a ChromeBrowser,
}

impl ChromeElement<'_> {
    fn call(&self, function: &str) -> Result<RemoteObject, BrowserError> {
        self.inner
            .call_js_fn(function, vec![], false)
            .map_err(|e| self.session.fault(e, BrowserError::Interaction))
    }
}

impl ElementHandle for ChromeElement<'_> {
    fn node_key(&self) -> NodeKey {
        NodeKey(u64::from(self.inner.backend_node_id))
    }

    fn is_visible(&self) -> bool {
        self.call(dom::IS_VISIBLE_FN)
            .map(|o| dom::as_bool(&o))
            .unwrap_or(false)
    }

    fn is_enabled(&self) -> bool {
        self.call(dom::IS_ENABLED_FN)
            .map(|o| dom::as_bool(&o))
            .unwrap_or(false)
    }

    fn text(&self) -> String {
        self.call(dom::INNER_TEXT_FN)
            .map(|o| dom::as_string(&o))
            .unwrap_or_default()
    }

    fn click(&self) -> Result<(), BrowserError> {
        self.call(dom::CLICK_FN).map(|_| ())
    }

    fn clear(&self) -> Result<(), BrowserError> {
        self.call(dom::CLEAR_FN).map(|_| ())
    }

    fn type_text(&self, text: &str) -> Result<(), BrowserError> {
        self.inner
            .focus()
            .and_then(|_| self.inner.parent.type_str(text))
            .map(|_| ())
            .map_err(|e| self.session.fault(e, BrowserError::Interaction))
    }

    fn scroll_into_view(&self) -> Result<(), BrowserError> {
        self.call(dom::SCROLL_INTO_VIEW_FN).map(|_| ())
    }

    fn send_key(&self, key: Key) -> Result<(), BrowserError> {
        self.inner
            .focus()
            .and_then(|_| self.inner.parent.press_key(key.name()))
            .map(|_| ())
            .map_err(|e| self.session.fault(e, BrowserError::Interaction))
    }
}

impl BrowserHandle for ChromeBrowser {
    type Element<'a>
        = ChromeElement<'a>
    where
        Self: 'a;

    fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        self.tab
            .navigate_to(url)
            .and_then(|t| t.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| self.fault(e, BrowserError::Navigation))?;
        let title = dom::get_page_title(&self.tab).unwrap_or_else(|_| "untitled".into());
        let landed = dom::get_current_url(&self.tab).unwrap_or_else(|_| "unknown".into());
        info!(%landed, %title, "navigated");
        Ok(())
    }

    fn find_all(&self, strategy: &SelectorStrategy) -> Result<Vec<ChromeElement<'_>>, BrowserError> {
        let found = match strategy.kind {
            SelectorKind::Css => self.tab.find_elements(strategy.value),
            SelectorKind::XPath => self.tab.find_elements_by_xpath(strategy.value),
            SelectorKind::TextContains => self
                .tab
                .find_elements_by_xpath(&dom::text_contains_xpath(strategy.value)),
        };

        match found {
            Ok(elements) => Ok(elements
                .into_iter()
                .map(|inner| ChromeElement {
                    inner,
                    session: self,
                })
                .collect()),
            Err(e) if e.downcast_ref::<NoElementFound>().is_some() => Ok(Vec::new()),
            Err(e) => Err(self.fault(e, |message| BrowserError::Query {
                selector: strategy.to_string(),
                message,
            })),
        }
    }

    fn click_viewport_center(&self) -> Result<(), BrowserError> {
        let result = self
            .tab
            .evaluate(dom::CLICK_VIEWPORT_CENTER_JS, false)
            .map_err(|e| self.fault(e, BrowserError::Interaction))?;
        if !dom::as_bool(&result) {
            return Err(BrowserError::Interaction(
                "nothing at the viewport centre".into(),
            ));
        }
        Ok(())
    }
}
