use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::BrowserSettings;
use crate::error::{AppError, AppResult};

use super::browser::{BrowserAutomation, BrowserPage, BrowserSession, ControlSnapshot};

const INDEX_ATTRIBUTE: &str = "data-mailsort-index";

// Tags every visible candidate with its snapshot index so `click` can find it again.
const CONTROLS_SCRIPT: &str = r#"(() => {
  const selector = 'a, button, input, [class*="unsubscribe" i], [id*="unsubscribe" i]';
  const marker = 'data-mailsort-index';
  const visible = (el) => {
    if (el.type === 'hidden') return false;
    const style = window.getComputedStyle(el);
    if (style.visibility === 'hidden' || style.display === 'none') return false;
    return el.getClientRects().length > 0;
  };
  document.querySelectorAll('[' + marker + ']').forEach((el) => el.removeAttribute(marker));
  const controls = [];
  for (const el of document.querySelectorAll(selector)) {
    if (!visible(el)) continue;
    const index = controls.length;
    el.setAttribute(marker, String(index));
    const attributes = {};
    for (const attr of el.attributes) {
      if (attr.name !== marker) attributes[attr.name] = attr.value;
    }
    const text = (el.innerText || el.value || '').trim().slice(0, 200);
    controls.push({ index, tag: el.tagName.toLowerCase(), text, attributes });
  }
  return controls;
})()"#;

const VISIBLE_TEXT_SCRIPT: &str = "document.body ? document.body.innerText : ''";

#[derive(Debug, Clone)]
pub struct ChromiumAutomation {
    executable: Option<PathBuf>,
    headless: bool,
}

impl ChromiumAutomation {
    pub fn from_settings(settings: &BrowserSettings) -> Self {
        Self {
            executable: settings.executable.clone(),
            headless: settings.headless,
        }
    }

    fn config(&self) -> AppResult<BrowserConfig> {
        let mut builder = BrowserConfig::builder();
        if let Some(executable) = &self.executable {
            builder = builder.chrome_executable(executable);
        }
        if !self.headless {
            builder = builder.with_head();
        }
        if std::env::var_os("CI").is_some() || std::env::var_os("NO_SANDBOX").is_some() {
            builder = builder.no_sandbox();
        }
        builder.build().map_err(AppError::Browser)
    }
}

#[async_trait]
impl BrowserAutomation for ChromiumAutomation {
    async fn start(&self) -> AppResult<Box<dyn BrowserSession>> {
        let config = self.config()?;
        info!(executable = ?self.executable, headless = self.headless, "launching chromium");
        let (browser, mut handler) = Browser::launch(config).await.map_err(browser_error)?;

        let events = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
            debug!("chromium event loop exited");
        });

        Ok(Box::new(ChromiumSession {
            browser: Some(browser),
            events,
        }))
    }
}

pub struct ChromiumSession {
    browser: Option<Browser>,
    events: JoinHandle<()>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_page(&self) -> AppResult<Box<dyn BrowserPage>> {
        let browser = self
            .browser
            .as_ref()
            .ok_or_else(|| AppError::Browser("browser already closed".to_string()))?;
        let page = browser.new_page("about:blank").await.map_err(browser_error)?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(mut self: Box<Self>) -> AppResult<()> {
        if let Some(mut browser) = self.browser.take() {
            browser.close().await.map_err(browser_error)?;
            if let Err(err) = browser.wait().await {
                warn!(error = %err, "chromium did not exit cleanly");
            }
        }
        self.events.abort();
        Ok(())
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        // Dropping `Browser` kills the child process; the event loop has to go with it.
        self.events.abort();
    }
}

pub struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl BrowserPage for ChromiumPage {
    async fn goto(&self, url: &str) -> AppResult<()> {
        self.page.goto(url).await.map_err(browser_error)?;
        self.page.wait_for_navigation().await.map_err(browser_error)?;
        Ok(())
    }

    async fn controls(&self) -> AppResult<Vec<ControlSnapshot>> {
        let controls = self
            .page
            .evaluate(CONTROLS_SCRIPT)
            .await
            .map_err(browser_error)?
            .into_value::<Vec<ControlSnapshot>>()?;
        Ok(controls)
    }

    async fn click(&self, index: usize) -> AppResult<()> {
        let selector = format!("[{INDEX_ATTRIBUTE}=\"{index}\"]");
        self.page
            .find_element(selector)
            .await
            .map_err(browser_error)?
            .click()
            .await
            .map_err(browser_error)?;
        Ok(())
    }

    async fn visible_text(&self) -> AppResult<String> {
        let text = self
            .page
            .evaluate(VISIBLE_TEXT_SCRIPT)
            .await
            .map_err(browser_error)?
            .into_value::<String>()?;
        Ok(text)
    }

    async fn close(self: Box<Self>) -> AppResult<()> {
        self.page.close().await.map_err(browser_error)
    }
}

fn browser_error(err: CdpError) -> AppError {
    AppError::Browser(err.to_string())
}
