//! Chrome DevTools Protocol implementation of the browser seam.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::fetch::{
    EnableParams, EventRequestPaused, FailRequestParams, RequestPattern,
};
use chromiumoxide::cdp::browser_protocol::network::{
    ErrorReason, ResourceType, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::BringToFrontParams;
use chromiumoxide::cdp::browser_protocol::target::{EventTargetCreated, TargetId};
use chromiumoxide::cdp::js_protocol::runtime::{EventConsoleApiCalled, EventExceptionThrown};
use chromiumoxide::error::CdpError;
use chromiumoxide::handler::{Handler, HandlerConfig};
use chromiumoxide::{Browser, Page};
use futures::StreamExt;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;

use super::config::{BrowserConfig, BrowserTarget};
use super::remote::resolve_ws_endpoint;
use super::{millis, BrowserDriver, BrowserSession, PageContext, PopupWatch};
use crate::error::{DiscoveryError, PageError};

const CHROME_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
    "/opt/google/chrome/google-chrome",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

const LAUNCH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--disable-background-networking",
    "--disable-sync",
    "--disable-translate",
    "--no-sandbox",
    "--disable-gpu",
];

const SELECTOR_POLL_INTERVAL: Duration = Duration::from_millis(250);
const POPUP_ATTACH_ATTEMPTS: u32 = 10;
const POPUP_ATTACH_INTERVAL: Duration = Duration::from_millis(100);
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

static PROFILE_SEQ: AtomicU64 = AtomicU64::new(0);

const VISIBLE_TEXT_JS: &str = r"(() => {
  const out = [];
  const root = document.body || document.documentElement;
  if (!root) return out;
  const walker = document.createTreeWalker(root, NodeFilter.SHOW_TEXT);
  while (walker.nextNode()) {
    const node = walker.currentNode;
    const parent = node.parentElement;
    if (!parent || ['SCRIPT', 'STYLE', 'NOSCRIPT', 'TEMPLATE'].includes(parent.tagName)) continue;
    const text = (node.textContent || '').trim();
    if (!text) continue;
    const style = window.getComputedStyle(parent);
    if (style.display === 'none' || style.visibility === 'hidden') continue;
    out.push(text);
  }
  return out;
})()";

/// Drives Chrome/Chromium through `chromiumoxide`.
#[derive(Debug)]
pub struct ChromiumDriver {
    config: BrowserConfig,
    http: reqwest::Client,
}

impl ChromiumDriver {
    #[must_use]
    pub fn new(config: BrowserConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    async fn launch_local(
        &self,
        chrome_path: Option<&Path>,
        headless: bool,
    ) -> Result<(Browser, Handler, Option<PathBuf>), DiscoveryError> {
        let profile_dir = std::env::temp_dir().join(format!(
            "codehound-{}-{}",
            std::process::id(),
            PROFILE_SEQ.fetch_add(1, Ordering::Relaxed)
        ));

        let mut builder = chromiumoxide::BrowserConfig::builder()
            .user_data_dir(&profile_dir)
            .request_timeout(self.config.navigation_timeout);
        if let Some(executable) = find_chrome(chrome_path) {
            tracing::debug!(executable = %executable.display(), "using chrome executable");
            builder = builder.chrome_executable(executable);
        }
        if !headless {
            builder = builder.with_head();
        }
        for arg in LAUNCH_ARGS {
            builder = builder.arg(*arg);
        }

        let cdp_config = builder
            .build()
            .map_err(|e| DiscoveryError::BrowserLaunch(format!("invalid launch config: {e}")))?;
        let (browser, handler) = Browser::launch(cdp_config)
            .await
            .map_err(|e| DiscoveryError::BrowserLaunch(e.to_string()))?;

        Ok((browser, handler, Some(profile_dir)))
    }

    async fn connect_remote(
        &self,
        endpoint: &str,
        token: Option<&str>,
    ) -> Result<(Browser, Handler, Option<PathBuf>), DiscoveryError> {
        let ws_url = resolve_ws_endpoint(&self.http, endpoint, token).await?;
        let handler_config = HandlerConfig {
            request_timeout: self.config.navigation_timeout,
            ..Default::default()
        };
        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .map_err(|e| DiscoveryError::BrowserLaunch(e.to_string()))?;

        Ok((browser, handler, None))
    }
}

#[async_trait]
impl BrowserDriver for ChromiumDriver {
    async fn acquire_session(&self) -> Result<Box<dyn BrowserSession>, DiscoveryError> {
        let (browser, mut handler, profile_dir) = match &self.config.target {
            BrowserTarget::Local {
                chrome_path,
                headless,
            } => self.launch_local(chrome_path.as_deref(), *headless).await?,
            BrowserTarget::Remote { endpoint, token } => {
                self.connect_remote(endpoint, token.as_deref()).await?
            }
        };

        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "cdp handler event error");
                }
            }
        });

        tracing::debug!(browser = ?self.config.target, "browser session acquired");

        Ok(Box::new(ChromiumSession {
            shared: Arc::new(SessionShared {
                browser: RwLock::new(Some(browser)),
                user_agent: self.config.user_agent.clone(),
                navigation_timeout: self.config.navigation_timeout,
            }),
            handler: Mutex::new(Some(handler_task)),
            profile_dir,
        }))
    }
}

fn find_chrome(configured: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = configured {
        return Some(path.to_path_buf());
    }
    CHROME_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

struct SessionShared {
    /// `None` once the session is closed.
    browser: RwLock<Option<Browser>>,
    user_agent: String,
    navigation_timeout: Duration,
}

struct ChromiumSession {
    shared: Arc<SessionShared>,
    handler: Mutex<Option<JoinHandle<()>>>,
    profile_dir: Option<PathBuf>,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn open_page(&self) -> Result<Box<dyn PageContext>, PageError> {
        let page = {
            let guard = self.shared.browser.read().await;
            let browser = guard.as_ref().ok_or(PageError::Closed)?;
            browser.new_page("about:blank").await.map_err(cdp_error)?
        };
        ChromiumPage::prepare(page, Arc::clone(&self.shared)).await
    }

    async fn close(&self) {
        let browser = self.shared.browser.write().await.take();
        let Some(mut browser) = browser else {
            return;
        };

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, browser.close()).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::debug!(error = %e, "browser close failed"),
            Err(_) => tracing::warn!("browser close timed out"),
        }
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, browser.wait())
            .await
            .is_err()
        {
            tracing::warn!("browser process did not exit in time");
        }
        drop(browser);

        if let Some(task) = self.handler.lock().await.take() {
            task.abort();
        }
        if let Some(dir) = &self.profile_dir {
            if let Err(e) = tokio::fs::remove_dir_all(dir).await {
                tracing::debug!(dir = %dir.display(), error = %e, "profile cleanup skipped");
            }
        }
        tracing::debug!("browser session closed");
    }
}

impl Drop for ChromiumSession {
    fn drop(&mut self) {
        if let Some(task) = self.handler.get_mut().take() {
            task.abort();
        }
    }
}

struct ChromiumPage {
    /// `None` once the page is closed.
    page: Mutex<Option<Page>>,
    shared: Arc<SessionShared>,
    listeners: Mutex<Vec<JoinHandle<()>>>,
}

impl ChromiumPage {
    async fn prepare(
        page: Page,
        shared: Arc<SessionShared>,
    ) -> Result<Box<dyn PageContext>, PageError> {
        match instrument(&page, &shared.user_agent).await {
            Ok(listeners) => Ok(Box::new(ChromiumPage {
                page: Mutex::new(Some(page)),
                shared,
                listeners: Mutex::new(listeners),
            })),
            Err(e) => {
                if let Err(close_err) = page.close().await {
                    tracing::debug!(error = %close_err, "closing half-prepared page failed");
                }
                Err(cdp_error(e))
            }
        }
    }

    async fn page(&self) -> Result<Page, PageError> {
        self.page.lock().await.clone().ok_or(PageError::Closed)
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, script: String) -> Result<T, PageError> {
        let page = self.page().await?;
        page.evaluate(script)
            .await
            .map_err(cdp_error)?
            .into_value::<T>()
            .map_err(|e| PageError::Browser(format!("unexpected script result: {e}")))
    }
}

/// Applies the user agent, blocks heavy resources and starts the diagnostic
/// listeners. Returns the listener tasks so the page can stop them on close.
async fn instrument(page: &Page, user_agent: &str) -> Result<Vec<JoinHandle<()>>, CdpError> {
    page.execute(SetUserAgentOverrideParams::new(user_agent.to_string()))
        .await?;

    let mut paused = page.event_listener::<EventRequestPaused>().await?;
    let patterns: Vec<RequestPattern> = [
        ResourceType::Image,
        ResourceType::Font,
        ResourceType::Stylesheet,
    ]
    .into_iter()
    .map(|kind| RequestPattern::builder().resource_type(kind).build())
    .collect();
    page.execute(EnableParams::builder().patterns(patterns).build())
        .await?;

    let blocker = page.clone();
    let block_task = tokio::spawn(async move {
        while let Some(event) = paused.next().await {
            let fail = FailRequestParams::new(event.request_id.clone(), ErrorReason::BlockedByClient);
            if blocker.execute(fail).await.is_err() {
                break;
            }
        }
    });

    let mut console = page.event_listener::<EventConsoleApiCalled>().await?;
    let console_task = tokio::spawn(async move {
        while let Some(event) = console.next().await {
            let message = event
                .args
                .iter()
                .filter_map(|arg| {
                    arg.value
                        .as_ref()
                        .map(ToString::to_string)
                        .or_else(|| arg.description.clone())
                })
                .collect::<Vec<_>>()
                .join(" ");
            tracing::debug!(kind = ?event.r#type, message = %message, "page console");
        }
    });

    let mut exceptions = page.event_listener::<EventExceptionThrown>().await?;
    let exception_task = tokio::spawn(async move {
        while let Some(event) = exceptions.next().await {
            tracing::warn!(
                message = %event.exception_details.text,
                "uncaught page exception"
            );
        }
    });

    Ok(vec![block_task, console_task, exception_task])
}

#[async_trait]
impl PageContext for ChromiumPage {
    async fn goto(&self, url: &str) -> Result<(), PageError> {
        let page = self.page().await?;
        let timeout = self.shared.navigation_timeout;
        let timed_out = || PageError::NavigationTimeout {
            url: url.to_string(),
            waited_ms: millis(timeout),
        };

        match tokio::time::timeout(timeout, page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(CdpError::Timeout)) | Err(_) => {
                tracing::warn!(url, "navigation timed out");
                Err(timed_out())
            }
            Ok(Err(e)) => {
                tracing::warn!(url, error = %e, "navigation failed");
                Err(cdp_error(e))
            }
        }
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), PageError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return false; \
             const r = el.getBoundingClientRect(); \
             return r.width > 0 || r.height > 0; }})()",
            sel = js_string(selector)
        );
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            match self.eval::<bool>(script.clone()).await {
                Ok(true) => return Ok(()),
                Ok(false) => {}
                Err(PageError::Closed) => return Err(PageError::Closed),
                Err(e) => tracing::debug!(selector, error = %e, "selector probe failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(PageError::SelectorNotFound {
                    selector: selector.to_string(),
                    waited_ms: millis(timeout),
                });
            }
            tokio::time::sleep(SELECTOR_POLL_INTERVAL).await;
        }
    }

    async fn outer_html(&self, selector: &str, limit: usize) -> Result<Vec<String>, PageError> {
        let script = format!(
            "Array.from(document.querySelectorAll({sel})).slice(0, {limit}).map(el => el.outerHTML)",
            sel = js_string(selector)
        );
        self.eval(script).await
    }

    async fn visible_text(&self) -> Result<Vec<String>, PageError> {
        self.eval(VISIBLE_TEXT_JS.to_string()).await
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>, PageError> {
        let script = format!(
            "(() => {{ const el = document.querySelector({sel}); \
             if (!el) return ''; \
             const value = typeof el.value === 'string' && el.value ? el.value : el.innerText; \
             return value == null ? '' : String(value); }})()",
            sel = js_string(selector)
        );
        let text: String = self.eval(script).await?;
        let text = text.trim();
        Ok((!text.is_empty()).then(|| text.to_string()))
    }

    async fn click(&self, selector: &str, index: usize) -> Result<(), PageError> {
        let page = self.page().await?;
        let elements = page.find_elements(selector).await.map_err(cdp_error)?;
        let element = elements
            .get(index)
            .ok_or_else(|| PageError::SelectorNotFound {
                selector: format!("{selector} [{index}]"),
                waited_ms: 0,
            })?;
        element.click().await.map_err(cdp_error)?;
        Ok(())
    }

    async fn bring_to_front(&self) -> Result<(), PageError> {
        let page = self.page().await?;
        page.execute(BringToFrontParams::default())
            .await
            .map_err(cdp_error)?;
        Ok(())
    }

    async fn watch_popup(&self) -> Result<PopupWatch, PageError> {
        let opener = self.page().await?.target_id().clone();
        let mut created = {
            let guard = self.shared.browser.read().await;
            let browser = guard.as_ref().ok_or(PageError::Closed)?;
            browser
                .event_listener::<EventTargetCreated>()
                .await
                .map_err(cdp_error)?
        };
        let shared = Arc::clone(&self.shared);

        Ok(PopupWatch::new(async move {
            while let Some(event) = created.next().await {
                let info = &event.target_info;
                if info.r#type != "page" || info.opener_id.as_ref() != Some(&opener) {
                    continue;
                }
                let popup = attach_popup(&shared, &info.target_id).await?;
                return ChromiumPage::prepare(popup, shared).await;
            }
            Err(PageError::Closed)
        }))
    }

    async fn close(&self) {
        for task in self.listeners.lock().await.drain(..) {
            task.abort();
        }
        let page = self.page.lock().await.take();
        if let Some(page) = page {
            if let Err(e) = page.close().await {
                tracing::debug!(error = %e, "page close failed");
            }
        }
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        for task in self.listeners.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// The target-created event can arrive before the handler has attached to the
/// new target, so the lookup is retried briefly.
async fn attach_popup(shared: &SessionShared, target_id: &TargetId) -> Result<Page, PageError> {
    for _ in 0..POPUP_ATTACH_ATTEMPTS {
        {
            let guard = shared.browser.read().await;
            let browser = guard.as_ref().ok_or(PageError::Closed)?;
            let pages = browser.pages().await.map_err(cdp_error)?;
            if let Some(page) = pages.into_iter().find(|p| p.target_id() == target_id) {
                return Ok(page);
            }
        }
        tokio::time::sleep(POPUP_ATTACH_INTERVAL).await;
    }
    Err(PageError::Browser(format!(
        "popup target {target_id:?} never attached"
    )))
}

fn js_string(value: &str) -> String {
    serde_json::Value::from(value).to_string()
}

fn cdp_error(err: CdpError) -> PageError {
    PageError::Browser(err.to_string())
}
