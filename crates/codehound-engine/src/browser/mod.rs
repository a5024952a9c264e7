//! Browser session manager.
//!
//! Three layers, each owning the next: a [`BrowserDriver`] hands out one
//! [`BrowserSession`] per discovery request, and a session hands out one
//! [`PageContext`] per adapter invocation. Both close operations are
//! idempotent so every exit path can call them unconditionally.

mod chromium;
mod config;
mod remote;
mod scope;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::{DiscoveryError, PageError};

pub use chromium::ChromiumDriver;
pub use config::{BrowserConfig, BrowserTarget};
pub use remote::resolve_ws_endpoint;
pub(crate) use scope::PageScope;

/// Acquires browser sessions. One driver is shared for the life of the
/// process; sessions are never shared between requests.
#[async_trait]
pub trait BrowserDriver: Send + Sync {
    /// Launches or connects to a browser.
    ///
    /// # Errors
    ///
    /// Returns [`DiscoveryError::BrowserLaunch`] when the process cannot be
    /// started or the remote endpoint refuses the connection.
    async fn acquire_session(&self) -> Result<Box<dyn BrowserSession>, DiscoveryError>;
}

/// A live browser owned by a single request.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Opens a fresh page with heavy resources blocked and the configured
    /// user agent applied.
    ///
    /// # Errors
    ///
    /// Returns [`PageError`] if the session is closed or the browser refuses
    /// to create a target.
    async fn open_page(&self) -> Result<Box<dyn PageContext>, PageError>;

    /// Tears down the browser and any page still attached to it. Safe to
    /// call more than once.
    async fn close(&self);
}

/// One tab, exclusively owned by the adapter using it.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Navigates and waits for the load event.
    async fn goto(&self, url: &str) -> Result<(), PageError>;

    /// Polls until `selector` matches a visible element or `timeout` elapses.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), PageError>;

    /// Outer HTML of the first `limit` elements matching `selector`.
    async fn outer_html(&self, selector: &str, limit: usize) -> Result<Vec<String>, PageError>;

    /// Trimmed, non-empty text nodes currently rendered on the page.
    async fn visible_text(&self) -> Result<Vec<String>, PageError>;

    /// Text (or input value) of the first element matching `selector`.
    async fn text_of(&self, selector: &str) -> Result<Option<String>, PageError>;

    /// Clicks the `index`-th element matching `selector` with a real mouse
    /// event, so pages that open popups on user gestures do so.
    async fn click(&self, selector: &str, index: usize) -> Result<(), PageError>;

    async fn bring_to_front(&self) -> Result<(), PageError>;

    /// Subscribes to pages opened by this one. The subscription is live when
    /// this returns, so a click issued afterwards cannot race past it.
    async fn watch_popup(&self) -> Result<PopupWatch, PageError>;

    /// Closes the tab. Safe to call more than once.
    async fn close(&self);
}

/// A pending popup: resolves to the first page opened by the watched page.
///
/// Dropping the watch drops the underlying event subscription.
pub struct PopupWatch {
    opened: BoxFuture<'static, Result<Box<dyn PageContext>, PageError>>,
}

impl PopupWatch {
    pub fn new<F>(opened: F) -> Self
    where
        F: Future<Output = Result<Box<dyn PageContext>, PageError>> + Send + 'static,
    {
        Self {
            opened: Box::pin(opened),
        }
    }

    /// Waits up to `timeout` for the popup.
    ///
    /// # Errors
    ///
    /// Returns [`PageError::PopupNotOpened`] when nothing opens in time, or
    /// whatever error attaching to the new page produced.
    pub async fn opened(self, timeout: Duration) -> Result<Box<dyn PageContext>, PageError> {
        match tokio::time::timeout(timeout, self.opened).await {
            Ok(result) => result,
            Err(_) => Err(PageError::PopupNotOpened {
                waited_ms: millis(timeout),
            }),
        }
    }
}

impl std::fmt::Debug for PopupWatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PopupWatch").finish_non_exhaustive()
    }
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
