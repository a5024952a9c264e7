use thiserror::Error;

/// Request-level failures. Everything else is absorbed per source.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("invalid store URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("could not start a browser session: {0}")]
    BrowserLaunch(String),
}

impl DiscoveryError {
    /// Stable machine-readable name for logs and API payloads.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            DiscoveryError::InvalidUrl { .. } => "invalid_url",
            DiscoveryError::BrowserLaunch(_) => "browser_unavailable",
        }
    }
}

/// Failures of a single page operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PageError {
    #[error("navigation to {url} timed out after {waited_ms}ms")]
    NavigationTimeout { url: String, waited_ms: u64 },

    #[error("selector \"{selector}\" not found within {waited_ms}ms")]
    SelectorNotFound { selector: String, waited_ms: u64 },

    #[error("no popup opened within {waited_ms}ms")]
    PopupNotOpened { waited_ms: u64 },

    #[error("page already closed")]
    Closed,

    #[error("browser protocol error: {0}")]
    Browser(String),
}

/// Failure of one adapter invocation. Converted to zero candidates by the
/// orchestrator, never surfaced to the caller.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AdapterError {
    #[error(transparent)]
    Page(#[from] PageError),

    #[error("adapter exceeded its {budget_ms}ms budget")]
    TimedOut { budget_ms: u64 },

    #[error("request deadline reached before the adapter finished")]
    Cancelled,
}

impl AdapterError {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            AdapterError::Page(PageError::NavigationTimeout { .. }) => "navigation_timeout",
            AdapterError::Page(PageError::SelectorNotFound { .. }) => "selector_not_found",
            AdapterError::Page(PageError::PopupNotOpened { .. }) => "popup_not_opened",
            AdapterError::Page(PageError::Closed) => "page_closed",
            AdapterError::Page(PageError::Browser(_)) => "browser_error",
            AdapterError::TimedOut { .. } => "timed_out",
            AdapterError::Cancelled => "cancelled",
        }
    }
}
