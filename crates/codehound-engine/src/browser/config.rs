use std::path::PathBuf;
use std::time::Duration;

use codehound_core::{AppConfig, BrowserMode};

/// Where sessions come from.
#[derive(Clone, PartialEq, Eq)]
pub enum BrowserTarget {
    /// Launch a local Chrome/Chromium per session.
    Local {
        /// Explicit executable; well-known install paths are probed when unset.
        chrome_path: Option<PathBuf>,
        headless: bool,
    },
    /// Connect to a hosted browser. `endpoint` may be `ws(s)://` or an
    /// `http(s)://` DevTools root.
    Remote {
        endpoint: String,
        token: Option<String>,
    },
}

impl std::fmt::Debug for BrowserTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserTarget::Local {
                chrome_path,
                headless,
            } => f
                .debug_struct("Local")
                .field("chrome_path", chrome_path)
                .field("headless", headless)
                .finish(),
            BrowserTarget::Remote { endpoint, token } => f
                .debug_struct("Remote")
                .field("endpoint", endpoint)
                .field("token", &token.as_ref().map(|_| "[redacted]"))
                .finish(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BrowserConfig {
    pub target: BrowserTarget,
    pub user_agent: String,
    /// Upper bound on a single `goto`.
    pub navigation_timeout: Duration,
}

impl BrowserConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let target = match config.browser_mode {
            BrowserMode::Local => BrowserTarget::Local {
                chrome_path: config.chrome_path.clone(),
                headless: config.headless,
            },
            BrowserMode::Remote => BrowserTarget::Remote {
                endpoint: config.browser_endpoint.clone().unwrap_or_default(),
                token: config.browser_token.clone(),
            },
        };

        Self {
            target,
            user_agent: config.user_agent.clone(),
            navigation_timeout: Duration::from_secs(config.adapter_timeout_secs),
        }
    }
}
