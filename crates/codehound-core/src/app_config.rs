use std::net::SocketAddr;
use std::path::PathBuf;

use crate::SourceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// Where the discovery browser comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrowserMode {
    /// Launch a local Chrome/Chromium per request.
    Local,
    /// Connect to a hosted browser endpoint per request.
    Remote,
}

impl std::fmt::Display for BrowserMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BrowserMode::Local => write!(f, "local"),
            BrowserMode::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub browser_mode: BrowserMode,
    pub browser_endpoint: Option<String>,
    pub browser_token: Option<String>,
    pub chrome_path: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
    pub cache_ttl_secs: u64,
    pub adapter_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    pub popup_timeout_secs: u64,
    pub request_deadline_secs: u64,
    /// 3 for the standard result, 1 for single-code deployments.
    pub max_codes: usize,
    pub fallback_enabled: bool,
    pub placeholders_enabled: bool,
    /// Enabled sources, highest ranking priority first.
    pub sources: Vec<SourceId>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("browser_mode", &self.browser_mode)
            .field("browser_endpoint", &self.browser_endpoint)
            .field(
                "browser_token",
                &self.browser_token.as_ref().map(|_| "[redacted]"),
            )
            .field("chrome_path", &self.chrome_path)
            .field("headless", &self.headless)
            .field("user_agent", &self.user_agent)
            .field("cache_ttl_secs", &self.cache_ttl_secs)
            .field("adapter_timeout_secs", &self.adapter_timeout_secs)
            .field("selector_timeout_secs", &self.selector_timeout_secs)
            .field("popup_timeout_secs", &self.popup_timeout_secs)
            .field("request_deadline_secs", &self.request_deadline_secs)
            .field("max_codes", &self.max_codes)
            .field("fallback_enabled", &self.fallback_enabled)
            .field("placeholders_enabled", &self.placeholders_enabled)
            .field("sources", &self.sources)
            .finish()
    }
}
