use crate::app_config::{AppConfig, BrowserMode, Environment};
use crate::{ConfigError, SourceId};

/// Desktop Chrome UA presented by discovery pages.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid, or if remote
/// browser mode is selected without an endpoint.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_secs = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let secs = parse_u64(var, default)?;
        if secs == 0 {
            return Err(invalid(var, "must be greater than zero".to_string()));
        }
        Ok(secs)
    };

    let parse_flag = |var: &str, default: bool| -> Result<bool, ConfigError> {
        match lookup(var) {
            Ok(raw) => parse_bool(&raw).ok_or_else(|| invalid(var, format!("not a boolean: {raw}"))),
            Err(_) => Ok(default),
        }
    };

    let env = parse_environment(&or_default("CODEHOUND_ENV", "development"))?;

    let bind_addr = or_default("CODEHOUND_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("CODEHOUND_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("CODEHOUND_LOG_LEVEL", "info");

    let browser_mode = parse_browser_mode(&or_default("CODEHOUND_BROWSER_MODE", "local"))?;
    let browser_endpoint = optional("CODEHOUND_BROWSER_ENDPOINT");
    let browser_token = optional("CODEHOUND_BROWSER_TOKEN");
    if browser_mode == BrowserMode::Remote && browser_endpoint.is_none() {
        return Err(ConfigError::MissingEnvVar(
            "CODEHOUND_BROWSER_ENDPOINT".to_string(),
        ));
    }
    let chrome_path = optional("CODEHOUND_CHROME_PATH").map(PathBuf::from);
    let headless = parse_flag("CODEHOUND_HEADLESS", true)?;
    let user_agent = or_default("CODEHOUND_USER_AGENT", DEFAULT_USER_AGENT);

    let cache_ttl_secs = parse_secs("CODEHOUND_CACHE_TTL_SECS", "3600")?;
    let adapter_timeout_secs = parse_secs("CODEHOUND_ADAPTER_TIMEOUT_SECS", "20")?;
    let selector_timeout_secs = parse_secs("CODEHOUND_SELECTOR_TIMEOUT_SECS", "12")?;
    let popup_timeout_secs = parse_secs("CODEHOUND_POPUP_TIMEOUT_SECS", "8")?;
    let request_deadline_secs = parse_secs("CODEHOUND_REQUEST_DEADLINE_SECS", "45")?;

    let max_codes = or_default("CODEHOUND_MAX_CODES", "3")
        .parse::<usize>()
        .map_err(|e| invalid("CODEHOUND_MAX_CODES", e.to_string()))?;
    if !(1..=3).contains(&max_codes) {
        return Err(invalid(
            "CODEHOUND_MAX_CODES",
            format!("must be between 1 and 3, got {max_codes}"),
        ));
    }

    let fallback_enabled = parse_flag("CODEHOUND_FALLBACK_ENABLED", true)?;
    let placeholders_enabled = parse_flag("CODEHOUND_PLACEHOLDERS_ENABLED", true)?;
    let sources = parse_sources(&or_default(
        "CODEHOUND_SOURCES",
        "retailmenot,couponfollow,dealspotr",
    ))?;

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        browser_mode,
        browser_endpoint,
        browser_token,
        chrome_path,
        headless,
        user_agent,
        cache_ttl_secs,
        adapter_timeout_secs,
        selector_timeout_secs,
        popup_timeout_secs,
        request_deadline_secs,
        max_codes,
        fallback_enabled,
        placeholders_enabled,
        sources,
    })
}

/// Parse a string into an `Environment` variant.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` for unrecognised values.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CODEHOUND_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

fn parse_browser_mode(s: &str) -> Result<BrowserMode, ConfigError> {
    match s.trim().to_ascii_lowercase().as_str() {
        "local" => Ok(BrowserMode::Local),
        "remote" => Ok(BrowserMode::Remote),
        other => Err(ConfigError::InvalidEnvVar {
            var: "CODEHOUND_BROWSER_MODE".to_string(),
            reason: format!("expected 'local' or 'remote', got '{other}'"),
        }),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a comma-separated source list, preserving order and dropping repeats.
fn parse_sources(raw: &str) -> Result<Vec<SourceId>, ConfigError> {
    let mut sources = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let id = part
            .parse::<SourceId>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: "CODEHOUND_SOURCES".to_string(),
                reason: e.to_string(),
            })?;
        if !sources.contains(&id) {
            sources.push(id);
        }
    }
    if sources.is_empty() {
        return Err(ConfigError::InvalidEnvVar {
            var: "CODEHOUND_SOURCES".to_string(),
            reason: "at least one source is required".to_string(),
        });
    }
    Ok(sources)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
