//! Remote browser endpoint resolution.
//!
//! Hosted browsers are addressed either by a WebSocket URL, used as-is, or by
//! an HTTP DevTools root whose `/json/version` document names the socket.
//! Either way the credential rides along as a `token` query parameter.

use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::error::DiscoveryError;

const VERSION_LOOKUP_TIMEOUT: Duration = Duration::from_secs(10);
const VERSION_LOOKUP_RETRIES: u32 = 2;
const VERSION_LOOKUP_BACKOFF_MS: u64 = 250;

#[derive(Debug, Deserialize)]
struct VersionInfo {
    #[serde(rename = "webSocketDebuggerUrl")]
    web_socket_debugger_url: Option<String>,
}

/// Resolves `endpoint` to the WebSocket URL a CDP client should connect to.
///
/// # Errors
///
/// Returns [`DiscoveryError::BrowserLaunch`] when the credential is missing,
/// the endpoint is malformed or uses an unsupported scheme, or the
/// `/json/version` lookup fails after retries.
pub async fn resolve_ws_endpoint(
    client: &reqwest::Client,
    endpoint: &str,
    token: Option<&str>,
) -> Result<String, DiscoveryError> {
    let token = token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            DiscoveryError::BrowserLaunch("remote browser token is not configured".to_string())
        })?;

    let url = Url::parse(endpoint.trim()).map_err(|e| {
        DiscoveryError::BrowserLaunch(format!("invalid remote browser endpoint: {e}"))
    })?;

    match url.scheme() {
        "ws" | "wss" => Ok(with_token(url, token).to_string()),
        "http" | "https" => {
            let ws_url = lookup_ws_url(client, &url, token).await?;
            let ws_url = Url::parse(&ws_url).map_err(|e| {
                DiscoveryError::BrowserLaunch(format!("invalid webSocketDebuggerUrl: {e}"))
            })?;
            Ok(with_token(ws_url, token).to_string())
        }
        other => Err(DiscoveryError::BrowserLaunch(format!(
            "unsupported remote browser scheme \"{other}\""
        ))),
    }
}

fn with_token(mut url: Url, token: &str) -> Url {
    if !url.query_pairs().any(|(k, _)| k == "token") {
        url.query_pairs_mut().append_pair("token", token);
    }
    url
}

async fn lookup_ws_url(
    client: &reqwest::Client,
    root: &Url,
    token: &str,
) -> Result<String, DiscoveryError> {
    let mut version_url = root.clone();
    let path = format!("{}/json/version", root.path().trim_end_matches('/'));
    version_url.set_path(&path);
    let version_url = with_token(version_url, token);

    let mut attempt = 0u32;
    loop {
        match fetch_version(client, &version_url).await {
            Ok(info) => {
                return info.web_socket_debugger_url.ok_or_else(|| {
                    DiscoveryError::BrowserLaunch(
                        "remote browser did not report a webSocketDebuggerUrl".to_string(),
                    )
                });
            }
            Err(LookupFailure::Fatal(reason)) => return Err(DiscoveryError::BrowserLaunch(reason)),
            Err(LookupFailure::Transient(reason)) if attempt >= VERSION_LOOKUP_RETRIES => {
                return Err(DiscoveryError::BrowserLaunch(reason));
            }
            Err(LookupFailure::Transient(reason)) => {
                let delay_ms = VERSION_LOOKUP_BACKOFF_MS.saturating_mul(1u64 << attempt);
                tracing::warn!(
                    attempt,
                    delay_ms,
                    error = %reason,
                    "remote browser lookup failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                attempt += 1;
            }
        }
    }
}

enum LookupFailure {
    Transient(String),
    Fatal(String),
}

async fn fetch_version(
    client: &reqwest::Client,
    version_url: &Url,
) -> Result<VersionInfo, LookupFailure> {
    let response = client
        .get(version_url.clone())
        .timeout(VERSION_LOOKUP_TIMEOUT)
        .send()
        .await
        .map_err(|e| LookupFailure::Transient(format!("remote browser unreachable: {e}")))?;

    let status = response.status();
    if status.is_server_error() {
        return Err(LookupFailure::Transient(format!(
            "remote browser returned {status}"
        )));
    }
    if !status.is_success() {
        return Err(LookupFailure::Fatal(format!(
            "remote browser rejected the session with {status}"
        )));
    }

    response
        .json::<VersionInfo>()
        .await
        .map_err(|e| LookupFailure::Fatal(format!("unreadable /json/version response: {e}")))
}
