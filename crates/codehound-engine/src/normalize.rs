//! Store URL → slug normalization.
//!
//! The slug is what coupon aggregators key their store pages on, so the
//! rules here mirror how those sites name merchants rather than any
//! canonical domain model.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DiscoveryError;

/// Generic retail words aggregators tend to omit from merchant page names.
///
/// Applied as a plain substring filter, so a store literally named
/// "Shopilicious" loses its "shop". Known weakness, kept deliberately.
static RETAIL_KEYWORDS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)clothing|shop|store|online").expect("valid regex"));

/// Normalized identity of a store, derived from its URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSlug {
    label: String,
    search_key: String,
}

impl StoreSlug {
    /// First hostname label, lowercase, without a leading `www.`.
    ///
    /// `https://www.examplestore.com` → `examplestore`.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The label with retail keywords stripped. Adapters build source URLs
    /// from this value.
    #[must_use]
    pub fn search_key(&self) -> &str {
        &self.search_key
    }

    /// Hyphen-free variant of [`Self::search_key`] for the retry pass, or
    /// `None` when it would be identical.
    #[must_use]
    pub fn compact(&self) -> Option<String> {
        if self.search_key.contains('-') {
            let compact: String = self.search_key.chars().filter(|c| *c != '-').collect();
            (!compact.is_empty()).then_some(compact)
        } else {
            None
        }
    }
}

impl std::fmt::Display for StoreSlug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

/// Derives the [`StoreSlug`] for a store URL.
///
/// # Errors
///
/// Returns [`DiscoveryError::InvalidUrl`] if `url` is not an absolute
/// `http`/`https` URL with a host.
pub fn store_slug(url: &str) -> Result<StoreSlug, DiscoveryError> {
    let invalid = |reason: &str| DiscoveryError::InvalidUrl {
        url: url.to_owned(),
        reason: reason.to_owned(),
    };

    let parsed = reqwest::Url::parse(url.trim()).map_err(|e| invalid(&e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(invalid("scheme must be http or https"));
    }
    let host = parsed
        .host_str()
        .filter(|h| !h.is_empty())
        .ok_or_else(|| invalid("URL has no host"))?
        .to_ascii_lowercase();

    let host = host.strip_prefix("www.").unwrap_or(&host);
    let label = host.split('.').next().unwrap_or_default().to_string();
    if label.is_empty() {
        return Err(invalid("URL host has no usable label"));
    }

    let stripped = RETAIL_KEYWORDS_RE.replace_all(&label, "");
    let stripped = stripped.trim_matches('-');
    let search_key = if stripped.is_empty() {
        label.clone()
    } else {
        stripped.to_string()
    };

    Ok(StoreSlug { label, search_key })
}

#[cfg(test)]
#[path = "normalize_test.rs"]
mod tests;
