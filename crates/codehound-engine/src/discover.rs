//! Discovery orchestrator: the engine's single entry point.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use codehound_core::{AppConfig, Confidence, CouponCandidate, DiscoveryOutcome, SourceId, SourceReport};
use futures::future::join_all;
use tokio::time::Instant;

use crate::browser::{BrowserConfig, BrowserDriver, BrowserSession, ChromiumDriver};
use crate::cache::{Clock, ResultCache, SystemClock};
use crate::error::DiscoveryError;
use crate::normalize::{store_slug, StoreSlug};
use crate::rank::{placeholder_codes, rank_candidates};
use crate::runner::{run_source, RunLimits};
use crate::sources::{build_sources, CouponSource, SourceSettings};

/// Request-level knobs.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Budget for one adapter invocation, navigation included.
    pub adapter_timeout: Duration,
    /// Budget for a whole uncached request.
    pub request_deadline: Duration,
    /// 3, or 1 for single-code deployments.
    pub max_codes: usize,
    pub fallback_enabled: bool,
    pub placeholders_enabled: bool,
}

impl EngineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            adapter_timeout: Duration::from_secs(config.adapter_timeout_secs),
            request_deadline: Duration::from_secs(config.request_deadline_secs),
            max_codes: config.max_codes,
            fallback_enabled: config.fallback_enabled,
            placeholders_enabled: config.placeholders_enabled,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adapter_timeout: Duration::from_secs(20),
            request_deadline: Duration::from_secs(45),
            max_codes: 3,
            fallback_enabled: true,
            placeholders_enabled: true,
        }
    }
}

/// Candidates and reports gathered by one or more passes over the sources.
#[derive(Default)]
struct Harvest {
    candidates: Vec<CouponCandidate>,
    reports: Vec<SourceReport>,
}

/// Finds discount codes for store URLs.
///
/// Cheap to share behind an `Arc`; each call to [`Discoverer::discover`]
/// acquires and releases its own browser session.
pub struct Discoverer<C: Clock = SystemClock> {
    driver: Arc<dyn BrowserDriver>,
    sources: Vec<Arc<dyn CouponSource>>,
    cache: Arc<ResultCache<C>>,
    config: EngineConfig,
}

impl Discoverer<SystemClock> {
    /// Wires the Chromium driver, the configured sources and a fresh cache.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let driver = ChromiumDriver::new(BrowserConfig::from_app_config(config));
        let sources = build_sources(&config.sources, &SourceSettings::from_app_config(config));
        let ttl = chrono::Duration::seconds(i64::try_from(config.cache_ttl_secs).unwrap_or(i64::MAX));
        Self::new(
            Arc::new(driver),
            sources,
            Arc::new(ResultCache::new(ttl)),
            EngineConfig::from_app_config(config),
        )
    }
}

impl<C: Clock> Discoverer<C> {
    /// `sources` order is the ranking priority order.
    pub fn new(
        driver: Arc<dyn BrowserDriver>,
        sources: Vec<Arc<dyn CouponSource>>,
        cache: Arc<ResultCache<C>>,
        config: EngineConfig,
    ) -> Self {
        Self {
            driver,
            sources,
            cache,
            config,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &ResultCache<C> {
        &self.cache
    }

    /// Discovers codes for `url`, serving a cached outcome when one is live.
    ///
    /// # Errors
    ///
    /// - [`DiscoveryError::InvalidUrl`] if `url` is not an absolute web URL.
    ///   No browser work happens in that case.
    /// - [`DiscoveryError::BrowserLaunch`] if no browser session could be
    ///   acquired before the request deadline.
    pub async fn discover(&self, url: &str) -> Result<DiscoveryOutcome, DiscoveryError> {
        let slug = store_slug(url)?;

        if let Some(mut hit) = self.cache.get(url) {
            tracing::info!(url, slug = %slug, codes = hit.codes.len(), "cache hit");
            hit.from_cache = true;
            return Ok(hit);
        }

        let deadline = Instant::now() + self.config.request_deadline;
        let session = tokio::time::timeout_at(deadline, self.driver.acquire_session())
            .await
            .map_err(|_| {
                DiscoveryError::BrowserLaunch("timed out acquiring a browser session".to_string())
            })??;

        let harvest = self.harvest(session.as_ref(), &slug, deadline).await;
        session.close().await;

        let outcome = self.conclude(url, &slug, harvest);
        self.cache.put(url, outcome.clone());

        tracing::info!(
            url,
            slug = %slug,
            codes = outcome.codes.len(),
            confidence = ?outcome.confidence,
            "discovery finished"
        );
        Ok(outcome)
    }

    /// [`Self::discover`] projected to the bare ranked codes.
    ///
    /// # Errors
    ///
    /// Same as [`Self::discover`].
    pub async fn discover_codes(&self, url: &str) -> Result<Vec<String>, DiscoveryError> {
        self.discover(url).await.map(DiscoveryOutcome::into_codes)
    }

    /// Primary pass with the search key, then a hyphen-less retry pass if
    /// the first produced nothing and time remains.
    async fn harvest(
        &self,
        session: &dyn BrowserSession,
        slug: &StoreSlug,
        deadline: Instant,
    ) -> Harvest {
        let mut harvest = self.run_pass(session, slug.search_key(), deadline).await;
        if !harvest.candidates.is_empty() {
            return harvest;
        }

        if let Some(compact) = slug.compact() {
            if Instant::now() < deadline {
                tracing::debug!(slug = %slug, key = %compact, "retrying with compact search key");
                let retry = self.run_pass(session, &compact, deadline).await;
                harvest.candidates = retry.candidates;
                harvest.reports.extend(retry.reports);
            }
        }
        harvest
    }

    async fn run_pass(
        &self,
        session: &dyn BrowserSession,
        search_key: &str,
        deadline: Instant,
    ) -> Harvest {
        let limits = RunLimits {
            adapter_timeout: self.config.adapter_timeout,
            request_deadline: deadline,
            fallback_enabled: self.config.fallback_enabled,
        };
        let runs = join_all(
            self.sources
                .iter()
                .map(|source| run_source(session, source.as_ref(), search_key, limits)),
        )
        .await;

        runs.into_iter().fold(Harvest::default(), |mut acc, run| {
            acc.candidates.extend(run.candidates);
            acc.reports.push(run.report);
            acc
        })
    }

    fn conclude(&self, url: &str, slug: &StoreSlug, harvest: Harvest) -> DiscoveryOutcome {
        let priority: Vec<SourceId> = self.sources.iter().map(|s| s.id()).collect();
        let ranked = rank_candidates(harvest.candidates, &priority, self.config.max_codes);

        let (codes, confidence) = if !ranked.is_empty() {
            (ranked, Confidence::Discovered)
        } else if self.config.placeholders_enabled {
            tracing::info!(url, slug = %slug, "no codes found, using placeholders");
            (
                placeholder_codes(slug.label(), self.config.max_codes),
                Confidence::Placeholder,
            )
        } else {
            (Vec::new(), Confidence::Empty)
        };

        DiscoveryOutcome {
            url: url.to_string(),
            slug: slug.label().to_string(),
            codes,
            confidence,
            from_cache: false,
            sources: harvest.reports,
            discovered_at: Utc::now(),
        }
    }
}

impl<C: Clock> std::fmt::Debug for Discoverer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sources: Vec<SourceId> = self.sources.iter().map(|s| s.id()).collect();
        f.debug_struct("Discoverer")
            .field("sources", &sources)
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
