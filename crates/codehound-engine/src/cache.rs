//! In-memory result cache keyed by the caller's URL string.
//!
//! Entries are not normalized across equivalent URLs: `https://a.com` and
//! `https://a.com/` are separate keys. Expired entries are evicted on the
//! read that notices them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Duration, Utc};
use codehound_core::DiscoveryOutcome;

/// Time source for the cache.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    outcome: DiscoveryOutcome,
    created_at: DateTime<Utc>,
}

/// Process-wide cache of discovery outcomes with a single fixed ttl.
pub struct ResultCache<C: Clock = SystemClock> {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    clock: C,
}

impl ResultCache<SystemClock> {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, SystemClock)
    }
}

impl<C: Clock> ResultCache<C> {
    pub fn with_clock(ttl: Duration, clock: C) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            clock,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the live entry for `url`, or `None` if it was never stored or
    /// its ttl has elapsed. An elapsed entry is removed by this call.
    pub fn get(&self, url: &str) -> Option<DiscoveryOutcome> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let expired = match entries.get(url) {
            None => return None,
            Some(entry) => now - entry.created_at > self.ttl,
        };
        if expired {
            entries.remove(url);
            tracing::debug!(url, "cache entry expired");
            return None;
        }
        entries.get(url).map(|entry| entry.outcome.clone())
    }

    /// Stores `outcome` under `url` with `created_at = now`, replacing any
    /// previous entry.
    pub fn put(&self, url: &str, outcome: DiscoveryOutcome) {
        let created_at = self.clock.now();
        self.lock()
            .insert(url.to_string(), CacheEntry { outcome, created_at });
    }

    /// Stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Clock> std::fmt::Debug for ResultCache<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultCache")
            .field("ttl", &self.ttl)
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use codehound_core::Confidence;

    use super::*;

    fn outcome(url: &str, codes: &[&str]) -> DiscoveryOutcome {
        DiscoveryOutcome {
            url: url.to_string(),
            slug: "example".to_string(),
            codes: codes.iter().map(|c| (*c).to_string()).collect(),
            confidence: Confidence::Discovered,
            from_cache: false,
            sources: Vec::new(),
            discovered_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn cache() -> (ResultCache<ManualClock>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap());
        (
            ResultCache::with_clock(Duration::hours(1), clock.clone()),
            clock,
        )
    }

    #[test]
    fn miss_on_unknown_url() {
        let (cache, _) = cache();
        assert!(cache.get("https://a.com").is_none());
    }

    #[test]
    fn hit_within_ttl() {
        let (cache, clock) = cache();
        cache.put("https://a.com", outcome("https://a.com", &["SAVE10"]));
        clock.advance(Duration::minutes(59));
        assert_eq!(cache.get("https://a.com").unwrap().codes, vec!["SAVE10"]);
    }

    #[test]
    fn entry_exactly_at_ttl_is_still_live() {
        let (cache, clock) = cache();
        cache.put("https://a.com", outcome("https://a.com", &["SAVE10"]));
        clock.advance(Duration::hours(1));
        assert!(cache.get("https://a.com").is_some());
    }

    #[test]
    fn expired_entry_is_evicted_on_read() {
        let (cache, clock) = cache();
        cache.put("https://a.com", outcome("https://a.com", &["SAVE10"]));
        clock.advance(Duration::hours(1) + Duration::seconds(1));
        assert_eq!(cache.len(), 1);
        assert!(cache.get("https://a.com").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn keys_are_not_normalized() {
        let (cache, _) = cache();
        cache.put("https://a.com", outcome("https://a.com", &["SAVE10"]));
        assert!(cache.get("https://a.com/").is_none());
    }

    #[test]
    fn put_replaces_and_restarts_ttl() {
        let (cache, clock) = cache();
        cache.put("https://a.com", outcome("https://a.com", &["OLD10"]));
        clock.advance(Duration::minutes(50));
        cache.put("https://a.com", outcome("https://a.com", &["NEW20"]));
        clock.advance(Duration::minutes(50));
        assert_eq!(cache.get("https://a.com").unwrap().codes, vec!["NEW20"]);
    }
}
