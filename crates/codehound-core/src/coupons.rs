use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Coupon aggregator sites the engine knows how to scrape.
///
/// The set is closed: adding a source means adding a variant here and an
/// adapter for it in the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SourceId {
    #[serde(rename = "retailmenot")]
    RetailMeNot,
    #[serde(rename = "couponfollow")]
    CouponFollow,
    #[serde(rename = "dealspotr")]
    Dealspotr,
}

impl SourceId {
    pub const ALL: [SourceId; 3] = [
        SourceId::RetailMeNot,
        SourceId::CouponFollow,
        SourceId::Dealspotr,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SourceId::RetailMeNot => "retailmenot",
            SourceId::CouponFollow => "couponfollow",
            SourceId::Dealspotr => "dealspotr",
        }
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown coupon source: {0}")]
pub struct UnknownSource(pub String);

impl std::str::FromStr for SourceId {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        SourceId::ALL
            .into_iter()
            .find(|id| id.as_str() == wanted)
            .ok_or_else(|| UnknownSource(s.trim().to_string()))
    }
}

/// How a candidate was obtained from its source page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateOrigin {
    /// Read from the source's offer cards or reveal popup.
    Structured,
    /// Matched by the text-pattern heuristic over the page's visible text.
    Fallback,
}

/// A discount code extracted from one source, before ranking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponCandidate {
    /// Upper-cased code token. Never empty.
    pub code: String,
    pub description: String,
    pub source: SourceId,
    /// The source marks the offer as confirmed working.
    pub verified: bool,
    /// 0-100, 0 when the source does not advertise a percentage.
    pub discount_percent: u8,
    pub expiry: Option<String>,
    pub origin: CandidateOrigin,
}

/// Whether a result holds real discoveries or last-resort guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Discovered,
    Placeholder,
    Empty,
}

/// Per-source summary of one adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceReport {
    pub source: SourceId,
    pub candidates: usize,
    pub used_fallback: bool,
    /// Failure kind (`navigation_timeout`, `timed_out`, ...) when structured
    /// extraction did not succeed.
    pub failure: Option<String>,
}

/// The full result of one discovery request, before projection to bare codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryOutcome {
    /// The input URL exactly as supplied.
    pub url: String,
    pub slug: String,
    /// Ranked, distinct codes. At most three.
    pub codes: Vec<String>,
    pub confidence: Confidence,
    pub from_cache: bool,
    pub sources: Vec<SourceReport>,
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveryOutcome {
    /// Returns `true` when the codes came from a source rather than synthesis.
    #[must_use]
    pub fn is_discovered(&self) -> bool {
        self.confidence == Confidence::Discovered
    }

    /// Consumes the outcome and returns only the ranked code strings.
    #[must_use]
    pub fn into_codes(self) -> Vec<String> {
        self.codes
    }
}
