//! Site adapters: one per coupon aggregator.
//!
//! Each adapter turns a live page plus a store search key into candidates.
//! Adapters only propagate errors; the runner decides what a failure means
//! for the request (fallback, zero candidates, a note in the report).

mod card;
mod couponfollow;
mod dealspotr;
mod retailmenot;
mod reveal;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use codehound_core::{AppConfig, CouponCandidate, SourceId};

use crate::browser::PageContext;
use crate::error::AdapterError;

use card::{parse_card, CardSelectors};

pub use couponfollow::CouponFollow;
pub use dealspotr::Dealspotr;
pub use retailmenot::RetailMeNot;

/// Cards read per listing page.
pub const MAX_CARDS: usize = 5;

/// Pause between reveal interactions so the source does not throttle us.
pub const REVEAL_SETTLE: Duration = Duration::from_millis(500);

/// Extraction capability shared by every source.
#[async_trait]
pub trait CouponSource: Send + Sync {
    fn id(&self) -> SourceId;

    /// Whether the text-pattern fallback may run on this source's page when
    /// structured extraction yields nothing.
    fn uses_fallback(&self) -> bool;

    /// The listing page for `search_key`.
    fn listing_url(&self, search_key: &str) -> String;

    /// Navigates `page` to the listing for `search_key` and reads its offers.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError`] on navigation timeouts, missing card
    /// selectors, or browser failures. Individual reveal failures are
    /// absorbed and only skip that card.
    async fn extract(
        &self,
        page: &dyn PageContext,
        search_key: &str,
    ) -> Result<Vec<CouponCandidate>, AdapterError>;
}

/// Timing knobs shared by all adapters.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Wait for the listing's card selector.
    pub selector_timeout: Duration,
    /// Wait for a reveal popup and for its code holder.
    pub popup_timeout: Duration,
    pub reveal_settle: Duration,
    pub max_cards: usize,
}

impl SourceSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            selector_timeout: Duration::from_secs(config.selector_timeout_secs),
            popup_timeout: Duration::from_secs(config.popup_timeout_secs),
            ..Self::default()
        }
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            selector_timeout: Duration::from_secs(12),
            popup_timeout: Duration::from_secs(8),
            reveal_settle: REVEAL_SETTLE,
            max_cards: MAX_CARDS,
        }
    }
}

/// Instantiates the adapters for `ids`, preserving order.
#[must_use]
pub fn build_sources(ids: &[SourceId], settings: &SourceSettings) -> Vec<Arc<dyn CouponSource>> {
    ids.iter()
        .map(|id| -> Arc<dyn CouponSource> {
            match id {
                SourceId::RetailMeNot => Arc::new(RetailMeNot::new(settings.clone())),
                SourceId::CouponFollow => Arc::new(CouponFollow::new(settings.clone())),
                SourceId::Dealspotr => Arc::new(Dealspotr::new(settings.clone())),
            }
        })
        .collect()
}

/// Direct-DOM extraction: load the listing, wait for cards, parse the first
/// few. Cards without a visible code are skipped.
async fn extract_listed(
    page: &dyn PageContext,
    source: SourceId,
    listing_url: &str,
    card_css: &str,
    selectors: &CardSelectors,
    settings: &SourceSettings,
) -> Result<Vec<CouponCandidate>, AdapterError> {
    page.goto(listing_url).await?;
    page.wait_for_selector(card_css, settings.selector_timeout)
        .await?;
    let cards = page.outer_html(card_css, settings.max_cards).await?;

    let candidates: Vec<CouponCandidate> = cards
        .iter()
        .filter_map(|html| parse_card(html, selectors).into_candidate(source))
        .collect();

    tracing::debug!(
        source = %source,
        url = listing_url,
        cards = cards.len(),
        count = candidates.len(),
        "listing parsed"
    );
    Ok(candidates)
}
