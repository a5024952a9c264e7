use std::sync::LazyLock;

use async_trait::async_trait;
use codehound_core::{CouponCandidate, SourceId};

use super::reveal::reveal_code;
use super::{parse_card, CardSelectors, CouponSource, SourceSettings};
use crate::browser::PageContext;
use crate::error::AdapterError;

const CARD_CSS: &str = ".offer-card";
const REVEAL_CSS: &str = ".offer-card .reveal-code";
const CODE_HOLDER_CSS: &str = "#code, .coupon-code input, .code-text";

static CARD: LazyLock<CardSelectors> = LazyLock::new(|| {
    CardSelectors::parse(
        ".coupon-code",
        ".offer-title, h3",
        ".verified, .badge-verified",
        ".offer-expires",
        ".reveal-code",
    )
});

/// CouponFollow hides codes behind a "Show Code" button that opens the code
/// in a new tab.
#[derive(Debug, Clone)]
pub struct CouponFollow {
    settings: SourceSettings,
}

impl CouponFollow {
    #[must_use]
    pub fn new(settings: SourceSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl CouponSource for CouponFollow {
    fn id(&self) -> SourceId {
        SourceId::CouponFollow
    }

    fn uses_fallback(&self) -> bool {
        true
    }

    fn listing_url(&self, search_key: &str) -> String {
        format!("https://couponfollow.com/site/{search_key}.com")
    }

    async fn extract(
        &self,
        page: &dyn PageContext,
        search_key: &str,
    ) -> Result<Vec<CouponCandidate>, AdapterError> {
        let url = self.listing_url(search_key);
        page.goto(&url).await?;
        page.wait_for_selector(CARD_CSS, self.settings.selector_timeout)
            .await?;
        let cards: Vec<_> = page
            .outer_html(CARD_CSS, self.settings.max_cards)
            .await?
            .iter()
            .map(|html| parse_card(html, &CARD))
            .collect();

        let mut candidates = Vec::new();
        // Reveal buttons are indexed page-wide, so count only cards that have one.
        let mut reveal_index = 0;
        for card in cards {
            let button = card.has_reveal.then_some(reveal_index);
            if card.has_reveal {
                reveal_index += 1;
            }
            if !card.is_code_offer {
                continue;
            }
            if let Some(code) = card.code.clone() {
                candidates.push(card.with_code(code, self.id()));
                continue;
            }
            let Some(index) = button else {
                continue;
            };

            match reveal_code(page, REVEAL_CSS, index, CODE_HOLDER_CSS, &self.settings).await {
                Ok(Some(code)) => candidates.push(card.with_code(code, self.id())),
                Ok(None) => {
                    tracing::debug!(source = %self.id(), index, "popup held no usable code");
                }
                Err(e) => {
                    tracing::debug!(source = %self.id(), index, error = %e, "reveal skipped");
                }
            }
            tokio::time::sleep(self.settings.reveal_settle).await;
        }

        tracing::debug!(
            source = %self.id(),
            url,
            count = candidates.len(),
            "reveals finished"
        );
        Ok(candidates)
    }
}
