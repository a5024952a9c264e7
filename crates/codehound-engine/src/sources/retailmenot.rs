use std::sync::LazyLock;

use async_trait::async_trait;
use codehound_core::{CouponCandidate, SourceId};

use super::{extract_listed, CardSelectors, CouponSource, SourceSettings};
use crate::browser::PageContext;
use crate::error::AdapterError;

const CARD_CSS: &str = "[data-testid='offer-card'], .offer-card";

static CARD: LazyLock<CardSelectors> = LazyLock::new(|| {
    CardSelectors::parse(
        "[data-testid='offer-code'], .offer-code",
        "[data-testid='offer-title'], .offer-title, h3",
        "[data-testid='verified-badge'], .verified",
        "[data-testid='offer-expiration'], .offer-expiration",
        "[data-testid='show-code'], .show-code",
    )
});

/// RetailMeNot store pages list codes directly on the offer cards.
#[derive(Debug, Clone)]
pub struct RetailMeNot {
    settings: SourceSettings,
}

impl RetailMeNot {
    #[must_use]
    pub fn new(settings: SourceSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl CouponSource for RetailMeNot {
    fn id(&self) -> SourceId {
        SourceId::RetailMeNot
    }

    fn uses_fallback(&self) -> bool {
        true
    }

    fn listing_url(&self, search_key: &str) -> String {
        format!("https://www.retailmenot.com/view/{search_key}.com")
    }

    async fn extract(
        &self,
        page: &dyn PageContext,
        search_key: &str,
    ) -> Result<Vec<CouponCandidate>, AdapterError> {
        extract_listed(
            page,
            self.id(),
            &self.listing_url(search_key),
            CARD_CSS,
            &CARD,
            &self.settings,
        )
        .await
    }
}
