use std::sync::LazyLock;

use async_trait::async_trait;
use codehound_core::{CouponCandidate, SourceId};

use super::{extract_listed, CardSelectors, CouponSource, SourceSettings};
use crate::browser::PageContext;
use crate::error::AdapterError;

const CARD_CSS: &str = ".promoblock";

static CARD: LazyLock<CardSelectors> = LazyLock::new(|| {
    CardSelectors::parse(
        ".promoblock--code, .promocode--text",
        ".promoblock--title, .title",
        ".promoblock--verified, .verified",
        ".promoblock--expires",
        ".promocode",
    )
});

/// Dealspotr exposes codes in its promo blocks. Its pages are noisy with
/// community content, so the text fallback is not used here.
#[derive(Debug, Clone)]
pub struct Dealspotr {
    settings: SourceSettings,
}

impl Dealspotr {
    #[must_use]
    pub fn new(settings: SourceSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl CouponSource for Dealspotr {
    fn id(&self) -> SourceId {
        SourceId::Dealspotr
    }

    fn uses_fallback(&self) -> bool {
        false
    }

    fn listing_url(&self, search_key: &str) -> String {
        format!("https://dealspotr.com/promo-codes/{search_key}.com")
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
