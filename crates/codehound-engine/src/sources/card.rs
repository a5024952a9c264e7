//! Offer-card parsing over captured outer HTML.
//!
//! Adapters pull each card's markup out of the live page in one round trip
//! and parse it here, so every markup rule is testable against fixtures.

use std::sync::LazyLock;

use codehound_core::{CandidateOrigin, CouponCandidate, SourceId};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::grammar::normalize_code;

/// Attributes aggregators use to stash the code on a card or its button.
const CODE_ATTRS: [&str; 3] = ["data-code", "data-clipboard-text", "data-coupon-code"];

const OFFER_TYPE_ATTRS: [&str; 2] = ["data-offer-type", "data-type"];

static DISCOUNT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3})\s*%").expect("valid regex"));

static EXPIRY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:expires?|ends?):?\s+(?:on\s+)?([A-Za-z0-9/,. -]*\d)").expect("valid regex")
});

/// Per-source CSS selectors, evaluated relative to one card.
pub(crate) struct CardSelectors {
    pub code: Selector,
    pub description: Selector,
    pub verified: Selector,
    pub expiry: Selector,
    /// Present only on cards that hide a code (e.g. a "Show Code" button).
    pub code_indicator: Selector,
}

impl CardSelectors {
    /// Builds selectors from literals. Panics on invalid CSS, so only call
    /// this from a `LazyLock` initializer with constant input.
    pub(crate) fn parse(
        code: &str,
        description: &str,
        verified: &str,
        expiry: &str,
        code_indicator: &str,
    ) -> Self {
        let parse = |css: &str| Selector::parse(css).expect("valid selector");
        Self {
            code: parse(code),
            description: parse(description),
            verified: parse(verified),
            expiry: parse(expiry),
            code_indicator: parse(code_indicator),
        }
    }
}

/// What one offer card says about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedCard {
    /// Normalized code, if the card exposes one that fits the grammar.
    pub code: Option<String>,
    pub description: String,
    pub verified: bool,
    pub discount_percent: u8,
    pub expiry: Option<String>,
    /// `false` for deal/sale cards that never carry a code.
    pub is_code_offer: bool,
    /// The card has a control that reveals a hidden code.
    pub has_reveal: bool,
}

impl ParsedCard {
    /// Candidate from the card's own code. `None` for deals or cards whose
    /// code is hidden or malformed.
    pub(crate) fn into_candidate(self, source: SourceId) -> Option<CouponCandidate> {
        if !self.is_code_offer {
            return None;
        }
        let code = self.code.clone()?;
        Some(self.with_code(code, source))
    }

    /// Candidate carrying this card's metadata and a code obtained elsewhere
    /// (a reveal popup).
    pub(crate) fn with_code(self, code: String, source: SourceId) -> CouponCandidate {
        CouponCandidate {
            code,
            description: self.description,
            source,
            verified: self.verified,
            discount_percent: self.discount_percent,
            expiry: self.expiry,
            origin: CandidateOrigin::Structured,
        }
    }
}

pub(crate) fn parse_card(html: &str, selectors: &CardSelectors) -> ParsedCard {
    let fragment = Html::parse_fragment(html);
    let root = fragment.root_element();
    let card = root.children().find_map(ElementRef::wrap).unwrap_or(root);

    let code = code_from_attrs(card)
        .or_else(|| first_text(card, &selectors.code))
        .and_then(|raw| normalize_code(&raw));

    let description = first_text(card, &selectors.description).unwrap_or_default();

    let verified = card.value().attr("data-verified") == Some("true")
        || card.select(&selectors.verified).next().is_some();

    let discount_percent = DISCOUNT_RE
        .captures(&description)
        .and_then(|caps| caps[1].parse::<u16>().ok())
        .map_or(0, |pct| u8::try_from(pct.min(100)).unwrap_or(100));

    let expiry = first_text(card, &selectors.expiry).or_else(|| {
        let text = collapse(card.text());
        EXPIRY_RE
            .captures(&text)
            .map(|caps| caps[1].trim().to_string())
    });

    let offer_type = OFFER_TYPE_ATTRS
        .iter()
        .find_map(|attr| card.value().attr(attr))
        .map(|t| t.trim().to_ascii_lowercase());
    let has_reveal = card.select(&selectors.code_indicator).next().is_some();
    let is_code_offer = match offer_type.as_deref() {
        Some("deal" | "sale") => false,
        Some("code" | "coupon") => true,
        _ => code.is_some() || has_reveal,
    };

    ParsedCard {
        code,
        description,
        verified,
        discount_percent,
        expiry,
        is_code_offer,
        has_reveal,
    }
}

fn code_from_attrs(card: ElementRef<'_>) -> Option<String> {
    std::iter::once(card)
        .chain(card.descendants().filter_map(ElementRef::wrap))
        .find_map(|el| {
            CODE_ATTRS
                .iter()
                .find_map(|attr| el.value().attr(attr))
                .filter(|v| !v.trim().is_empty())
                .map(str::to_string)
        })
}

fn first_text(card: ElementRef<'_>, selector: &Selector) -> Option<String> {
    card.select(selector)
        .map(|el| collapse(el.text()))
        .find(|text| !text.is_empty())
}

fn collapse<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
