//! Heuristic text-pattern extraction used when a source's markup can't be read.

use codehound_core::{CandidateOrigin, CouponCandidate, SourceId};

use crate::grammar::is_code_shaped;

/// Fallback candidates kept per page.
pub const MAX_FALLBACK_CANDIDATES: usize = 3;

/// Description attached to every fallback candidate.
pub const FALLBACK_DESCRIPTION: &str = "Matched in page text (unverified)";

/// Scans visible text nodes for code-shaped tokens.
///
/// Each node's trimmed text is tested as a whole; repeats collapse to their
/// first occurrence. Never fails: an unreadable page simply yields nothing.
#[must_use]
pub fn extract_fallback_candidates<S: AsRef<str>>(
    source: SourceId,
    text_nodes: &[S],
) -> Vec<CouponCandidate> {
    let mut candidates: Vec<CouponCandidate> = Vec::new();

    for node in text_nodes {
        let text = node.as_ref().trim();
        if !is_code_shaped(text) || candidates.iter().any(|c| c.code == text) {
            continue;
        }
        candidates.push(CouponCandidate {
            code: text.to_string(),
            description: FALLBACK_DESCRIPTION.to_string(),
            source,
            verified: false,
            discount_percent: 0,
            expiry: None,
            origin: CandidateOrigin::Fallback,
        });
        if candidates.len() == MAX_FALLBACK_CANDIDATES {
            break;
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_code_shaped_nodes_only() {
        let nodes = [
            "Top Coupons for Example",
            "  SAVE15  ",
            "Free shipping on orders over $50",
            "DOCTYPE",
            "10OFF",
        ];
        let found = extract_fallback_candidates(SourceId::RetailMeNot, &nodes);
        let codes: Vec<&str> = found.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["SAVE15", "10OFF"]);
    }

    #[test]
    fn caps_at_three_and_collapses_repeats() {
        let nodes = ["SAVE10", "SAVE10", "WELCOME5", "NEW20", "EXTRA30"];
        let found = extract_fallback_candidates(SourceId::CouponFollow, &nodes);
        let codes: Vec<&str> = found.iter().map(|c| c.code.as_str()).collect();
        assert_eq!(codes, ["SAVE10", "WELCOME5", "NEW20"]);
    }

    #[test]
    fn fallback_candidates_carry_low_confidence_metadata() {
        let found = extract_fallback_candidates(SourceId::RetailMeNot, &["SPRING25"]);
        assert_eq!(found.len(), 1);
        let candidate = &found[0];
        assert_eq!(candidate.description, FALLBACK_DESCRIPTION);
        assert!(!candidate.verified);
        assert_eq!(candidate.discount_percent, 0);
        assert_eq!(candidate.expiry, None);
        assert_eq!(candidate.origin, CandidateOrigin::Fallback);
        assert_eq!(candidate.source, SourceId::RetailMeNot);
    }

    #[test]
    fn empty_page_yields_nothing() {
        let nodes: [&str; 0] = [];
        assert!(extract_fallback_candidates(SourceId::Dealspotr, &nodes).is_empty());
    }
}
