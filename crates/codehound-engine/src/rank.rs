//! Aggregation and ranking of candidates from every source run for a request.

use std::cmp::Reverse;

use codehound_core::{CouponCandidate, SourceId};

use crate::grammar::is_code_shaped;

/// Generic codes appended after the store-specific placeholder.
const GENERIC_PLACEHOLDERS: [&str; 2] = ["WELCOME10", "SAVE15"];

/// Longest store stem that still leaves room for the `10` suffix within the
/// code grammar's length limit.
const PLACEHOLDER_STEM_LEN: usize = 13;

/// Collapses candidates sharing an upper-cased code.
///
/// A verified duplicate replaces an unverified one in place; otherwise the
/// first occurrence wins.
#[must_use]
pub fn dedup_candidates(candidates: Vec<CouponCandidate>) -> Vec<CouponCandidate> {
    let mut unique: Vec<CouponCandidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let key = candidate.code.to_uppercase();
        match unique.iter_mut().find(|c| c.code.to_uppercase() == key) {
            Some(existing) if !existing.verified && candidate.verified => *existing = candidate,
            Some(_) => {}
            None => unique.push(candidate),
        }
    }
    unique
}

/// Dedups, orders and truncates candidates, returning bare codes.
///
/// Order: verified first, then higher discount, then the position of the
/// candidate's source in `priority`. Remaining ties keep encounter order.
#[must_use]
pub fn rank_candidates(
    candidates: Vec<CouponCandidate>,
    priority: &[SourceId],
    limit: usize,
) -> Vec<String> {
    let mut unique = dedup_candidates(candidates);
    unique.sort_by_key(|c| {
        let rank = priority
            .iter()
            .position(|id| *id == c.source)
            .unwrap_or(usize::MAX);
        (Reverse(c.verified), Reverse(c.discount_percent), rank)
    });
    unique
        .into_iter()
        .take(limit)
        .map(|c| c.code.to_uppercase())
        .collect()
}

/// Deterministic last-resort codes for a store: `<LABEL>10`, `WELCOME10`,
/// `SAVE15`, truncated to `limit`.
///
/// The store code is built from the label's alphanumerics and dropped if it
/// still would not satisfy the code grammar (labels shorter than two chars).
#[must_use]
pub fn placeholder_codes(label: &str, limit: usize) -> Vec<String> {
    let stem: String = label
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(PLACEHOLDER_STEM_LEN)
        .collect::<String>()
        .to_ascii_uppercase();
    let store_code = format!("{stem}10");

    is_code_shaped(&store_code)
        .then_some(store_code)
        .into_iter()
        .chain(GENERIC_PLACEHOLDERS.iter().map(|c| (*c).to_string()))
        .take(limit)
        .collect()
}

#[cfg(test)]
#[path = "rank_test.rs"]
mod tests;
