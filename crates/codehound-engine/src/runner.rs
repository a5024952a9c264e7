//! One adapter invocation: open a page, extract under a budget, fall back to
//! text matching if allowed, close the page and any popups it opened.

use std::time::Duration;

use codehound_core::{CouponCandidate, SourceReport};
use tokio::time::Instant;

use crate::browser::{millis, BrowserSession, PageScope};
use crate::error::AdapterError;
use crate::fallback::extract_fallback_candidates;
use crate::sources::CouponSource;

/// Upper bound on reading page text for the fallback extractor.
const FALLBACK_READ_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub(crate) struct RunLimits {
    pub adapter_timeout: Duration,
    pub request_deadline: Instant,
    pub fallback_enabled: bool,
}

#[derive(Debug)]
pub(crate) struct SourceRun {
    pub candidates: Vec<CouponCandidate>,
    pub report: SourceReport,
}

/// Runs `source` against a fresh page from `session`.
///
/// Never fails: every error becomes an empty contribution plus a failure
/// kind in the report. The page and every popup opened from it are closed
/// before this returns.
pub(crate) async fn run_source(
    session: &dyn BrowserSession,
    source: &dyn CouponSource,
    search_key: &str,
    limits: RunLimits,
) -> SourceRun {
    let id = source.id();
    let page = match tokio::time::timeout_at(limits.request_deadline, session.open_page()).await {
        Ok(Ok(page)) => page,
        Ok(Err(e)) => {
            let err = AdapterError::from(e);
            tracing::warn!(source = %id, error = %err, "could not open page");
            return SourceRun::failed(source, &err);
        }
        Err(_) => return SourceRun::failed(source, &AdapterError::Cancelled),
    };

    let budget_end = Instant::now() + limits.adapter_timeout;
    let deadline = budget_end.min(limits.request_deadline);
    let scope = PageScope::default();
    let scoped = scope.track(page.as_ref());
    let extract = source.extract(&scoped, search_key);
    let structured = match tokio::time::timeout_at(deadline, extract).await {
        Ok(result) => result,
        Err(_) if budget_end <= limits.request_deadline => Err(AdapterError::TimedOut {
            budget_ms: millis(limits.adapter_timeout),
        }),
        Err(_) => Err(AdapterError::Cancelled),
    };
    // Popups the adapter was still holding when its future was dropped.
    let popups = scope.close_popups().await;
    if popups > 0 {
        tracing::debug!(source = %id, popups, "reveal popups closed");
    }

    let (candidates, failure) = match structured {
        Ok(candidates) => (candidates, None),
        Err(e) => {
            tracing::warn!(source = %id, key = search_key, kind = e.kind(), error = %e, "structured extraction failed");
            (Vec::new(), Some(e.kind().to_string()))
        }
    };

    let mut used_fallback = false;
    let candidates = if candidates.is_empty()
        && limits.fallback_enabled
        && source.uses_fallback()
        && Instant::now() < limits.request_deadline
    {
        used_fallback = true;
        let read_by = (Instant::now() + FALLBACK_READ_TIMEOUT).min(limits.request_deadline);
        match tokio::time::timeout_at(read_by, page.visible_text()).await {
            Ok(Ok(nodes)) => extract_fallback_candidates(id, &nodes),
            Ok(Err(e)) => {
                tracing::debug!(source = %id, error = %e, "fallback text read failed");
                Vec::new()
            }
            Err(_) => {
                tracing::debug!(source = %id, "fallback text read timed out");
                Vec::new()
            }
        }
    } else {
        candidates
    };

    page.close().await;

    tracing::debug!(
        source = %id,
        key = search_key,
        count = candidates.len(),
        used_fallback,
        "source finished"
    );

    SourceRun {
        report: SourceReport {
            source: id,
            candidates: candidates.len(),
            used_fallback,
            failure,
        },
        candidates,
    }
}

impl SourceRun {
    fn failed(source: &dyn CouponSource, err: &AdapterError) -> Self {
        Self {
            candidates: Vec::new(),
            report: SourceReport {
                source: source.id(),
                candidates: 0,
                used_fallback: false,
                failure: Some(err.kind().to_string()),
            },
        }
    }
}
