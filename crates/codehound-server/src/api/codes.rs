use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Query, State,
    },
    Extension, Json,
};
use codehound_core::{Confidence, DiscoveryOutcome};
use codehound_engine::DiscoveryError;
use serde::{Deserialize, Serialize};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};
use crate::middleware::RequestId;

#[derive(Debug, Deserialize)]
pub(super) struct CodesRequest {
    url: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub(super) struct CodesData {
    pub codes: Vec<String>,
    pub confidence: Confidence,
    pub cached: bool,
}

impl From<DiscoveryOutcome> for CodesData {
    fn from(outcome: DiscoveryOutcome) -> Self {
        Self {
            codes: outcome.codes,
            confidence: outcome.confidence,
            cached: outcome.from_cache,
        }
    }
}

pub(super) async fn post_codes(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Result<Json<CodesRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CodesData>>, ApiError> {
    let Json(body) = body.map_err(|rejection| bad_request(&req_id, &rejection.body_text()))?;
    discover(&state, req_id, body.url).await
}

pub(super) async fn get_codes(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    query: Result<Query<CodesRequest>, QueryRejection>,
) -> Result<Json<ApiResponse<CodesData>>, ApiError> {
    let Query(query) = query.map_err(|rejection| bad_request(&req_id, &rejection.body_text()))?;
    discover(&state, req_id, query.url).await
}

fn bad_request(req_id: &RequestId, message: &str) -> ApiError {
    tracing::debug!(message, "rejected malformed codes request");
    ApiError::new(req_id.0.clone(), "bad_request", message)
}

/// Runs discovery on its own task so a dropped connection cannot abandon a
/// browser session halfway through.
async fn discover(
    state: &AppState,
    req_id: RequestId,
    url: String,
) -> Result<Json<ApiResponse<CodesData>>, ApiError> {
    let discoverer = Arc::clone(&state.discoverer);
    let task = tokio::spawn(async move { discoverer.discover(&url).await });

    match task.await {
        Ok(Ok(outcome)) => Ok(Json(ApiResponse {
            data: CodesData::from(outcome),
            meta: ResponseMeta::new(req_id.0),
        })),
        Ok(Err(e)) => Err(map_discovery_error(req_id.0, &e)),
        Err(e) => {
            tracing::error!(error = %e, "discovery task failed");
            Err(ApiError::new(req_id.0, "internal_error", "discovery failed"))
        }
    }
}

fn map_discovery_error(request_id: String, error: &DiscoveryError) -> ApiError {
    match error {
        DiscoveryError::InvalidUrl { .. } => {
            tracing::debug!(error = %error, "rejected discovery request");
        }
        DiscoveryError::BrowserLaunch(_) => {
            tracing::error!(error = %error, "browser unavailable");
        }
    }
    ApiError::new(request_id, error.kind(), error.to_string())
}
