use super::models::{CveResponse, HealthResponse, FETCH_FAILED_MESSAGE, RATE_LIMITED_MESSAGE};
use crate::enrich::CveService;
use crate::error::ByocError;
use axum::{
    extract::{rejection::PathRejection, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<CveService>,
}

impl AppState {
    pub fn new(service: CveService) -> Self {
        Self {
            service: Arc::new(service),
        }
    }
}

/// `GET /api/cve/{keyword}`. The path segment arrives percent-decoded. A segment that
/// does not decode still gets the JSON error body.
pub async fn get_cves(
    State(state): State<AppState>,
    keyword: Result<Path<String>, PathRejection>,
) -> (StatusCode, Json<CveResponse>) {
    let keyword = match keyword {
        Ok(Path(keyword)) => keyword,
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected keyword path");
            return (
                StatusCode::BAD_REQUEST,
                Json(CveResponse::error(rejection.body_text())),
            );
        }
    };

    match state.service.lookup(&keyword).await {
        Ok(lookup) => {
            tracing::info!(
                keyword = %keyword,
                results = lookup.cves.len(),
                cached = lookup.cached,
                "CVE lookup served"
            );
            (StatusCode::OK, Json(lookup.into()))
        }
        Err(ByocError::InvalidKeyword) => (
            StatusCode::BAD_REQUEST,
            Json(CveResponse::error(ByocError::InvalidKeyword.to_string())),
        ),
        Err(e) if e.is_rate_limited() => {
            tracing::warn!(keyword = %keyword, error = %e, "primary source rate limited");
            (StatusCode::OK, Json(CveResponse::error(RATE_LIMITED_MESSAGE)))
        }
        Err(e) => {
            tracing::error!(keyword = %keyword, error = %e, "CVE fetch error");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(CveResponse::error(FETCH_FAILED_MESSAGE)),
            )
        }
    }
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        cached_keywords: state.service.cache().len(),
    })
}
