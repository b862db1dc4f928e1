//! Text search endpoint.
//!
//! GET /api/search - Rank stored items against a natural-language query.

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};

use echolocator_core::service::gateway::SearchResults;

use crate::http::error::AppError;
use crate::http::extractors::query::SearchQuery;
use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// GET /api/search?query=&threshold=&top_k=&location=
///
/// Threshold and top_k are normalized by the gateway; the applied values
/// come back in the payload.
pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<SearchResults>>, AppError> {
    let timer = RequestTimer::start();
    let Query(query) = query.map_err(|e| AppError::validation(e.body_text()))?;

    let results = state.gateway.search_text(query.into()).await?;
    tracing::debug!(count = results.count, elapsed_ms = timer.elapsed_ms(), "search served");

    Ok(Json(ApiResponse::success(results, &timer)))
}
