//! Dashboard statistics endpoint.
//!
//! GET /api/stats - Totals, the recent-upload count and the busiest locations.

use axum::Json;
use axum::extract::State;

use echolocator_types::stats::StatsSnapshot;

use crate::http::response::{ApiResponse, RequestTimer};
use crate::state::AppState;

/// GET /api/stats - Aggregate statistics over one consistent snapshot.
pub async fn get_stats(State(state): State<AppState>) -> Json<ApiResponse<StatsSnapshot>> {
    let timer = RequestTimer::start();
    Json(ApiResponse::success(state.gateway.stats(), &timer))
}
