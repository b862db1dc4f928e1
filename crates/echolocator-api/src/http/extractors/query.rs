//! Query parameter extractors for list and search endpoints.

use serde::Deserialize;

use echolocator_core::service::gateway::SearchRequest;

/// `?limit=` on the listing endpoints. Absent means the listing's default.
#[derive(Debug, Deserialize, Default)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// Query parameters for `GET /api/search`.
///
/// `query` is optional here so a missing parameter reaches the gateway's
/// length check and gets the same message as a too-short one.
#[derive(Debug, Deserialize, Default)]
pub struct SearchQuery {
    pub query: Option<String>,
    pub threshold: Option<f32>,
    pub top_k: Option<i64>,
    pub location: Option<String>,
}

impl From<SearchQuery> for SearchRequest {
    fn from(q: SearchQuery) -> Self {
        SearchRequest {
            query: q.query.unwrap_or_default(),
            threshold: q.threshold,
            top_k: q.top_k,
            location: q.location,
        }
    }
}
