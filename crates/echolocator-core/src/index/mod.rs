//! Similarity index: ranked nearest-neighbour queries over the item store.
//!
//! The trait takes only `(vector, threshold, top_k, location)` and returns
//! ranked matches, so an approximate structure can replace the linear scan
//! without touching callers.

pub mod linear;

use echolocator_types::error::EngineError;
use echolocator_types::item::ScoredItem;
use echolocator_types::search::SimilarityQuery;

pub use linear::LinearScanIndex;

/// Ranked similarity search.
///
/// Results are sorted by similarity descending, then `created_at`
/// descending, then `id` descending, and never exceed `query.top_k`.
pub trait SimilarityIndex: Send + Sync {
    fn search(&self, query: &SimilarityQuery<'_>) -> Result<Vec<ScoredItem>, EngineError>;
}
