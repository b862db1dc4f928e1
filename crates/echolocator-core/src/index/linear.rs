//! Exact linear-scan similarity index.

use std::cmp::Ordering;
use std::sync::Arc;

use echolocator_types::error::EngineError;
use echolocator_types::item::ScoredItem;
use echolocator_types::search::{SimilarityMapping, SimilarityQuery};

use super::SimilarityIndex;
use crate::store::{ItemStore, StoreSnapshot};

/// Scans every item of a store snapshot and ranks by mapped cosine similarity.
#[derive(Debug, Clone)]
pub struct LinearScanIndex {
    store: Arc<ItemStore>,
    mapping: SimilarityMapping,
}

impl LinearScanIndex {
    pub fn new(store: Arc<ItemStore>, mapping: SimilarityMapping) -> Self {
        Self { store, mapping }
    }

    pub fn mapping(&self) -> SimilarityMapping {
        self.mapping
    }

    /// Run `query` against an already-acquired snapshot.
    pub fn search_snapshot(
        &self,
        snapshot: &StoreSnapshot,
        query: &SimilarityQuery<'_>,
    ) -> Result<Vec<ScoredItem>, EngineError> {
        self.validate(query)?;

        let location = query.location.map(str::trim);
        let query_norm = squared_norm(query.vector);

        let mut hits: Vec<ScoredItem> = snapshot
            .iter()
            .filter(|item| location.is_none_or(|loc| same_location(&item.location, loc)))
            .filter_map(|item| {
                let cosine = cosine_with_norm(query.vector, query_norm, &item.embedding);
                let similarity = self.mapping.apply(cosine);
                (similarity >= query.threshold).then(|| ScoredItem {
                    item: Arc::clone(item),
                    similarity,
                })
            })
            .collect();

        if hits.len() > query.top_k {
            hits.select_nth_unstable_by(query.top_k - 1, rank_order);
            hits.truncate(query.top_k);
        }
        hits.sort_unstable_by(rank_order);

        tracing::debug!(
            candidates = snapshot.len(),
            returned = hits.len(),
            threshold = query.threshold,
            top_k = query.top_k,
            "similarity scan complete"
        );
        Ok(hits)
    }

    fn validate(&self, query: &SimilarityQuery<'_>) -> Result<(), EngineError> {
        if query.top_k == 0 {
            return Err(EngineError::validation("top_k must be at least 1"));
        }
        if !(0.0..=1.0).contains(&query.threshold) {
            return Err(EngineError::validation(format!(
                "threshold must be within [0, 1], got {}",
                query.threshold
            )));
        }
        let dimension = self.store.dimension();
        if query.vector.len() != dimension {
            return Err(EngineError::validation(format!(
                "query vector has {} dimensions, expected {dimension}",
                query.vector.len()
            )));
        }
        if query.vector.iter().any(|v| !v.is_finite()) || squared_norm(query.vector) == 0.0 {
            return Err(EngineError::validation("query vector must be finite and non-zero"));
        }
        Ok(())
    }
}

impl SimilarityIndex for LinearScanIndex {
    fn search(&self, query: &SimilarityQuery<'_>) -> Result<Vec<ScoredItem>, EngineError> {
        let snapshot = self.store.snapshot();
        self.search_snapshot(&snapshot, query)
    }
}

/// Highest similarity first; newer items first on ties, then higher ids.
fn rank_order(a: &ScoredItem, b: &ScoredItem) -> Ordering {
    b.similarity
        .total_cmp(&a.similarity)
        .then_with(|| b.item.created_at.cmp(&a.item.created_at))
        .then_with(|| b.item.id.cmp(&a.item.id))
}

/// Trimmed, Unicode case-insensitive equality.
fn same_location(stored: &str, wanted: &str) -> bool {
    stored
        .trim()
        .chars()
        .flat_map(char::to_lowercase)
        .eq(wanted.chars().flat_map(char::to_lowercase))
}

fn squared_norm(v: &[f32]) -> f64 {
    v.iter().map(|x| f64::from(*x) * f64::from(*x)).sum()
}

/// Cosine similarity accumulated in f64. Identical vectors score exactly 1.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    cosine_with_norm(a, squared_norm(a), b)
}

fn cosine_with_norm(a: &[f32], a_norm: f64, b: &[f32]) -> f32 {
    let b_norm = squared_norm(b);
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let dot: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum();
    (dot / (a_norm * b_norm).sqrt()).clamp(-1.0, 1.0) as f32
}
