//! Query gateway: the boundary between callers and the engine.
//!
//! Normalizes request parameters, dispatches to the store, index, stats
//! aggregator and ingestion pipeline, and is the only place an
//! [`EngineError`] becomes a boundary-facing [`GatewayError`].

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use echolocator_types::config::{EngineConfig, ListingConfig, SearchConfig};
use echolocator_types::error::{EngineError, ErrorKind};
use echolocator_types::item::{ItemId, ItemSubmission, ItemView, ScoredItem, SearchHit};
use echolocator_types::search::SimilarityQuery;
use echolocator_types::stats::StatsSnapshot;

use crate::embedding::box_embedder::BoxEmbedder;
use crate::embedding::embed_checked;
use crate::embedding::embedder::EmbedInput;
use crate::index::{LinearScanIndex, SimilarityIndex};
use crate::ingest::{IngestionPipeline, RetryPolicy};
use crate::service::hash::ContentHasher;
use crate::stats::StatsAggregator;
use crate::storage::asset_store::AssetStore;
use crate::store::ItemStore;

/// URL prefix under which stored images are served.
pub const ASSET_URL_PREFIX: &str = "/uploads";

/// Boundary-facing error: a category and a message safe to show callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct GatewayError {
    pub kind: ErrorKind,
    pub message: String,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }
}

/// A text search as received from a caller. Every field but `query` is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    pub threshold: Option<f32>,
    pub top_k: Option<i64>,
    pub location: Option<String>,
}

/// Ranked search results with the parameters actually applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub query: String,
    pub threshold: f32,
    pub count: usize,
    pub results: Vec<SearchHit>,
}

/// Which listing a limit applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Recent,
    All,
}

/// The engine's single entry point for every external operation.
pub struct QueryGateway<A: AssetStore + 'static, H: ContentHasher> {
    store: Arc<ItemStore>,
    index: Box<dyn SimilarityIndex>,
    stats: StatsAggregator,
    pipeline: IngestionPipeline<A, H>,
    embedder: Arc<BoxEmbedder>,
    search: SearchConfig,
    listing: ListingConfig,
    embed_timeout: Duration,
}

impl<A: AssetStore + 'static, H: ContentHasher> QueryGateway<A, H> {
    /// Wire the engine components over an opened store.
    pub fn new(
        store: Arc<ItemStore>,
        embedder: Arc<BoxEmbedder>,
        assets: Arc<A>,
        hasher: H,
        config: &EngineConfig,
    ) -> Self {
        let index = LinearScanIndex::new(Arc::clone(&store), config.search.similarity_mapping());
        let stats = StatsAggregator::new(Arc::clone(&store), &config.stats);
        let pipeline = IngestionPipeline::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            assets,
            hasher,
            config.ingest.clone(),
            RetryPolicy::from_config(&config.retry),
        );

        Self {
            store,
            index: Box::new(index),
            stats,
            pipeline,
            embedder,
            search: config.search.clone(),
            listing: config.listing.clone(),
            embed_timeout: Duration::from_secs(config.ingest.embed_timeout_secs),
        }
    }

    /// Replace the similarity index implementation.
    pub fn with_index(mut self, index: Box<dyn SimilarityIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn store(&self) -> &Arc<ItemStore> {
        &self.store
    }

    pub fn embedder(&self) -> &BoxEmbedder {
        &self.embedder
    }

    pub async fn ingest(&self, submission: ItemSubmission) -> Result<ItemView, GatewayError> {
        self.pipeline
            .ingest(submission)
            .await
            .map(|item| ItemView::from_item(&item, ASSET_URL_PREFIX))
            .map_err(|e| translate("ingest", "Failed to store item.", e))
    }

    /// Embed `request.query` as text and rank items against it.
    #[tracing::instrument(
        name = "search_text",
        skip(self, request),
        fields(query_chars = request.query.len(), location = ?request.location)
    )]
    pub async fn search_text(&self, request: SearchRequest) -> Result<SearchResults, GatewayError> {
        let query = request.query.trim().to_lowercase();
        if query.chars().count() < self.search.min_query_chars {
            return Err(GatewayError::validation(format!(
                "Query must be at least {} characters.",
                self.search.min_query_chars
            )));
        }
        let threshold = self.normalize_threshold(request.threshold);
        let top_k = self.normalize_top_k(request.top_k)?;
        let location = normalize_location(request.location.as_deref());

        let vector = embed_checked(
            &self.embedder,
            EmbedInput::Text(&query),
            self.embed_timeout,
            self.store.dimension(),
        )
        .await
        .map_err(|e| translate("search", "Search failed.", e.into()))?;

        let results = self.rank(&vector, threshold, top_k, location)?;
        Ok(SearchResults {
            query,
            threshold,
            count: results.len(),
            results,
        })
    }

    /// Rank items against a caller-supplied vector.
    pub fn search_vector(
        &self,
        vector: &[f32],
        threshold: Option<f32>,
        top_k: Option<i64>,
        location: Option<&str>,
    ) -> Result<Vec<SearchHit>, GatewayError> {
        let threshold = self.normalize_threshold(threshold);
        let top_k = self.normalize_top_k(top_k)?;
        self.rank(vector, threshold, top_k, normalize_location(location))
    }

    /// Newest items first, capped at the listing's maximum.
    pub fn list(&self, listing: Listing, limit: Option<i64>) -> Result<Vec<ItemView>, GatewayError> {
        let (default, max) = match listing {
            Listing::Recent => (self.listing.recent_default, self.listing.recent_max),
            Listing::All => (self.listing.list_default, self.listing.list_max),
        };
        let limit = match limit {
            None => default,
            Some(n) if n < 1 => return Err(GatewayError::validation("limit must be at least 1.")),
            Some(n) => usize::try_from(n).unwrap_or(usize::MAX).min(max),
        };
        Ok(self
            .store
            .list_recent(limit)
            .iter()
            .map(|item| ItemView::from_item(item, ASSET_URL_PREFIX))
            .collect())
    }

    pub fn get_item(&self, id: ItemId) -> Result<ItemView, GatewayError> {
        self.store
            .get_item(id)
            .map(|item| ItemView::from_item(&item, ASSET_URL_PREFIX))
            .map_err(|e| translate("get_item", "Failed to load item.", e))
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.compute()
    }

    /// Remove stored images no visible item references.
    pub async fn reconcile_assets(&self) -> Result<usize, GatewayError> {
        self.pipeline
            .reconcile_assets()
            .await
            .map_err(|e| translate("reconcile", "Failed to reconcile stored images.", e))
    }

    fn rank(
        &self,
        vector: &[f32],
        threshold: f32,
        top_k: usize,
        location: Option<&str>,
    ) -> Result<Vec<SearchHit>, GatewayError> {
        let query = SimilarityQuery {
            vector,
            threshold,
            top_k,
            location,
        };
        let hits = self
            .index
            .search(&query)
            .map_err(|e| translate("search", "Search failed.", e))?;
        Ok(hits.iter().map(to_hit).collect())
    }

    /// Missing or NaN falls back to the configured default; anything else is
    /// clamped into `[0, 1]`.
    fn normalize_threshold(&self, threshold: Option<f32>) -> f32 {
        match threshold {
            Some(t) if !t.is_nan() => t.clamp(0.0, 1.0),
            _ => self.search.default_threshold.clamp(0.0, 1.0),
        }
    }

    fn normalize_top_k(&self, top_k: Option<i64>) -> Result<usize, GatewayError> {
        match top_k {
            None => Ok(self.search.default_top_k.clamp(1, self.search.max_top_k.max(1))),
            Some(k) if k < 1 => Err(GatewayError::validation("top_k must be at least 1.")),
            Some(k) => Ok(usize::try_from(k)
                .unwrap_or(usize::MAX)
                .min(self.search.max_top_k.max(1))),
        }
    }
}

fn normalize_location(location: Option<&str>) -> Option<&str> {
    location.map(str::trim).filter(|l| !l.is_empty())
}

fn to_hit(scored: &ScoredItem) -> SearchHit {
    SearchHit {
        item: ItemView::from_item(&scored.item, ASSET_URL_PREFIX),
        similarity: round_similarity(scored.similarity),
    }
}

/// Four decimal places, for presentation only.
fn round_similarity(similarity: f32) -> f64 {
    (f64::from(similarity) * 10_000.0).round() / 10_000.0
}

/// Convert an engine failure into its boundary form.
///
/// Validation messages are meant for callers and pass through. Everything
/// else is logged here and replaced with `public_message`.
fn translate(operation: &'static str, public_message: &str, err: EngineError) -> GatewayError {
    let kind = err.kind();
    match err {
        EngineError::Validation(message) => GatewayError::new(kind, message),
        EngineError::NotFound(what) => {
            tracing::debug!(operation, what = %what, "not found");
            GatewayError::new(kind, "Item not found.")
        }
        other => {
            tracing::error!(operation, kind = %kind, error = %other, "operation failed");
            GatewayError::new(kind, public_message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::box_item::BoxItemRepository;
    use crate::repository::ephemeral::EphemeralItemRepository;
    use crate::testing::{ByteSumHasher, DIM, FailingEmbedder, MemoryAssetStore, StubEmbedder};
    use echolocator_types::error::EmbeddingError;

    type TestGateway = QueryGateway<MemoryAssetStore, ByteSumHasher>;

    async fn gateway_with(embedder: BoxEmbedder, config: EngineConfig) -> TestGateway {
        let store = Arc::new(
            ItemStore::open(BoxItemRepository::new(EphemeralItemRepository::new()), DIM)
                .await
                .unwrap(),
        );
        QueryGateway::new(
            store,
            Arc::new(embedder),
            Arc::new(MemoryAssetStore::default()),
            ByteSumHasher,
            &config,
        )
    }

    async fn gateway() -> TestGateway {
        gateway_with(BoxEmbedder::new(StubEmbedder), EngineConfig::default()).await
    }

    fn submission(title: &str, location: &str, image: &[u8]) -> ItemSubmission {
        ItemSubmission {
            title: title.to_string(),
            location: location.to_string(),
            description: None,
            finder_contact: None,
            content_type: "image/png".to_string(),
            image: image.to_vec(),
        }
    }

    fn search(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.to_string(),
            ..SearchRequest::default()
        }
    }

    #[tokio::test]
    async fn test_ingest_then_text_search_finds_item() {
        let gw = gateway().await;
        let view = gw
            .ingest(submission("Water Bottle", "Library", b"water bottle"))
            .await
            .unwrap();
        assert_eq!(view.id, ItemId(1));
        assert!(view.image_url.starts_with("/uploads/"));

        let results = gw.search_text(search("  Water Bottle ")).await.unwrap();
        assert_eq!(results.query, "water bottle");
        assert_eq!(results.count, 1);
        assert_eq!(results.results[0].item.title, "Water Bottle");
        assert_eq!(results.results[0].similarity, 1.0);
        assert!((results.threshold - 0.6).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_short_query_rejected() {
        let gw = gateway().await;
        let err = gw.search_text(search(" a ")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
        assert_eq!(err.message, "Query must be at least 2 characters.");
    }

    #[tokio::test]
    async fn test_top_k_normalization() {
        let gw = gateway().await;
        assert_eq!(gw.normalize_top_k(None).unwrap(), 10);
        assert_eq!(gw.normalize_top_k(Some(500)).unwrap(), 50);
        assert_eq!(gw.normalize_top_k(Some(3)).unwrap(), 3);
        for bad in [0, -4] {
            assert_eq!(gw.normalize_top_k(Some(bad)).unwrap_err().kind, ErrorKind::Validation);
        }
    }

    #[tokio::test]
    async fn test_threshold_normalization() {
        let gw = gateway().await;
        assert_eq!(gw.normalize_threshold(Some(1.7)), 1.0);
        assert_eq!(gw.normalize_threshold(Some(-0.2)), 0.0);
        assert_eq!(gw.normalize_threshold(Some(0.25)), 0.25);
        assert!((gw.normalize_threshold(Some(f32::NAN)) - 0.6).abs() < f32::EPSILON);
        assert!((gw.normalize_threshold(None) - 0.6).abs() < f32::EPSILON);
    }

    #[tokio::test]
    async fn test_search_embedding_failure_is_an_error_not_empty() {
        let embedder = Arc::new(FailingEmbedder::new(
            1,
            EmbeddingError::Unavailable("model offline".to_string()),
        ));
        let gw = gateway_with(BoxEmbedder::new(embedder), EngineConfig::default()).await;

        let err = gw.search_text(search("blue backpack")).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Embedding);
        assert_eq!(err.message, "Search failed.");
    }

    #[tokio::test]
    async fn test_ingest_embedding_failure_keeps_listing_and_stats() {
        let embedder = Arc::new(FailingEmbedder::new(
            u32::MAX,
            EmbeddingError::Rejected("undecodable image".to_string()),
        ));
        let gw = gateway_with(BoxEmbedder::new(embedder), EngineConfig::default()).await;

        let err = gw
            .ingest(submission("Keys", "Library", b"keys"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Embedding);
        assert_eq!(err.message, "Failed to store item.");
        assert!(gw.list(Listing::Recent, None).unwrap().is_empty());
        assert_eq!(gw.stats().total_items, 0);
    }

    #[tokio::test]
    async fn test_listing_limits() {
        let gw = gateway().await;
        for n in 0..30u8 {
            gw.ingest(submission(&format!("item {n}"), "Library", &[n, 1, 2]))
                .await
                .unwrap();
        }

        assert_eq!(gw.list(Listing::Recent, None).unwrap().len(), 8);
        assert_eq!(gw.list(Listing::Recent, Some(100)).unwrap().len(), 24);
        assert_eq!(gw.list(Listing::All, None).unwrap().len(), 25);
        assert_eq!(gw.list(Listing::All, Some(100)).unwrap().len(), 30);
        assert_eq!(
            gw.list(Listing::All, Some(0)).unwrap_err().kind,
            ErrorKind::Validation
        );

        let newest = &gw.list(Listing::Recent, Some(1)).unwrap()[0];
        assert_eq!(newest.title, "item 29");
    }

    #[tokio::test]
    async fn test_stats_total_matches_listing() {
        let gw = gateway().await;
        for (n, location) in ["Library", "Gym", "Cafeteria"].iter().enumerate() {
            gw.ingest(submission(&format!("item {n}"), location, location.as_bytes()))
                .await
                .unwrap();
        }
        let stats = gw.stats();
        assert_eq!(stats.total_items, 3);
        assert_eq!(stats.unique_locations, 3);
        assert_eq!(stats.items_last_7_days, 3);
        assert_eq!(
            gw.list(Listing::All, Some(stats.total_items as i64)).unwrap().len() as u64,
            stats.total_items
        );
    }

    #[tokio::test]
    async fn test_get_item_not_found() {
        let gw = gateway().await;
        let err = gw.get_item(ItemId(42)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert_eq!(err.message, "Item not found.");
    }

    #[tokio::test]
    async fn test_search_vector_with_location_filter() {
        let gw = gateway().await;
        gw.ingest(submission("Cap", "Gym", b"cap")).await.unwrap();
        gw.ingest(submission("Mug", "Library", b"mug")).await.unwrap();

        let vector = gw.store().get_item(ItemId(1)).unwrap().embedding.clone();
        let hits = gw.search_vector(&vector, Some(0.0), Some(5), Some(" gym ")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].item.location, "Gym");

        let none = gw.search_vector(&vector, Some(0.0), Some(5), Some("Dorm")).unwrap();
        assert!(none.is_empty());

        let err = gw.search_vector(&[1.0], None, None, None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[test]
    fn test_round_similarity() {
        assert_eq!(round_similarity(0.123_456), 0.1235);
        assert_eq!(round_similarity(1.0), 1.0);
    }
}
