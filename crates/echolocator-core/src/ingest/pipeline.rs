//! Ingestion pipeline: submission -> stored image -> embedding -> visible item.
//!
//! Stages run in order and each can fail on its own:
//!
//! 1. validate metadata and image content type/size
//! 2. fingerprint the image and reject known duplicates
//! 3. persist the image through the asset store
//! 4. embed the image bytes (bounded by a timeout, retried when transient)
//! 5. insert into the item store
//!
//! No lock is held on the store before stage 5. Stage 5 runs on a detached
//! task together with the orphan guard, so dropping the caller's future
//! either commits the whole item or removes the image.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use echolocator_types::config::IngestConfig;
use echolocator_types::error::{AssetError, EmbeddingError, EngineError};
use echolocator_types::item::{ImageContentType, Item, ItemSubmission, NewItem};

use super::orphan::OrphanGuard;
use super::retry::RetryPolicy;
use crate::embedding::box_embedder::BoxEmbedder;
use crate::embedding::embed_checked;
use crate::embedding::embedder::EmbedInput;
use crate::service::hash::ContentHasher;
use crate::storage::asset_store::AssetStore;
use crate::store::{DUPLICATE_IMAGE_MESSAGE, ItemStore};

const MAX_NAME_HINT_CHARS: usize = 40;

/// Submission fields after trimming and validation.
#[derive(Debug, Clone, PartialEq)]
struct ValidatedSubmission {
    title: String,
    location: String,
    description: Option<String>,
    finder_contact: Option<String>,
    content_type: ImageContentType,
}

/// Turns raw submissions into committed items.
pub struct IngestionPipeline<A: AssetStore + 'static, H: ContentHasher> {
    store: Arc<ItemStore>,
    embedder: Arc<BoxEmbedder>,
    assets: Arc<A>,
    hasher: H,
    config: IngestConfig,
    retry: RetryPolicy,
    sweep_gate: Arc<tokio::sync::RwLock<()>>,
}

impl<A: AssetStore + 'static, H: ContentHasher> IngestionPipeline<A, H> {
    pub fn new(
        store: Arc<ItemStore>,
        embedder: Arc<BoxEmbedder>,
        assets: Arc<A>,
        hasher: H,
        config: IngestConfig,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            store,
            embedder,
            assets,
            hasher,
            config,
            retry,
            sweep_gate: Arc::new(tokio::sync::RwLock::new(())),
        }
    }

    pub fn assets(&self) -> &Arc<A> {
        &self.assets
    }

    /// Run every stage for one submission and return the visible item.
    #[tracing::instrument(
        name = "ingest_item",
        skip(self, submission),
        fields(
            image_bytes = submission.image.len(),
            content_type = %submission.content_type,
        )
    )]
    pub async fn ingest(&self, submission: ItemSubmission) -> Result<Arc<Item>, EngineError> {
        let fields = self.validate(&submission)?;

        let image_hash = self.hasher.compute_hash(&submission.image);
        if self.config.reject_duplicates && self.store.snapshot().contains_image_hash(&image_hash) {
            return Err(EngineError::validation(DUPLICATE_IMAGE_MESSAGE));
        }

        let gate = Arc::clone(&self.sweep_gate).read_owned().await;
        let hint = name_hint(&fields.title);
        let image = submission.image.as_slice();
        let image_ref = self
            .retry
            .run("asset_put", AssetError::is_transient, || {
                self.assets.put(&hint, fields.content_type, image)
            })
            .await?;
        tracing::debug!(image_ref = %image_ref, "image stored");

        let guard = OrphanGuard::new(Arc::clone(&self.assets), image_ref, gate);

        let embedding = match self.embed_image(image).await {
            Ok(vector) => vector,
            Err(e) => {
                guard.discard().await;
                return Err(e.into());
            }
        };
        tracing::debug!(dimension = embedding.len(), "image embedded");

        let new = NewItem {
            title: fields.title,
            description: fields.description,
            location: fields.location,
            finder_contact: fields.finder_contact,
            image_ref: guard.image_ref().to_string(),
            image_hash: self.config.reject_duplicates.then_some(image_hash),
            embedding,
            embedding_model: self.embedder.model_name().to_string(),
        };

        let store = Arc::clone(&self.store);
        let retry = self.retry.clone();
        let commit = tokio::spawn(async move {
            match store.insert_with_retry(new, &retry).await {
                Ok(item) => {
                    guard.disarm();
                    Ok(item)
                }
                Err(e) => {
                    guard.discard().await;
                    Err(e)
                }
            }
        });

        let item = commit
            .await
            .map_err(|e| EngineError::Storage(format!("commit task failed: {e}")))??;
        tracing::info!(item_id = %item.id, location = %item.location, "item ingested");
        Ok(item)
    }

    /// Remove every stored image that no visible item references.
    ///
    /// Waits for in-flight ingests to commit or discard their image first.
    /// Returns the number of images removed.
    #[tracing::instrument(name = "reconcile_assets", skip(self))]
    pub async fn reconcile_assets(&self) -> Result<usize, EngineError> {
        let _exclusive = self.sweep_gate.write().await;

        let stored = self.assets.list().await?;
        let snapshot = self.store.snapshot();
        let referenced: HashSet<&str> = snapshot.iter().map(|item| item.image_ref.as_str()).collect();

        let mut removed = 0;
        for image_ref in stored.iter().filter(|r| !referenced.contains(r.as_str())) {
            match self.assets.remove(image_ref).await {
                Ok(()) => {
                    tracing::info!(image_ref = %image_ref, "removed orphaned image");
                    removed += 1;
                }
                Err(e) => {
                    tracing::warn!(image_ref = %image_ref, error = %e, "failed to remove orphaned image");
                }
            }
        }
        Ok(removed)
    }

    async fn embed_image(&self, image: &[u8]) -> Result<Vec<f32>, EmbeddingError> {
        let timeout = Duration::from_secs(self.config.embed_timeout_secs);
        let dimension = self.store.dimension();
        self.retry
            .run("embed_image", EmbeddingError::is_transient, || {
                embed_checked(&self.embedder, EmbedInput::Image(image), timeout, dimension)
            })
            .await
    }

    fn validate(&self, submission: &ItemSubmission) -> Result<ValidatedSubmission, EngineError> {
        let limits = &self.config;

        let content_type: ImageContentType = submission
            .content_type
            .parse()
            .map_err(EngineError::Validation)?;

        if submission.image.is_empty() {
            return Err(EngineError::validation("Uploaded image payload was empty."));
        }
        if submission.image.len() > limits.max_image_bytes {
            return Err(EngineError::validation(format!(
                "Image exceeds the {} byte upload limit.",
                limits.max_image_bytes
            )));
        }

        let title = submission.title.trim();
        if title.is_empty() {
            return Err(EngineError::validation("Title is required."));
        }
        if title.chars().count() > limits.max_title_chars {
            return Err(EngineError::validation(format!(
                "Title must be at most {} characters.",
                limits.max_title_chars
            )));
        }

        let location = submission.location.trim();
        let location_chars = location.chars().count();
        if location_chars < limits.min_location_chars || location_chars > limits.max_location_chars {
            return Err(EngineError::validation(format!(
                "Location must be between {} and {} characters.",
                limits.min_location_chars, limits.max_location_chars
            )));
        }

        let finder_contact = non_empty(submission.finder_contact.as_deref());
        if finder_contact
            .as_ref()
            .is_some_and(|c| c.chars().count() > limits.max_contact_chars)
        {
            return Err(EngineError::validation(format!(
                "Finder contact must be at most {} characters.",
                limits.max_contact_chars
            )));
        }

        Ok(ValidatedSubmission {
            title: title.to_string(),
            location: location.to_string(),
            description: non_empty(submission.description.as_deref()),
            finder_contact,
            content_type,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Filesystem-safe stem derived from the title.
fn name_hint(title: &str) -> String {
    let hint: String = title
        .chars()
        .take(MAX_NAME_HINT_CHARS)
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    if hint.chars().all(|c| c == '_') {
        "item".to_string()
    } else {
        hint
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::embedder::Embedder;
    use crate::repository::box_item::BoxItemRepository;
    use crate::repository::ephemeral::EphemeralItemRepository;
    use crate::testing::{
        ByteSumHasher, DIM, FailingEmbedder, HangingEmbedder, MemoryAssetStore, StubEmbedder,
    };
    use echolocator_types::error::ErrorKind;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1),
            max_backoff: Duration::from_millis(2),
        }
    }

    async fn pipeline_with<E: Embedder + 'static>(
        embedder: E,
        config: IngestConfig,
    ) -> (IngestionPipeline<MemoryAssetStore, ByteSumHasher>, Arc<ItemStore>) {
        let store = Arc::new(
            ItemStore::open(BoxItemRepository::new(EphemeralItemRepository::new()), DIM)
                .await
                .unwrap(),
        );
        let pipeline = IngestionPipeline::new(
            Arc::clone(&store),
            Arc::new(BoxEmbedder::new(embedder)),
            Arc::new(MemoryAssetStore::default()),
            ByteSumHasher,
            config,
            fast_retry(),
        );
        (pipeline, store)
    }

    fn submission(title: &str, location: &str, image: &[u8]) -> ItemSubmission {
        ItemSubmission {
            title: title.to_string(),
            location: location.to_string(),
            description: Some("  ".to_string()),
            finder_contact: Some(" desk@campus.edu ".to_string()),
            content_type: "image/jpeg".to_string(),
            image: image.to_vec(),
        }
    }

    #[tokio::test]
    async fn test_ingest_makes_item_visible() {
        let (pipeline, store) = pipeline_with(StubEmbedder, IngestConfig::default()).await;

        let item = pipeline
            .ingest(submission("  Water Bottle ", " Library ", b"bottle-bytes"))
            .await
            .unwrap();

        assert_eq!(item.title, "Water Bottle");
        assert_eq!(item.location, "Library");
        assert_eq!(item.description, None);
        assert_eq!(item.finder_contact.as_deref(), Some("desk@campus.edu"));
        assert_eq!(item.embedding.len(), DIM);
        assert_eq!(item.embedding_model, "stub");
        assert!(item.image_ref.ends_with("_Water_Bottle.jpg"));
        assert_eq!(store.list_recent(10).len(), 1);
        assert_eq!(pipeline.assets().refs(), vec![item.image_ref.clone()]);
    }

    #[tokio::test]
    async fn test_validation_failures_store_nothing() {
        let (pipeline, store) = pipeline_with(StubEmbedder, IngestConfig::default()).await;

        let mut gif = submission("Cap", "Gym", b"gif");
        gif.content_type = "image/gif".to_string();
        let too_big = ItemSubmission {
            image: vec![7u8; IngestConfig::default().max_image_bytes + 1],
            ..submission("Cap", "Gym", b"")
        };
        let long_contact = ItemSubmission {
            finder_contact: Some("x".repeat(201)),
            ..submission("Cap", "Gym", b"x")
        };

        for bad in [
            gif,
            submission("Cap", "Gym", b""),
            submission("   ", "Gym", b"x"),
            submission("Cap", "G", b"x"),
            submission(&"t".repeat(121), "Gym", b"x"),
            too_big,
            long_contact,
        ] {
            let err = pipeline.ingest(bad).await.unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation, "{err}");
        }
        assert!(store.snapshot().is_empty());
        assert!(pipeline.assets().refs().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_image_rejected() {
        let (pipeline, store) = pipeline_with(StubEmbedder, IngestConfig::default()).await;
        pipeline.ingest(submission("Keys", "Library", b"same")).await.unwrap();

        let err = pipeline
            .ingest(submission("Other keys", "Gym", b"same"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(err.to_string().contains(DUPLICATE_IMAGE_MESSAGE));
        assert_eq!(store.snapshot().len(), 1);
        assert_eq!(pipeline.assets().refs().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicates_allowed_when_disabled() {
        let config = IngestConfig {
            reject_duplicates: false,
            ..IngestConfig::default()
        };
        let (pipeline, store) = pipeline_with(StubEmbedder, config).await;
        pipeline.ingest(submission("Keys", "Library", b"same")).await.unwrap();
        pipeline.ingest(submission("Keys", "Library", b"same")).await.unwrap();
        assert_eq!(store.snapshot().len(), 2);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_nothing_visible() {
        let embedder = Arc::new(FailingEmbedder::new(
            u32::MAX,
            EmbeddingError::Rejected("not an image".to_string()),
        ));
        let (pipeline, store) = pipeline_with(Arc::clone(&embedder), IngestConfig::default()).await;

        let err = pipeline
            .ingest(submission("Keys", "Library", b"corrupt"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Embedding);
        assert!(store.list_recent(10).is_empty());
        assert_eq!(store.snapshot().len(), 0);
        assert!(pipeline.assets().refs().is_empty());
        // Permanent failures are not retried.
        assert_eq!(embedder.calls(), 1);
    }

    #[tokio::test]
    async fn test_transient_embedding_failure_is_retried() {
        let embedder = Arc::new(FailingEmbedder::new(
            2,
            EmbeddingError::Unavailable("model loading".to_string()),
        ));
        let (pipeline, store) = pipeline_with(Arc::clone(&embedder), IngestConfig::default()).await;

        pipeline.ingest(submission("Keys", "Library", b"keys")).await.unwrap();

        assert_eq!(embedder.calls(), 3);
        assert_eq!(store.snapshot().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_embed_timeout_surfaces_as_embedding_error() {
        let config = IngestConfig {
            embed_timeout_secs: 1,
            ..IngestConfig::default()
        };
        let (pipeline, store) = pipeline_with(HangingEmbedder, config).await;

        let err = pipeline
            .ingest(submission("Keys", "Library", b"keys"))
            .await
            .unwrap_err();

        assert!(matches!(err, EngineError::Embedding(EmbeddingError::Timeout(_))));
        assert!(store.snapshot().is_empty());
        assert!(pipeline.assets().refs().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_ingest_removes_image() {
        let (pipeline, store) = pipeline_with(HangingEmbedder, IngestConfig::default()).await;
        let pipeline = Arc::new(pipeline);

        let task = {
            let pipeline = Arc::clone(&pipeline);
            tokio::spawn(async move { pipeline.ingest(submission("Keys", "Library", b"keys")).await })
        };
        // Let the ingest reach the embed stage.
        while pipeline.assets().refs().is_empty() {
            tokio::task::yield_now().await;
        }
        task.abort();
        let _ = task.await;

        for _ in 0..100 {
            if pipeline.assets().refs().is_empty() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(pipeline.assets().refs().is_empty());
        assert!(store.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_reconcile_removes_only_unreferenced_images() {
        let (pipeline, _store) = pipeline_with(StubEmbedder, IngestConfig::default()).await;
        let item = pipeline.ingest(submission("Keys", "Library", b"keys")).await.unwrap();
        pipeline.assets().insert_raw("stale_upload.jpg");

        let removed = pipeline.reconcile_assets().await.unwrap();

        assert_eq!(removed, 1);
        assert_eq!(pipeline.assets().refs(), vec![item.image_ref.clone()]);
    }

    #[test]
    fn test_name_hint() {
        assert_eq!(name_hint("Blue Backpack!"), "Blue_Backpack_");
        assert_eq!(name_hint("***"), "item");
        assert_eq!(name_hint(&"a".repeat(60)).len(), MAX_NAME_HINT_CHARS);
    }

    /// Completes only once two embeddings are in flight at the same time.
    struct RendezvousEmbedder(Arc<tokio::sync::Barrier>);

    impl Embedder for RendezvousEmbedder {
        async fn embed(&self, input: EmbedInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
            self.0.wait().await;
            StubEmbedder.embed(input).await
        }

        fn model_name(&self) -> &str {
            "rendezvous"
        }

        fn dimension(&self) -> usize {
            DIM
        }
    }

    #[tokio::test]
    async fn test_concurrent_ingests_embed_in_parallel() {
        let barrier = Arc::new(tokio::sync::Barrier::new(2));
        let (pipeline, store) =
            pipeline_with(RendezvousEmbedder(barrier), IngestConfig::default()).await;

        let (a, b) = tokio::time::timeout(Duration::from_secs(5), async {
            tokio::join!(
                pipeline.ingest(submission("Water Bottle", "Library", b"bottle")),
                pipeline.ingest(submission("Blue Backpack", "Gym", b"backpack")),
            )
        })
        .await
        .expect("embeddings were serialized");

        let (a, b) = (a.unwrap(), b.unwrap());
        assert_ne!(a.id, b.id);
        assert_eq!(store.snapshot().len(), 2);
    }
}
