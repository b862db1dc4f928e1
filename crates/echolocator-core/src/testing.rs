//! In-memory port implementations shared by the engine's unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use echolocator_types::error::{AssetError, EmbeddingError};
use echolocator_types::item::{ImageContentType, NewItem};

use crate::embedding::embedder::{EmbedInput, Embedder};
use crate::service::hash::ContentHasher;
use crate::storage::asset_store::AssetStore;

pub const DIM: usize = 4;

/// Embeds image bytes or text by folding bytes into `DIM` buckets.
///
/// Text and image inputs with the same bytes land on the same vector.
pub struct StubEmbedder;

impl Embedder for StubEmbedder {
    async fn embed(&self, input: EmbedInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
        let bytes = match input {
            EmbedInput::Image(b) => b,
            EmbedInput::Text(t) => t.as_bytes(),
        };
        let mut v = vec![0.0f32; DIM];
        for (i, b) in bytes.iter().enumerate() {
            v[i % DIM] += f32::from(*b) + 1.0;
        }
        Ok(v)
    }

    fn model_name(&self) -> &str {
        "stub"
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Fails the first `failures` calls with `error`, then behaves like [`StubEmbedder`].
pub struct FailingEmbedder {
    failures: AtomicU32,
    error: EmbeddingError,
    pub calls: AtomicU32,
}

impl FailingEmbedder {
    pub fn new(failures: u32, error: EmbeddingError) -> Self {
        Self {
            failures: AtomicU32::new(failures),
            error,
            calls: AtomicU32::new(0),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Embedder for std::sync::Arc<FailingEmbedder> {
    async fn embed(&self, input: EmbedInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(self.error.clone());
        }
        StubEmbedder.embed(input).await
    }

    fn model_name(&self) -> &str {
        "failing"
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Never answers.
pub struct HangingEmbedder;

impl Embedder for HangingEmbedder {
    async fn embed(&self, _input: EmbedInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
        std::future::pending().await
    }

    fn model_name(&self) -> &str {
        "hanging"
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

#[derive(Default)]
pub struct MemoryAssetStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
    counter: AtomicU32,
}

impl MemoryAssetStore {
    pub fn refs(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn insert_raw(&self, image_ref: &str) {
        self.objects
            .lock()
            .unwrap()
            .insert(image_ref.to_string(), vec![1]);
    }
}

impl AssetStore for MemoryAssetStore {
    async fn put(
        &self,
        name_hint: &str,
        content_type: ImageContentType,
        bytes: &[u8],
    ) -> Result<String, AssetError> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        let image_ref = format!("{n:04}_{name_hint}.{}", content_type.extension());
        self.objects
            .lock()
            .unwrap()
            .insert(image_ref.clone(), bytes.to_vec());
        Ok(image_ref)
    }

    async fn remove(&self, image_ref: &str) -> Result<(), AssetError> {
        self.objects.lock().unwrap().remove(image_ref);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<String>, AssetError> {
        Ok(self.refs())
    }
}

/// Cheap stand-in for a content hash.
pub struct ByteSumHasher;

impl ContentHasher for ByteSumHasher {
    fn compute_hash(&self, content: &[u8]) -> String {
        let sum: u64 = content.iter().map(|b| u64::from(*b)).sum();
        format!("{sum:x}-{}", content.len())
    }
}

pub fn new_item(title: &str, location: &str, embedding: Vec<f32>) -> NewItem {
    NewItem {
        title: title.to_string(),
        description: None,
        location: location.to_string(),
        finder_contact: None,
        image_ref: format!("{title}.jpg"),
        image_hash: None,
        embedding,
        embedding_model: "stub".to_string(),
    }
}
