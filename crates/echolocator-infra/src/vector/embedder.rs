//! FastEmbed-based CLIP embedder.
//!
//! Implements the `Embedder` trait from `echolocator-core` with fastembed's
//! CLIP ViT-B/32 image and text towers (512 dimensions, ONNX runtime). The
//! two towers share one embedding space, so a text query ranks against
//! photographed items.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{
    EmbeddingModel, ImageEmbedding, ImageEmbeddingModel, ImageInitOptions, InitOptions,
    TextEmbedding,
};

use echolocator_core::embedding::embedder::{EmbedInput, Embedder};
use echolocator_types::error::EmbeddingError;

pub const CLIP_MODEL_NAME: &str = "clip-vit-b-32";
pub const CLIP_DIMENSION: usize = 512;

/// Both CLIP towers. Inference needs exclusive access, so each sits behind
/// its own lock and image and text calls do not contend.
struct ClipModels {
    image: Mutex<ImageEmbedding>,
    text: Mutex<TextEmbedding>,
}

/// CLIP ViT-B/32 embedder backed by fastembed.
///
/// Inference is CPU-bound and runs on tokio's blocking pool.
#[derive(Clone)]
pub struct FastEmbedClipEmbedder {
    models: Arc<ClipModels>,
}

impl FastEmbedClipEmbedder {
    /// Load both towers, downloading the ONNX weights into `cache_dir` (or
    /// fastembed's default cache) on first use.
    ///
    /// Blocking; call from `spawn_blocking` inside a runtime.
    pub fn try_new(cache_dir: Option<PathBuf>) -> Result<Self, EmbeddingError> {
        let mut image_opts =
            ImageInitOptions::new(ImageEmbeddingModel::ClipVitB32).with_show_download_progress(false);
        let mut text_opts =
            InitOptions::new(EmbeddingModel::ClipVitB32).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            image_opts = image_opts.with_cache_dir(dir.clone());
            text_opts = text_opts.with_cache_dir(dir);
        }

        let image = ImageEmbedding::try_new(image_opts).map_err(|e| {
            EmbeddingError::Unavailable(format!("failed to load CLIP image model: {e}"))
        })?;
        let text = TextEmbedding::try_new(text_opts).map_err(|e| {
            EmbeddingError::Unavailable(format!("failed to load CLIP text model: {e}"))
        })?;

        tracing::info!(model = CLIP_MODEL_NAME, dimension = CLIP_DIMENSION, "CLIP models loaded");
        Ok(Self {
            models: Arc::new(ClipModels {
                image: Mutex::new(image),
                text: Mutex::new(text),
            }),
        })
    }
}

impl std::fmt::Debug for FastEmbedClipEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedClipEmbedder")
            .field("model", &CLIP_MODEL_NAME)
            .finish()
    }
}

fn poisoned() -> EmbeddingError {
    EmbeddingError::Unavailable("CLIP model lock poisoned".to_string())
}

/// fastembed returns one vector per input; we always send exactly one.
fn single(mut vectors: Vec<Vec<f32>>) -> Result<Vec<f32>, EmbeddingError> {
    vectors
        .pop()
        .ok_or_else(|| EmbeddingError::Unavailable("model returned no embedding".to_string()))
}

impl Embedder for FastEmbedClipEmbedder {
    async fn embed(&self, input: EmbedInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
        let models = Arc::clone(&self.models);

        let task = match input {
            EmbedInput::Image(bytes) => {
                let bytes = bytes.to_vec();
                tokio::task::spawn_blocking(move || {
                    let mut model = models.image.lock().map_err(|_| poisoned())?;
                    // Decode failures surface here; they are not worth retrying.
                    let vectors = model
                        .embed_bytes(&[bytes.as_slice()], None)
                        .map_err(|e| EmbeddingError::Rejected(e.to_string()))?;
                    single(vectors)
                })
            }
            EmbedInput::Text(text) => {
                let text = text.to_string();
                tokio::task::spawn_blocking(move || {
                    let mut model = models.text.lock().map_err(|_| poisoned())?;
                    let vectors = model
                        .embed(vec![text], None)
                        .map_err(|e| EmbeddingError::Rejected(e.to_string()))?;
                    single(vectors)
                })
            }
        };

        task.await
            .map_err(|e| EmbeddingError::Unavailable(format!("embedding task failed: {e}")))?
    }

    fn model_name(&self) -> &str {
        CLIP_MODEL_NAME
    }

    fn dimension(&self) -> usize {
        CLIP_DIMENSION
    }
}
