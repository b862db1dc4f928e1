//! BoxEmbedder -- object-safe dynamic dispatch wrapper for Embedder.
//!
//! 1. Define an object-safe `EmbedderDyn` trait with boxed futures
//! 2. Blanket-impl `EmbedderDyn` for all `T: Embedder`
//! 3. `BoxEmbedder` wraps `Box<dyn EmbedderDyn>` and delegates

use std::future::Future;
use std::pin::Pin;

use echolocator_types::error::EmbeddingError;

use super::embedder::{EmbedInput, Embedder};

/// Object-safe version of [`Embedder`] with boxed futures.
///
/// This trait exists solely to enable dynamic dispatch (`dyn EmbedderDyn`).
/// A blanket implementation is provided for all types implementing `Embedder`.
pub trait EmbedderDyn: Send + Sync {
    fn embed_boxed<'a>(
        &'a self,
        input: EmbedInput<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbeddingError>> + Send + 'a>>;

    fn model_name_dyn(&self) -> &str;

    fn dimension_dyn(&self) -> usize;
}

/// Blanket implementation: any `Embedder` automatically implements `EmbedderDyn`.
impl<T: Embedder> EmbedderDyn for T {
    fn embed_boxed<'a>(
        &'a self,
        input: EmbedInput<'a>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbeddingError>> + Send + 'a>> {
        Box::pin(self.embed(input))
    }

    fn model_name_dyn(&self) -> &str {
        self.model_name()
    }

    fn dimension_dyn(&self) -> usize {
        self.dimension()
    }
}

/// Type-erased embedder for runtime selection.
///
/// Wraps any `Embedder` implementation behind dynamic dispatch, so the
/// binary can pick fastembed CLIP or the offline embedder from config and
/// tests can inject stubs.
pub struct BoxEmbedder {
    inner: Box<dyn EmbedderDyn + Send + Sync>,
}

impl BoxEmbedder {
    /// Wrap a concrete `Embedder` in a type-erased box.
    pub fn new<T: Embedder + 'static>(embedder: T) -> Self {
        Self {
            inner: Box::new(embedder),
        }
    }

    /// Embed a single image or text input.
    pub async fn embed(&self, input: EmbedInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
        self.inner.embed_boxed(input).await
    }

    /// The model name used for embeddings.
    pub fn model_name(&self) -> &str {
        self.inner.model_name_dyn()
    }

    /// The dimensionality of the output vectors.
    pub fn dimension(&self) -> usize {
        self.inner.dimension_dyn()
    }
}

impl std::fmt::Debug for BoxEmbedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoxEmbedder")
            .field("model", &self.model_name())
            .field("dimension", &self.dimension())
            .finish()
    }
}
