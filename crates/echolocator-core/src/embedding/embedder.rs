//! Embedder trait for image/text-to-vector conversion.
//!
//! Images and text are embedded into one shared space, so a text query can
//! be ranked against photographed items. Implementations live in
//! echolocator-infra.

use echolocator_types::error::EmbeddingError;

/// Input accepted by an [`Embedder`].
#[derive(Debug, Clone, Copy)]
pub enum EmbedInput<'a> {
    /// Encoded image bytes (JPEG, PNG or WEBP).
    Image(&'a [u8]),
    /// Natural-language text.
    Text(&'a str),
}

impl EmbedInput<'_> {
    /// Short label for logs and spans.
    pub fn modality(&self) -> &'static str {
        match self {
            EmbedInput::Image(_) => "image",
            EmbedInput::Text(_) => "text",
        }
    }
}

/// Trait for converting images and text into embedding vectors.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
/// Implementations must be deterministic for a given input and model version.
pub trait Embedder: Send + Sync {
    /// Embed a single input into a vector of length [`Embedder::dimension`].
    fn embed(
        &self,
        input: EmbedInput<'_>,
    ) -> impl std::future::Future<Output = Result<Vec<f32>, EmbeddingError>> + Send;

    /// The model name used for embeddings (e.g., "clip-vit-b-32").
    fn model_name(&self) -> &str;

    /// The dimensionality of the output vectors.
    fn dimension(&self) -> usize;
}
