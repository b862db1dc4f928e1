//! Embedding capability for Echo-Locator.
//!
//! The neural model is an external collaborator. The engine only sees the
//! `Embedder` port: a function from image bytes or text to a vector of fixed
//! dimension. Concrete models (fastembed CLIP, offline hashing) live in
//! echolocator-infra.

pub mod box_embedder;
pub mod embedder;

use std::time::Duration;

use echolocator_types::error::EmbeddingError;

use self::box_embedder::BoxEmbedder;
use self::embedder::EmbedInput;

/// One embed call bounded by `timeout`, with its output checked against
/// `expected` dimensions.
pub async fn embed_checked(
    embedder: &BoxEmbedder,
    input: EmbedInput<'_>,
    timeout: Duration,
    expected: usize,
) -> Result<Vec<f32>, EmbeddingError> {
    let vector = tokio::time::timeout(timeout, embedder.embed(input))
        .await
        .map_err(|_| EmbeddingError::Timeout(timeout))??;
    check_embedding(vector, expected)
}

/// Check an embedder's output against the dimension the store was opened with.
///
/// Non-finite components and the zero vector are rejected as well, since
/// cosine similarity is undefined for them.
pub fn check_embedding(vector: Vec<f32>, expected: usize) -> Result<Vec<f32>, EmbeddingError> {
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    if vector.iter().any(|v| !v.is_finite()) {
        return Err(EmbeddingError::Rejected(
            "embedding contains non-finite values".to_string(),
        ));
    }
    if vector.iter().all(|v| *v == 0.0) {
        return Err(EmbeddingError::Rejected("embedding is the zero vector".to_string()));
    }
    Ok(vector)
}
