//! Offline hashing embedder.
//!
//! Needs no model download: vectors are derived from SHA-256 digests, so the
//! same input always maps to the same unit vector. Text is embedded by
//! feature hashing its lower-cased tokens, which gives queries that share
//! words a positive cosine. Image bytes are hashed whole. This is a
//! deterministic stand-in, not a semantic model.

use sha2::{Digest, Sha256};

use echolocator_core::embedding::embedder::{EmbedInput, Embedder};
use echolocator_types::error::EmbeddingError;

pub const DETERMINISTIC_MODEL_NAME: &str = "deterministic-sha256";

#[derive(Debug, Clone, Copy)]
pub struct DeterministicEmbedder {
    dimension: usize,
}

impl DeterministicEmbedder {
    pub fn new(dimension: usize) -> Result<Self, EmbeddingError> {
        if dimension == 0 {
            return Err(EmbeddingError::Rejected(
                "embedding dimension must be positive".to_string(),
            ));
        }
        Ok(Self { dimension })
    }

    /// One signed unit bump per token at a hashed position.
    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let digest = Sha256::digest(token.to_lowercase().as_bytes());
            let index = (u64_from(&digest[..8]) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }
        vector
    }

    /// Counter-mode expansion of the digest into `dimension` values in [-1, 1].
    fn embed_bytes(&self, bytes: &[u8]) -> Vec<f32> {
        let seed = Sha256::digest(bytes);
        let mut vector = Vec::with_capacity(self.dimension);
        let mut counter: u64 = 0;
        while vector.len() < self.dimension {
            let block = Sha256::new()
                .chain_update(seed)
                .chain_update(counter.to_le_bytes())
                .finalize();
            for chunk in block.chunks_exact(4) {
                if vector.len() == self.dimension {
                    break;
                }
                let raw = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                vector.push((raw as f64 / u32::MAX as f64 * 2.0 - 1.0) as f32);
            }
            counter += 1;
        }
        vector
    }
}

fn u64_from(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b))
}

fn normalize(mut vector: Vec<f32>) -> Option<Vec<f32>> {
    let norm = vector.iter().map(|v| f64::from(*v) * f64::from(*v)).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return None;
    }
    for v in &mut vector {
        *v = (f64::from(*v) / norm) as f32;
    }
    Some(vector)
}

impl Embedder for DeterministicEmbedder {
    async fn embed(&self, input: EmbedInput<'_>) -> Result<Vec<f32>, EmbeddingError> {
        let (features, raw) = match input {
            EmbedInput::Text(text) => (self.embed_text(text), text.as_bytes()),
            // UTF-8 payloads (caption fixtures, demo files) share the text space.
            EmbedInput::Image(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => (self.embed_text(text), bytes),
                Err(_) => (self.embed_bytes(bytes), bytes),
            },
        };
        if raw.is_empty() {
            return Err(EmbeddingError::Rejected("empty input".to_string()));
        }

        // Cancelling tokens (or punctuation-only text) fall back to the byte hash.
        normalize(features)
            .or_else(|| normalize(self.embed_bytes(raw)))
            .ok_or_else(|| EmbeddingError::Rejected("degenerate embedding".to_string()))
    }

    fn model_name(&self) -> &str {
        DETERMINISTIC_MODEL_NAME
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}
