//! Embedding backends.
//!
//! - `embedder`: fastembed CLIP ViT-B/32, images and text in one 512-d space
//! - `deterministic`: offline hashing embedder for tests and air-gapped demos

pub mod deterministic;
pub mod embedder;

pub use deterministic::DeterministicEmbedder;
pub use embedder::FastEmbedClipEmbedder;
