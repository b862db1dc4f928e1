//! SHA-256 content hashing for duplicate image detection.
//!
//! Implements the `ContentHasher` trait from `echolocator-core` using the
//! `sha2` crate (RustCrypto ecosystem).

use sha2::{Digest, Sha256};

use echolocator_core::service::hash::ContentHasher;

/// SHA-256 implementation of `ContentHasher`.
///
/// Produces lowercase hex digests of raw image bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256ContentHasher;

impl Sha256ContentHasher {
    pub fn new() -> Self {
        Self
    }
}

impl ContentHasher for Sha256ContentHasher {
    fn compute_hash(&self, content: &[u8]) -> String {
        format!("{:x}", Sha256::digest(content))
    }
}
