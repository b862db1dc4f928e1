//! ContentHasher trait for computing content fingerprints.
//!
//! Defined in echolocator-core so the ingestion pipeline can fingerprint
//! uploads without coupling to a specific hashing algorithm. The
//! `Sha256ContentHasher` adapter lives in echolocator-infra.

/// Abstraction over content hashing for duplicate detection.
pub trait ContentHasher: Send + Sync {
    /// Compute a hex-encoded hash of the given bytes.
    fn compute_hash(&self, content: &[u8]) -> String;
}
