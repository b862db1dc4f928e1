//! Asset store trait.
//!
//! Defines the interface for persisting uploaded images.
//! Implementations live in echolocator-infra.

use echolocator_types::error::AssetError;
use echolocator_types::item::ImageContentType;

/// Trait for raw image persistence.
///
/// Uses RPITIT (native async fn in traits, Rust 2024 edition).
pub trait AssetStore: Send + Sync {
    /// Persist `bytes` and return an opaque reference. `name_hint` is a
    /// sanitized, human-readable stem the store may fold into the reference.
    fn put(
        &self,
        name_hint: &str,
        content_type: ImageContentType,
        bytes: &[u8],
    ) -> impl std::future::Future<Output = Result<String, AssetError>> + Send;

    /// Remove a previously stored asset. Removing a missing asset is not an error.
    fn remove(
        &self,
        image_ref: &str,
    ) -> impl std::future::Future<Output = Result<(), AssetError>> + Send;

    /// List every stored reference. Used by the orphan sweep.
    fn list(&self) -> impl std::future::Future<Output = Result<Vec<String>, AssetError>> + Send;
}
