//! Item repository trait definition.

use echolocator_types::error::RepositoryError;
use echolocator_types::item::Item;

/// Durable backing log for the in-memory item store.
///
/// The store is the source of truth at runtime; the repository only has to
/// replay every appended item on start-up and persist each new one. Items
/// are append-only, so there is no update or delete.
///
/// Uses native async fn in traits (Rust 2024 edition, no async_trait macro).
pub trait ItemRepository: Send + Sync {
    /// Load every persisted item, in any order.
    fn load_all(
        &self,
    ) -> impl std::future::Future<Output = Result<Vec<Item>, RepositoryError>> + Send;

    /// Persist one fully-formed item. Must be atomic: either the whole
    /// record is durable or none of it is.
    fn append(
        &self,
        item: &Item,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
