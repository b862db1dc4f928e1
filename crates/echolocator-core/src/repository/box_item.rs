//! BoxItemRepository -- object-safe dynamic dispatch wrapper for ItemRepository.
//!
//! Same blanket-impl pattern as `BoxEmbedder`, so the item store does not
//! have to be generic over its durability backend.

use std::future::Future;
use std::pin::Pin;

use echolocator_types::error::RepositoryError;
use echolocator_types::item::Item;

use super::item::ItemRepository;

/// Object-safe version of [`ItemRepository`] with boxed futures.
pub trait ItemRepositoryDyn: Send + Sync {
    fn load_all_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, RepositoryError>> + Send + 'a>>;

    fn append_boxed<'a>(
        &'a self,
        item: &'a Item,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>>;
}

impl<T: ItemRepository> ItemRepositoryDyn for T {
    fn load_all_boxed<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Item>, RepositoryError>> + Send + 'a>> {
        Box::pin(self.load_all())
    }

    fn append_boxed<'a>(
        &'a self,
        item: &'a Item,
    ) -> Pin<Box<dyn Future<Output = Result<(), RepositoryError>> + Send + 'a>> {
        Box::pin(self.append(item))
    }
}

/// Type-erased item repository (SQLite in production, ephemeral in tests
/// and `--ephemeral` runs).
pub struct BoxItemRepository {
    inner: Box<dyn ItemRepositoryDyn + Send + Sync>,
}

impl BoxItemRepository {
    /// Wrap a concrete `ItemRepository` in a type-erased box.
    pub fn new<T: ItemRepository + 'static>(repo: T) -> Self {
        Self {
            inner: Box::new(repo),
        }
    }

    pub async fn load_all(&self) -> Result<Vec<Item>, RepositoryError> {
        self.inner.load_all_boxed().await
    }

    pub async fn append(&self, item: &Item) -> Result<(), RepositoryError> {
        self.inner.append_boxed(item).await
    }
}
