//! In-memory deployment: nothing is persisted beyond the process.

use echolocator_types::error::RepositoryError;
use echolocator_types::item::Item;

use super::item::ItemRepository;

/// Repository that keeps nothing. The item store alone holds the corpus,
/// which is lost on exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct EphemeralItemRepository;

impl EphemeralItemRepository {
    pub fn new() -> Self {
        Self
    }
}

impl ItemRepository for EphemeralItemRepository {
    async fn load_all(&self) -> Result<Vec<Item>, RepositoryError> {
        Ok(Vec::new())
    }

    async fn append(&self, _item: &Item) -> Result<(), RepositoryError> {
        Ok(())
    }
}
