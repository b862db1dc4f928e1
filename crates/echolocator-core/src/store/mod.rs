//! VectorRecord store: the single source of truth for visible items.
//!
//! Readers take a [`StoreSnapshot`] and never touch a lock afterwards.
//! Writers are serialized by an async mutex that covers id assignment,
//! the durable append, and publication of the next snapshot. The published
//! snapshot is swapped under a short synchronous lock that is never held
//! across an await.

pub mod snapshot;

use std::collections::HashSet;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

use echolocator_types::error::{EngineError, RepositoryError};
use echolocator_types::item::{Item, ItemId, NewItem};

use crate::ingest::retry::RetryPolicy;
use crate::repository::box_item::BoxItemRepository;

pub use snapshot::StoreSnapshot;

/// Message surfaced when an image hash is already indexed.
pub const DUPLICATE_IMAGE_MESSAGE: &str = "This item image was already uploaded.";

struct WriterState {
    next_id: ItemId,
    last_created_at: Option<DateTime<Utc>>,
    hashes: HashSet<String>,
}

/// Append-only, snapshot-isolated item store.
pub struct ItemStore {
    repo: BoxItemRepository,
    dimension: usize,
    writer: tokio::sync::Mutex<WriterState>,
    published: RwLock<StoreSnapshot>,
}

impl ItemStore {
    /// Open the store, replaying every persisted item from `repo`.
    ///
    /// Fails with `Storage` when a persisted vector does not have `dimension`
    /// components: the corpus was indexed by a different model.
    pub async fn open(repo: BoxItemRepository, dimension: usize) -> Result<Self, EngineError> {
        if dimension == 0 {
            return Err(EngineError::validation("embedding dimension must be positive"));
        }

        let mut items = repo.load_all().await?;
        items.sort_by_key(|item| item.id);

        if let Some(bad) = items.iter().find(|item| item.embedding.len() != dimension) {
            return Err(EngineError::Storage(format!(
                "item {} has a {}-dimensional embedding, expected {dimension}",
                bad.id,
                bad.embedding.len()
            )));
        }

        let state = WriterState {
            next_id: items.last().map_or(ItemId(1), |item| item.id.next()),
            last_created_at: items.iter().map(|item| item.created_at).max(),
            hashes: items
                .iter()
                .filter_map(|item| item.image_hash.clone())
                .collect(),
        };
        let version = items.len() as u64;
        let items: Vec<Arc<Item>> = items.into_iter().map(Arc::new).collect();

        tracing::debug!(items = items.len(), dimension, "item store opened");

        Ok(Self {
            repo,
            dimension,
            writer: tokio::sync::Mutex::new(state),
            published: RwLock::new(StoreSnapshot::new(version, items)),
        })
    }

    /// Embedding dimension every item in this store has.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// A point-in-time view of every committed item.
    pub fn snapshot(&self) -> StoreSnapshot {
        self.published
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Up to `limit` items, newest first.
    pub fn list_recent(&self, limit: usize) -> Vec<Arc<Item>> {
        self.snapshot().recent(limit)
    }

    pub fn get_item(&self, id: ItemId) -> Result<Arc<Item>, EngineError> {
        self.snapshot()
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("item {id}")))
    }

    /// Validate, assign identity, persist, and publish a new item.
    pub async fn insert(&self, new: NewItem) -> Result<Arc<Item>, EngineError> {
        self.insert_with_retry(new, &RetryPolicy::none()).await
    }

    /// As [`insert`](Self::insert), retrying transient repository failures.
    ///
    /// The writer lock is held across the retries, so no later insert can
    /// commit with an earlier timestamp.
    ///
    /// A `Conflict` from the repository means another writer appended rows
    /// this store has not seen. The store then replays those rows once and
    /// retries under the next free id; a duplicate image among them surfaces
    /// as the usual duplicate-image validation error.
    pub async fn insert_with_retry(
        &self,
        new: NewItem,
        policy: &RetryPolicy,
    ) -> Result<Arc<Item>, EngineError> {
        self.validate(&new)?;

        let mut state = self.writer.lock().await;
        let mut resynced = false;

        loop {
            if new
                .image_hash
                .as_deref()
                .is_some_and(|hash| state.hashes.contains(hash))
            {
                return Err(EngineError::validation(DUPLICATE_IMAGE_MESSAGE));
            }

            let id = state.next_id;
            let now = Utc::now();
            let created_at = match state.last_created_at {
                Some(last) if last > now => last,
                _ => now,
            };
            let item = Arc::new(new.clone().into_item(id, created_at));

            let appended = policy
                .run("item_append", RepositoryError::is_transient, || {
                    self.repo.append(&item)
                })
                .await;

            match appended {
                Ok(()) => {
                    self.publish(&mut state, Arc::clone(&item));
                    drop(state);
                    tracing::debug!(item_id = %id, "item committed");
                    return Ok(item);
                }
                Err(RepositoryError::Conflict(reason)) if !resynced => {
                    resynced = true;
                    let replayed = self.catch_up(&mut state).await?;
                    tracing::warn!(
                        item_id = %id,
                        %reason,
                        replayed,
                        "append conflicted, replayed rows from another writer"
                    );
                    if replayed == 0 {
                        return Err(RepositoryError::Conflict(reason).into());
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Publish rows another writer appended after this store last saw the
    /// repository. Returns how many were published.
    async fn catch_up(&self, state: &mut WriterState) -> Result<usize, EngineError> {
        let mut missing: Vec<Item> = self
            .repo
            .load_all()
            .await?
            .into_iter()
            .filter(|item| item.id >= state.next_id)
            .collect();
        missing.sort_by_key(|item| item.id);

        if let Some(bad) = missing.iter().find(|item| item.embedding.len() != self.dimension) {
            return Err(EngineError::Storage(format!(
                "item {} has a {}-dimensional embedding, expected {}",
                bad.id,
                bad.embedding.len(),
                self.dimension
            )));
        }

        let replayed = missing.len();
        for item in missing {
            self.publish(state, Arc::new(item));
        }
        Ok(replayed)
    }

    fn publish(&self, state: &mut WriterState, item: Arc<Item>) {
        state.next_id = item.id.next();
        state.last_created_at = state.last_created_at.max(Some(item.created_at));
        if let Some(hash) = &item.image_hash {
            state.hashes.insert(hash.clone());
        }
        self.published
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(item);
    }

    fn validate(&self, new: &NewItem) -> Result<(), EngineError> {
        if new.title.trim().is_empty() {
            return Err(EngineError::validation("Title is required."));
        }
        if new.location.trim().is_empty() {
            return Err(EngineError::validation("Location is required."));
        }
        if new.embedding.len() != self.dimension {
            return Err(EngineError::validation(format!(
                "embedding has {} dimensions, expected {}",
                new.embedding.len(),
                self.dimension
            )));
        }
        if new.embedding.iter().any(|v| !v.is_finite())
            || new.embedding.iter().all(|v| *v == 0.0)
        {
            return Err(EngineError::validation(
                "embedding must be finite and non-zero",
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for ItemStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemStore")
            .field("dimension", &self.dimension)
            .field("items", &self.snapshot().len())
            .finish()
    }
}
