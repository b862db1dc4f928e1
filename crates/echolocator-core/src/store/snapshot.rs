//! Immutable point-in-time views of the item store.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use echolocator_types::item::{Item, ItemId};

/// A read-only view of every item visible at the instant it was taken.
///
/// Cloning is two pointer copies. Items are kept in commit order, which is
/// ascending `(created_at, id)`, so ordering queries never need to sort.
#[derive(Debug, Clone)]
pub struct StoreSnapshot {
    version: u64,
    items: Arc<Vec<Arc<Item>>>,
}

impl StoreSnapshot {
    pub(crate) fn new(version: u64, items: Vec<Arc<Item>>) -> Self {
        Self {
            version,
            items: Arc::new(items),
        }
    }

    /// Append a committed item, producing the next version in place.
    ///
    /// Copies the item list only when an outstanding snapshot still shares it.
    pub(crate) fn push(&mut self, item: Arc<Item>) {
        Arc::make_mut(&mut self.items).push(item);
        self.version += 1;
    }

    /// Monotonic version; bumps by one per committed insert.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Items in commit order (oldest first).
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Item>> {
        self.items.iter()
    }

    /// The most recently committed item.
    pub fn latest(&self) -> Option<&Arc<Item>> {
        self.items.last()
    }

    /// Up to `limit` items, newest first (`created_at` desc, then `id` desc).
    pub fn recent(&self, limit: usize) -> Vec<Arc<Item>> {
        self.items.iter().rev().take(limit).cloned().collect()
    }

    /// Look an item up by id.
    pub fn get(&self, id: ItemId) -> Option<&Arc<Item>> {
        self.items
            .binary_search_by(|item| item.id.cmp(&id))
            .ok()
            .map(|idx| &self.items[idx])
    }

    /// Number of items with `created_at >= cutoff`.
    pub fn count_since(&self, cutoff: DateTime<Utc>) -> usize {
        let first = self.items.partition_point(|item| item.created_at < cutoff);
        self.items.len() - first
    }

    /// Whether an item with this image hash is already visible.
    pub fn contains_image_hash(&self, hash: &str) -> bool {
        self.items
            .iter()
            .any(|item| item.image_hash.as_deref() == Some(hash))
    }
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self::new(0, Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use echolocator_types::item::NewItem;

    fn item(id: u64, created_at: DateTime<Utc>) -> Arc<Item> {
        Arc::new(
            NewItem {
                title: format!("item {id}"),
                description: None,
                location: "Library".to_string(),
                finder_contact: None,
                image_ref: format!("{id}.jpg"),
                image_hash: Some(format!("hash-{id}")),
                embedding: vec![1.0, 0.0],
                embedding_model: "stub".to_string(),
            }
            .into_item(ItemId(id), created_at),
        )
    }

    fn sample(now: DateTime<Utc>) -> StoreSnapshot {
        StoreSnapshot::new(
            3,
            vec![
                item(1, now - Duration::days(10)),
                item(2, now - Duration::days(2)),
                item(3, now - Duration::days(2)),
            ],
        )
    }

    #[test]
    fn test_recent_is_newest_first_with_id_tiebreak() {
        let snap = sample(Utc::now());
        let ids: Vec<u64> = snap.recent(10).iter().map(|i| i.id.get()).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(snap.recent(2).len(), 2);
        assert!(snap.recent(0).is_empty());
    }

    #[test]
    fn test_get_by_id() {
        let snap = sample(Utc::now());
        assert_eq!(snap.get(ItemId(2)).unwrap().title, "item 2");
        assert!(snap.get(ItemId(9)).is_none());
    }

    #[test]
    fn test_count_since_uses_cutoff_inclusively() {
        let now = Utc::now();
        let snap = sample(now);
        assert_eq!(snap.count_since(now - Duration::days(7)), 2);
        assert_eq!(snap.count_since(now - Duration::days(2)), 2);
        assert_eq!(snap.count_since(now - Duration::days(30)), 3);
        assert_eq!(snap.count_since(now), 0);
    }

    #[test]
    fn test_push_does_not_disturb_outstanding_snapshot() {
        let now = Utc::now();
        let mut live = sample(now);
        let frozen = live.clone();

        live.push(item(4, now));

        assert_eq!(frozen.len(), 3);
        assert_eq!(frozen.version(), 3);
        assert_eq!(live.len(), 4);
        assert_eq!(live.version(), 4);
        assert_eq!(live.latest().unwrap().id, ItemId(4));
    }

    #[test]
    fn test_contains_image_hash() {
        let snap = sample(Utc::now());
        assert!(snap.contains_image_hash("hash-2"));
        assert!(!snap.contains_image_hash("hash-9"));
    }
}
