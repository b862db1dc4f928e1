//! Cleanup of images persisted by an ingest that never committed.

use std::sync::Arc;

use tokio::sync::OwnedRwLockReadGuard;

use crate::storage::asset_store::AssetStore;

/// Owns a freshly stored image until its item commits.
///
/// `disarm` hands the image over to the committed item. `discard` removes it
/// in place. Dropping an armed guard (the ingest was cancelled or panicked)
/// schedules the removal on the runtime.
///
/// The guard also holds a read lock on the sweep gate, so the reconcile
/// sweep cannot mistake the in-flight image for an orphan.
pub(crate) struct OrphanGuard<A: AssetStore + 'static> {
    assets: Arc<A>,
    image_ref: Option<String>,
    _gate: OwnedRwLockReadGuard<()>,
}

impl<A: AssetStore + 'static> OrphanGuard<A> {
    pub(crate) fn new(assets: Arc<A>, image_ref: String, gate: OwnedRwLockReadGuard<()>) -> Self {
        Self {
            assets,
            image_ref: Some(image_ref),
            _gate: gate,
        }
    }

    pub(crate) fn image_ref(&self) -> &str {
        self.image_ref.as_deref().unwrap_or_default()
    }

    /// The item referencing the image is visible; keep the image.
    pub(crate) fn disarm(mut self) {
        self.image_ref = None;
    }

    /// Remove the image now.
    pub(crate) async fn discard(mut self) {
        if let Some(image_ref) = self.image_ref.take() {
            remove_orphan(self.assets.as_ref(), &image_ref).await;
        }
    }
}

impl<A: AssetStore + 'static> Drop for OrphanGuard<A> {
    fn drop(&mut self) {
        let Some(image_ref) = self.image_ref.take() else {
            return;
        };
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let assets = Arc::clone(&self.assets);
                handle.spawn(async move {
                    remove_orphan(assets.as_ref(), &image_ref).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    image_ref = %image_ref,
                    "no runtime to remove abandoned image; left for reconcile"
                );
            }
        }
    }
}

async fn remove_orphan<A: AssetStore>(assets: &A, image_ref: &str) {
    match assets.remove(image_ref).await {
        Ok(()) => tracing::warn!(image_ref, "removed image of uncommitted item"),
        Err(e) => tracing::warn!(
            image_ref,
            error = %e,
            "failed to remove image of uncommitted item; left for reconcile"
        ),
    }
}
