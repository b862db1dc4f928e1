//! Local filesystem asset store.
//!
//! Implements the `AssetStore` trait from `echolocator-core` with every
//! uploaded image stored flat under one upload directory. The reference
//! handed back is the bare file name, which the HTTP layer serves under
//! `/uploads/{image_ref}`.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;

use echolocator_core::storage::asset_store::AssetStore;
use echolocator_types::error::AssetError;
use echolocator_types::item::ImageContentType;

/// Attempts at finding a free file name before giving up.
const MAX_NAME_ATTEMPTS: u32 = 16;

/// Filesystem-backed image store.
///
/// Layout:
/// ```text
/// {upload_dir}/
///   20260101T120000.123456_Blue_Backpack.jpg
///   20260101T120004.981220_Keys.png
/// ```
#[derive(Debug, Clone)]
pub struct LocalAssetStore {
    upload_dir: PathBuf,
}

impl LocalAssetStore {
    /// Create a store rooted at `upload_dir`. The directory is created on
    /// first write.
    pub fn new(upload_dir: PathBuf) -> Self {
        Self { upload_dir }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Path on disk for a reference, after checking it names a plain file.
    pub fn path_for(&self, image_ref: &str) -> Result<PathBuf, AssetError> {
        validate_reference(image_ref)?;
        Ok(self.upload_dir.join(image_ref))
    }

    /// `{timestamp}_{hint}.{ext}`, with `-n` appended on retries.
    fn candidate_name(stamp: &str, hint: &str, ext: &str, attempt: u32) -> String {
        if attempt == 0 {
            format!("{stamp}_{hint}.{ext}")
        } else {
            format!("{stamp}_{hint}-{attempt}.{ext}")
        }
    }
}

/// References are bare file names: no separators, no parent segments, no
/// hidden files.
fn validate_reference(image_ref: &str) -> Result<(), AssetError> {
    let invalid = image_ref.is_empty()
        || image_ref.starts_with('.')
        || image_ref.contains("..")
        || image_ref.contains('/')
        || image_ref.contains('\\')
        || image_ref.contains('\0');
    if invalid {
        return Err(AssetError::InvalidReference(image_ref.to_string()));
    }
    Ok(())
}

fn io_error(context: &str, err: std::io::Error) -> AssetError {
    AssetError::Io(format!("{context}: {err}"))
}

impl AssetStore for LocalAssetStore {
    async fn put(
        &self,
        name_hint: &str,
        content_type: ImageContentType,
        bytes: &[u8],
    ) -> Result<String, AssetError> {
        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| io_error("create upload dir", e))?;

        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.6f").to_string();
        let ext = content_type.extension();

        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = Self::candidate_name(&stamp, name_hint, ext, attempt);
            let path = self.path_for(&name)?;

            // create_new refuses to clobber an image written in the same microsecond.
            let mut file = match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(io_error("create image file", e)),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(e) = written {
                let _ = tokio::fs::remove_file(&path).await;
                return Err(io_error("write image file", e));
            }

            tracing::debug!(image_ref = %name, size = bytes.len(), "image stored");
            return Ok(name);
        }

        Err(AssetError::Io(format!(
            "no free file name for '{name_hint}' after {MAX_NAME_ATTEMPTS} attempts"
        )))
    }

    async fn remove(&self, image_ref: &str) -> Result<(), AssetError> {
        let path = self.path_for(image_ref)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error("remove image file", e)),
        }
    }

    async fn list(&self) -> Result<Vec<String>, AssetError> {
        let mut entries = match tokio::fs::read_dir(&self.upload_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("read upload dir", e)),
        };

        let mut refs = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error("read upload dir", e))?
        {
            let is_file = entry
                .file_type()
                .await
                .map_err(|e| io_error("stat upload entry", e))?
                .is_file();
            if !is_file {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if validate_reference(name).is_ok() {
                    refs.push(name.to_string());
                }
            }
        }
        refs.sort();
        Ok(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_writes_bytes_with_extension() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path().join("uploads"));

        let image_ref = store
            .put("Blue_Backpack", ImageContentType::Png, b"png-bytes")
            .await
            .unwrap();

        assert!(image_ref.ends_with("_Blue_Backpack.png"));
        let on_disk = tokio::fs::read(store.path_for(&image_ref).unwrap())
            .await
            .unwrap();
        assert_eq!(on_disk, b"png-bytes");
    }

    #[tokio::test]
    async fn test_put_same_hint_does_not_clobber() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path().to_path_buf());

        let mut refs = Vec::new();
        for i in 0..5u8 {
            refs.push(
                store
                    .put("Keys", ImageContentType::Jpeg, &[i])
                    .await
                    .unwrap(),
            );
        }
        refs.sort();
        refs.dedup();
        assert_eq!(refs.len(), 5);
        assert_eq!(store.list().await.unwrap(), refs);
    }

    #[tokio::test]
    async fn test_remove_is_idempotent() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path().to_path_buf());

        let image_ref = store
            .put("Umbrella", ImageContentType::Webp, b"webp")
            .await
            .unwrap();
        store.remove(&image_ref).await.unwrap();
        store.remove(&image_ref).await.unwrap();
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path().join("never-created"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_directories_and_hidden_files() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path().to_path_buf());
        tokio::fs::create_dir(dir.path().join("nested")).await.unwrap();
        tokio::fs::write(dir.path().join(".DS_Store"), b"x").await.unwrap();
        tokio::fs::write(dir.path().join("a.jpg"), b"x").await.unwrap();

        assert_eq!(store.list().await.unwrap(), vec!["a.jpg".to_string()]);
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = tempdir().unwrap();
        let store = LocalAssetStore::new(dir.path().to_path_buf());

        for bad in ["../secret.jpg", "a/b.jpg", "a\\b.jpg", "", ".hidden"] {
            let err = store.remove(bad).await.unwrap_err();
            assert!(matches!(err, AssetError::InvalidReference(_)), "{bad}");
        }
    }
}
