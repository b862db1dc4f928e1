//! Item types for Echo-Locator.
//!
//! An `Item` is one photographed found object: its free-text metadata, the
//! reference to its stored image, and the embedding vector the similarity
//! index ranks it by. Items are append-only and never mutated once visible.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use std::fmt;
use std::str::FromStr;

/// Unique, monotonically assigned item identifier.
///
/// Ids start at 1 and are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub u64);

impl ItemId {
    pub fn get(self) -> u64 {
        self.0
    }

    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(ItemId)
            .map_err(|_| format!("invalid item id: '{s}'"))
    }
}

/// Accepted image content types for uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageContentType {
    Jpeg,
    Png,
    Webp,
}

impl ImageContentType {
    /// The MIME type string (e.g. `image/jpeg`).
    pub fn mime(self) -> &'static str {
        match self {
            ImageContentType::Jpeg => "image/jpeg",
            ImageContentType::Png => "image/png",
            ImageContentType::Webp => "image/webp",
        }
    }

    /// File extension used when the asset store writes the image.
    pub fn extension(self) -> &'static str {
        match self {
            ImageContentType::Jpeg => "jpg",
            ImageContentType::Png => "png",
            ImageContentType::Webp => "webp",
        }
    }

    /// Infer the content type from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(ImageContentType::Jpeg),
            "png" => Some(ImageContentType::Png),
            "webp" => Some(ImageContentType::Webp),
            _ => None,
        }
    }
}

impl fmt::Display for ImageContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for ImageContentType {
    type Err = String;

    /// Parses a MIME type, ignoring parameters such as `; charset=...`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let essence = s.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
        match essence.as_str() {
            "image/jpeg" | "image/jpg" => Ok(ImageContentType::Jpeg),
            "image/png" => Ok(ImageContentType::Png),
            "image/webp" => Ok(ImageContentType::Webp),
            _ => Err("Upload JPG, PNG, or WEBP images only.".to_string()),
        }
    }
}

/// A persisted, visible item.
///
/// `embedding` has exactly the store's dimension and is never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub finder_contact: Option<String>,
    /// Opaque reference returned by the asset store.
    pub image_ref: String,
    /// Lowercase hex SHA-256 of the image bytes, when known.
    pub image_hash: Option<String>,
    pub embedding: Vec<f32>,
    /// Model that produced `embedding`.
    pub embedding_model: String,
    pub created_at: DateTime<Utc>,
}

/// An item awaiting insertion. The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub finder_contact: Option<String>,
    pub image_ref: String,
    pub image_hash: Option<String>,
    pub embedding: Vec<f32>,
    pub embedding_model: String,
}

impl NewItem {
    /// Attach the store-assigned identity, producing the visible record.
    pub fn into_item(self, id: ItemId, created_at: DateTime<Utc>) -> Item {
        Item {
            id,
            title: self.title,
            description: self.description,
            location: self.location,
            finder_contact: self.finder_contact,
            image_ref: self.image_ref,
            image_hash: self.image_hash,
            embedding: self.embedding,
            embedding_model: self.embedding_model,
            created_at,
        }
    }
}

/// Raw submission accepted by the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct ItemSubmission {
    pub title: String,
    pub location: String,
    pub description: Option<String>,
    pub finder_contact: Option<String>,
    /// Declared content type of `image` (e.g. the multipart part's type).
    pub content_type: String,
    pub image: Vec<u8>,
}

/// Boundary-facing projection of an item (no embedding).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: ItemId,
    pub title: String,
    pub description: Option<String>,
    pub location: String,
    pub finder_contact: Option<String>,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
}

impl ItemView {
    /// Build a view, prefixing the image reference with `asset_prefix`.
    pub fn from_item(item: &Item, asset_prefix: &str) -> Self {
        Self {
            id: item.id,
            title: item.title.clone(),
            description: item.description.clone(),
            location: item.location.clone(),
            finder_contact: item.finder_contact.clone(),
            image_url: format!("{}/{}", asset_prefix.trim_end_matches('/'), item.image_ref),
            created_at: item.created_at,
        }
    }
}

/// An item paired with its mapped similarity to a query, in `[0, 1]`.
#[derive(Debug, Clone)]
pub struct ScoredItem {
    pub item: std::sync::Arc<Item>,
    pub similarity: f32,
}

/// A search hit as returned over the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(flatten)]
    pub item: ItemView,
    pub similarity: f64,
}
