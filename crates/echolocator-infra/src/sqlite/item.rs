//! SQLite item repository implementation.
//!
//! Implements `ItemRepository` from `echolocator-core`. Embeddings are
//! stored as little-endian `f32` BLOBs next to their dimension.

use chrono::{DateTime, Utc};
use sqlx::Row;

use echolocator_core::repository::item::ItemRepository;
use echolocator_types::error::RepositoryError;
use echolocator_types::item::{Item, ItemId};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `ItemRepository`.
pub struct SqliteItemRepository {
    pool: DatabasePool,
}

impl SqliteItemRepository {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to a domain `Item`.
struct ItemRow {
    id: i64,
    title: String,
    description: Option<String>,
    location: String,
    finder_contact: Option<String>,
    image_ref: String,
    image_hash: Option<String>,
    vector: Vec<u8>,
    vector_dim: i64,
    embedding_model: String,
    created_at: String,
}

impl ItemRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            description: row.try_get("description")?,
            location: row.try_get("location")?,
            finder_contact: row.try_get("finder_contact")?,
            image_ref: row.try_get("image_ref")?,
            image_hash: row.try_get("image_hash")?,
            vector: row.try_get("vector")?,
            vector_dim: row.try_get("vector_dim")?,
            embedding_model: row.try_get("embedding_model")?,
            created_at: row.try_get("created_at")?,
        })
    }

    fn into_item(self) -> Result<Item, RepositoryError> {
        let id = u64::try_from(self.id)
            .map_err(|_| RepositoryError::Query(format!("invalid item id: {}", self.id)))?;
        let embedding = decode_vector(&self.vector)?;
        if i64::try_from(embedding.len()).ok() != Some(self.vector_dim) {
            return Err(RepositoryError::Query(format!(
                "item {id}: vector has {} components but vector_dim is {}",
                embedding.len(),
                self.vector_dim
            )));
        }

        Ok(Item {
            id: ItemId(id),
            title: self.title,
            description: self.description,
            location: self.location,
            finder_contact: self.finder_contact,
            image_ref: self.image_ref,
            image_hash: self.image_hash,
            embedding,
            embedding_model: self.embedding_model,
            created_at: parse_datetime(&self.created_at)?,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

/// Encode a vector as consecutive little-endian `f32`s.
pub fn encode_vector(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|v| v.to_le_bytes()).collect()
}

/// Inverse of [`encode_vector`].
pub fn decode_vector(bytes: &[u8]) -> Result<Vec<f32>, RepositoryError> {
    if bytes.len() % 4 != 0 {
        return Err(RepositoryError::Query(format!(
            "vector blob length {} is not a multiple of 4",
            bytes.len()
        )));
    }
    Ok(bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect())
}

/// Pool exhaustion, I/O failures and lock contention may clear up;
/// everything else is permanent.
fn map_sqlx_error(e: sqlx::Error) -> RepositoryError {
    let transient = match &e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => true,
        sqlx::Error::Database(db_err) => db_err.message().contains("database is locked"),
        _ => false,
    };
    if transient {
        tracing::warn!(error = %e, "database unavailable");
        RepositoryError::Connection
    } else {
        RepositoryError::Query(e.to_string())
    }
}

impl ItemRepository for SqliteItemRepository {
    async fn load_all(&self) -> Result<Vec<Item>, RepositoryError> {
        let rows = sqlx::query("SELECT * FROM items ORDER BY id")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(map_sqlx_error)?;

        rows.iter()
            .map(|row| {
                ItemRow::from_row(row)
                    .map_err(|e| RepositoryError::Query(e.to_string()))?
                    .into_item()
            })
            .collect()
    }

    async fn append(&self, item: &Item) -> Result<(), RepositoryError> {
        let id = i64::try_from(item.id.get())
            .map_err(|_| RepositoryError::Query(format!("item id {} out of range", item.id)))?;

        let result = sqlx::query(
            "INSERT INTO items (id, title, description, location, finder_contact, image_ref, image_hash, vector, vector_dim, embedding_model, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(&item.location)
        .bind(&item.finder_contact)
        .bind(&item.image_ref)
        .bind(&item.image_hash)
        .bind(encode_vector(&item.embedding))
        .bind(item.embedding.len() as i64)
        .bind(&item.embedding_model)
        .bind(format_datetime(&item.created_at))
        .execute(&self.pool.writer)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.message().contains("UNIQUE") => {
                Err(RepositoryError::Conflict(format!(
                    "item {} conflicts with a stored item",
                    item.id
                )))
            }
            Err(e) => Err(map_sqlx_error(e)),
        }
    }
}
