//! Application state wiring the engine to its adapters.
//!
//! The engine is generic over the asset store and content hasher; AppState
//! pins it to the local filesystem store and SHA-256. The item repository and
//! embedder are picked at start-up (SQLite or in-memory, CLIP or offline).

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;

use echolocator_core::embedding::box_embedder::BoxEmbedder;
use echolocator_core::repository::box_item::BoxItemRepository;
use echolocator_core::repository::ephemeral::EphemeralItemRepository;
use echolocator_core::service::gateway::QueryGateway;
use echolocator_core::store::ItemStore;
use echolocator_infra::config::load_config;
use echolocator_infra::crypto::hash::Sha256ContentHasher;
use echolocator_infra::filesystem::{resolve_data_dir, resolve_under};
use echolocator_infra::sqlite::item::SqliteItemRepository;
use echolocator_infra::sqlite::pool::DatabasePool;
use echolocator_infra::storage::filesystem::LocalAssetStore;
use echolocator_infra::vector::{DeterministicEmbedder, FastEmbedClipEmbedder};
use echolocator_types::config::{EmbedderBackend, EngineConfig};

/// The gateway pinned to the concrete infra adapters.
pub type Gateway = QueryGateway<LocalAssetStore, Sha256ContentHasher>;

/// Start-up choices made on the command line.
#[derive(Debug, Clone, Default)]
pub struct StateOptions {
    /// Keep items in memory only.
    pub ephemeral: bool,
    /// Override `[embedder] backend` from config.
    pub embedder: Option<EmbedderBackend>,
}

/// Shared application state, used by both CLI commands and HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    pub config: Arc<EngineConfig>,
    pub data_dir: PathBuf,
    pub upload_dir: PathBuf,
}

impl AppState {
    /// Resolve the data directory, load config, open the repository and the
    /// embedder, and replay stored items into memory.
    pub async fn init(options: &StateOptions) -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let mut config = load_config(&data_dir).await;
        if let Some(backend) = options.embedder {
            config.embedder.backend = backend;
        }

        let repo = if options.ephemeral {
            tracing::info!("using in-memory item repository");
            BoxItemRepository::new(EphemeralItemRepository::new())
        } else {
            let db_path = resolve_under(&data_dir, &config.server.database);
            if let Some(parent) = db_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let pool = DatabasePool::open_path(&db_path)
                .await
                .with_context(|| format!("failed to open database {}", db_path.display()))?;
            BoxItemRepository::new(SqliteItemRepository::new(pool))
        };

        let embedder = build_embedder(&config, &data_dir).await?;
        Self::from_parts(config, data_dir, repo, embedder).await
    }

    /// Assemble state from already-built parts.
    pub async fn from_parts(
        config: EngineConfig,
        data_dir: PathBuf,
        repo: BoxItemRepository,
        embedder: BoxEmbedder,
    ) -> anyhow::Result<Self> {
        let upload_dir = resolve_under(&data_dir, &config.server.upload_dir);
        let store = ItemStore::open(repo, embedder.dimension())
            .await
            .context("failed to load stored items")?;
        tracing::info!(
            items = store.snapshot().len(),
            model = embedder.model_name(),
            "item store ready"
        );

        let gateway = QueryGateway::new(
            Arc::new(store),
            Arc::new(embedder),
            Arc::new(LocalAssetStore::new(upload_dir.clone())),
            Sha256ContentHasher::new(),
            &config,
        );

        Ok(Self {
            gateway: Arc::new(gateway),
            config: Arc::new(config),
            data_dir,
            upload_dir,
        })
    }
}

async fn build_embedder(config: &EngineConfig, data_dir: &Path) -> anyhow::Result<BoxEmbedder> {
    match config.embedder.backend {
        EmbedderBackend::Deterministic => {
            let embedder = DeterministicEmbedder::new(config.embedder.dimension)?;
            Ok(BoxEmbedder::new(embedder))
        }
        EmbedderBackend::Clip => {
            let cache_dir = data_dir.join("models");
            let embedder =
                tokio::task::spawn_blocking(move || FastEmbedClipEmbedder::try_new(Some(cache_dir)))
                    .await
                    .context("model loading task failed")??;
            Ok(BoxEmbedder::new(embedder))
        }
    }
}
