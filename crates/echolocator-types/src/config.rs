//! Engine configuration types for Echo-Locator.
//!
//! `EngineConfig` represents the top-level `config.toml` in the data
//! directory. Every field has a default, so an empty file (or no file at all)
//! yields a working configuration.

use serde::{Deserialize, Serialize};

use crate::search::{DEFAULT_SCALE_FACTOR, MappingKind, SimilarityMapping};

/// Top-level configuration for the engine and its HTTP boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_api_title")]
    pub api_title: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub listing: ListingConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub embedder: EmbedderConfig,
}

fn default_api_title() -> String {
    "Echo-Locator API".to_string()
}

fn default_api_version() -> String {
    "1.1.0".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_title: default_api_title(),
            api_version: default_api_version(),
            search: SearchConfig::default(),
            listing: ListingConfig::default(),
            stats: StatsConfig::default(),
            ingest: IngestConfig::default(),
            retry: RetryConfig::default(),
            server: ServerConfig::default(),
            embedder: EmbedderConfig::default(),
        }
    }
}

/// Search defaults and limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_threshold: f32,
    pub default_top_k: usize,
    pub max_top_k: usize,
    /// Minimum number of characters in a trimmed text query.
    pub min_query_chars: usize,
    pub mapping: MappingKind,
    /// Multiplier used when `mapping = "scaled"`. Must be finite and at
    /// least 1; anything else falls back to [`DEFAULT_SCALE_FACTOR`].
    pub scale_factor: f32,
}

impl SearchConfig {
    /// The concrete mapping this configuration selects.
    pub fn similarity_mapping(&self) -> SimilarityMapping {
        match self.mapping {
            MappingKind::Shifted => SimilarityMapping::Shifted,
            MappingKind::Clamped => SimilarityMapping::Clamped,
            MappingKind::Scaled => SimilarityMapping::scaled(self.scale_factor)
                .unwrap_or(SimilarityMapping::Scaled {
                    factor: DEFAULT_SCALE_FACTOR,
                }),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_threshold: 0.6,
            default_top_k: 10,
            max_top_k: 50,
            min_query_chars: 2,
            mapping: MappingKind::Shifted,
            scale_factor: DEFAULT_SCALE_FACTOR,
        }
    }
}

/// Listing page sizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListingConfig {
    pub recent_default: usize,
    pub recent_max: usize,
    pub list_default: usize,
    pub list_max: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            recent_default: 8,
            recent_max: 24,
            list_default: 25,
            list_max: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    /// Length of the `top_locations` ranking.
    pub top_locations: usize,
    pub recent_window_days: i64,
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self {
            top_locations: 5,
            recent_window_days: 7,
        }
    }
}

/// Ingestion validation limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub max_image_bytes: usize,
    pub reject_duplicates: bool,
    pub max_title_chars: usize,
    pub min_location_chars: usize,
    pub max_location_chars: usize,
    pub max_contact_chars: usize,
    pub embed_timeout_secs: u64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 10 * 1024 * 1024,
            reject_duplicates: true,
            max_title_chars: 120,
            min_location_chars: 2,
            max_location_chars: 120,
            max_contact_chars: 200,
            embed_timeout_secs: 30,
        }
    }
}

/// Bounded retry with exponential backoff for transient failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 100,
            max_backoff_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors_origins: Vec<String>,
    /// Image directory, relative to the data directory unless absolute.
    pub upload_dir: String,
    /// SQLite file, relative to the data directory unless absolute.
    pub database: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            cors_origins: vec![
                "http://localhost:5173".to_string(),
                "http://127.0.0.1:5173".to_string(),
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            upload_dir: "uploads".to_string(),
            database: "echolocator.db".to_string(),
        }
    }
}

/// Which embedding backend to wire at the system boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderBackend {
    /// fastembed CLIP ViT-B/32 (image + text, 512 dimensions).
    #[default]
    Clip,
    /// Offline hashing embedder; deterministic, not semantic.
    Deterministic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedderConfig {
    pub backend: EmbedderBackend,
    /// Output dimension of the deterministic backend.
    pub dimension: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            backend: EmbedderBackend::Clip,
            dimension: 512,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_config_default_values() {
        let config = EngineConfig::default();
        assert_eq!(config.api_title, "Echo-Locator API");
        assert!((config.search.default_threshold - 0.6).abs() < f32::EPSILON);
        assert_eq!(config.search.default_top_k, 10);
        assert_eq!(config.listing.recent_default, 8);
        assert_eq!(config.stats.top_locations, 5);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.embedder.backend, EmbedderBackend::Clip);
    }

    #[test]
    fn test_engine_config_deserialize_with_defaults() {
        let config: EngineConfig = toml::from_str("").unwrap();
        assert_eq!(config.search.max_top_k, 50);
        assert_eq!(config.listing.list_max, 100);
        assert_eq!(config.search.similarity_mapping(), SimilarityMapping::Shifted);
    }

    #[test]
    fn test_engine_config_partial_sections() {
        let toml_str = r#"
api_title = "Campus Lost & Found"

[search]
mapping = "scaled"
scale_factor = 2.5
default_top_k = 12

[server]
port = 9090

[embedder]
backend = "deterministic"
dimension = 64
"#;
        let config: EngineConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.api_title, "Campus Lost & Found");
        assert_eq!(config.search.default_top_k, 12);
        // Unspecified keys in a present section keep their defaults.
        assert_eq!(config.search.max_top_k, 50);
        assert_eq!(
            config.search.similarity_mapping(),
            SimilarityMapping::Scaled { factor: 2.5 }
        );
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.embedder.backend, EmbedderBackend::Deterministic);
        assert_eq!(config.embedder.dimension, 64);
    }

    #[test]
    fn test_invalid_scale_factor_falls_back_to_default() {
        for factor in ["0.0", "-3.0", "nan"] {
            let toml_str = format!("[search]\nmapping = \"scaled\"\nscale_factor = {factor}\n");
            let config: EngineConfig = toml::from_str(&toml_str).unwrap();
            let mapping = config.search.similarity_mapping();
            assert_eq!(
                mapping,
                SimilarityMapping::Scaled {
                    factor: DEFAULT_SCALE_FACTOR
                }
            );
            assert_eq!(mapping.apply(1.0), 1.0);
        }
    }

    #[test]
    fn test_engine_config_rejects_unknown_mapping() {
        let result: Result<EngineConfig, _> = toml::from_str("[search]\nmapping = \"cubic\"\n");
        assert!(result.is_err());
    }
}
