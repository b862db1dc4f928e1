//! Engine configuration loader for Echo-Locator.
//!
//! Reads `config.toml` from the data directory (`~/.echolocator/` in
//! production) and deserializes it into [`EngineConfig`]. Falls back to
//! defaults when the file is missing or malformed, then applies the
//! `ECHO_LOCATOR_*` environment overrides.

use std::path::Path;

use echolocator_types::config::EngineConfig;
use echolocator_types::search::{DEFAULT_SCALE_FACTOR, SimilarityMapping};

pub const ENV_DB: &str = "ECHO_LOCATOR_DB";
pub const ENV_UPLOAD_DIR: &str = "ECHO_LOCATOR_UPLOAD_DIR";
pub const ENV_CORS: &str = "ECHO_LOCATOR_CORS";
pub const ENV_DEFAULT_THRESHOLD: &str = "ECHO_LOCATOR_DEFAULT_THRESHOLD";
pub const ENV_TITLE: &str = "ECHO_LOCATOR_TITLE";

/// Load configuration from `{data_dir}/config.toml` and the process
/// environment.
pub async fn load_config(data_dir: &Path) -> EngineConfig {
    let mut config = load_config_file(data_dir).await;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    config
}

/// Load `{data_dir}/config.toml` without environment overrides.
///
/// - If the file does not exist, returns [`EngineConfig::default()`].
/// - If the file exists but fails to parse, logs a warning and returns the default.
pub async fn load_config_file(data_dir: &Path) -> EngineConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return EngineConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return EngineConfig::default();
        }
    };

    match toml::from_str::<EngineConfig>(&content) {
        Ok(mut config) => {
            sanitize(&mut config);
            config
        }
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            EngineConfig::default()
        }
    }
}

/// Replace values that would break search invariants with their defaults.
fn sanitize(config: &mut EngineConfig) {
    let factor = config.search.scale_factor;
    if SimilarityMapping::scaled(factor).is_none() {
        tracing::warn!(
            scale_factor = factor,
            "scale_factor must be finite and at least 1, using {DEFAULT_SCALE_FACTOR}"
        );
        config.search.scale_factor = DEFAULT_SCALE_FACTOR;
    }
}

/// Apply `ECHO_LOCATOR_*` overrides read through `lookup`.
///
/// Empty values are ignored. An unparsable default threshold is logged and
/// left at its configured value.
pub fn apply_env_overrides<F>(config: &mut EngineConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(db) = get(ENV_DB) {
        config.server.database = db.trim().to_string();
    }
    if let Some(dir) = get(ENV_UPLOAD_DIR) {
        config.server.upload_dir = dir.trim().to_string();
    }
    if let Some(cors) = get(ENV_CORS) {
        config.server.cors_origins = cors
            .split(',')
            .map(str::trim)
            .filter(|origin| !origin.is_empty())
            .map(str::to_string)
            .collect();
    }
    if let Some(raw) = get(ENV_DEFAULT_THRESHOLD) {
        match raw.trim().parse::<f32>() {
            Ok(t) if t.is_finite() => config.search.default_threshold = t.clamp(0.0, 1.0),
            _ => tracing::warn!(
                value = %raw,
                "ignoring unparsable {ENV_DEFAULT_THRESHOLD}"
            ),
        }
    }
    if let Some(title) = get(ENV_TITLE) {
        config.api_title = title.trim().to_string();
    }
}
