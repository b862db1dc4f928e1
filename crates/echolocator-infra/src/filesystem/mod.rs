//! Data directory layout for Echo-Locator.
//!
//! The data directory holds `config.toml`, the SQLite database and the
//! upload directory. Paths from configuration are relative to it unless
//! absolute.

use std::path::{Path, PathBuf};

pub const ENV_DATA_DIR: &str = "ECHO_LOCATOR_DATA_DIR";

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `ECHO_LOCATOR_DATA_DIR` environment variable
/// 2. `~/.echolocator`
/// 3. `./.echolocator`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(ENV_DATA_DIR) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".echolocator");
    }

    PathBuf::from(".echolocator")
}

/// Resolve a configured path against the data directory.
pub fn resolve_under(data_dir: &Path, configured: &str) -> PathBuf {
    let path = Path::new(configured);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        data_dir.join(path)
    }
}
