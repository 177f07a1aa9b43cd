//! Data directory layout for Persona.
//!
//! Everything a deployment persists lives under one directory: the SQLite
//! database and `config.toml`.

use std::path::{Path, PathBuf};

/// Resolve the data directory from environment or platform defaults.
///
/// Priority:
/// 1. `PERSONA_DATA_DIR` environment variable
/// 2. `~/.persona`
pub fn resolve_data_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("PERSONA_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(home) = dirs::home_dir() {
        return home.join(".persona");
    }

    PathBuf::from(".persona")
}

/// Path of the deployment's `config.toml`.
pub fn config_path(data_dir: &Path) -> PathBuf {
    data_dir.join("config.toml")
}

/// Create the data directory if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(data_dir).await
}
