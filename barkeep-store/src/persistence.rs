//! File persistence helpers.
//!
//! Default locations for the database and the descriptor cache, plus atomic
//! JSON load/save.

use serde::{de::DeserializeOwned, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::error::StoreError;

// ============================================================================
// Default Paths
// ============================================================================

/// Returns the default data directory.
///
/// - macOS: `~/Library/Application Support/barkeep`
/// - Linux: `~/.local/share/barkeep`
/// - Windows: `%APPDATA%\barkeep`
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("barkeep"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default cache directory.
///
/// - macOS: `~/Library/Caches/barkeep`
/// - Linux: `~/.cache/barkeep`
/// - Windows: `%LOCALAPPDATA%\barkeep`
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|c| c.join("barkeep"))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns the default SQLite database path.
pub fn default_database_path() -> PathBuf {
    default_data_dir().join("barkeep.db")
}

/// Returns the default descriptor cache path.
pub fn default_descriptor_path() -> PathBuf {
    default_cache_dir().join("endpoint.json")
}

// ============================================================================
// File Operations
// ============================================================================

/// Saves data to a JSON file.
///
/// Creates parent directories if they don't exist and writes atomically
/// (via temp file + rename).
pub async fn save_json<T: Serialize>(path: &Path, data: &T) -> Result<(), StoreError> {
    debug!(path = %path.display(), "Saving JSON file");

    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }

    let json = serde_json::to_string_pretty(data)?;

    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, &json).await?;
    tokio::fs::rename(&temp_path, path).await?;

    debug!(path = %path.display(), bytes = json.len(), "JSON file saved");
    Ok(())
}

/// Loads data from a JSON file.
pub async fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, StoreError> {
    debug!(path = %path.display(), "Loading JSON file");

    let content = tokio::fs::read_to_string(path).await?;
    let data = serde_json::from_str(&content)?;
    Ok(data)
}

/// Loads data from a JSON file, returning `None` if it is missing or
/// unreadable.
pub async fn load_json_opt<T: DeserializeOwned>(path: &Path) -> Option<T> {
    match load_json(path).await {
        Ok(data) => Some(data),
        Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => None,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable JSON file");
            None
        }
    }
}

/// Ensures a directory exists.
pub async fn ensure_dir(path: &Path) -> Result<(), StoreError> {
    if !path.as_os_str().is_empty() && !path.exists() {
        debug!(path = %path.display(), "Creating directory");
        tokio::fs::create_dir_all(path).await?;
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_default_paths() {
        assert!(default_database_path().ends_with("barkeep.db"));
        assert!(default_descriptor_path().ends_with("endpoint.json"));
        assert!(!default_data_dir().as_os_str().is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("data.json");
        let data = BTreeMap::from([("vodka".to_string(), 3_u32)]);

        save_json(&path, &data).await.unwrap();
        assert!(!path.with_extension("json.tmp").exists());

        let loaded: BTreeMap<String, u32> = load_json(&path).await.unwrap();
        assert_eq!(loaded, data);
    }

    #[tokio::test]
    async fn test_load_json_opt_missing_and_corrupt() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("missing.json");
        assert!(load_json_opt::<Vec<u32>>(&missing).await.is_none());

        let corrupt = temp_dir.path().join("corrupt.json");
        tokio::fs::write(&corrupt, "{not json").await.unwrap();
        assert!(load_json_opt::<Vec<u32>>(&corrupt).await.is_none());
    }
}
