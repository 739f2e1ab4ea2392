//! On-disk cache of the discovered search endpoint.

use std::path::{Path, PathBuf};

use barkeep_fetch::EndpointDescriptor;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::persistence::{default_descriptor_path, load_json_opt, save_json};

/// JSON file holding the last good [`EndpointDescriptor`].
#[derive(Debug, Clone)]
pub struct DescriptorCache {
    path: PathBuf,
}

impl DescriptorCache {
    /// Creates a cache at the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the cache file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached descriptor. A missing or corrupt file yields `None`.
    pub async fn load(&self) -> Option<EndpointDescriptor> {
        let descriptor: Option<EndpointDescriptor> = load_json_opt(&self.path).await;
        if let Some(d) = &descriptor {
            debug!(base_url = %d.base_url, discovered_at = %d.discovered_at, "Loaded cached descriptor");
        }
        descriptor
    }

    /// Saves a descriptor, replacing the cached one.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn save(&self, descriptor: &EndpointDescriptor) -> Result<(), StoreError> {
        save_json(&self.path, descriptor).await?;
        info!(path = %self.path.display(), base_url = %descriptor.base_url, "Cached endpoint descriptor");
        Ok(())
    }

    /// Removes the cached descriptor. Returns `false` if there was none.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be removed.
    pub async fn clear(&self) -> Result<bool, StoreError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl Default for DescriptorCache {
    fn default() -> Self {
        Self::new(default_descriptor_path())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use barkeep_fetch::{PaginationScheme, QueryGrammar, RequestEncoding, ResponseShape};
    use chrono::Utc;
    use std::collections::BTreeMap;

    fn descriptor() -> EndpointDescriptor {
        EndpointDescriptor {
            base_url: "https://search.example.com/rest/search/v2".into(),
            required_headers: BTreeMap::from([("origin".into(), "https://shop.example.com".into())]),
            grammar: QueryGrammar {
                encoding: RequestEncoding::QueryString,
                query_param: "q".into(),
                category_param: None,
                category_template: "{category}".into(),
                offset_param: "firstResult".into(),
                page_size_param: "numberOfResults".into(),
                fixed_params: BTreeMap::new(),
            },
            pagination: PaginationScheme::Offset,
            response_shape: ResponseShape::default(),
            source_page: "https://shop.example.com/products".into(),
            discovered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DescriptorCache::new(dir.path().join("cache").join("endpoint.json"));

        assert!(cache.load().await.is_none());
        cache.save(&descriptor()).await.unwrap();
        let loaded = cache.load().await.unwrap();
        assert_eq!(loaded.base_url, descriptor().base_url);
        assert_eq!(loaded.grammar, descriptor().grammar);

        assert!(cache.clear().await.unwrap());
        assert!(!cache.clear().await.unwrap());
        assert!(cache.load().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_cache_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DescriptorCache::new(dir.path().join("endpoint.json"));
        tokio::fs::write(cache.path(), "{\"base_url\": 3}").await.unwrap();
        assert!(cache.load().await.is_none());
    }
}
