use std::sync::Arc;

use crate::config::{IndexBackend, IndexConfig};
use crate::models::Organization;
use crate::search::backend::SearchBackend;
use crate::search::error::SearchResult;
use crate::search::registry::IndexRegistry;

/// Create the configured index backend and provision `tenants` on it
pub fn create_backend(
    config: &IndexConfig,
    tenants: &[Organization],
) -> SearchResult<Arc<dyn SearchBackend>> {
    let backend: Arc<dyn SearchBackend> = create_registry(config, tenants)?;
    Ok(backend)
}

/// Create the trie registry, whatever backend is configured
///
/// The relational backend is not part of this build; selecting it falls
/// back to the trie backend with a warning.
pub fn create_registry(
    config: &IndexConfig,
    tenants: &[Organization],
) -> SearchResult<Arc<IndexRegistry>> {
    match config.backend {
        IndexBackend::Trie => {
            tracing::info!(data_dir = ?config.data_dir, "Initializing trie index backend");
        }
        IndexBackend::Sql => {
            tracing::warn!("SQL index backend is not yet implemented, falling back to trie backend");
        }
    }

    let registry = IndexRegistry::init(config.clone(), tenants)?;
    Ok(Arc::new(registry))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_trie_backend() {
        let temp_dir = TempDir::new().unwrap();
        let config = IndexConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let backend = create_backend(&config, &[Organization::new("acme", 1)]).unwrap();
        let endpoints = backend.endpoints(&Organization::new("acme", 1)).await.unwrap();
        assert_eq!(endpoints, vec!["client", "environment", "node", "role"]);
    }

    #[tokio::test]
    async fn test_sql_falls_back_to_trie() {
        let temp_dir = TempDir::new().unwrap();
        let config = IndexConfig {
            backend: IndexBackend::Sql,
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let backend = create_backend(&config, &[Organization::new("acme", 1)]).unwrap();
        assert!(backend.endpoints(&Organization::new("acme", 1)).await.is_ok());
    }

    #[test]
    fn test_unwritable_data_dir() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let config = IndexConfig {
            data_dir: blocker.join("index"),
            ..Default::default()
        };
        assert!(create_registry(&config, &[]).is_err());
    }
}
