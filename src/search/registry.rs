//! Process-wide set of tenant indexes

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::config::IndexConfig;
use crate::models::{Indexable, Organization, Tenant};
use crate::search::backend;
use crate::search::error::{SearchError, SearchResult};
use crate::search::index::{Index, ReindexReport};

/// Owns one [`Index`] per provisioned tenant
///
/// Constructed once at startup with [`IndexRegistry::init`] and shared by
/// reference; [`IndexRegistry::shutdown`] performs the final save.
#[derive(Debug)]
pub struct IndexRegistry {
    config: Arc<IndexConfig>,
    indexes: DashMap<String, Arc<Index>>,
}

impl IndexRegistry {
    /// Create an empty registry without touching disk
    pub fn new(config: IndexConfig) -> Self {
        Self {
            config: Arc::new(config),
            indexes: DashMap::new(),
        }
    }

    /// Create the data directory and provision every tenant
    pub fn init(config: IndexConfig, tenants: &[Organization]) -> SearchResult<Self> {
        std::fs::create_dir_all(&config.data_dir).map_err(|e| {
            SearchError::Persistence(format!(
                "Failed to create data directory {}: {}",
                config.data_dir.display(),
                e
            ))
        })?;

        let registry = Self::new(config);
        for tenant in tenants {
            registry.provision(tenant)?;
        }

        info!(
            data_dir = %registry.config.data_dir.display(),
            tenants = registry.indexes.len(),
            "Index registry initialized"
        );
        Ok(registry)
    }

    pub fn config(&self) -> &IndexConfig {
        &self.config
    }

    /// Open the index of a tenant, loading it from disk on first use
    pub fn provision(&self, tenant: &dyn Tenant) -> SearchResult<Arc<Index>> {
        if let Some(index) = self.indexes.get(tenant.name()) {
            return Ok(index.value().clone());
        }

        let index = Arc::new(Index::open(tenant, &self.config)?);
        let index = self
            .indexes
            .entry(tenant.name().to_string())
            .or_insert(index)
            .value()
            .clone();

        info!(tenant = %tenant.name(), tenant_id = tenant.id(), "Tenant provisioned");
        Ok(index)
    }

    pub fn index(&self, tenant: &str) -> SearchResult<Arc<Index>> {
        self.indexes
            .get(tenant)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| SearchError::TenantNotFound(tenant.to_string()))
    }

    /// Sorted names of every provisioned tenant
    pub fn tenants(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Queue an entity for indexing and return immediately
    ///
    /// The document is rebuilt on the blocking pool; a search issued right
    /// after this call may not see it yet. The returned handle can be
    /// awaited by callers that need to know the outcome. Must be called
    /// from within a tokio runtime.
    pub fn index_entity(&self, entity: Arc<dyn Indexable>) -> JoinHandle<SearchResult<()>> {
        let index = self.index(&entity.tenant_name());
        tokio::task::spawn_blocking(move || index?.index_entity(entity.as_ref()))
    }

    /// Full reindex of one tenant, awaited
    pub async fn reindex(
        &self,
        tenant: &str,
        entities: Vec<Arc<dyn Indexable>>,
    ) -> SearchResult<ReindexReport> {
        self.index(tenant)?.reindex(entities).await
    }

    /// Start a full reindex and return its completion signal
    pub fn reindex_in_background(
        &self,
        tenant: &str,
        entities: Vec<Arc<dyn Indexable>>,
    ) -> oneshot::Receiver<SearchResult<ReindexReport>> {
        let (tx, rx) = oneshot::channel();
        let index = self.index(tenant);

        tokio::spawn(async move {
            let result = match index {
                Ok(index) => index.reindex(entities).await,
                Err(e) => Err(e),
            };
            if tx.send(result).is_err() {
                info!("Reindex finished after its requester went away");
            }
        });

        rx
    }

    /// Handles to every provisioned index
    pub(crate) fn all_indexes(&self) -> Vec<Arc<Index>> {
        self.indexes.iter().map(|e| e.value().clone()).collect()
    }

    /// Save every dirty index
    ///
    /// Every index is attempted even if an earlier one fails; the first
    /// failure is returned. Returns the number of indexes written.
    pub fn save_all(&self) -> SearchResult<usize> {
        save_indexes(&self.all_indexes())
    }

    /// Reload every index from disk
    pub fn load_all(&self) -> SearchResult<()> {
        load_indexes(&self.all_indexes())
    }

    /// Periodically save dirty indexes until the task is aborted
    pub fn spawn_autosave(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        backend::spawn_autosave(self.clone(), interval)
    }

    /// Final save of every dirty index
    pub fn shutdown(&self) -> SearchResult<()> {
        info!("Shutting down index registry");
        match self.save_all() {
            Ok(written) => {
                info!(written, "Index registry shut down");
                Ok(())
            }
            Err(e) => {
                error!(error = %e, "Failed to save indexes on shutdown");
                Err(e)
            }
        }
    }
}

pub(crate) fn save_indexes(indexes: &[Arc<Index>]) -> SearchResult<usize> {
    let mut written = 0;
    let mut first_error = None;
    for index in indexes {
        match index.save() {
            Ok(true) => written += 1,
            Ok(false) => {}
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(written),
    }
}

pub(crate) fn load_indexes(indexes: &[Arc<Index>]) -> SearchResult<()> {
    for index in indexes {
        index.load()?;
        index.create_default_collections();
    }
    Ok(())
}
