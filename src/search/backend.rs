//! Backend-agnostic index contract

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::models::{Indexable, Tenant};
use crate::search::collection::DocumentIds;
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::RangeQuery;
use crate::search::registry::{self, IndexRegistry};

/// Operations every index backend provides
///
/// Callers depend only on this trait so a backend built on a different
/// storage engine can be selected by configuration.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Prepare storage for a tenant
    async fn provision(&self, tenant: &dyn Tenant) -> SearchResult<()>;

    async fn create_collection(&self, tenant: &dyn Tenant, name: &str) -> SearchResult<()>;

    async fn delete_collection(&self, tenant: &dyn Tenant, name: &str) -> SearchResult<()>;

    async fn delete_item(&self, tenant: &dyn Tenant, collection: &str, id: &str)
        -> SearchResult<()>;

    /// Index (or re-index) one entity
    async fn save_item(&self, item: Arc<dyn Indexable>) -> SearchResult<()>;

    async fn search(
        &self,
        tenant: &dyn Tenant,
        collection: &str,
        term: &str,
        negate: bool,
    ) -> SearchResult<DocumentIds>;

    async fn search_text(
        &self,
        tenant: &dyn Tenant,
        collection: &str,
        term: &str,
        negate: bool,
    ) -> SearchResult<DocumentIds>;

    async fn search_range(
        &self,
        tenant: &dyn Tenant,
        collection: &str,
        range: &RangeQuery,
        negate: bool,
    ) -> SearchResult<DocumentIds>;

    /// Sorted collection names of a tenant
    async fn endpoints(&self, tenant: &dyn Tenant) -> SearchResult<Vec<String>>;

    /// Persist every tenant with unsaved changes
    async fn save(&self) -> SearchResult<()>;

    /// Restore every tenant from persistent storage
    async fn load(&self) -> SearchResult<()>;
}

/// Run blocking index work off the async executor
async fn blocking<T, F>(work: F) -> SearchResult<T>
where
    F: FnOnce() -> SearchResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| SearchError::Task(e.to_string()))?
}

#[async_trait]
impl SearchBackend for IndexRegistry {
    async fn provision(&self, tenant: &dyn Tenant) -> SearchResult<()> {
        self.provision(tenant).map(|_| ())
    }

    async fn create_collection(&self, tenant: &dyn Tenant, name: &str) -> SearchResult<()> {
        self.index(tenant.name())?.create_collection(name).map(|_| ())
    }

    async fn delete_collection(&self, tenant: &dyn Tenant, name: &str) -> SearchResult<()> {
        self.index(tenant.name())?.delete_collection(name)
    }

    async fn delete_item(
        &self,
        tenant: &dyn Tenant,
        collection: &str,
        id: &str,
    ) -> SearchResult<()> {
        self.index(tenant.name())?.delete_item(collection, id)
    }

    async fn save_item(&self, item: Arc<dyn Indexable>) -> SearchResult<()> {
        self.index_entity(item)
            .await
            .map_err(|e| SearchError::Task(e.to_string()))?
    }

    async fn search(
        &self,
        tenant: &dyn Tenant,
        collection: &str,
        term: &str,
        negate: bool,
    ) -> SearchResult<DocumentIds> {
        let index = self.index(tenant.name())?;
        let collection = collection.to_string();
        let term = term.to_string();
        blocking(move || index.search(&collection, &term, negate)).await
    }

    async fn search_text(
        &self,
        tenant: &dyn Tenant,
        collection: &str,
        term: &str,
        negate: bool,
    ) -> SearchResult<DocumentIds> {
        let index = self.index(tenant.name())?;
        let collection = collection.to_string();
        let term = term.to_string();
        blocking(move || index.search_text(&collection, &term, negate)).await
    }

    async fn search_range(
        &self,
        tenant: &dyn Tenant,
        collection: &str,
        range: &RangeQuery,
        negate: bool,
    ) -> SearchResult<DocumentIds> {
        let index = self.index(tenant.name())?;
        let collection = collection.to_string();
        let range = range.clone();
        blocking(move || index.search_range(&collection, &range, negate)).await
    }

    async fn endpoints(&self, tenant: &dyn Tenant) -> SearchResult<Vec<String>> {
        Ok(self.index(tenant.name())?.endpoints())
    }

    async fn save(&self) -> SearchResult<()> {
        let indexes = self.all_indexes();
        blocking(move || registry::save_indexes(&indexes).map(|_| ())).await
    }

    async fn load(&self) -> SearchResult<()> {
        let indexes = self.all_indexes();
        blocking(move || registry::load_indexes(&indexes)).await
    }
}

/// Save `backend` every `interval` until the returned task is aborted
///
/// Failed saves are logged and retried on the next tick.
pub fn spawn_autosave(backend: Arc<dyn SearchBackend>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match backend.save().await {
                Ok(()) => debug!("Autosave complete"),
                Err(e) => error!(error = %e, "Autosave failed"),
            }
        }
    })
}
