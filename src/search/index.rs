//! Per-tenant index: collection lifecycle, persistence and reindexing

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::{ErrorKind, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator};
use tracing::{debug, error, info, warn};

use crate::config::IndexConfig;
use crate::metrics;
use crate::models::{Indexable, Tenant};
use crate::search::codec::DocumentCodec;
use crate::search::collection::{Collection, DocumentIds};
use crate::search::document::{panic_message, Document};
use crate::search::error::{SearchError, SearchResult};
use crate::search::flatten::Flattener;
use crate::search::query::RangeQuery;

/// Collections every tenant has and that cannot be deleted
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, EnumString, Display, AsRefStr)]
#[strum(serialize_all = "snake_case")]
pub enum BuiltinCollection {
    Client,
    Environment,
    Node,
    Role,
}

impl BuiltinCollection {
    pub fn is_builtin(name: &str) -> bool {
        name.parse::<BuiltinCollection>().is_ok()
    }
}

type CollectionMap = HashMap<String, Arc<Collection>>;

/// On-disk form: collection name to document id to document
#[derive(Serialize, Deserialize)]
struct IndexSnapshot {
    collections: BTreeMap<String, HashMap<String, Document>>,
}

/// Index statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub tenant: String,

    /// Document count per collection
    pub collections: BTreeMap<String, usize>,

    pub total_documents: usize,

    /// Compressed size of every document blob in bytes
    pub compressed_bytes: usize,

    /// Whether there are unsaved mutations
    pub dirty: bool,

    pub last_saved: Option<DateTime<Utc>>,
}

/// One entity that could not be indexed during a reindex
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReindexFailure {
    pub collection: String,
    pub id: String,
    pub reason: String,
}

/// Outcome of a full reindex
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReindexReport {
    pub indexed: usize,
    pub failed: Vec<ReindexFailure>,
    pub elapsed: Duration,
}

impl ReindexReport {
    fn merge(&mut self, other: ReindexReport) {
        self.indexed += other.indexed;
        self.failed.extend(other.failed);
    }
}

/// Flatten-and-build path shared by live indexing and reindex workers
#[derive(Debug, Clone)]
struct EntityIndexer {
    tenant: String,
    flattener: Flattener,
    codec: Arc<DocumentCodec>,
}

impl EntityIndexer {
    fn index(&self, collections: &RwLock<CollectionMap>, entity: &dyn Indexable) -> SearchResult<()> {
        let owner = entity.tenant_name();
        if owner != self.tenant {
            return Err(SearchError::TenantMismatch {
                index: self.tenant.clone(),
                entity: owner,
            });
        }

        let id = entity.document_id();
        let attributes = panic::catch_unwind(AssertUnwindSafe(|| entity.flatten())).map_err(
            |cause| SearchError::BuildFailed {
                id: id.clone(),
                reason: panic_message("attribute flattening", cause.as_ref()),
            },
        )?;
        let flattened = self.flattener.flatten(&attributes)?;
        let collection = self.collection(collections, &entity.collection_name())?;
        collection.add_document(&id, &flattened)
    }

    /// Look up a collection, creating it if absent
    fn collection(&self, collections: &RwLock<CollectionMap>, name: &str) -> SearchResult<Arc<Collection>> {
        if name.is_empty() {
            return Err(SearchError::InvalidDocument(
                "collection name cannot be empty".to_string(),
            ));
        }
        if let Some(collection) = collections.read().get(name) {
            return Ok(collection.clone());
        }

        let collection = collections
            .write()
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(tenant = %self.tenant, collection = %name, "Collection created");
                Arc::new(Collection::new(name, self.codec.clone()))
            })
            .clone();
        Ok(collection)
    }

    fn defaults(&self) -> CollectionMap {
        BuiltinCollection::iter()
            .map(|builtin| {
                let name = builtin.to_string();
                let collection = Arc::new(Collection::new(name.clone(), self.codec.clone()));
                (name, collection)
            })
            .collect()
    }
}

/// The search index of one tenant
pub struct Index {
    tenant_id: i64,
    path: PathBuf,
    collections: RwLock<CollectionMap>,
    dirty: AtomicBool,
    last_saved: RwLock<Option<DateTime<Utc>>>,
    indexer: EntityIndexer,
    workers: usize,
    reindex_lock: tokio::sync::Mutex<()>,
    /// Serializes save and load against each other
    save_lock: Mutex<()>,
}

impl std::fmt::Debug for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Index")
            .field("tenant", &self.indexer.tenant)
            .field("tenant_id", &self.tenant_id)
            .field("path", &self.path)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl Index {
    /// Create an empty index for a tenant without touching disk
    pub fn new(tenant: &dyn Tenant, config: &IndexConfig) -> Self {
        Self {
            tenant_id: tenant.id(),
            path: config.data_dir.join(index_file_name(tenant)),
            collections: RwLock::new(HashMap::new()),
            dirty: AtomicBool::new(false),
            last_saved: RwLock::new(None),
            indexer: EntityIndexer {
                tenant: tenant.name().to_string(),
                flattener: Flattener::new(config.flatten_options()),
                codec: Arc::new(DocumentCodec::zlib(config.compression_level)),
            },
            workers: config.worker_count(),
            reindex_lock: tokio::sync::Mutex::new(()),
            save_lock: Mutex::new(()),
        }
    }

    /// Create the index, restore it from disk and ensure the defaults exist
    pub fn open(tenant: &dyn Tenant, config: &IndexConfig) -> SearchResult<Self> {
        let index = Self::new(tenant, config);
        index.load()?;
        index.create_default_collections();
        Ok(index)
    }

    pub fn tenant(&self) -> &str {
        &self.indexer.tenant
    }

    pub fn tenant_id(&self) -> i64 {
        self.tenant_id
    }

    /// Backing file of this index
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::Release);
    }

    /// Create a collection if it does not exist yet
    pub fn create_collection(&self, name: &str) -> SearchResult<Arc<Collection>> {
        let existed = self.collections.read().contains_key(name);
        let collection = self.indexer.collection(&self.collections, name)?;
        if !existed {
            self.mark_dirty();
        }
        Ok(collection)
    }

    /// Create the built-in collections that are missing
    pub fn create_default_collections(&self) {
        let mut collections = self.collections.write();
        for builtin in BuiltinCollection::iter() {
            let name = builtin.to_string();
            if !collections.contains_key(&name) {
                collections.insert(
                    name.clone(),
                    Arc::new(Collection::new(name, self.indexer.codec.clone())),
                );
                self.mark_dirty();
            }
        }
    }

    /// Delete a user-defined collection and all of its documents
    pub fn delete_collection(&self, name: &str) -> SearchResult<()> {
        if BuiltinCollection::is_builtin(name) {
            return Err(SearchError::ProtectedCollection(name.to_string()));
        }

        let removed = self.collections.write().remove(name);
        match removed {
            Some(collection) => {
                self.mark_dirty();
                info!(
                    tenant = %self.tenant(),
                    collection = %name,
                    documents = collection.len(),
                    "Collection deleted"
                );
                Ok(())
            }
            None => Err(SearchError::CollectionNotFound(name.to_string())),
        }
    }

    pub fn collection(&self, name: &str) -> SearchResult<Arc<Collection>> {
        self.collections
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| SearchError::CollectionNotFound(name.to_string()))
    }

    /// Build (or rebuild) the document for one entity
    pub fn index_entity(&self, entity: &dyn Indexable) -> SearchResult<()> {
        match self.indexer.index(&self.collections, entity) {
            Ok(()) => {
                self.mark_dirty();
                Ok(())
            }
            Err(e) => {
                error!(
                    tenant = %self.tenant(),
                    collection = %entity.collection_name(),
                    document_id = %entity.document_id(),
                    error = %e,
                    "Failed to index entity"
                );
                Err(e)
            }
        }
    }

    /// Remove one document
    pub fn delete_item(&self, collection: &str, id: &str) -> SearchResult<()> {
        self.collection(collection)?.delete_document(id)?;
        self.mark_dirty();
        Ok(())
    }

    pub fn search(&self, collection: &str, term: &str, negate: bool) -> SearchResult<DocumentIds> {
        self.collection(collection)?.search(term, negate)
    }

    pub fn search_text(&self, collection: &str, term: &str, negate: bool) -> SearchResult<DocumentIds> {
        self.collection(collection)?.search_text(term, negate)
    }

    pub fn search_range(
        &self,
        collection: &str,
        range: &RangeQuery,
        negate: bool,
    ) -> SearchResult<DocumentIds> {
        self.collection(collection)?.search_range(range, negate)
    }

    pub fn all_documents(&self, collection: &str) -> SearchResult<DocumentIds> {
        Ok(self.collection(collection)?.all_documents())
    }

    /// Sorted collection names
    pub fn endpoints(&self) -> Vec<String> {
        let mut names: Vec<String> = self.collections.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Drop every collection and recreate the defaults
    pub fn clear(&self) {
        *self.collections.write() = self.indexer.defaults();
        self.mark_dirty();
        info!(tenant = %self.tenant(), "Index cleared");
    }

    pub fn stats(&self) -> IndexStats {
        let collections: BTreeMap<String, usize> = self
            .collections
            .read()
            .iter()
            .map(|(name, collection)| (name.clone(), collection.len()))
            .collect();
        let compressed_bytes = self
            .collections
            .read()
            .values()
            .map(|collection| collection.compressed_size())
            .sum();

        IndexStats {
            tenant: self.tenant().to_string(),
            total_documents: collections.values().sum(),
            collections,
            compressed_bytes,
            dirty: self.is_dirty(),
            last_saved: *self.last_saved.read(),
        }
    }

    /// Write the whole index to disk
    ///
    /// Returns `Ok(false)` without touching disk when nothing changed since
    /// the last successful save.
    pub fn save(&self) -> SearchResult<bool> {
        let _guard = self.save_lock.lock();
        if !self.dirty.swap(false, Ordering::AcqRel) {
            metrics::INDEX_SAVES_TOTAL
                .with_label_values(&["skipped"])
                .inc();
            return Ok(false);
        }

        match self.write_snapshot() {
            Ok(bytes) => {
                *self.last_saved.write() = Some(Utc::now());
                metrics::INDEX_SAVES_TOTAL
                    .with_label_values(&["written"])
                    .inc();
                info!(
                    tenant = %self.tenant(),
                    path = %self.path.display(),
                    bytes,
                    "Index saved"
                );
                Ok(true)
            }
            Err(e) => {
                self.mark_dirty();
                metrics::INDEX_SAVES_TOTAL.with_label_values(&["error"]).inc();
                error!(tenant = %self.tenant(), error = %e, "Failed to save index");
                Err(e)
            }
        }
    }

    fn write_snapshot(&self) -> SearchResult<usize> {
        let snapshot = IndexSnapshot {
            collections: self
                .collections
                .read()
                .iter()
                .map(|(name, collection)| (name.clone(), collection.snapshot()))
                .collect(),
        };
        let payload = self.indexer.codec.pack(&snapshot)?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        if !dir.is_dir() {
            return Err(SearchError::Persistence(format!(
                "destination directory {} does not exist",
                dir.display()
            )));
        }

        let mut tmp = tempfile::NamedTempFile::new_in(dir).map_err(|e| {
            SearchError::Persistence(format!(
                "Failed to create temporary file in {}: {}",
                dir.display(),
                e
            ))
        })?;
        tmp.write_all(&payload)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| {
                SearchError::Persistence(format!(
                    "Failed to write {}: {}",
                    tmp.path().display(),
                    e
                ))
            })?;

        // the temporary file is removed when persisting fails
        tmp.persist(&self.path).map_err(|e| {
            SearchError::Persistence(format!(
                "Failed to rename {} to {}: {}",
                e.file.path().display(),
                self.path.display(),
                e.error
            ))
        })?;

        Ok(payload.len())
    }

    /// Replace the in-memory state with the persisted index
    ///
    /// A missing or empty file leaves the index untouched and returns
    /// `Ok(false)`. Anything that cannot be decoded is `Corrupt`.
    pub fn load(&self) -> SearchResult<bool> {
        let _guard = self.save_lock.lock();
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(tenant = %self.tenant(), path = %self.path.display(), "No persisted index found");
                return Ok(false);
            }
            Err(e) => {
                return Err(SearchError::Persistence(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        if bytes.is_empty() {
            warn!(tenant = %self.tenant(), path = %self.path.display(), "Persisted index is empty");
            return Ok(false);
        }

        let snapshot: IndexSnapshot = self.indexer.codec.unpack(&bytes).map_err(|e| {
            SearchError::Corrupt(format!("{}: {}", self.path.display(), e))
        })?;

        let codec = &self.indexer.codec;
        let collections: CollectionMap = snapshot
            .collections
            .into_iter()
            .map(|(name, docs)| {
                let collection = Arc::new(Collection::from_documents(name.clone(), docs, codec.clone()));
                (name, collection)
            })
            .collect();
        let documents: usize = collections.values().map(|c| c.len()).sum();

        *self.collections.write() = collections;
        self.dirty.store(false, Ordering::Release);
        info!(
            tenant = %self.tenant(),
            path = %self.path.display(),
            documents,
            "Index loaded"
        );
        Ok(true)
    }

    /// Rebuild the whole index from an authoritative list of entities
    ///
    /// Entities are indexed by a fixed pool of blocking workers into a
    /// staging map that replaces the live collections once every entity has
    /// been processed. Only one reindex runs at a time; a second caller
    /// waits for the first to finish.
    pub async fn reindex(&self, entities: Vec<Arc<dyn Indexable>>) -> SearchResult<ReindexReport> {
        let _guard = self.reindex_lock.lock().await;
        let started = Instant::now();
        let total = entities.len();
        info!(
            tenant = %self.tenant(),
            entities = total,
            workers = self.workers,
            "Reindex started"
        );

        let staging = Arc::new(RwLock::new(self.indexer.defaults()));
        let (tx, rx) = crossbeam::channel::unbounded::<Arc<dyn Indexable>>();

        let workers: Vec<_> = (0..self.workers.max(1))
            .map(|_| {
                let rx = rx.clone();
                let staging = staging.clone();
                let indexer = self.indexer.clone();
                tokio::task::spawn_blocking(move || {
                    let mut report = ReindexReport::default();
                    for entity in rx.iter() {
                        match indexer.index(&staging, entity.as_ref()) {
                            Ok(()) => report.indexed += 1,
                            Err(e) => {
                                warn!(
                                    tenant = %indexer.tenant,
                                    collection = %entity.collection_name(),
                                    document_id = %entity.document_id(),
                                    error = %e,
                                    "Entity skipped during reindex"
                                );
                                report.failed.push(ReindexFailure {
                                    collection: entity.collection_name(),
                                    id: entity.document_id(),
                                    reason: e.to_string(),
                                });
                            }
                        }
                    }
                    report
                })
            })
            .collect();
        drop(rx);

        for entity in entities {
            tx.send(entity)
                .map_err(|e| SearchError::Reindex(format!("Failed to queue entity: {}", e)))?;
        }
        drop(tx);

        let mut report = ReindexReport::default();
        for joined in futures::future::join_all(workers).await {
            let partial =
                joined.map_err(|e| SearchError::Reindex(format!("Reindex worker failed: {}", e)))?;
            report.merge(partial);
        }

        let staged = std::mem::take(&mut *staging.write());
        *self.collections.write() = staged;
        self.mark_dirty();

        report.elapsed = started.elapsed();
        metrics::REINDEX_DURATION_SECONDS.observe(report.elapsed.as_secs_f64());
        info!(
            tenant = %self.tenant(),
            indexed = report.indexed,
            failed = report.failed.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "Reindex complete"
        );
        Ok(report)
    }
}

/// File name of a tenant's index, safe for any tenant name
fn index_file_name(tenant: &dyn Tenant) -> String {
    let name: String = tenant
        .name()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{}-{}.idx", tenant.id(), name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DataBagItem, Node, Organization};
    use serde_json::json;
    use tempfile::TempDir;

    fn config(dir: &Path) -> IndexConfig {
        IndexConfig {
            data_dir: dir.to_path_buf(),
            reindex_workers: 2,
            ..Default::default()
        }
    }

    fn node(name: &str, platform: &str) -> Node {
        let mut node = Node::new("acme", name);
        node.automatic = json!({ "platform": platform }).as_object().cloned().unwrap();
        node
    }

    fn ids(values: &[&str]) -> DocumentIds {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_builtin_collection_names() {
        let names: Vec<String> = BuiltinCollection::iter().map(|b| b.to_string()).collect();
        assert_eq!(names, vec!["client", "environment", "node", "role"]);
        assert!(BuiltinCollection::is_builtin("node"));
        assert!(!BuiltinCollection::is_builtin("users"));
    }

    #[test]
    fn test_index_file_name_is_sanitized() {
        assert_eq!(index_file_name(&Organization::new("acme", 7)), "7-acme.idx");
        assert_eq!(
            index_file_name(&Organization::new("../evil org", 3)),
            "3-___evil_org.idx"
        );
    }

    #[test]
    fn test_default_collections_and_endpoints() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();

        assert_eq!(index.endpoints(), vec!["client", "environment", "node", "role"]);

        index.create_collection("users").unwrap();
        index.create_collection("users").unwrap();
        assert_eq!(
            index.endpoints(),
            vec!["client", "environment", "node", "role", "users"]
        );
    }

    #[test]
    fn test_delete_collection_rules() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();

        for builtin in ["node", "client", "environment", "role"] {
            assert!(matches!(
                index.delete_collection(builtin),
                Err(SearchError::ProtectedCollection(_))
            ));
        }
        assert!(matches!(
            index.delete_collection("missing"),
            Err(SearchError::CollectionNotFound(_))
        ));

        index.create_collection("users").unwrap();
        index.delete_collection("users").unwrap();
        assert!(index.collection("users").is_err());
    }

    #[test]
    fn test_index_entity_creates_collection_lazily() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();

        let raw = json!({ "id": "db", "host": "db01" }).as_object().cloned().unwrap();
        let item = DataBagItem::new("acme", "services", raw).unwrap();
        index.index_entity(&item).unwrap();

        assert_eq!(index.search("services", "host:db01", false).unwrap(), ids(&["db"]));
        assert!(index.is_dirty());
    }

    #[test]
    fn test_tenant_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();

        let foreign = Node::new("globex", "web01");
        assert!(matches!(
            index.index_entity(&foreign),
            Err(SearchError::TenantMismatch { .. })
        ));
        assert!(index.collection("node").unwrap().is_empty());
    }

    #[test]
    fn test_delete_item() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();
        index.index_entity(&node("web01", "ubuntu")).unwrap();

        index.delete_item("node", "web01").unwrap();
        assert!(index.all_documents("node").unwrap().is_empty());
        assert!(matches!(
            index.delete_item("node", "web01"),
            Err(SearchError::DocumentNotFound { .. })
        ));
        assert!(matches!(
            index.delete_item("nope", "web01"),
            Err(SearchError::CollectionNotFound(_))
        ));
    }

    #[test]
    fn test_save_is_skipped_when_clean() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();

        assert!(index.save().unwrap());
        assert!(!index.save().unwrap());

        index.index_entity(&node("web01", "ubuntu")).unwrap();
        assert!(index.save().unwrap());
        assert!(index.stats().last_saved.is_some());
    }

    #[test]
    fn test_save_into_missing_directory_fails_and_stays_dirty() {
        let dir = TempDir::new().unwrap();
        let index = Index::new(
            &Organization::new("acme", 1),
            &config(&dir.path().join("missing")),
        );
        index.create_default_collections();

        assert!(matches!(index.save(), Err(SearchError::Persistence(_))));
        assert!(index.is_dirty());
    }

    #[test]
    fn test_clear_recreates_defaults() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();
        index.index_entity(&node("web01", "ubuntu")).unwrap();
        index.create_collection("users").unwrap();

        index.clear();

        assert_eq!(index.endpoints(), vec!["client", "environment", "node", "role"]);
        assert_eq!(index.stats().total_documents, 0);
    }

    #[test]
    fn test_stats() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();
        index.index_entity(&node("web01", "ubuntu")).unwrap();
        index.index_entity(&node("web02", "centos")).unwrap();

        let stats = index.stats();
        assert_eq!(stats.tenant, "acme");
        assert_eq!(stats.collections["node"], 2);
        assert_eq!(stats.total_documents, 2);
        assert!(stats.compressed_bytes > 0);
        assert!(stats.dirty);
    }

    #[tokio::test]
    async fn test_reindex_replaces_contents() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();
        index.index_entity(&node("stale", "ubuntu")).unwrap();

        let entities: Vec<Arc<dyn Indexable>> = vec![
            Arc::new(node("web01", "ubuntu")),
            Arc::new(node("web02", "centos")),
            Arc::new(Node::new("globex", "intruder")),
        ];
        let report = index.reindex(entities).await.unwrap();

        assert_eq!(report.indexed, 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "intruder");
        assert_eq!(
            index.search("node", "platform:ubuntu", false).unwrap(),
            ids(&["web01"])
        );
        assert_eq!(index.endpoints(), vec!["client", "environment", "node", "role"]);
    }

    /// Entity whose attribute tree cannot be produced
    struct Broken;

    impl Indexable for Broken {
        fn document_id(&self) -> String {
            "broken".to_string()
        }

        fn collection_name(&self) -> String {
            "node".to_string()
        }

        fn tenant_name(&self) -> String {
            "acme".to_string()
        }

        fn flatten(&self) -> serde_json::Map<String, serde_json::Value> {
            panic!("attributes unavailable")
        }
    }

    #[test]
    fn test_panicking_entity_is_a_build_failure() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();

        match index.index_entity(&Broken) {
            Err(SearchError::BuildFailed { id, reason }) => {
                assert_eq!(id, "broken");
                assert!(reason.contains("attributes unavailable"));
            }
            other => panic!("expected BuildFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_reindex_survives_panicking_entity() {
        let dir = TempDir::new().unwrap();
        let index = Index::open(&Organization::new("acme", 1), &config(dir.path())).unwrap();

        let mut entities: Vec<Arc<dyn Indexable>> = vec![Arc::new(Broken)];
        for i in 0..10 {
            entities.push(Arc::new(node(&format!("web{:02}", i), "ubuntu")));
        }
        let report = index.reindex(entities).await.unwrap();

        assert_eq!(report.indexed, 10);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, "broken");
        assert_eq!(index.all_documents("node").unwrap().len(), 10);
    }
}
