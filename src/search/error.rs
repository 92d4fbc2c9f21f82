//! Error types for search operations

/// Result type for search operations
pub type SearchResult<T> = std::result::Result<T, SearchError>;

/// Errors that can occur during indexing and search operations
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// Collection does not exist in the tenant's index
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    /// Document does not exist in the collection
    #[error("Document {id} not found in collection {collection}")]
    DocumentNotFound { collection: String, id: String },

    /// Tenant has no provisioned index
    #[error("No index provisioned for tenant: {0}")]
    TenantNotFound(String),

    /// Entity belongs to a different tenant than the index it was sent to
    #[error("Entity belongs to tenant {entity}, not {index}")]
    TenantMismatch { index: String, entity: String },

    /// Query term rejected before any document was examined
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Attribute tree could not be flattened
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Trie or text blob could not be built for one document
    #[error("Failed to build document {id}: {reason}")]
    BuildFailed { id: String, reason: String },

    /// Built-in collections cannot be deleted
    #[error("Collection {0} is built in and cannot be deleted")]
    ProtectedCollection(String),

    /// Save or load of the persisted index failed
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Persisted index could not be decoded
    #[error("Index corruption detected: {0}")]
    Corrupt(String),

    /// Serialization or compression of a blob failed
    #[error("Codec error: {0}")]
    Codec(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Reindex could not be carried out
    #[error("Reindex failed: {0}")]
    Reindex(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Blocking task was cancelled or panicked
    #[error("Background task failed: {0}")]
    Task(String),
}

impl From<regex::Error> for SearchError {
    fn from(err: regex::Error) -> Self {
        SearchError::InvalidQuery(err.to_string())
    }
}

impl SearchError {
    /// Short label used for metrics and structured logs
    pub fn kind(&self) -> &'static str {
        match self {
            SearchError::CollectionNotFound(_) => "collection_not_found",
            SearchError::DocumentNotFound { .. } => "document_not_found",
            SearchError::TenantNotFound(_) => "tenant_not_found",
            SearchError::TenantMismatch { .. } => "tenant_mismatch",
            SearchError::InvalidQuery(_) => "invalid_query",
            SearchError::InvalidDocument(_) => "invalid_document",
            SearchError::BuildFailed { .. } => "build_failed",
            SearchError::ProtectedCollection(_) => "protected_collection",
            SearchError::Persistence(_) => "persistence",
            SearchError::Corrupt(_) => "corrupt",
            SearchError::Codec(_) => "codec",
            SearchError::Io(_) => "io",
            SearchError::Reindex(_) => "reindex",
            SearchError::Configuration(_) => "configuration",
            SearchError::Task(_) => "task",
        }
    }
}
