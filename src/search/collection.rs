//! Named set of documents and the parallel query engine over them
//!
//! Every query fans out one task per document on the rayon pool. Tasks
//! report through two channels sized to the document count, one for errors
//! and one for match results, so no task ever blocks on send. The caller
//! joins every task, drains the error channel first and fails the whole
//! query if any document could not be read; only then are the results
//! assembled. The collection's read lock is held for the whole fan-out.

use crossbeam::channel;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use crate::metrics;
use crate::search::codec::DocumentCodec;
use crate::search::document::Document;
use crate::search::error::{SearchError, SearchResult};
use crate::search::query::{RangeQuery, SearchTerm, TextQuery};

/// Ids of the documents matched by a query
pub type DocumentIds = BTreeSet<String>;

/// A named, mutable set of documents keyed by document id
#[derive(Debug)]
pub struct Collection {
    name: String,
    docs: RwLock<HashMap<String, Document>>,
    codec: Arc<DocumentCodec>,
}

impl Collection {
    pub fn new(name: impl Into<String>, codec: Arc<DocumentCodec>) -> Self {
        Self::from_documents(name, HashMap::new(), codec)
    }

    pub(crate) fn from_documents(
        name: impl Into<String>,
        docs: HashMap<String, Document>,
        codec: Arc<DocumentCodec>,
    ) -> Self {
        Self {
            name: name.into(),
            docs: RwLock::new(docs),
            codec,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.docs.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.read().is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.docs.read().contains_key(id)
    }

    /// Total compressed bytes held by this collection's documents
    pub fn compressed_size(&self) -> usize {
        self.docs.read().values().map(Document::compressed_size).sum()
    }

    /// Build (or rebuild) the document for `id` from its flattened attributes
    ///
    /// The new document is built before the write lock is taken; readers see
    /// either the previous document or the new one, never a mix.
    pub fn add_document(&self, id: &str, flattened: &[String]) -> SearchResult<()> {
        let document = match Document::build(id, flattened, &self.codec) {
            Ok(document) => document,
            Err(e) => {
                metrics::DOCUMENTS_INDEXED_TOTAL
                    .with_label_values(&["failed"])
                    .inc();
                return Err(e);
            }
        };

        self.docs.write().insert(id.to_string(), document);
        metrics::DOCUMENTS_INDEXED_TOTAL
            .with_label_values(&["indexed"])
            .inc();

        debug!(
            collection = %self.name,
            document_id = %id,
            attributes = flattened.len(),
            "Document indexed"
        );
        Ok(())
    }

    /// Remove one document
    pub fn delete_document(&self, id: &str) -> SearchResult<()> {
        if self.docs.write().remove(id).is_none() {
            return Err(SearchError::DocumentNotFound {
                collection: self.name.clone(),
                id: id.to_string(),
            });
        }

        metrics::DOCUMENTS_INDEXED_TOTAL
            .with_label_values(&["deleted"])
            .inc();
        debug!(collection = %self.name, document_id = %id, "Document deleted");
        Ok(())
    }

    /// Every document id in the collection
    pub fn all_documents(&self) -> DocumentIds {
        self.docs.read().keys().cloned().collect()
    }

    /// Exact or wildcard `field:value` search
    ///
    /// `*:*` returns every document regardless of `negate`.
    pub fn search(&self, term: &str, negate: bool) -> SearchResult<DocumentIds> {
        let term = SearchTerm::parse(term)?;
        if let SearchTerm::All = term {
            let started = Instant::now();
            let all = self.all_documents();
            metrics::record_query(term.kind(), true, started.elapsed().as_secs_f64());
            return Ok(all);
        }

        self.fan_out(term.kind(), negate, |doc, codec| doc.examine(&term, codec))
    }

    /// Substring search over each document's raw attribute text
    pub fn search_text(&self, term: &str, negate: bool) -> SearchResult<DocumentIds> {
        let query = TextQuery::parse(term)?;
        self.fan_out("text", negate, |doc, codec| doc.text_search(&query, codec))
    }

    /// Lexicographic range search over one field
    pub fn search_range(&self, range: &RangeQuery, negate: bool) -> SearchResult<DocumentIds> {
        self.fan_out("range", negate, |doc, codec| doc.range(range, codec))
    }

    /// Copy of the current documents, for persistence
    pub(crate) fn snapshot(&self) -> HashMap<String, Document> {
        self.docs.read().clone()
    }

    fn fan_out<F>(&self, kind: &'static str, negate: bool, predicate: F) -> SearchResult<DocumentIds>
    where
        F: Fn(&Document, &DocumentCodec) -> SearchResult<bool> + Sync,
    {
        let started = Instant::now();
        let docs = self.docs.read();

        let capacity = docs.len().max(1);
        let (err_tx, err_rx) = channel::bounded::<SearchError>(capacity);
        let (hit_tx, hit_rx) = channel::bounded::<(&str, bool)>(capacity);
        let codec = self.codec.as_ref();
        let predicate = &predicate;

        rayon::scope(|scope| {
            for (id, doc) in docs.iter() {
                let err_tx = err_tx.clone();
                let hit_tx = hit_tx.clone();
                scope.spawn(move |_| match predicate(doc, codec) {
                    Ok(matched) => {
                        let _ = hit_tx.send((id.as_str(), matched));
                    }
                    Err(e) => {
                        let _ = err_tx.send(e);
                    }
                });
            }
        });
        drop(err_tx);
        drop(hit_tx);

        let mut errors = err_rx.try_iter();
        if let Some(err) = errors.next() {
            let others = errors.count();
            warn!(
                collection = %self.name,
                query_kind = kind,
                error = %err,
                other_failures = others,
                "Query failed on at least one document"
            );
            metrics::record_query(kind, false, started.elapsed().as_secs_f64());
            return Err(err);
        }

        let hits: DocumentIds = hit_rx
            .try_iter()
            .filter(|(_, matched)| *matched != negate)
            .map(|(id, _)| id.to_string())
            .collect();

        metrics::record_query(kind, true, started.elapsed().as_secs_f64());
        debug!(
            collection = %self.name,
            query_kind = kind,
            negate,
            documents = docs.len(),
            hits = hits.len(),
            "Query complete"
        );
        Ok(hits)
    }
}
