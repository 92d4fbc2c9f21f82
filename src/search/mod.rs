//! Multi-tenant attribute search over compressed per-document tries
//!
//! Every indexed entity is flattened into a sorted set of `path:value`
//! strings. Those strings become a [`Document`]: a compressed radix trie for
//! exact, wildcard and range lookups plus the compressed raw text for
//! substring search. Documents live in named [`Collection`]s, and each
//! tenant owns one [`Index`] of collections that is persisted to a single
//! file.
//!
//! ```text
//!   IndexRegistry ── tenant ──▶ Index ── name ──▶ Collection ── id ──▶ Document
//!                                 │                    │
//!                           save / load          rayon fan-out
//!                          (bincode + zlib)     (one task per doc)
//! ```
//!
//! # Example
//!
//! ```no_run
//! use attribute_index::config::IndexConfig;
//! use attribute_index::models::{Node, Organization};
//! use attribute_index::search::IndexRegistry;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = IndexRegistry::init(IndexConfig::default(), &[Organization::new("acme", 1)])?;
//!
//!     let node = Node::new("acme", "web01");
//!     registry.index_entity(Arc::new(node)).await??;
//!
//!     let hits = registry.index("acme")?.search("node", "name:web*", false)?;
//!     println!("{:?}", hits);
//!     Ok(())
//! }
//! ```

pub mod backend;
pub mod codec;
pub mod collection;
pub mod document;
pub mod error;
pub mod factory;
pub mod flatten;
pub mod index;
pub mod query;
pub mod registry;
pub mod trie;

pub use backend::{spawn_autosave, SearchBackend};
pub use codec::{Compressor, DocumentCodec, ZlibCompressor};
pub use collection::{Collection, DocumentIds};
pub use document::Document;
pub use error::{SearchError, SearchResult};
pub use factory::{create_backend, create_registry};
pub use flatten::{FlattenOptions, Flattener};
pub use index::{BuiltinCollection, Index, IndexStats, ReindexFailure, ReindexReport};
pub use query::{RangeQuery, SearchTerm, TextQuery};
pub use registry::IndexRegistry;
pub use trie::Trie;
