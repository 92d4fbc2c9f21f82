//! Shared fixtures for integration tests

#![allow(dead_code)]

use attribute_index::config::IndexConfig;
use attribute_index::models::{Indexable, Node, Organization};
use attribute_index::search::{DocumentIds, Index};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

pub fn test_config(dir: &Path) -> IndexConfig {
    IndexConfig {
        data_dir: dir.to_path_buf(),
        reindex_workers: 4,
        ..Default::default()
    }
}

pub fn acme() -> Organization {
    Organization::new("acme", 1)
}

pub fn open_index(dir: &Path) -> Index {
    Index::open(&acme(), &test_config(dir)).unwrap()
}

/// Node owned by `acme` whose automatic attributes are `attrs`
pub fn node(name: &str, attrs: Value) -> Node {
    let mut node = Node::new("acme", name);
    node.automatic = as_map(attrs);
    node
}

pub fn shared(node: Node) -> Arc<dyn Indexable> {
    Arc::new(node)
}

pub fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {}", other),
    }
}

pub fn ids(values: &[&str]) -> DocumentIds {
    values.iter().map(|s| s.to_string()).collect()
}
