//! Entity contracts consumed by the index, and the built-in entity types

pub mod client;
pub mod data_bag;
pub mod environment;
pub mod node;
pub mod organization;
pub mod role;

pub use client::Client;
pub use data_bag::DataBagItem;
pub use environment::Environment;
pub use node::Node;
pub use organization::Organization;
pub use role::Role;

use serde_json::{Map, Value};

/// Anything that can be indexed
///
/// The index never inspects concrete entity types; it only needs an
/// address and an attribute tree.
pub trait Indexable: Send + Sync {
    /// Id of the document within its collection
    fn document_id(&self) -> String;

    /// Collection the entity is indexed into
    fn collection_name(&self) -> String;

    /// Tenant that owns the entity
    fn tenant_name(&self) -> String;

    /// Attribute tree to be flattened into the document
    fn flatten(&self) -> Map<String, Value>;
}

/// An organization that owns exactly one index
pub trait Tenant: Send + Sync {
    fn name(&self) -> &str;

    fn id(&self) -> i64;
}

/// Recursively merge `source` into `target`; `source` wins on conflicts
pub(crate) fn deep_merge(target: &mut Map<String, Value>, source: &Map<String, Value>) {
    for (key, value) in source {
        match (target.get_mut(key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                deep_merge(existing, incoming);
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

pub(crate) fn string_list(items: &[String]) -> Value {
    Value::Array(items.iter().cloned().map(Value::String).collect())
}
