use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Indexable;
use crate::search::{SearchError, SearchResult};

/// One item of a data bag
///
/// Each bag is its own collection, named after the bag. The item's
/// `raw_data` is indexed at the top level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataBagItem {
    pub organization: String,
    pub data_bag: String,
    id: String,
    pub raw_data: Map<String, Value>,
}

impl DataBagItem {
    /// Build an item; `raw_data` must carry a non-empty string `id`
    pub fn new(
        organization: impl Into<String>,
        data_bag: impl Into<String>,
        raw_data: Map<String, Value>,
    ) -> SearchResult<Self> {
        let data_bag = data_bag.into();
        let id = match raw_data.get("id") {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            _ => {
                return Err(SearchError::InvalidDocument(format!(
                    "data bag item in {} has no string id",
                    data_bag
                )))
            }
        };

        Ok(Self {
            organization: organization.into(),
            data_bag,
            id,
            raw_data,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Indexable for DataBagItem {
    fn document_id(&self) -> String {
        self.id.clone()
    }

    fn collection_name(&self) -> String {
        self.data_bag.clone()
    }

    fn tenant_name(&self) -> String {
        self.organization.clone()
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut tree = self.raw_data.clone();
        tree.insert("data_bag".to_string(), Value::String(self.data_bag.clone()));
        tree.insert(
            "chef_type".to_string(),
            Value::String("data_bag_item".to_string()),
        );
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_item_requires_id() {
        let raw = json!({ "password": "hunter2" }).as_object().cloned().unwrap();
        assert!(matches!(
            DataBagItem::new("acme", "secrets", raw),
            Err(SearchError::InvalidDocument(_))
        ));
    }

    #[test]
    fn test_item_indexes_into_bag_collection() {
        let raw = json!({ "id": "db", "host": "db01" }).as_object().cloned().unwrap();
        let item = DataBagItem::new("acme", "services", raw).unwrap();

        assert_eq!(item.document_id(), "db");
        assert_eq!(item.collection_name(), "services");
        assert_eq!(item.tenant_name(), "acme");

        let tree = item.flatten();
        assert_eq!(tree["host"], json!("db01"));
        assert_eq!(tree["data_bag"], json!("services"));
    }
}
