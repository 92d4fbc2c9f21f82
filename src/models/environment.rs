use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::Indexable;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Environment {
    pub name: String,

    #[serde(default)]
    pub organization: String,

    #[serde(default)]
    pub description: String,

    /// Cookbook name to version constraint
    #[serde(default)]
    pub cookbook_versions: BTreeMap<String, String>,

    #[serde(default)]
    pub default_attributes: Map<String, Value>,

    #[serde(default)]
    pub override_attributes: Map<String, Value>,
}

impl Indexable for Environment {
    fn document_id(&self) -> String {
        self.name.clone()
    }

    fn collection_name(&self) -> String {
        "environment".to_string()
    }

    fn tenant_name(&self) -> String {
        self.organization.clone()
    }

    fn flatten(&self) -> Map<String, Value> {
        let cookbook_versions: Map<String, Value> = self
            .cookbook_versions
            .iter()
            .map(|(cookbook, version)| (cookbook.clone(), Value::String(version.clone())))
            .collect();

        let mut tree = Map::new();
        tree.insert("name".to_string(), Value::String(self.name.clone()));
        tree.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        tree.insert(
            "cookbook_versions".to_string(),
            Value::Object(cookbook_versions),
        );
        tree.insert(
            "default_attributes".to_string(),
            Value::Object(self.default_attributes.clone()),
        );
        tree.insert(
            "override_attributes".to_string(),
            Value::Object(self.override_attributes.clone()),
        );
        tree.insert(
            "chef_type".to_string(),
            Value::String("environment".to_string()),
        );
        tree
    }
}
