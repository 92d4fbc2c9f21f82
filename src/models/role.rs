use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use super::{string_list, Indexable};

/// A named run list plus attributes applied to every node holding the role
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Role {
    pub name: String,

    #[serde(default)]
    pub organization: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub run_list: Vec<String>,

    /// Per-environment run lists
    #[serde(default)]
    pub env_run_lists: BTreeMap<String, Vec<String>>,

    #[serde(default)]
    pub default_attributes: Map<String, Value>,

    #[serde(default)]
    pub override_attributes: Map<String, Value>,
}

impl Indexable for Role {
    fn document_id(&self) -> String {
        self.name.clone()
    }

    fn collection_name(&self) -> String {
        "role".to_string()
    }

    fn tenant_name(&self) -> String {
        self.organization.clone()
    }

    fn flatten(&self) -> Map<String, Value> {
        let env_run_lists: Map<String, Value> = self
            .env_run_lists
            .iter()
            .map(|(env, items)| (env.clone(), string_list(items)))
            .collect();

        let mut tree = Map::new();
        tree.insert("name".to_string(), Value::String(self.name.clone()));
        tree.insert(
            "description".to_string(),
            Value::String(self.description.clone()),
        );
        tree.insert("run_list".to_string(), string_list(&self.run_list));
        tree.insert("env_run_lists".to_string(), Value::Object(env_run_lists));
        tree.insert(
            "default_attributes".to_string(),
            Value::Object(self.default_attributes.clone()),
        );
        tree.insert(
            "override_attributes".to_string(),
            Value::Object(self.override_attributes.clone()),
        );
        tree.insert("chef_type".to_string(), Value::String("role".to_string()));
        tree
    }
}
