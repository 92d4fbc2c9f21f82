use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{deep_merge, string_list, Indexable};

/// A managed machine
///
/// The four attribute layers are merged in precedence order (default,
/// normal, override, automatic) before indexing, so the document holds the
/// effective value of every attribute.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Node {
    pub name: String,

    #[serde(default)]
    pub organization: String,

    #[serde(default = "default_environment")]
    pub chef_environment: String,

    #[serde(default)]
    pub run_list: Vec<String>,

    #[serde(default)]
    pub default: Map<String, Value>,

    #[serde(default)]
    pub normal: Map<String, Value>,

    #[serde(default, rename = "override")]
    pub override_attributes: Map<String, Value>,

    #[serde(default)]
    pub automatic: Map<String, Value>,
}

fn default_environment() -> String {
    "_default".to_string()
}

impl Node {
    pub fn new(organization: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            organization: organization.into(),
            chef_environment: default_environment(),
            ..Default::default()
        }
    }

    /// Effective attributes after precedence merging
    pub fn merged_attributes(&self) -> Map<String, Value> {
        let mut merged = Map::new();
        for layer in [
            &self.default,
            &self.normal,
            &self.override_attributes,
            &self.automatic,
        ] {
            deep_merge(&mut merged, layer);
        }
        merged
    }
}

impl Indexable for Node {
    fn document_id(&self) -> String {
        self.name.clone()
    }

    fn collection_name(&self) -> String {
        "node".to_string()
    }

    fn tenant_name(&self) -> String {
        self.organization.clone()
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut tree = self.merged_attributes();
        tree.insert("name".to_string(), Value::String(self.name.clone()));
        tree.insert(
            "chef_environment".to_string(),
            Value::String(self.chef_environment.clone()),
        );
        tree.insert("run_list".to_string(), string_list(&self.run_list));
        tree.insert("chef_type".to_string(), Value::String("node".to_string()));
        tree
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_attribute_precedence() {
        let mut node = Node::new("acme", "web01");
        node.default = json!({ "nginx": { "port": 80, "workers": 2 } })
            .as_object()
            .cloned()
            .unwrap();
        node.override_attributes = json!({ "nginx": { "port": 8080 } })
            .as_object()
            .cloned()
            .unwrap();
        node.automatic = json!({ "platform": "ubuntu" }).as_object().cloned().unwrap();

        let tree = node.flatten();
        assert_eq!(tree["nginx"]["port"], json!(8080));
        assert_eq!(tree["nginx"]["workers"], json!(2));
        assert_eq!(tree["platform"], json!("ubuntu"));
        assert_eq!(tree["name"], json!("web01"));
        assert_eq!(tree["chef_environment"], json!("_default"));
    }

    #[test]
    fn test_deserialize_override_key() {
        let node: Node = serde_json::from_value(json!({
            "name": "db01",
            "run_list": ["role[db]"],
            "override": { "mysql": { "version": "8.0" } }
        }))
        .unwrap();

        assert_eq!(node.chef_environment, "_default");
        assert_eq!(node.override_attributes["mysql"]["version"], json!("8.0"));
        assert_eq!(node.collection_name(), "node");
    }
}
