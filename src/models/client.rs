use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Indexable;

/// An API client. The public key is never indexed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Client {
    pub name: String,

    #[serde(default)]
    pub organization: String,

    #[serde(default)]
    pub validator: bool,

    #[serde(default)]
    pub admin: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,
}

impl Indexable for Client {
    fn document_id(&self) -> String {
        self.name.clone()
    }

    fn collection_name(&self) -> String {
        "client".to_string()
    }

    fn tenant_name(&self) -> String {
        self.organization.clone()
    }

    fn flatten(&self) -> Map<String, Value> {
        let mut tree = Map::new();
        tree.insert("name".to_string(), Value::String(self.name.clone()));
        tree.insert("clientname".to_string(), Value::String(self.name.clone()));
        tree.insert("validator".to_string(), Value::Bool(self.validator));
        tree.insert("admin".to_string(), Value::Bool(self.admin));
        tree.insert("chef_type".to_string(), Value::String("client".to_string()));
        tree
    }
}
