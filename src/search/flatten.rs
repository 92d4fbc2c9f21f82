//! Flattening of attribute trees into `path:value` strings

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};

use crate::search::error::{SearchError, SearchResult};

/// Attribute whose entries are additionally broken out into `role`/`recipe`
const RUN_LIST: &str = "run_list";

/// Options controlling how attribute paths and values are emitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlattenOptions {
    /// Joins nested keys into a single path
    pub separator: char,

    /// Maximum number of characters kept from each value
    pub value_trim: Option<usize>,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            separator: '_',
            value_trim: None,
        }
    }
}

/// Converts an entity's attribute tree into the sorted, deduplicated set of
/// `path:value` strings that a document is built from
#[derive(Debug, Clone, Default)]
pub struct Flattener {
    options: FlattenOptions,
}

type Merged = BTreeMap<String, BTreeSet<String>>;

impl Flattener {
    pub fn new(options: FlattenOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &FlattenOptions {
        &self.options
    }

    /// Flatten a top-level attribute map
    ///
    /// Top-level keys are used as paths unchanged. Nested map keys are
    /// joined with the configured separator, and every nested map also
    /// lists its own sub-keys as values under its path.
    pub fn flatten(&self, tree: &Map<String, Value>) -> SearchResult<Vec<String>> {
        let mut merged = Merged::new();
        for (key, value) in tree {
            check_key(key)?;
            self.merge(key, value, &mut merged)?;
        }

        let lines: BTreeSet<String> = merged
            .into_iter()
            .flat_map(|(path, values)| {
                values
                    .into_iter()
                    .map(move |value| format!("{}:{}", path, value))
            })
            .collect();

        Ok(lines.into_iter().collect())
    }

    /// Flatten an arbitrary JSON value, which must be an object
    pub fn flatten_value(&self, value: &Value) -> SearchResult<Vec<String>> {
        match value {
            Value::Object(map) => self.flatten(map),
            other => Err(SearchError::InvalidDocument(format!(
                "expected an attribute map at the top level, found {}",
                value_kind(other)
            ))),
        }
    }

    fn merge(&self, path: &str, value: &Value, merged: &mut Merged) -> SearchResult<()> {
        match value {
            Value::Object(map) => {
                for (key, child) in map {
                    check_key(key)?;
                    merged
                        .entry(path.to_string())
                        .or_default()
                        .insert(key.clone());

                    let child_path = format!("{}{}{}", path, self.options.separator, key);
                    self.merge(&child_path, child, merged)?;
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.merge(path, item, merged)?;
                }
                if path == RUN_LIST {
                    self.expand_run_list(items, merged);
                }
            }
            scalar => {
                merged
                    .entry(path.to_string())
                    .or_default()
                    .insert(self.render(stringify(scalar)));
            }
        }
        Ok(())
    }

    /// Emit `role` and `recipe` entries parsed from `role[x]`/`recipe[x]`
    fn expand_run_list(&self, items: &[Value], merged: &mut Merged) {
        for item in items.iter().filter_map(Value::as_str) {
            if let Some((kind, name)) = parse_run_list_item(item) {
                merged
                    .entry(kind.to_string())
                    .or_default()
                    .insert(self.render(name.to_string()));
            }
        }
    }

    /// Fold line breaks into spaces so each emitted string stays one line
    /// of the text blob, then apply the value trim
    fn render(&self, value: String) -> String {
        let mut value = if value.contains(['\n', '\r']) {
            value.replace(['\n', '\r'], " ")
        } else {
            value
        };
        if let Some(limit) = self.options.value_trim {
            if let Some((idx, _)) = value.char_indices().nth(limit) {
                value.truncate(idx);
            }
        }
        value
    }
}

/// Split `role[web]` into `("role", "web")`
pub fn parse_run_list_item(item: &str) -> Option<(&'static str, &str)> {
    let (kind, rest) = if let Some(rest) = item.strip_prefix("role[") {
        ("role", rest)
    } else if let Some(rest) = item.strip_prefix("recipe[") {
        ("recipe", rest)
    } else {
        return None;
    };
    rest.strip_suffix(']').map(|name| (kind, name))
}

fn check_key(key: &str) -> SearchResult<()> {
    if key.contains('\n') {
        return Err(SearchError::InvalidDocument(format!(
            "attribute key {:?} contains a newline",
            key
        )));
    }
    Ok(())
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
