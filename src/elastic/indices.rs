//! Index creation and deletion from a mappings document
//!
//! A mappings document maps index names to their definition:
//!
//! ```json
//! { "sales": { "mappings": { "properties": { "REGION": { "type": "keyword" } } } } }
//! ```

use crate::client::IndexStore;
use crate::error::EtlError;
use eyre::{Context, Result};
use serde_json::{Map, Value as JsonValue};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which indices of a mappings document to act on
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSelector {
    All,
    None,
    Name(String),
}

impl FromStr for IndexSelector {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "all" => Self::All,
            "none" => Self::None,
            name => Self::Name(name.to_string()),
        })
    }
}

impl fmt::Display for IndexSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::None => write!(f, "none"),
            Self::Name(name) => write!(f, "{}", name),
        }
    }
}

/// Read a mappings document (JSON, or YAML by extension)
pub fn read_mappings(path: &Path) -> Result<Map<String, JsonValue>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read mappings file: {}", path.display()))?;
    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"));
    let document: JsonValue = if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse mappings file: {}", path.display()))?
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse mappings file: {}", path.display()))?
    };
    match document {
        JsonValue::Object(map) => Ok(map),
        _ => Err(EtlError::config(format!(
            "Mappings file {} must hold an object keyed by index name",
            path.display()
        ))
        .into()),
    }
}

/// Names of `mappings` picked by `selector`, warning when a named index is not described
fn selected<'a>(mappings: &'a Map<String, JsonValue>, selector: &IndexSelector) -> Vec<&'a str> {
    match selector {
        IndexSelector::All => mappings.keys().map(String::as_str).collect(),
        IndexSelector::None => Vec::new(),
        IndexSelector::Name(name) => match mappings.get_key_value(name) {
            Some((key, _)) => vec![key.as_str()],
            None => {
                log::warn!("Index {} is not described in the mappings", name);
                Vec::new()
            }
        },
    }
}

/// Create the selected indices that do not exist yet; returns the created names
pub async fn init_indices(
    store: &dyn IndexStore,
    mappings: &Map<String, JsonValue>,
    selector: &IndexSelector,
) -> Result<Vec<String>> {
    let mut created = Vec::new();
    for index in selected(mappings, selector) {
        if store.exists(index).await? {
            log::warn!("Index {} already exists", index);
            continue;
        }
        store
            .create(index, &mappings[index])
            .await
            .with_context(|| format!("Failed to create index {}", index))?;
        log::info!("Index {} created", index);
        created.push(index.to_string());
    }
    Ok(created)
}

/// Delete the selected indices that exist; returns the deleted names
pub async fn clean_indices(
    store: &dyn IndexStore,
    mappings: &Map<String, JsonValue>,
    selector: &IndexSelector,
) -> Result<Vec<String>> {
    let mut deleted = Vec::new();
    for index in selected(mappings, selector) {
        if !store.exists(index).await? {
            log::warn!("Index {} does not exist", index);
            continue;
        }
        store
            .delete(index)
            .await
            .with_context(|| format!("Failed to delete index {}", index))?;
        log::info!("Index {} deleted", index);
        deleted.push(index.to_string());
    }
    Ok(deleted)
}
