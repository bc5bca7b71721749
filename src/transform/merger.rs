//! Referential merge transformer

use super::join::{JoinKind, join};
use crate::etl::{Extractor, Params, Transformer, parse_params};
use crate::storage::FileExtractor;
use crate::table::Table;
use eyre::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// A single key or a list of keys
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Keys {
    One(String),
    Many(Vec<String>),
}

impl From<Keys> for Vec<String> {
    fn from(keys: Keys) -> Self {
        match keys {
            Keys::One(key) => vec![key],
            Keys::Many(keys) => keys,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct MergerOptions {
    #[serde(alias = "ref")]
    referential: PathBuf,
    #[serde(default, alias = "mergekey", alias = "on")]
    keys: Option<Keys>,
    #[serde(default)]
    how: JoinKind,
    /// Passed to the extractor reading the referential
    #[serde(default)]
    options: Params,
}

/// Enriches tables by joining them with a referential
///
/// The referential is either a table given up front or a file read once, at construction,
/// with a [`FileExtractor`].
#[derive(Debug, Clone)]
pub struct Merger {
    referential: Table,
    keys: Option<Vec<String>>,
    how: JoinKind,
}

impl Merger {
    pub fn new(referential: Table) -> Self {
        Self {
            referential,
            keys: None,
            how: JoinKind::default(),
        }
    }

    pub fn with_keys(mut self, keys: Vec<String>) -> Self {
        self.keys = Some(keys);
        self
    }

    pub fn with_how(mut self, how: JoinKind) -> Self {
        self.how = how;
        self
    }

    /// Build from params: `referential` (path, required), `keys`, `how`, `options`
    pub fn from_params(params: &Params) -> Result<Self> {
        let options: MergerOptions = parse_params("Merger", params)?;
        let referential = FileExtractor::default()
            .extract(&options.referential, &options.options)
            .with_context(|| {
                format!(
                    "Failed to read referential {}",
                    options.referential.display()
                )
            })?;
        let mut merger = Self::new(referential).with_how(options.how);
        if let Some(keys) = options.keys {
            merger = merger.with_keys(keys.into());
        }
        Ok(merger)
    }
}

impl Transformer for Merger {
    fn transform(&self, table: Table) -> Result<Table> {
        join(&table, &self.referential, self.keys.as_deref(), self.how)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use serde_json::json;

    fn table() -> Table {
        Table::from_rows(
            vec!["0", "1"],
            vec![
                vec![Value::Int(1), Value::from("a")],
                vec![Value::Int(2), Value::from("b")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_merge_with_self() {
        let merger = Merger::new(table()).with_keys(vec!["0".into(), "1".into()]);
        assert_eq!(merger.transform(table()).unwrap(), table());
    }

    #[test]
    fn test_from_params_reads_referential() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("regions.csv");
        std::fs::write(&path, "CODE,REGION\n1,north\n").unwrap();
        let params = json!({"referential": path, "mergekey": "CODE", "how": "left"});

        let merger = Merger::from_params(params.as_object().unwrap()).unwrap();
        let input = Table::from_rows(vec!["CODE"], vec![vec![Value::Int(1)], vec![Value::Int(5)]]).unwrap();
        let output = merger.transform(input).unwrap();

        assert_eq!(output.n_rows(), 2);
        assert_eq!(output.get(0, "REGION"), Some(&Value::from("north")));
        assert!(output.get(1, "REGION").unwrap().is_missing());
    }

    #[test]
    fn test_bad_join_kind() {
        let params = json!({"referential": "x.csv", "how": "cross"});
        assert!(Merger::from_params(params.as_object().unwrap()).is_err());
    }
}
