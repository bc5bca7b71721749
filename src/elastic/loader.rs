//! Loader writing tables into an Elasticsearch index

use crate::client::{ElasticClient, ElasticConfig, IndexStore, WriteAction};
use crate::error::EtlError;
use crate::etl::{LoadReport, Loader, Params, parse_params};
use crate::storage::{BACKUP_DELIMITER, write_delimited};
use crate::table::Table;
use async_trait::async_trait;
use chrono::Local;
use chrono::format::{Item, StrftimeItems};
use eyre::{Context, Result};
use serde::Deserialize;
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_TIME_FREQ: &str = "_%m_%Y";
const DEFAULT_EXPORT_PREFIX: &str = "exported_data_";

fn default_time_freq() -> String {
    DEFAULT_TIME_FREQ.to_string()
}

fn default_true() -> bool {
    true
}

/// Settings of an [`ElasticLoader`]
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ElasticLoaderOptions {
    /// Base name of the destination index
    pub indice: String,
    /// strftime suffix appended to `indice` (and to backup file names)
    #[serde(default = "default_time_freq")]
    pub time_freq: String,
    #[serde(default)]
    pub path_to_export_folder: Option<PathBuf>,
    /// Append every loaded table to a `|` separated file in `path_to_export_folder`
    #[serde(default)]
    pub backup: bool,
    /// Prefix of backup file names (default `exported_data_`)
    #[serde(default)]
    pub name_export: Option<String>,
    /// Empty a non-empty destination before loading, keeping its mappings
    #[serde(default)]
    pub overwrite: bool,
    /// Append `time_freq` to `indice`
    #[serde(default = "default_true")]
    pub suffix: bool,
    /// Connection settings, used instead of the shared store when given
    #[serde(default)]
    pub es_conf: Option<ElasticConfig>,
}

impl ElasticLoaderOptions {
    pub fn new(indice: impl Into<String>) -> Self {
        Self {
            indice: indice.into(),
            time_freq: default_time_freq(),
            path_to_export_folder: None,
            backup: false,
            name_export: None,
            overwrite: false,
            suffix: true,
            es_conf: None,
        }
    }
}

/// Loads tables into an index named after `indice` and the current date
///
/// The destination is fixed when the loader is built: `indice` followed by the current date
/// rendered with `time_freq` (default `_%m_%Y`), or `indice` alone when `suffix` is false.
pub struct ElasticLoader {
    options: ElasticLoaderOptions,
    destination: String,
    store: Arc<dyn IndexStore>,
}

impl ElasticLoader {
    /// Create a loader writing through `store`
    ///
    /// # Errors
    /// Returns a configuration error if `backup` is set without an existing export folder or
    /// if `time_freq` is not a valid strftime pattern
    pub fn new(options: ElasticLoaderOptions, store: Arc<dyn IndexStore>) -> Result<Self> {
        if options.backup {
            match &options.path_to_export_folder {
                None => {
                    return Err(EtlError::config(
                        "No export folder passed but backup set to true !",
                    )
                    .into());
                }
                Some(folder) if !folder.is_dir() => {
                    return Err(EtlError::config(format!(
                        "Export folder {} does not exist but backup set to true !",
                        folder.display()
                    ))
                    .into());
                }
                Some(_) => {}
            }
        }
        if StrftimeItems::new(&options.time_freq).any(|item| matches!(item, Item::Error)) {
            return Err(EtlError::config(format!("Bad time_freq {:?}", options.time_freq)).into());
        }

        let destination = if options.suffix {
            format!("{}{}", options.indice, date_suffix(&options.time_freq))
        } else {
            options.indice.clone()
        };
        Ok(Self {
            options,
            destination,
            store,
        })
    }

    /// Build from params, connecting with `es_conf` (or the environment) through a new
    /// [`ElasticClient`]
    pub fn from_params(params: &Params) -> Result<Self> {
        let options: ElasticLoaderOptions = parse_params("ElasticLoader", params)?;
        let config = options
            .es_conf
            .clone()
            .unwrap_or_default()
            .with_env_overrides();
        let client = ElasticClient::from_config(&config).context("Failed to create Elasticsearch client")?;
        Self::new(options, Arc::new(client))
    }

    /// Build from params, writing through `store` unless params carry their own `es_conf`
    pub fn with_store(params: &Params, store: Arc<dyn IndexStore>) -> Result<Self> {
        let options: ElasticLoaderOptions = parse_params("ElasticLoader", params)?;
        if options.es_conf.is_some() {
            return Self::from_params(params);
        }
        Self::new(options, store)
    }

    /// Index the rows are written to
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// File the next backup is appended to, if backups are enabled
    pub fn backup_path(&self) -> Option<PathBuf> {
        if !self.options.backup {
            return None;
        }
        let folder = self.options.path_to_export_folder.as_ref()?;
        let prefix = self
            .options
            .name_export
            .as_deref()
            .unwrap_or(DEFAULT_EXPORT_PREFIX);
        Some(folder.join(format!(
            "{}{}{}.csv",
            prefix,
            self.destination,
            date_suffix(&self.options.time_freq)
        )))
    }

    /// Empty the destination, keeping its mappings. Missing or empty destinations are left
    /// alone.
    async fn recreate_destination(&self) -> Result<()> {
        let index = self.destination.as_str();
        if !self.store.exists(index).await? {
            log::debug!("Destination {} does not exist, nothing to overwrite", index);
            return Ok(());
        }
        let count = self.store.count(index).await?;
        if count == 0 {
            log::debug!("Destination {} is empty, nothing to overwrite", index);
            return Ok(());
        }
        log::info!("Overwriting {} ({} documents)", index, count);
        let mappings = self.store.mappings(index).await?;
        self.store.delete(index).await?;
        self.store
            .create(index, &json!({ "mappings": mappings }))
            .await
    }

    fn wrap_in_actions(&self, table: &Table) -> Vec<WriteAction> {
        table
            .records()
            .into_iter()
            .map(|source| WriteAction {
                index: self.destination.clone(),
                source,
            })
            .collect()
    }
}

#[async_trait]
impl Loader for ElasticLoader {
    async fn load(&self, table: Table) -> Result<LoadReport> {
        if self.options.overwrite {
            self.recreate_destination()
                .await
                .with_context(|| format!("Failed to overwrite {}", self.destination))?;
        }
        if let Some(path) = self.backup_path() {
            write_delimited(&path, &table, BACKUP_DELIMITER, true)
                .with_context(|| format!("Failed to back up to {}", path.display()))?;
        }

        let actions = self.wrap_in_actions(&table);
        log::info!("{} rows in the table", actions.len());

        let mut report = LoadReport::default();
        for (ok, detail) in self.store.stream_write(actions).await? {
            report.record(ok, detail);
        }

        log::info!(
            "{} successfully inserted into {}",
            report.success,
            self.destination
        );
        if report.failed > 0 {
            log::warn!("{} errors detected", report.failed);
            log::debug!("Error details : {:?}", report.errors);
        }
        Ok(report)
    }
}

fn date_suffix(time_freq: &str) -> String {
    Local::now().format(time_freq).to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::table::Value;
    use crate::storage::CsvExtractor;
    use crate::etl::Extractor;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// In-memory store recording every call
    #[derive(Default)]
    pub(crate) struct MockStore {
        pub docs: Mutex<HashMap<String, u64>>,
        pub calls: Mutex<Vec<String>>,
        pub written: Mutex<Vec<WriteAction>>,
        /// Actions at these positions are rejected
        pub reject: Vec<usize>,
    }

    impl MockStore {
        pub(crate) fn with_index(index: &str, docs: u64) -> Self {
            let store = Self::default();
            store.docs.lock().unwrap().insert(index.to_string(), docs);
            store
        }

        pub(crate) fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn call(&self, name: &str, index: &str) {
            self.calls.lock().unwrap().push(format!("{name} {index}"));
        }
    }

    #[async_trait]
    impl IndexStore for MockStore {
        async fn exists(&self, index: &str) -> Result<bool> {
            self.call("exists", index);
            Ok(self.docs.lock().unwrap().contains_key(index))
        }

        async fn count(&self, index: &str) -> Result<u64> {
            self.call("count", index);
            Ok(self.docs.lock().unwrap().get(index).copied().unwrap_or(0))
        }

        async fn mappings(&self, index: &str) -> Result<serde_json::Value> {
            self.call("mappings", index);
            Ok(json!({"properties": {"A": {"type": "keyword"}}}))
        }

        async fn delete(&self, index: &str) -> Result<()> {
            self.call("delete", index);
            self.docs.lock().unwrap().remove(index);
            Ok(())
        }

        async fn create(&self, index: &str, body: &serde_json::Value) -> Result<()> {
            self.call("create", index);
            assert!(body.get("mappings").is_some());
            self.docs.lock().unwrap().insert(index.to_string(), 0);
            Ok(())
        }

        async fn stream_write(
            &self,
            actions: Vec<WriteAction>,
        ) -> Result<Vec<(bool, serde_json::Value)>> {
            let results = actions
                .iter()
                .enumerate()
                .map(|(i, action)| {
                    if self.reject.contains(&i) {
                        (false, json!({"index": {"status": 400, "error": {"position": i}}}))
                    } else {
                        (true, json!({"index": {"_index": action.index, "status": 201}}))
                    }
                })
                .collect();
            self.written.lock().unwrap().extend(actions);
            Ok(results)
        }
    }

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn table(rows: usize) -> Table {
        let rows = (0..rows)
            .map(|i| vec![Value::Int(i as i64), Value::from(format!("row {i}"))])
            .collect();
        Table::from_rows(vec!["A", "B"], rows).unwrap()
    }

    #[test]
    fn test_destination_suffix() {
        let store = Arc::new(MockStore::default());
        let loader = ElasticLoader::with_store(&params(json!({"indice": "sales"})), store.clone()).unwrap();
        let expected = format!("sales{}", Local::now().format("_%m_%Y"));
        assert_eq!(loader.destination(), expected);

        let loader = ElasticLoader::with_store(
            &params(json!({"indice": "sales", "suffix": false})),
            store,
        )
        .unwrap();
        assert_eq!(loader.destination(), "sales");
    }

    #[test]
    fn test_backup_requires_existing_folder() {
        let store: Arc<dyn IndexStore> = Arc::new(MockStore::default());
        let err = ElasticLoader::with_store(&params(json!({"indice": "i", "backup": true})), store.clone())
            .err()
            .unwrap();
        assert!(err.to_string().contains("No export folder"));

        let err = ElasticLoader::with_store(
            &params(json!({"indice": "i", "backup": true, "path_to_export_folder": "/no/such/dir"})),
            store,
        )
        .err()
        .unwrap();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_indice_is_required() {
        let store = Arc::new(MockStore::default());
        assert!(ElasticLoader::with_store(&Params::new(), store).is_err());
    }

    #[tokio::test]
    async fn test_partial_failure_is_reported() {
        let store = Arc::new(MockStore {
            reject: vec![2, 5, 8],
            ..Default::default()
        });
        let loader = ElasticLoader::with_store(&params(json!({"indice": "i"})), store.clone()).unwrap();

        let report = loader.load(table(10)).await.unwrap();

        assert_eq!(report.success, 7);
        assert_eq!(report.failed, 3);
        assert_eq!(report.errors.len(), 3);
        assert_eq!(report.errors[0]["index"]["error"]["position"], 2);
        assert_eq!(store.written.lock().unwrap().len(), 10);
    }

    #[tokio::test]
    async fn test_actions_target_destination() {
        let store = Arc::new(MockStore::default());
        let loader = ElasticLoader::with_store(
            &params(json!({"indice": "dest", "suffix": false})),
            store.clone(),
        )
        .unwrap();

        loader.load(table(2)).await.unwrap();

        let written = store.written.lock().unwrap();
        assert_eq!(written[1].index, "dest");
        assert_eq!(written[1].source, json!({"A": 1, "B": "row 1"}));
    }

    #[tokio::test]
    async fn test_overwrite_empty_destination_does_nothing() {
        let store = Arc::new(MockStore::with_index("dest", 0));
        let loader = ElasticLoader::with_store(
            &params(json!({"indice": "dest", "suffix": false, "overwrite": true})),
            store.clone(),
        )
        .unwrap();

        let report = loader.load(table(3)).await.unwrap();

        assert_eq!(report.success, 3);
        assert_eq!(store.calls(), vec!["exists dest", "count dest"]);
    }

    #[tokio::test]
    async fn test_overwrite_recreates_with_mappings() {
        let store = Arc::new(MockStore::with_index("dest", 12));
        let loader = ElasticLoader::with_store(
            &params(json!({"indice": "dest", "suffix": false, "overwrite": true})),
            store.clone(),
        )
        .unwrap();

        loader.load(table(1)).await.unwrap();

        assert_eq!(
            store.calls(),
            vec!["exists dest", "count dest", "mappings dest", "delete dest", "create dest"]
        );
    }

    #[tokio::test]
    async fn test_backup_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MockStore::default());
        let loader = ElasticLoader::with_store(
            &params(json!({
                "indice": "dest",
                "backup": true,
                "path_to_export_folder": dir.path(),
                "name_export": "EX_",
            })),
            store,
        )
        .unwrap();
        let path = loader.backup_path().unwrap();
        let suffix = Local::now().format("_%m_%Y").to_string();
        assert_eq!(
            path.file_name().unwrap().to_string_lossy(),
            format!("EX_dest{suffix}{suffix}.csv")
        );

        let rows = (0..4)
            .map(|i| {
                vec![
                    Value::Int(i),
                    Value::from(format!("row {i}")),
                    Value::Float(i as f64 * 0.5 + 1.0),
                ]
            })
            .collect();
        let original = Table::from_rows(vec!["A", "B", "C"], rows).unwrap();
        loader.load(original.clone()).await.unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("row 0|1.0\n"));

        let reread = CsvExtractor::default()
            .extract(&path, &params(json!({"sep": "|", "converters": {"B": "str"}})))
            .unwrap();
        assert_eq!(reread, original);
    }
}
