//! Declarative configuration files
//!
//! ```json
//! {
//!   "Processes": [
//!     {
//!       "name": "SALES",
//!       "Extractors": {"name": "extractors.FileExtractor", "sep": ";"},
//!       "Transformers": [{"name": "transformers.ColumnStripper"}],
//!       "Loaders": {"name": "loaders.ElasticLoader"},
//!       "indice": "sales"
//!     }
//!   ],
//!   "elastic": {"host": "localhost", "port": 9200}
//! }
//! ```

use crate::client::ElasticConfig;
use crate::error::EtlError;
use crate::etl::Params;
use eyre::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// A whole configuration file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(rename = "Processes", default)]
    pub processes: Vec<ProcessConfig>,
    #[serde(default)]
    pub elastic: ElasticConfig,
}

impl Config {
    /// Read a configuration file, as YAML for `.yml`/`.yaml` and JSON otherwise
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or does not describe a configuration
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yml") || e.eq_ignore_ascii_case("yaml"));

        let config: Result<Self, EtlError> = if is_yaml {
            serde_yaml::from_str(&content).map_err(|e| EtlError::config(e.to_string()))
        } else {
            serde_json::from_str(&content).map_err(|e| EtlError::config(e.to_string()))
        };
        let config: Self =
            config.with_context(|| format!("Invalid config file: {}", path.display()))?;
        log::debug!(
            "{} process(es) configured in {}",
            config.processes.len(),
            path.display()
        );
        Ok(config)
    }

    pub fn process(&self, name: &str) -> Option<&ProcessConfig> {
        self.processes.iter().find(|p| p.name == name)
    }
}

/// One pipeline as configured. Absent roles fall back to the pipeline defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProcessConfig {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "Extractors", alias = "Extractor", default)]
    pub extractor: Option<RoleConfig>,
    #[serde(rename = "Transformers", alias = "Transformer", default)]
    pub transformers: Option<OneOrMany<RoleConfig>>,
    #[serde(rename = "Loaders", alias = "Loader", default)]
    pub loader: Option<RoleConfig>,
    /// Destination index handed to the loader
    #[serde(default)]
    pub indice: Option<String>,
}

/// A registry key and the constructor params that go with it
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RoleConfig {
    pub name: String,
    #[serde(flatten)]
    pub params: Params,
}

impl RoleConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Params::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}
