//! CLI helper functions

use crate::{
    client::{ElasticClient, ElasticConfig, IndexStore},
    elastic::{IndexSelector, clean_indices, init_indices, read_mappings},
    error::EtlError,
    etl::LoadReport,
    factory::{Config, FactoryContext, ProcessConfig, ProcessFactory},
};
use eyre::{Context, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Load the Elasticsearch client from the config file's `elastic` section
///
/// Environment variables take precedence over the file:
/// - ELASTIC_HOST: host name or full URL (default: localhost)
/// - ELASTIC_USER: username for basic auth (optional)
/// - ELASTIC_PASSWORD: password for basic auth (optional)
/// - ELASTIC_APIKEY: API key for auth (optional, wins over username/password)
/// - ELASTIC_CAFILE: PEM bundle of the CA to trust (optional, switches to https)
pub fn load_elastic_client(config: &ElasticConfig) -> Result<ElasticClient> {
    let config = config.clone().with_env_overrides();
    ElasticClient::from_config(&config).context("Failed to create Elasticsearch client")
}

/// Read the configuration file, failing with a clear message when it is missing
pub fn load_config(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(EtlError::config(format!(
            "Could not find config file {}",
            path.display()
        ))
        .into());
    }
    Config::from_file(path)
}

/// Processes to run: every one for `all`, otherwise the one called `name`
pub fn select_processes<'a>(config: &'a Config, name: &str) -> Result<Vec<&'a ProcessConfig>> {
    if name == "all" {
        return Ok(config.processes.iter().collect());
    }
    match config.process(name) {
        Some(process) => Ok(vec![process]),
        None => Err(EtlError::config(format!(
            "process {} not found in the configuration file !",
            name
        ))
        .into()),
    }
}

/// Regular files directly inside `dir`, sorted by path
pub fn source_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read directory: {}", dir.display()))?
    {
        let path = entry?.path();
        if !path.is_dir() {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Run one configured process on `source`
///
/// A file is processed on its own; a directory has all of its files bulked through the same
/// pipeline. `indice` replaces the process destination when given.
pub async fn process_from_config(
    factory: &ProcessFactory<'_>,
    process: &ProcessConfig,
    source: impl AsRef<Path>,
    indice: Option<&str>,
) -> Result<Vec<LoadReport>> {
    let source = source.as_ref();
    if !source.exists() {
        eyre::bail!("Could not find file {}", source.display());
    }

    let overridden;
    let factory = match indice {
        Some(indice) => {
            overridden = factory.with_indice(indice);
            &overridden
        }
        None => factory,
    };
    let pipeline = factory.create_process(process)?;

    if source.is_dir() {
        let files = source_files(source)?;
        log::info!(
            "{} file(s) found in {} for process {}",
            files.len(),
            source.display(),
            process.name
        );
        pipeline.bulk(files.as_slice()).await
    } else {
        Ok(vec![pipeline.process(source).await?])
    }
}

/// Run the selected processes of a configuration file on `source`
///
/// Returns the reports of every processed file.
pub async fn run_processes(
    config_file: impl AsRef<Path>,
    source: impl AsRef<Path>,
    process: &str,
    indice: Option<&str>,
) -> Result<Vec<LoadReport>> {
    let source = source.as_ref();
    let config = load_config(config_file)?;
    let processes = select_processes(&config, process)?;
    if !source.exists() {
        eyre::bail!("Could not find file {}", source.display());
    }

    let store: Arc<dyn IndexStore> = Arc::new(load_elastic_client(&config.elastic)?);
    let factory = ProcessFactory::new(FactoryContext::new(store));

    let mut reports = Vec::new();
    for process in processes {
        log::info!("Running process {}", process.name);
        reports.extend(process_from_config(&factory, process, source, indice).await?);
    }
    Ok(reports)
}

/// Create the indices of a mappings file that do not exist yet
pub async fn init_index(
    config_file: impl AsRef<Path>,
    mappings_file: impl AsRef<Path>,
    selector: &IndexSelector,
) -> Result<Vec<String>> {
    let config = load_config(config_file)?;
    let mappings = read_mappings(mappings_file.as_ref())?;
    let client = load_elastic_client(&config.elastic)?;
    init_indices(&client, &mappings, selector).await
}

/// Delete the indices of a mappings file that exist
pub async fn clean_index(
    config_file: impl AsRef<Path>,
    mappings_file: impl AsRef<Path>,
    selector: &IndexSelector,
) -> Result<Vec<String>> {
    let config = load_config(config_file)?;
    let mappings = read_mappings(mappings_file.as_ref())?;
    let client = load_elastic_client(&config.elastic)?;
    clean_indices(&client, &mappings, selector).await
}
