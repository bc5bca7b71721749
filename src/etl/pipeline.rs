//! Pipeline orchestration for ETL operations

use super::binding::{Advisory, Constructor, Params, Role, RoleKind, TransformerRoles};
use super::{Extractor, LoadReport, Loader, Transformer};
use crate::elastic::ElasticLoader;
use crate::error::EtlError;
use crate::storage::FileExtractor;
use crate::table::Table;
use crate::transform::Normalizer;
use eyre::{Context, Result};
use std::path::Path;
use std::sync::Arc;

/// How the transform stage runs, fixed at construction
enum TransformStage {
    Single(Box<dyn Transformer>),
    Chain(Vec<Box<dyn Transformer>>),
    Deferred(Constructor<dyn Transformer>),
}

/// How the load stage runs, fixed at construction
enum LoadStage {
    Bound(Box<dyn Loader>),
    Unbound(Constructor<dyn Loader>),
}

/// ETL Pipeline: one extractor, zero or more transformers and one loader
///
/// Transformer and loader may be given as instances (fixed parameters, reused for every
/// file) or as classes (built per call from that call's params). The classification is made
/// once in [`Pipeline::new`] and never revisited.
///
/// # Example
/// ```no_run
/// use tabload::etl::{Pipeline, Role};
/// use tabload::storage::CsvExtractor;
/// use tabload::transform::Normalizer;
///
/// # async fn example(loader: tabload::elastic::ElasticLoader) -> eyre::Result<()> {
/// let pipeline = Pipeline::new(
///     Some(Role::<dyn tabload::etl::Extractor>::instance(CsvExtractor::default())),
///     Some(Role::<dyn tabload::etl::Transformer>::instance(Normalizer::default()).into()),
///     Some(Role::<dyn tabload::etl::Loader>::instance(loader)),
/// )?;
///
/// let reports = pipeline.bulk(&["2020.csv", "2021.csv"]).await?;
/// println!("Loaded {} files", reports.len());
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    extractor: Box<dyn Extractor>,
    transform: TransformStage,
    load: LoadStage,
}

impl Pipeline {
    /// Create a new pipeline, applying defaults for missing roles
    ///
    /// Defaults: a [`FileExtractor`] instance, the [`Normalizer`] class and the
    /// [`ElasticLoader`] class.
    ///
    /// # Errors
    /// Returns a configuration error if the extractor is given as a class or if a list of
    /// transformers contains a class.
    pub fn new(
        extractor: Option<Role<dyn Extractor>>,
        transformer: Option<TransformerRoles>,
        loader: Option<Role<dyn Loader>>,
    ) -> Result<Self> {
        let extractor = match extractor {
            None => Box::new(FileExtractor::default()) as Box<dyn Extractor>,
            Some(Role::Instance(extractor)) => extractor,
            Some(Role::Class(_)) => {
                return Err(EtlError::config("Bad extractor: extractor must be instanced").into());
            }
        };

        let transform = match transformer {
            None => TransformStage::Deferred(Arc::new(|params: &Params| {
                Ok(Box::new(Normalizer::from_params(params)?) as Box<dyn Transformer>)
            })),
            Some(TransformerRoles::One(Role::Instance(t))) => TransformStage::Single(t),
            Some(TransformerRoles::One(Role::Class(c))) => TransformStage::Deferred(c),
            Some(TransformerRoles::Many(roles)) => {
                let mut chain = Vec::with_capacity(roles.len());
                for (position, role) in roles.into_iter().enumerate() {
                    match role {
                        Role::Instance(t) => chain.push(t),
                        Role::Class(_) => {
                            return Err(EtlError::config(format!(
                                "Bad transformer: list entry {position} is not instanced"
                            ))
                            .into());
                        }
                    }
                }
                TransformStage::Chain(chain)
            }
        };

        let load = match loader {
            None => LoadStage::Unbound(Arc::new(|params: &Params| {
                Ok(Box::new(ElasticLoader::from_params(params)?) as Box<dyn Loader>)
            })),
            Some(Role::Instance(l)) => LoadStage::Bound(l),
            Some(Role::Class(c)) => LoadStage::Unbound(c),
        };

        Ok(Self {
            extractor,
            transform,
            load,
        })
    }

    /// Always true: extractors are only accepted as instances
    pub fn extractor_is_instanced(&self) -> bool {
        true
    }

    /// True when the transform stage needs no per-call construction (single or chain)
    pub fn transformer_is_instanced(&self) -> bool {
        !matches!(self.transform, TransformStage::Deferred(_))
    }

    pub fn multiple_transformers(&self) -> bool {
        matches!(self.transform, TransformStage::Chain(_))
    }

    pub fn loader_is_instanced(&self) -> bool {
        matches!(self.load, LoadStage::Bound(_))
    }

    /// Extract `path` with the pipeline's extractor, forwarding `options` verbatim
    ///
    /// # Errors
    /// Returns an error if the extension is unsupported or the file cannot be read
    pub fn extract(&self, path: impl AsRef<Path>, options: &Params) -> Result<Table> {
        let path = path.as_ref();
        log::debug!("Extracting {}", path.display());
        let table = self
            .extractor
            .extract(path, options)
            .with_context(|| format!("Failed to extract {}", path.display()))?;
        log::info!(
            "Extracted {} rows, {} columns from {}",
            table.n_rows(),
            table.n_columns(),
            path.display()
        );
        Ok(table)
    }

    /// Transform a table
    ///
    /// Instanced transformers ignore `params` (with a warning); a transformer class is built
    /// from `params` for this call only.
    ///
    /// # Errors
    /// Returns an error if construction or any transformer fails
    pub fn transform(&self, table: Table, params: &Params) -> Result<Table> {
        match &self.transform {
            TransformStage::Chain(chain) => {
                if let Some(advisory) = Advisory::extra_arguments(RoleKind::Transformer, true, params) {
                    advisory.emit();
                }
                chain
                    .iter()
                    .try_fold(table, |table, transformer| transformer.transform(table))
            }
            TransformStage::Single(transformer) => {
                if let Some(advisory) = Advisory::extra_arguments(RoleKind::Transformer, false, params) {
                    advisory.emit();
                }
                transformer.transform(table)
            }
            TransformStage::Deferred(constructor) => {
                let transformer = constructor(params).context("Failed to build transformer")?;
                transformer.transform(table)
            }
        }
    }

    /// Load a table
    ///
    /// An instanced loader ignores `params` (with a warning); a loader class is built from
    /// `params` (typically `indice` and connection settings) for this call only.
    ///
    /// # Errors
    /// Returns an error if construction fails or the destination cannot be written
    pub async fn load(&self, table: Table, params: &Params) -> Result<LoadReport> {
        match &self.load {
            LoadStage::Bound(loader) => {
                if let Some(advisory) = Advisory::extra_arguments(RoleKind::Loader, false, params) {
                    advisory.emit();
                }
                loader.load(table).await
            }
            LoadStage::Unbound(constructor) => {
                let loader = constructor(params).context("Failed to build loader")?;
                loader.load(table).await
            }
        }
    }

    /// Run the complete pipeline on one file: extract, transform, load
    ///
    /// # Errors
    /// Returns an error if any stage fails
    pub async fn process(&self, path: impl AsRef<Path>) -> Result<LoadReport> {
        let path = path.as_ref();
        log::info!("Processing {}", path.display());
        let params = Params::new();
        let table = self.extract(path, &params)?;
        let table = self.transform(table, &params)?;
        let report = self.load(table, &params).await?;
        log::debug!(
            "{}: {} loaded, {} failed",
            path.display(),
            report.success,
            report.failed
        );
        Ok(report)
    }

    /// Process every file in order, sequentially
    ///
    /// Requires an instanced transformer and loader, since no per-file arguments can be
    /// given. The first failing file aborts the rest of the batch.
    ///
    /// # Errors
    /// Returns a configuration error naming the roles that are not instanced, or the first
    /// per-file error
    pub async fn bulk<P: AsRef<Path>>(&self, files: &[P]) -> Result<Vec<LoadReport>> {
        let mut unresolved = Vec::new();
        if !self.transformer_is_instanced() {
            unresolved.push(RoleKind::Transformer.to_string());
        }
        if !self.loader_is_instanced() {
            unresolved.push(RoleKind::Loader.to_string());
        }
        if !unresolved.is_empty() {
            return Err(EtlError::config(format!("{} not instanced", unresolved.join(", "))).into());
        }

        log::info!("Starting bulk of {} file(s)", files.len());
        let mut reports = Vec::with_capacity(files.len());
        for file in files {
            reports.push(self.process(file).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct MockExtractor;

    impl Extractor for MockExtractor {
        fn extract(&self, path: &Path, _options: &Params) -> Result<Table> {
            let name = path.display().to_string();
            Table::from_rows(vec!["file"], vec![vec![Value::from(name)]])
        }
    }

    struct Suffix(&'static str);

    impl Transformer for Suffix {
        fn transform(&self, table: Table) -> Result<Table> {
            let suffix = self.0;
            table.rename_columns(|name| format!("{name}{suffix}"))
        }
    }

    #[derive(Clone, Default)]
    struct RecordingLoader(Arc<Mutex<Vec<Table>>>);

    #[async_trait]
    impl Loader for RecordingLoader {
        async fn load(&self, table: Table) -> Result<LoadReport> {
            let rows = table.n_rows();
            self.0.lock().unwrap().push(table);
            Ok(LoadReport {
                success: rows,
                ..Default::default()
            })
        }
    }

    fn extractor() -> Option<Role<dyn Extractor>> {
        Some(Role::<dyn Extractor>::instance(MockExtractor))
    }

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_default_pipeline_flags() {
        let pipeline = Pipeline::new(None, None, None).unwrap();
        assert!(pipeline.extractor_is_instanced());
        assert!(!pipeline.transformer_is_instanced());
        assert!(!pipeline.multiple_transformers());
        assert!(!pipeline.loader_is_instanced());
    }

    #[test]
    fn test_extractor_class_rejected() {
        let result = Pipeline::new(
            Some(Role::<dyn Extractor>::class(|_| Ok(MockExtractor))),
            None,
            None,
        );
        let err = result.err().unwrap();
        assert!(err.to_string().contains("Bad extractor"));
    }

    #[test]
    fn test_list_with_class_rejected() {
        let roles = vec![
            Role::<dyn Transformer>::instance(Suffix("_a")),
            Role::<dyn Transformer>::class(|_| Ok(Suffix("_b"))),
        ];
        let err = Pipeline::new(extractor(), Some(roles.into()), None)
            .err()
            .unwrap();
        assert!(err.to_string().contains("Bad transformer"));
        assert!(crate::error::etl_error(&err).unwrap().is_config());
    }

    #[test]
    fn test_chain_applies_in_order() {
        let roles = vec![
            Role::<dyn Transformer>::instance(Suffix("_a")),
            Role::<dyn Transformer>::instance(Suffix("_b")),
        ];
        let pipeline = Pipeline::new(extractor(), Some(roles.into()), None).unwrap();
        assert!(pipeline.multiple_transformers());
        assert!(pipeline.transformer_is_instanced());

        let table = Table::from_rows(vec!["c"], vec![vec![Value::Int(1)]]).unwrap();
        let output = pipeline
            .transform(table, &params(json!({"ignored": true})))
            .unwrap();
        assert_eq!(output.column_names(), vec!["c_a_b"]);
    }

    #[test]
    fn test_empty_chain_is_identity() {
        let pipeline = Pipeline::new(extractor(), Some(TransformerRoles::Many(vec![])), None).unwrap();
        let table = Table::from_rows(vec!["c"], vec![vec![Value::Int(1)]]).unwrap();
        assert_eq!(pipeline.transform(table.clone(), &Params::new()).unwrap(), table);
    }

    #[test]
    fn test_deferred_transformer_built_per_call() {
        let role = Role::<dyn Transformer>::class(|params: &Params| {
            let suffix = params.get("suffix").and_then(|v| v.as_str()).unwrap_or("_none");
            Ok(Suffix(if suffix == "_x" { "_x" } else { "_none" }))
        });
        let pipeline = Pipeline::new(extractor(), Some(role.into()), None).unwrap();
        let table = Table::from_rows(vec!["c"], vec![vec![Value::Int(1)]]).unwrap();

        let output = pipeline
            .transform(table.clone(), &params(json!({"suffix": "_x"})))
            .unwrap();
        assert_eq!(output.column_names(), vec!["c_x"]);

        let output = pipeline.transform(table, &Params::new()).unwrap();
        assert_eq!(output.column_names(), vec!["c_none"]);
    }

    #[tokio::test]
    async fn test_instanced_loader_ignores_extra_arguments() {
        let loader = RecordingLoader::default();
        let pipeline = Pipeline::new(
            extractor(),
            None,
            Some(Role::<dyn Loader>::instance(loader.clone())),
        )
        .unwrap();
        let table = Table::from_rows(vec!["c"], vec![vec![Value::Int(1)]]).unwrap();
        let report = pipeline
            .load(table, &params(json!({"indice": "other", "extra": 1})))
            .await
            .unwrap();
        assert_eq!(report.success, 1);
        assert_eq!(loader.0.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_process_runs_all_stages() {
        let loader = RecordingLoader::default();
        let pipeline = Pipeline::new(
            extractor(),
            Some(Role::<dyn Transformer>::instance(Suffix("_t")).into()),
            Some(Role::<dyn Loader>::instance(loader.clone())),
        )
        .unwrap();

        pipeline.process("data.csv").await.unwrap();

        let loaded = loader.0.lock().unwrap();
        assert_eq!(loaded[0].column_names(), vec!["file_t"]);
        assert_eq!(loaded[0].get(0, "file_t"), Some(&Value::from("data.csv")));
    }

    #[tokio::test]
    async fn test_bulk_processes_files_in_order() {
        let loader = RecordingLoader::default();
        let pipeline = Pipeline::new(
            extractor(),
            Some(Role::<dyn Transformer>::instance(Suffix("")).into()),
            Some(Role::<dyn Loader>::instance(loader.clone())),
        )
        .unwrap();

        let reports = pipeline.bulk(&["file1", "file2"]).await.unwrap();
        assert_eq!(reports.len(), 2);

        let loaded = loader.0.lock().unwrap();
        let files: Vec<_> = loaded.iter().map(|t| t.get(0, "file").cloned()).collect();
        assert_eq!(
            files,
            vec![Some(Value::from("file1")), Some(Value::from("file2"))]
        );
    }

    #[tokio::test]
    async fn test_bulk_empty_is_noop() {
        let loader = RecordingLoader::default();
        let pipeline = Pipeline::new(
            extractor(),
            Some(Role::<dyn Transformer>::instance(Suffix("")).into()),
            Some(Role::<dyn Loader>::instance(loader.clone())),
        )
        .unwrap();

        let files: Vec<&str> = vec![];
        let reports = pipeline.bulk(&files).await.unwrap();
        assert!(reports.is_empty());
        assert!(loader.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_names_unresolved_roles() {
        let pipeline = Pipeline::new(None, None, None).unwrap();
        let err = pipeline.bulk(&["file1"]).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "configuration error: Transformer, Loader not instanced"
        );

        let pipeline = Pipeline::new(
            None,
            None,
            Some(Role::<dyn Loader>::instance(RecordingLoader::default())),
        )
        .unwrap();
        let err = pipeline.bulk(&["file1"]).await.unwrap_err();
        assert_eq!(err.to_string(), "configuration error: Transformer not instanced");

        let pipeline = Pipeline::new(
            None,
            Some(Role::<dyn Transformer>::instance(Suffix("")).into()),
            None,
        )
        .unwrap();
        let err = pipeline.bulk(&["file1"]).await.unwrap_err();
        assert_eq!(err.to_string(), "configuration error: Loader not instanced");
    }

    #[tokio::test]
    async fn test_bulk_aborts_on_first_failure() {
        struct FailOn(&'static str);

        impl Extractor for FailOn {
            fn extract(&self, path: &Path, options: &Params) -> Result<Table> {
                if path == Path::new(self.0) {
                    eyre::bail!("cannot read {}", path.display());
                }
                MockExtractor.extract(path, options)
            }
        }

        let loader = RecordingLoader::default();
        let pipeline = Pipeline::new(
            Some(Role::<dyn Extractor>::instance(FailOn("file2"))),
            Some(Role::<dyn Transformer>::instance(Suffix("")).into()),
            Some(Role::<dyn Loader>::instance(loader.clone())),
        )
        .unwrap();

        assert!(pipeline.bulk(&["file1", "file2", "file3"]).await.is_err());
        assert_eq!(loader.0.lock().unwrap().len(), 1);
    }
}
