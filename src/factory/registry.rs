//! Name to constructor registry used by the factory

use super::FactoryContext;
use crate::elastic::ElasticLoader;
use crate::etl::{Extractor, Loader, Params, RoleKind, Transformer};
use crate::storage::{CsvExtractor, CsvWriter, FileExtractor, SpreadsheetExtractor};
use crate::transform::{
    ColumnCapitaliser, ColumnReplacer, ColumnStripper, ContentReplacer, ContentStripper,
    DateFormatter, DateParser, DepartementCodeParser, Merger, Normalizer, NullValuesReplacer,
};
use eyre::Result;
use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

pub type ExtractorBuilder = Arc<dyn Fn(&Params) -> Result<Box<dyn Extractor>> + Send + Sync>;
pub type TransformerBuilder = Arc<dyn Fn(&Params) -> Result<Box<dyn Transformer>> + Send + Sync>;
pub type LoaderBuilder =
    Arc<dyn Fn(&Params, &FactoryContext) -> Result<Box<dyn Loader>> + Send + Sync>;

/// A registered constructor, tagged with the role it builds
#[derive(Clone)]
pub enum Builder {
    Extractor(ExtractorBuilder),
    Transformer(TransformerBuilder),
    Loader(LoaderBuilder),
}

impl Builder {
    pub fn kind(&self) -> RoleKind {
        match self {
            Self::Extractor(_) => RoleKind::Extractor,
            Self::Transformer(_) => RoleKind::Transformer,
            Self::Loader(_) => RoleKind::Loader,
        }
    }
}

/// Stable string keys mapped to role constructors
///
/// The builtin keys are `extractors.<Name>`, `transformers.<Name>` and `loaders.<Name>`.
#[derive(Clone, Default)]
pub struct Registry {
    entries: BTreeMap<String, Builder>,
}

static GLOBAL: OnceLock<Registry> = OnceLock::new();

impl Registry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared registry of builtin roles, built on first use
    pub fn global() -> &'static Registry {
        GLOBAL.get_or_init(Self::with_builtins)
    }

    /// A registry holding every builtin role, to extend before a run
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();

        registry.register_extractor("extractors.FileExtractor", |p| FileExtractor::from_params(p));
        registry.register_extractor("extractors.CsvExtractor", |p| CsvExtractor::from_params(p));
        registry.register_extractor("extractors.SpreadsheetExtractor", |p| {
            SpreadsheetExtractor::from_params(p)
        });

        registry.register_transformer("transformers.Normalizer", |p| Normalizer::from_params(p));
        registry.register_transformer("transformers.ColumnStripper", |p| {
            without_options("ColumnStripper", p);
            Ok(ColumnStripper)
        });
        registry.register_transformer("transformers.ColumnReplacer", |p| {
            ColumnReplacer::from_params(p)
        });
        registry.register_transformer("transformers.ColumnCapitaliser", |p| {
            without_options("ColumnCapitaliser", p);
            Ok(ColumnCapitaliser)
        });
        registry.register_transformer("transformers.ContentStripper", |p| {
            ContentStripper::from_params(p)
        });
        registry.register_transformer("transformers.ContentReplacer", |p| {
            ContentReplacer::from_params(p)
        });
        registry.register_transformer("transformers.NullValuesReplacer", |p| {
            without_options("NullValuesReplacer", p);
            Ok(NullValuesReplacer)
        });
        registry.register_transformer("transformers.DateFormatter", |p| DateFormatter::from_params(p));
        registry.register_transformer("transformers.DateParser", |p| DateParser::from_params(p));
        registry.register_transformer("transformers.Merger", |p| Merger::from_params(p));
        registry.register_transformer("transformers.DepartementCodeParser", |p| {
            DepartementCodeParser::from_params(p)
        });

        registry.register_loader("loaders.ElasticLoader", |p, context| {
            let mut params = p.clone();
            if let Some(indice) = &context.indice {
                params.insert("indice".to_string(), indice.clone().into());
            }
            match &context.store {
                Some(store) => ElasticLoader::with_store(&params, store.clone()),
                None => ElasticLoader::from_params(&params),
            }
        });
        registry.register_loader("loaders.CsvWriter", |p, _| CsvWriter::from_params(p));

        registry
    }

    pub fn register_extractor<E, F>(&mut self, name: impl Into<String>, constructor: F)
    where
        E: Extractor + 'static,
        F: Fn(&Params) -> Result<E> + Send + Sync + 'static,
    {
        let builder: ExtractorBuilder =
            Arc::new(move |params| Ok(Box::new(constructor(params)?) as Box<dyn Extractor>));
        self.insert(name.into(), Builder::Extractor(builder));
    }

    pub fn register_transformer<T, F>(&mut self, name: impl Into<String>, constructor: F)
    where
        T: Transformer + 'static,
        F: Fn(&Params) -> Result<T> + Send + Sync + 'static,
    {
        let builder: TransformerBuilder =
            Arc::new(move |params| Ok(Box::new(constructor(params)?) as Box<dyn Transformer>));
        self.insert(name.into(), Builder::Transformer(builder));
    }

    /// Register a loader; its constructor also receives the process context
    pub fn register_loader<L, F>(&mut self, name: impl Into<String>, constructor: F)
    where
        L: Loader + 'static,
        F: Fn(&Params, &FactoryContext) -> Result<L> + Send + Sync + 'static,
    {
        let builder: LoaderBuilder = Arc::new(move |params, context| {
            Ok(Box::new(constructor(params, context)?) as Box<dyn Loader>)
        });
        self.insert(name.into(), Builder::Loader(builder));
    }

    fn insert(&mut self, name: String, builder: Builder) {
        if self.entries.insert(name.clone(), builder).is_some() {
            log::debug!("Registry entry {} replaced", name);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Builder> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered keys, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

fn without_options(owner: &str, params: &Params) {
    if !params.is_empty() {
        let keys = params.keys().cloned().collect::<Vec<_>>().join(", ");
        log::warn!("{} takes no options ! ignored: {}", owner, keys);
    }
}
