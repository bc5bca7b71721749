//! Builds pipelines from declarative configuration
//!
//! Every role of a [`ProcessConfig`] names a [`Registry`] entry; the remaining keys of the role
//! record are the constructor params. Configured roles are built once, as instances, so the
//! resulting pipeline can [`bulk`](crate::etl::Pipeline::bulk) whole directories.

mod config;
mod registry;

pub use config::{Config, OneOrMany, ProcessConfig, RoleConfig};
pub use registry::{Builder, ExtractorBuilder, LoaderBuilder, Registry, TransformerBuilder};

use crate::client::IndexStore;
use crate::error::EtlError;
use crate::etl::{Extractor, Loader, Pipeline, Role, RoleKind, Transformer, TransformerRoles};
use eyre::{Context, Result};
use std::sync::Arc;

/// What loader constructors receive besides their params
#[derive(Clone, Default)]
pub struct FactoryContext {
    /// Shared index store connection
    pub store: Option<Arc<dyn IndexStore>>,
    /// Destination of the process; replaces any `indice` in the loader params
    pub indice: Option<String>,
}

impl FactoryContext {
    pub fn new(store: Arc<dyn IndexStore>) -> Self {
        Self {
            store: Some(store),
            indice: None,
        }
    }

    pub fn with_indice(mut self, indice: Option<String>) -> Self {
        self.indice = indice;
        self
    }
}

/// Resolves configured role names into a [`Pipeline`]
///
/// # Example
/// ```no_run
/// use tabload::factory::{Config, FactoryContext, ProcessFactory};
///
/// # fn example() -> eyre::Result<()> {
/// let config = Config::from_file("conf/config.json")?;
/// let factory = ProcessFactory::new(FactoryContext::default());
/// for process in &config.processes {
///     let pipeline = factory.create_process(process)?;
///     println!("{}: bulk ready = {}", process.name, pipeline.loader_is_instanced());
/// }
/// # Ok(())
/// # }
/// ```
pub struct ProcessFactory<'r> {
    registry: &'r Registry,
    context: FactoryContext,
}

impl ProcessFactory<'static> {
    /// Factory over the global registry
    pub fn new(context: FactoryContext) -> Self {
        Self::with_registry(Registry::global(), context)
    }
}

impl<'r> ProcessFactory<'r> {
    pub fn with_registry(registry: &'r Registry, context: FactoryContext) -> Self {
        Self { registry, context }
    }

    pub fn context(&self) -> &FactoryContext {
        &self.context
    }

    /// A factory over the same registry and store whose loaders target `indice`
    pub fn with_indice(&self, indice: impl Into<String>) -> Self {
        Self {
            registry: self.registry,
            context: self.context.clone().with_indice(Some(indice.into())),
        }
    }

    /// Build the pipeline of `config`
    ///
    /// The process `indice` is handed to the loader through the context unless the context
    /// already carries one.
    ///
    /// # Errors
    /// Returns a configuration error for names missing from the registry or registered for
    /// another role, and any error raised by a role constructor
    pub fn create_process(&self, config: &ProcessConfig) -> Result<Pipeline> {
        let mut context = self.context.clone();
        if context.indice.is_none() {
            context.indice = config.indice.clone();
        }

        let extractor = config
            .extractor
            .as_ref()
            .map(|role| self.extractor(role).map(Role::Instance))
            .transpose()?;

        let transformer = match &config.transformers {
            None => None,
            Some(OneOrMany::One(role)) => Some(TransformerRoles::One(Role::Instance(
                self.transformer(role)?,
            ))),
            Some(OneOrMany::Many(roles)) => Some(TransformerRoles::Many(
                roles
                    .iter()
                    .map(|role| self.transformer(role).map(Role::Instance))
                    .collect::<Result<Vec<_>>>()?,
            )),
        };

        let loader = config
            .loader
            .as_ref()
            .map(|role| self.loader(role, &context).map(Role::Instance))
            .transpose()?;

        log::debug!("Process {} built", config.name);
        Pipeline::new(extractor, transformer, loader)
            .with_context(|| format!("Failed to build process {}", config.name))
    }

    fn lookup(&self, role: &RoleConfig) -> Result<&Builder> {
        self.registry
            .get(&role.name)
            .ok_or_else(|| EtlError::config(format!("{} not found in registry", role.name)).into())
    }

    fn extractor(&self, role: &RoleConfig) -> Result<Box<dyn Extractor>> {
        match self.lookup(role)? {
            Builder::Extractor(build) => {
                build(&role.params).with_context(|| format!("Failed to build {}", role.name))
            }
            other => Err(bad_role(RoleKind::Extractor, role, other)),
        }
    }

    fn transformer(&self, role: &RoleConfig) -> Result<Box<dyn Transformer>> {
        match self.lookup(role)? {
            Builder::Transformer(build) => {
                build(&role.params).with_context(|| format!("Failed to build {}", role.name))
            }
            other => Err(bad_role(RoleKind::Transformer, role, other)),
        }
    }

    fn loader(&self, role: &RoleConfig, context: &FactoryContext) -> Result<Box<dyn Loader>> {
        match self.lookup(role)? {
            Builder::Loader(build) => build(&role.params, context)
                .with_context(|| format!("Failed to build {}", role.name)),
            other => Err(bad_role(RoleKind::Loader, role, other)),
        }
    }
}

fn bad_role(expected: RoleKind, role: &RoleConfig, found: &Builder) -> eyre::Report {
    EtlError::config(format!(
        "Bad {}: {} is a {}",
        expected.to_string().to_lowercase(),
        role.name,
        found.kind().to_string().to_lowercase()
    ))
    .into()
}
