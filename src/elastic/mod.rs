//! Elasticsearch destination: the [`ElasticLoader`] and index maintenance utilities.

mod indices;
mod loader;

pub use indices::{IndexSelector, clean_indices, init_indices, read_mappings};
pub use loader::{ElasticLoader, ElasticLoaderOptions};
