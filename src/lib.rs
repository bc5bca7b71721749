//! tabload
//!
//! Extract tabular files (CSV, Excel, OpenDocument), normalize their structure and contents,
//! and bulk-load the rows into Elasticsearch.

pub mod cli;
pub mod client;
pub mod elastic;
pub mod error;
pub mod etl;
pub mod factory;
pub mod storage;
pub mod table;
pub mod transform;

// Re-exports for convenience
pub use client::{Auth, ElasticClient, ElasticConfig, IndexStore};
pub use elastic::ElasticLoader;
pub use error::EtlError;
pub use etl::{Extractor, IdentityTransformer, LoadReport, Loader, Pipeline, Role, Transformer};
pub use factory::{Config, ProcessFactory, Registry};
pub use storage::{CsvExtractor, CsvWriter, FileExtractor, SpreadsheetExtractor};
pub use table::{Table, Value};
pub use transform::Normalizer;
