//! Extractor trait for reading tabular files

use super::Params;
use crate::table::Table;
use eyre::Result;
use std::path::Path;

/// Extractor trait for reading one source file into a [`Table`]
///
/// Format options (sheet selection, rows to skip, converters...) arrive as untyped
/// [`Params`] and are forwarded verbatim; each implementor decides which keys it accepts.
///
/// # Example
/// ```no_run
/// use tabload::etl::{Extractor, Params};
/// use tabload::table::Table;
/// use eyre::Result;
/// use std::path::Path;
///
/// struct EmptyExtractor;
///
/// impl Extractor for EmptyExtractor {
///     fn extract(&self, _path: &Path, _options: &Params) -> Result<Table> {
///         Ok(Table::default())
///     }
/// }
/// ```
pub trait Extractor: Send + Sync {
    /// Read `path` into a table
    ///
    /// # Errors
    /// Returns an error if the file cannot be read, the format is not supported or the
    /// options are not understood by this extractor.
    fn extract(&self, path: &Path, options: &Params) -> Result<Table>;
}
