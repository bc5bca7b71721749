//! Loader trait for writing tables to a destination

use crate::table::Table;
use async_trait::async_trait;
use eyre::Result;
use serde_json::Value as JsonValue;

/// Outcome of one `load` call
///
/// Record rejections are counted here rather than raised: a partially failed load is a
/// reported condition, not an error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub success: usize,
    pub failed: usize,
    /// Raw failure payloads as returned by the store
    pub errors: Vec<JsonValue>,
}

impl LoadReport {
    pub fn record(&mut self, ok: bool, detail: JsonValue) {
        if ok {
            self.success += 1;
        } else {
            self.failed += 1;
            self.errors.push(detail);
        }
    }

    pub fn total(&self) -> usize {
        self.success + self.failed
    }
}

/// Loader trait for writing a finished table to its destination
///
/// The destination is bound when the loader is built.
///
/// # Example
/// ```no_run
/// use tabload::etl::{Loader, LoadReport};
/// use tabload::table::Table;
/// use async_trait::async_trait;
/// use eyre::Result;
///
/// struct CountingLoader;
///
/// #[async_trait]
/// impl Loader for CountingLoader {
///     async fn load(&self, table: Table) -> Result<LoadReport> {
///         Ok(LoadReport { success: table.n_rows(), ..Default::default() })
///     }
/// }
/// ```
#[async_trait]
pub trait Loader: Send + Sync {
    /// Write the table to the destination
    ///
    /// # Errors
    /// Returns an error if the destination cannot be reached or prepared. Individual record
    /// failures are reported through the returned [`LoadReport`].
    async fn load(&self, table: Table) -> Result<LoadReport>;
}
