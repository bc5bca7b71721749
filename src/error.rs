//! Error taxonomy shared by every stage.
//!
//! Functions return [`eyre::Result`]; the typed [`EtlError`] travels inside the report so
//! callers (and tests) can tell configuration problems apart from bad input with
//! `report.downcast_ref::<EtlError>()`.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EtlError {
    /// Bad role type, missing required path, unresolvable name. Fatal, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// The extractor has no reader for this file extension.
    #[error("file has unsupported file extension: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    #[error("no such column {0} in table")]
    MissingColumn(String),

    /// A column holds values of the wrong kind for the requested operation.
    #[error("column {column}: {reason}")]
    Type { column: String, reason: String },

    /// The index store answered with something other than success.
    #[error("index store error: {0}")]
    Store(String),
}

impl EtlError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Returns the [`EtlError`] carried by a report, if any.
pub fn etl_error(report: &eyre::Report) -> Option<&EtlError> {
    report.downcast_ref::<EtlError>()
}
