//! Extension based reader dispatch

use super::csv::CsvExtractor;
use super::options::ExtractOptions;
use super::spreadsheet::SpreadsheetExtractor;
use crate::error::EtlError;
use crate::etl::{Extractor, Params};
use crate::table::Table;
use eyre::Result;
use std::path::Path;

/// Extensions read as workbooks, compared case-insensitively
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Default extractor: picks the reader from the file extension
///
/// `.csv` files go to [`CsvExtractor`], workbook extensions to [`SpreadsheetExtractor`];
/// anything else is an [`EtlError::UnsupportedFormat`].
#[derive(Debug, Clone, Default)]
pub struct FileExtractor {
    csv: CsvExtractor,
    spreadsheet: SpreadsheetExtractor,
}

impl FileExtractor {
    /// Build with `params` as defaults for both readers
    pub fn from_params(params: &Params) -> Result<Self> {
        ExtractOptions::merged(params, &Params::new())?;
        Ok(Self {
            csv: CsvExtractor::new(params.clone()),
            spreadsheet: SpreadsheetExtractor::new(params.clone()),
        })
    }
}

impl Extractor for FileExtractor {
    fn extract(&self, path: &Path, options: &Params) -> Result<Table> {
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        if extension == "csv" {
            self.csv.extract(path, options)
        } else if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
            self.spreadsheet.extract(path, options)
        } else {
            Err(EtlError::UnsupportedFormat(path.to_path_buf()).into())
        }
    }
}
