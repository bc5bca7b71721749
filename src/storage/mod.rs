//! File system storage operations
//!
//! This module handles all file I/O operations including:
//! - Delimited text and workbook readers (the extractors)
//! - Extension based dispatch between them
//! - Delimited text output for load backups and the CSV loader

mod backup;
mod csv;
mod file;
mod options;
mod spreadsheet;

pub use backup::{BACKUP_DELIMITER, CsvWriter, write_delimited};
pub use csv::CsvExtractor;
pub use file::FileExtractor;
pub use options::{Converter, ExtractOptions, SheetSelector};
pub use spreadsheet::SpreadsheetExtractor;
