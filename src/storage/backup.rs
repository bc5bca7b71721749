//! Delimited text output: load backups and the CSV loader

use crate::error::EtlError;
use crate::etl::{LoadReport, Loader, Params, parse_params};
use crate::table::Table;
use async_trait::async_trait;
use eyre::{Context, Result};
use serde::Deserialize;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

/// Separator of backup files
pub const BACKUP_DELIMITER: u8 = b'|';

/// Write `table` to `path` as delimited text
///
/// In `append` mode rows are added to the end of an existing file and the header is written
/// only if the file is new or empty; otherwise the file is truncated first. Returns the number
/// of rows written.
pub fn write_delimited(path: &Path, table: &Table, delimiter: u8, append: bool) -> Result<usize> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(append)
        .truncate(!append)
        .open(path)
        .with_context(|| format!("Failed to open {} for writing", path.display()))?;
    let needs_header = file
        .metadata()
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len()
        == 0;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(file);

    if needs_header {
        writer
            .write_record(table.column_names())
            .with_context(|| format!("Failed to write header to {}", path.display()))?;
    }
    for i in 0..table.n_rows() {
        let cells = table
            .columns()
            .iter()
            .map(|column| column.values[i].to_string());
        writer
            .write_record(cells)
            .with_context(|| format!("Failed to write row {i} to {}", path.display()))?;
    }
    writer
        .flush()
        .with_context(|| format!("Failed to flush {}", path.display()))?;

    log::debug!("Wrote {} rows to {}", table.n_rows(), path.display());
    Ok(table.n_rows())
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct CsvWriterOptions {
    path: PathBuf,
    #[serde(default = "default_delimiter", alias = "sep")]
    delimiter: char,
    #[serde(default)]
    append: bool,
}

fn default_delimiter() -> char {
    ','
}

/// Loader saving the table to a local delimited file
///
/// Options: `path` (required), `delimiter` (default `,`), `append` (default false).
#[derive(Debug, Clone)]
pub struct CsvWriter {
    path: PathBuf,
    delimiter: u8,
    append: bool,
}

impl CsvWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            append: false,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_append(mut self, append: bool) -> Self {
        self.append = append;
        self
    }

    pub fn from_params(params: &Params) -> Result<Self> {
        let options: CsvWriterOptions = parse_params("CsvWriter", params)?;
        let delimiter = u8::try_from(options.delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| EtlError::config(format!("Bad delimiter {:?}", options.delimiter)))?;
        Ok(Self::new(options.path)
            .with_delimiter(delimiter)
            .with_append(options.append))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Loader for CsvWriter {
    async fn load(&self, table: Table) -> Result<LoadReport> {
        let written = write_delimited(&self.path, &table, self.delimiter, self.append)?;
        log::info!("{} rows written to {}", written, self.path.display());
        Ok(LoadReport {
            success: written,
            ..Default::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Value;
    use serde_json::json;
    use tempfile::TempDir;

    fn table() -> Table {
        Table::from_rows(
            vec!["A", "B"],
            vec![
                vec![Value::Int(1), Value::from("x")],
                vec![Value::Null, Value::Float(f64::NAN)],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("backup.csv");

        write_delimited(&path, &table(), BACKUP_DELIMITER, true).unwrap();
        write_delimited(&path, &table(), BACKUP_DELIMITER, true).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "A|B\n1|x\n|\n1|x\n|\n");
    }

    #[test]
    fn test_truncate_mode_rewrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");

        write_delimited(&path, &table(), b',', false).unwrap();
        write_delimited(&path, &table(), b',', false).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "A,B\n1,x\n,\n");
    }

    #[tokio::test]
    async fn test_csv_writer_loader() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let params = json!({"path": path, "sep": ";"}).as_object().cloned().unwrap();

        let writer = CsvWriter::from_params(&params).unwrap();
        let report = writer.load(table()).await.unwrap();

        assert_eq!(report.success, 2);
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("A;B\n"));
    }

    #[test]
    fn test_csv_writer_requires_path() {
        let err = CsvWriter::from_params(&Params::new()).unwrap_err();
        assert!(err.to_string().contains("CsvWriter"));
    }
}
