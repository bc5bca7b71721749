//! Delimited text reader

use super::options::ExtractOptions;
use crate::etl::{Extractor, Params};
use crate::table::{Table, Value};
use eyre::{Context, Result};
use std::path::Path;

/// Read a delimited text file (CSV by default) into a table
///
/// The first line after `skip_rows` is the header. Cells are typed by inference unless a
/// converter or a date column says otherwise; empty cells are missing values. Files that
/// are not valid UTF-8 are decoded as Latin-1.
///
/// # Example
/// ```no_run
/// use tabload::etl::{Extractor, Params};
/// use tabload::storage::CsvExtractor;
/// use std::path::Path;
///
/// let table = CsvExtractor::default().extract(Path::new("data.csv"), &Params::new()).unwrap();
/// println!("{} rows", table.n_rows());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CsvExtractor {
    defaults: Params,
}

impl CsvExtractor {
    /// Create an extractor whose `defaults` apply to every call, below per-call options
    pub fn new(defaults: Params) -> Self {
        Self { defaults }
    }

    /// Build from construction params, validating them once up front
    pub fn from_params(params: &Params) -> Result<Self> {
        ExtractOptions::merged(params, &Params::new())?;
        Ok(Self::new(params.clone()))
    }

    /// Read `path` with already merged options
    pub fn read(&self, path: &Path, options: &ExtractOptions) -> Result<Table> {
        let delimiter = options.delimiter.unwrap_or(',');
        let delimiter = u8::try_from(delimiter)
            .ok()
            .filter(u8::is_ascii)
            .ok_or_else(|| eyre::eyre!("Delimiter {delimiter:?} is not a single ASCII character"))?;

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

        let mut lines = Vec::new();
        for record in reader.byte_records() {
            let record =
                record.with_context(|| format!("Failed to parse CSV file: {}", path.display()))?;
            lines.push(record.iter().map(decode).collect::<Vec<String>>());
        }
        log::debug!(
            "{} rows (including header) detected in the csv {}",
            lines.len(),
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        let mut lines = lines.into_iter().skip(options.skip_rows.unwrap_or(0));
        let Some(header) = lines.next() else {
            return Ok(Table::default());
        };
        let header = header_names(header);
        options.check_columns(&header)?;

        let mut rows = Vec::new();
        for line in lines {
            let row = header
                .iter()
                .zip(line.iter().map(String::as_str).chain(std::iter::repeat("")))
                .map(|(column, raw)| options.read_text(column, raw))
                .collect::<Result<Vec<Value>>>()?;
            rows.push(row);
        }
        Table::from_rows(header, rows)
    }
}

impl Extractor for CsvExtractor {
    fn extract(&self, path: &Path, options: &Params) -> Result<Table> {
        let options = ExtractOptions::merged(&self.defaults, options)?;
        self.read(path, &options)
    }
}

/// UTF-8 when valid, Latin-1 otherwise
fn decode(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

/// Name blank headers by position and make duplicates unique with a `.n` suffix
pub(crate) fn header_names(raw: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for (position, name) in raw.into_iter().enumerate() {
        let base = if name.trim().is_empty() {
            format!("Unnamed: {position}")
        } else {
            name
        };
        let mut candidate = base.clone();
        let mut n = 1;
        while names.contains(&candidate) {
            candidate = format!("{base}.{n}");
            n += 1;
        }
        names.push(candidate);
    }
    names
}
