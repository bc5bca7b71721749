//! Workbook reader (xlsx, xlsm, xlsb, xls, ods)

use super::csv::header_names;
use super::options::{ExtractOptions, SheetSelector};
use crate::etl::{Extractor, Params};
use crate::table::{Table, Value};
use calamine::{Data, DataType, Reader, open_workbook_auto};
use eyre::{Context, Result, eyre};
use std::path::Path;

/// Read one sheet of a workbook into a table
///
/// The sheet is picked with `sheet_name` (position or name, default the first sheet). Cells
/// keep the type the workbook stores; integral numbers become integers and blank or error
/// cells are missing values.
#[derive(Debug, Clone, Default)]
pub struct SpreadsheetExtractor {
    defaults: Params,
}

impl SpreadsheetExtractor {
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
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("Failed to open workbook: {}", path.display()))?;

        let names = workbook.sheet_names();
        let sheet = match &options.sheet_name {
            None => names.first().cloned(),
            Some(SheetSelector::Index(i)) => names.get(*i).cloned(),
            Some(SheetSelector::Name(name)) => names.iter().find(|n| *n == name).cloned(),
        }
        .ok_or_else(|| {
            eyre!(
                "Sheet {:?} not found in {} (available: {})",
                options.sheet_name,
                path.display(),
                names.join(", ")
            )
        })?;

        let range = workbook
            .worksheet_range(&sheet)
            .with_context(|| format!("Failed to read sheet '{sheet}' of {}", path.display()))?;
        log::debug!(
            "{} rows in the excel sheet '{}' from file '{}'",
            range.height(),
            sheet,
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        let mut rows = range.rows().skip(options.skip_rows.unwrap_or(0));
        let Some(header) = rows.next() else {
            return Ok(Table::default());
        };
        let header = header_names(header.iter().map(header_text).collect());
        options.check_columns(&header)?;

        let mut records = Vec::new();
        for row in rows {
            let record = header
                .iter()
                .enumerate()
                .map(|(i, column)| {
                    let cell = row.get(i).map_or(Value::Float(f64::NAN), cell_value);
                    options.read_typed(column, cell)
                })
                .collect::<Result<Vec<Value>>>()?;
            records.push(record);
        }
        Table::from_rows(header, records)
    }
}

impl Extractor for SpreadsheetExtractor {
    fn extract(&self, path: &Path, options: &Params) -> Result<Table> {
        let options = ExtractOptions::merged(&self.defaults, options)?;
        self.read(path, &options)
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::Float(f) if f.fract() == 0.0 => format!("{}", *f as i64),
        Data::Empty | Data::Error(_) => String::new(),
        other => other.to_string(),
    }
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::Int(*i),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Value::Int(*f as i64),
        Data::Float(f) => Value::Float(*f),
        Data::String(s) => Value::Text(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::DateTime(_) | Data::DateTimeIso(_) => {
            cell.as_datetime().map(Value::DateTime).unwrap_or(Value::NaT)
        }
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Empty | Data::Error(_) => Value::Float(f64::NAN),
    }
}
