//! Datetime parsing and formatting transformers

use super::normalizer::{check_format, format_column};
use crate::error::EtlError;
use crate::etl::{Params, Transformer, parse_params};
use crate::table::{Table, Value, parse_datetime};
use eyre::Result;
use serde::Deserialize;

const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct DateOptions {
    #[serde(alias = "columns")]
    date_columns: Vec<String>,
    #[serde(default = "default_date_format")]
    date_format: String,
}

/// Renders the datetimes of the listed columns as text
///
/// Missing values stay missing. Any other non-datetime value is an error: parse first.
#[derive(Debug, Clone)]
pub struct DateFormatter {
    columns: Vec<String>,
    format: String,
}

impl DateFormatter {
    /// Format `columns` with the default `%Y-%m-%d` pattern
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            format: default_date_format(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn from_params(params: &Params) -> Result<Self> {
        let options: DateOptions = parse_params("DateFormatter", params)?;
        check_format(&options.date_format)?;
        Ok(Self::new(options.date_columns).with_format(options.date_format))
    }
}

impl Transformer for DateFormatter {
    fn transform(&self, mut table: Table) -> Result<Table> {
        for name in &self.columns {
            let column = table
                .column_mut(name)
                .ok_or_else(|| EtlError::MissingColumn(name.clone()))?;
            format_column(&mut column.values, name, &self.format)?;
        }
        Ok(table)
    }
}

/// Parses the text values of the listed columns into datetimes
///
/// Date-only patterns give midnight. Missing values become `NaT`; a value that does not
/// match the pattern is an error naming the column.
#[derive(Debug, Clone)]
pub struct DateParser {
    columns: Vec<String>,
    format: String,
}

impl DateParser {
    /// Parse `columns` with the default `%Y-%m-%d` pattern
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            format: default_date_format(),
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn from_params(params: &Params) -> Result<Self> {
        let options: DateOptions = parse_params("DateParser", params)?;
        Ok(Self::new(options.date_columns).with_format(options.date_format))
    }

    fn parse(&self, column: &str, value: Value) -> Result<Value> {
        match value {
            Value::DateTime(_) | Value::NaT => Ok(value),
            v if v.is_missing() || v.is_null() => Ok(Value::NaT),
            other => {
                let raw = other.to_string();
                parse_datetime(raw.trim(), Some(&self.format))
                    .map(Value::DateTime)
                    .ok_or_else(|| {
                        EtlError::Type {
                            column: column.to_string(),
                            reason: format!("{raw:?} does not match date format {}", self.format),
                        }
                        .into()
                    })
            }
        }
    }
}

impl Transformer for DateParser {
    fn transform(&self, mut table: Table) -> Result<Table> {
        for name in &self.columns {
            let column = table
                .column_mut(name)
                .ok_or_else(|| EtlError::MissingColumn(name.clone()))?;
            column.values = std::mem::take(&mut column.values)
                .into_iter()
                .map(|value| self.parse(name, value))
                .collect::<Result<Vec<_>>>()?;
        }
        Ok(table)
    }
}
