//! Reader options shared by the file extractors

use crate::error::EtlError;
use crate::etl::Params;
use crate::table::{Value, parse_datetime};
use eyre::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;

/// Options understood by the file extractors.
///
/// Built by merging the extractor's construction params with the per-call params, the
/// latter winning. Unknown keys are rejected.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtractOptions {
    /// Field delimiter for delimited text
    #[serde(default, alias = "sep")]
    pub delimiter: Option<char>,

    /// Number of leading lines to skip before the header
    #[serde(default, alias = "skiprows")]
    pub skip_rows: Option<usize>,

    /// Sheet to read from a workbook, by position or name (default: the first one)
    #[serde(default)]
    pub sheet_name: Option<SheetSelector>,

    /// Per-column coercion, applied instead of type inference
    #[serde(default)]
    pub converters: HashMap<String, Converter>,

    /// Columns to parse as datetimes; unparsable values become `NaT`
    #[serde(default, alias = "parse_dates")]
    pub dates: Vec<String>,

    /// strftime pattern for `dates`, common patterns are tried when absent
    #[serde(default)]
    pub date_format: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SheetSelector {
    Index(usize),
    Name(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Converter {
    #[serde(alias = "string", alias = "text")]
    Str,
    #[serde(alias = "integer")]
    Int,
    Float,
    Bool,
}

impl ExtractOptions {
    /// Merge `defaults` and `overrides` and deserialize the result
    ///
    /// # Errors
    /// Returns a configuration error for unknown keys or badly typed values
    pub fn merged(defaults: &Params, overrides: &Params) -> Result<Self> {
        let mut merged = defaults.clone();
        for (key, value) in overrides {
            merged.insert(key.clone(), value.clone());
        }
        serde_json::from_value(serde_json::Value::Object(merged))
            .map_err(|e| EtlError::config(format!("Bad extractor options: {e}")))
            .context("Failed to read extractor options")
    }

    /// Check every column named by the options is present in `header`
    pub(crate) fn check_columns(&self, header: &[String]) -> Result<()> {
        let named = self.converters.keys().chain(self.dates.iter());
        for column in named {
            if !header.iter().any(|h| h == column) {
                return Err(EtlError::MissingColumn(column.clone()).into());
            }
        }
        Ok(())
    }

    /// Turn a raw text cell of `column` into a value
    pub(crate) fn read_text(&self, column: &str, raw: &str) -> Result<Value> {
        if let Some(converter) = self.converters.get(column) {
            return converter.convert_text(column, raw);
        }
        if self.dates.iter().any(|d| d == column) {
            return Ok(self.read_date_text(raw));
        }
        Ok(Value::infer(raw))
    }

    /// Apply converters and date parsing to an already typed cell of `column`
    pub(crate) fn read_typed(&self, column: &str, value: Value) -> Result<Value> {
        if let Some(converter) = self.converters.get(column) {
            if value.is_missing() {
                return Ok(value);
            }
            return converter.convert_text(column, &value.to_string());
        }
        if self.dates.iter().any(|d| d == column) {
            return Ok(match value {
                Value::DateTime(_) => value,
                Value::Text(raw) => self.read_date_text(&raw),
                _ => Value::NaT,
            });
        }
        Ok(value)
    }

    fn read_date_text(&self, raw: &str) -> Value {
        parse_datetime(raw.trim(), self.date_format.as_deref())
            .map(Value::DateTime)
            .unwrap_or(Value::NaT)
    }
}

impl Converter {
    fn convert_text(self, column: &str, raw: &str) -> Result<Value> {
        let type_error = |kind: &str| EtlError::Type {
            column: column.to_string(),
            reason: format!("cannot convert {raw:?} to {kind}"),
        };
        match self {
            Self::Str => Ok(Value::Text(raw.to_string())),
            _ if raw.trim().is_empty() => Ok(Value::Float(f64::NAN)),
            Self::Int => raw
                .trim()
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| type_error("int").into()),
            Self::Float => raw
                .trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| type_error("float").into()),
            Self::Bool => match raw.trim().to_lowercase().as_str() {
                "true" | "1" | "yes" => Ok(Value::Bool(true)),
                "false" | "0" | "no" => Ok(Value::Bool(false)),
                _ => Err(type_error("bool").into()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_overrides_win() {
        let options = ExtractOptions::merged(
            &params(json!({"sep": ";", "skiprows": 2})),
            &params(json!({"sep": "|"})),
        )
        .unwrap();
        assert_eq!(options.delimiter, Some('|'));
        assert_eq!(options.skip_rows, Some(2));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = ExtractOptions::merged(&Params::new(), &params(json!({"nope": 1})));
        assert!(result.is_err());
    }

    #[test]
    fn test_sheet_selector() {
        let by_index = ExtractOptions::merged(&Params::new(), &params(json!({"sheet_name": 1}))).unwrap();
        assert_eq!(by_index.sheet_name, Some(SheetSelector::Index(1)));
        let by_name =
            ExtractOptions::merged(&Params::new(), &params(json!({"sheet_name": "Data"}))).unwrap();
        assert_eq!(by_name.sheet_name, Some(SheetSelector::Name("Data".to_string())));
    }

    #[test]
    fn test_converters() {
        let options = ExtractOptions::merged(
            &Params::new(),
            &params(json!({"converters": {"code": "str", "n": "int"}})),
        )
        .unwrap();
        assert_eq!(options.read_text("code", "01").unwrap(), Value::from("01"));
        assert_eq!(options.read_text("n", " 7 ").unwrap(), Value::Int(7));
        assert!(options.read_text("n", "x").is_err());
        assert_eq!(options.read_text("other", "01").unwrap(), Value::Int(1));
    }

    #[test]
    fn test_dates() {
        let options = ExtractOptions::merged(
            &Params::new(),
            &params(json!({"dates": ["day"], "date_format": "%d/%m/%Y"})),
        )
        .unwrap();
        assert!(options.read_text("day", "22/01/1970").unwrap().as_datetime().is_some());
        assert!(options.read_text("day", "garbage").unwrap().is_missing());
    }

    #[test]
    fn test_check_columns() {
        let options =
            ExtractOptions::merged(&Params::new(), &params(json!({"dates": ["missing"]}))).unwrap();
        assert!(options.check_columns(&["a".to_string()]).is_err());
    }
}
