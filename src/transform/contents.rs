//! Cell content transformers

use super::replace::ReplaceMap;
use crate::etl::{Params, Transformer, parse_params};
use crate::table::{Table, Value};
use eyre::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentStripperOptions {
    #[serde(alias = "columns_to_strip")]
    columns: Vec<String>,
}

/// Trims the text values of the listed columns
///
/// Unknown columns and columns holding no text are reported with a warning and left alone.
#[derive(Debug, Clone, Default)]
pub struct ContentStripper {
    columns: Vec<String>,
}

impl ContentStripper {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    pub fn from_params(params: &Params) -> Result<Self> {
        let options: ContentStripperOptions = parse_params("ContentStripper", params)?;
        Ok(Self::new(options.columns))
    }
}

impl Transformer for ContentStripper {
    fn transform(&self, mut table: Table) -> Result<Table> {
        for name in &self.columns {
            let Some(column) = table.column_mut(name) else {
                log::warn!("No such column {name} in passed table");
                continue;
            };
            let has_text = column.values.iter().any(|v| v.as_text().is_some());
            let only_text = column
                .values
                .iter()
                .all(|v| v.as_text().is_some() || v.is_missing() || v.is_null());
            if !has_text || !only_text {
                log::warn!("Column {name} is not of type text, cannot strip");
                continue;
            }
            for value in &mut column.values {
                if let Value::Text(text) = value {
                    *text = text.trim().to_string();
                }
            }
        }
        Ok(table)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContentReplacerOptions {
    #[serde(alias = "replace_dict", alias = "df_replace")]
    replace: ReplaceMap,
}

/// Applies ordered regex replacements to every text cell
#[derive(Debug, Clone, Default)]
pub struct ContentReplacer {
    replace: ReplaceMap,
}

impl ContentReplacer {
    pub fn new(replace: ReplaceMap) -> Self {
        Self { replace }
    }

    pub fn from_params(params: &Params) -> Result<Self> {
        let options: ContentReplacerOptions = parse_params("ContentReplacer", params)?;
        Ok(Self::new(options.replace))
    }
}

impl Transformer for ContentReplacer {
    fn transform(&self, table: Table) -> Result<Table> {
        Ok(table.map_values(|value| match value {
            Value::Text(text) => Value::Text(self.replace.apply(&text)),
            other => other,
        }))
    }
}

/// Replaces every missing value (NaN, NaT) with `Null`, which stores understand
#[derive(Debug, Default, Clone, Copy)]
pub struct NullValuesReplacer;

impl Transformer for NullValuesReplacer {
    fn transform(&self, table: Table) -> Result<Table> {
        Ok(table.map_values(|value| if value.is_missing() { Value::Null } else { value }))
    }
}
