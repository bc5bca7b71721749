//! Column name transformers

use crate::etl::{Params, Transformer, parse_params};
use crate::table::Table;
use eyre::Result;
use serde::Deserialize;
use std::collections::HashMap;

/// Removes leading and trailing whitespace from column names
///
/// # Example
/// ```
/// use tabload::etl::Transformer;
/// use tabload::table::{Table, Value};
/// use tabload::transform::ColumnStripper;
///
/// let table = Table::from_rows(vec![" code "], vec![vec![Value::Int(1)]]).unwrap();
/// let table = ColumnStripper.transform(table).unwrap();
/// assert_eq!(table.column_names(), vec!["code"]);
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnStripper;

impl Transformer for ColumnStripper {
    fn transform(&self, table: Table) -> Result<Table> {
        table.rename_columns(|name| name.trim().to_string())
    }
}

/// Upper-cases the first character of column names and lower-cases the rest
#[derive(Debug, Default, Clone, Copy)]
pub struct ColumnCapitaliser;

impl Transformer for ColumnCapitaliser {
    fn transform(&self, table: Table) -> Result<Table> {
        table.rename_columns(capitalize)
    }
}

fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ColumnReplacerOptions {
    #[serde(alias = "column_replace_dict", alias = "column_replace")]
    columns: HashMap<String, String>,
}

/// Renames columns by exact name; columns not listed keep their name
#[derive(Debug, Clone, Default)]
pub struct ColumnReplacer {
    renames: HashMap<String, String>,
}

impl ColumnReplacer {
    pub fn new(renames: HashMap<String, String>) -> Self {
        Self { renames }
    }

    pub fn from_params(params: &Params) -> Result<Self> {
        let options: ColumnReplacerOptions = parse_params("ColumnReplacer", params)?;
        Ok(Self::new(options.columns))
    }
}

impl Transformer for ColumnReplacer {
    fn transform(&self, table: Table) -> Result<Table> {
        table.rename_columns(|name| {
            self.renames
                .get(name)
                .cloned()
                .unwrap_or_else(|| name.to_string())
        })
    }
}
