//! In-memory tabular data
//!
//! A [`Table`] is an ordered list of named [`Column`]s sharing a row index `0..n_rows`.

mod value;

pub use value::{DATETIME_FORMAT, Value, parse_datetime};

use crate::error::EtlError;
use eyre::Result;
use serde_json::{Map, Value as JsonValue};
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Value>,
}

impl Column {
    pub fn new(name: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// Column-oriented table. Column names are unique and every column has the same length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
}

impl Table {
    /// Build a table from columns, checking names are unique and lengths agree
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EtlError::config(format!("duplicate column name {}", column.name)).into());
            }
        }
        if let Some(first) = columns.first() {
            let n = first.values.len();
            if let Some(bad) = columns.iter().find(|c| c.values.len() != n) {
                eyre::bail!(
                    "column {} has {} values, expected {}",
                    bad.name,
                    bad.values.len(),
                    n
                );
            }
        }
        Ok(Self { columns })
    }

    /// Build a table from a header and row-major records.
    ///
    /// Short rows are padded with missing values, long rows are truncated.
    pub fn from_rows<S: Into<String>>(header: Vec<S>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut columns: Vec<Column> = header
            .into_iter()
            .map(|name| Column::new(name, Vec::with_capacity(rows.len())))
            .collect();
        for row in rows {
            let mut cells = row.into_iter();
            for column in &mut columns {
                column
                    .values
                    .push(cells.next().unwrap_or(Value::Float(f64::NAN)));
            }
        }
        Self::new(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.columns.first().map_or(0, |c| c.values.len())
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Value at `row` in column `name`
    pub fn get(&self, row: usize, name: &str) -> Option<&Value> {
        self.column(name).and_then(|c| c.values.get(row))
    }

    /// Row `index` as its cells, in column order
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        (index < self.n_rows()).then(|| self.columns.iter().map(|c| &c.values[index]).collect())
    }

    /// Rename every column with `f`, rejecting empty or colliding results
    pub fn rename_columns<F>(mut self, mut f: F) -> Result<Self>
    where
        F: FnMut(&str) -> String,
    {
        for column in &mut self.columns {
            column.name = f(&column.name);
            if column.name.is_empty() {
                return Err(EtlError::config("column name is empty after renaming").into());
            }
        }
        Self::new(self.columns)
    }

    /// Apply `f` to every cell
    pub fn map_values<F>(mut self, mut f: F) -> Self
    where
        F: FnMut(Value) -> Value,
    {
        for column in &mut self.columns {
            column.values = std::mem::take(&mut column.values)
                .into_iter()
                .map(&mut f)
                .collect();
        }
        self
    }

    /// Rows as JSON objects keyed by column name, in column order
    pub fn records(&self) -> Vec<JsonValue> {
        (0..self.n_rows())
            .map(|i| {
                let record: Map<String, JsonValue> = self
                    .columns
                    .iter()
                    .map(|c| {
                        let value = serde_json::to_value(&c.values[i]).unwrap_or(JsonValue::Null);
                        (c.name.clone(), value)
                    })
                    .collect();
                JsonValue::Object(record)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Table {
        Table::from_rows(
            vec!["a", "b"],
            vec![
                vec![Value::Int(1), Value::from("x")],
                vec![Value::Int(2), Value::from("y")],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_from_rows() {
        let table = sample();
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column_names(), vec!["a", "b"]);
        assert_eq!(table.get(1, "b"), Some(&Value::from("y")));
    }

    #[test]
    fn test_short_rows_are_padded_with_missing() {
        let table = Table::from_rows(vec!["a", "b"], vec![vec![Value::Int(1)]]).unwrap();
        assert!(table.get(0, "b").unwrap().is_missing());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let result = Table::new(vec![
            Column::new("a", vec![]),
            Column::new("a", vec![]),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_rename_collision_rejected() {
        let result = sample().rename_columns(|_| "same".to_string());
        assert!(result.is_err());
    }

    #[test]
    fn test_records() {
        let records = sample().records();
        assert_eq!(records[0], json!({"a": 1, "b": "x"}));
        assert_eq!(records[1], json!({"a": 2, "b": "y"}));
    }
}
