//! The canonical table normalizer
//!
//! [`Normalizer`] runs, in order, column name normalization, content replacement, date
//! formatting and null canonicalization. Each step is also available on its own.

use super::join::{JoinKind, join};
use super::replace::ReplaceMap;
use crate::error::EtlError;
use crate::etl::{Extractor, Params, Transformer, parse_params};
use crate::storage::FileExtractor;
use crate::table::{Table, Value};
use chrono::format::{Item, StrftimeItems};
use eyre::{Context, Result};
use serde::Deserialize;
use std::path::Path;

/// Normalizer settings, all optional
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NormalizerOptions {
    /// Columns whose text values are trimmed (names as they are after normalization)
    #[serde(default)]
    pub strip: Vec<String>,
    /// Regex rules applied to column names before upper-casing
    #[serde(default)]
    pub column_replace: ReplaceMap,
    /// Regex rules applied to every text cell
    #[serde(default)]
    pub df_replace: ReplaceMap,
    /// strftime pattern applied to `date_columns`
    #[serde(default)]
    pub date_format: Option<String>,
    #[serde(default)]
    pub date_columns: Option<Vec<String>>,
}

/// Where the referential of [`Normalizer::merge_referential`] comes from
pub enum Referential<'a> {
    Table(&'a Table),
    Path(&'a Path),
}

impl<'a> From<&'a Table> for Referential<'a> {
    fn from(table: &'a Table) -> Self {
        Self::Table(table)
    }
}

impl<'a> From<&'a Path> for Referential<'a> {
    fn from(path: &'a Path) -> Self {
        Self::Path(path)
    }
}

/// Table normalizer
///
/// # Example
/// ```
/// use tabload::etl::Transformer;
/// use tabload::table::{Table, Value};
/// use tabload::transform::{Normalizer, NormalizerOptions, ReplaceMap};
///
/// let normalizer = Normalizer::new(NormalizerOptions {
///     strip: vec!["DEPARTEMENT".to_string()],
///     column_replace: ReplaceMap::new([("é", "e"), (" ", "_")]).unwrap(),
///     ..Default::default()
/// });
///
/// let table = Table::from_rows(vec!["Département"], vec![vec![Value::from(" 75 ")]]).unwrap();
/// let table = normalizer.transform(table).unwrap();
/// assert_eq!(table.get(0, "DEPARTEMENT"), Some(&Value::from("75")));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    options: NormalizerOptions,
}

impl Normalizer {
    pub fn new(options: NormalizerOptions) -> Self {
        Self { options }
    }

    pub fn from_params(params: &Params) -> Result<Self> {
        Ok(Self::new(parse_params("Normalizer", params)?))
    }

    pub fn options(&self) -> &NormalizerOptions {
        &self.options
    }

    /// Normalize column names (trim, `column_replace`, upper-case), then trim the text values
    /// of the `strip` columns
    ///
    /// # Errors
    /// Returns an error if a name becomes empty or collides with another one
    pub fn format_str_columns(&self, table: Table) -> Result<Table> {
        let mut table = table
            .rename_columns(|name| {
                self.options
                    .column_replace
                    .apply(name.trim())
                    .to_uppercase()
            })
            .context("Failed to normalize column names")?;

        for name in &self.options.strip {
            match table.column_mut(name) {
                Some(column) => {
                    for value in &mut column.values {
                        if let Value::Text(text) = value {
                            let trimmed = text.trim();
                            if trimmed.len() != text.len() {
                                *text = trimmed.to_string();
                            }
                        }
                    }
                }
                None => log::warn!("No such column {name} in table, cannot strip"),
            }
        }
        Ok(table)
    }

    /// Apply `df_replace` to every text cell
    pub fn format_contents(&self, table: Table) -> Table {
        if self.options.df_replace.is_empty() {
            return table;
        }
        table.map_values(|value| match value {
            Value::Text(text) => Value::Text(self.options.df_replace.apply(&text)),
            other => other,
        })
    }

    /// Format the datetimes of `date_columns` with `date_format`
    ///
    /// Missing values are left as they are. Usage problems (only one of the two settings
    /// given, unknown column) are logged and skipped.
    ///
    /// # Errors
    /// Returns an error naming the column if it holds a value that is neither a datetime
    /// nor missing
    pub fn format_dates(&self, mut table: Table) -> Result<Table> {
        let (columns, format) = match (&self.options.date_columns, &self.options.date_format) {
            (Some(columns), Some(format)) => (columns, format),
            (Some(_), None) => {
                log::warn!("Incorrect usage: date_columns given without date_format");
                return Ok(table);
            }
            (None, Some(_)) => {
                log::warn!("Incorrect usage: date_format given without date_columns");
                return Ok(table);
            }
            (None, None) => {
                log::debug!("No date columns and no date format, nothing to do");
                return Ok(table);
            }
        };

        for name in columns {
            let Some(column) = table.column_mut(name) else {
                log::warn!("No such column {name} in table, cannot format dates");
                continue;
            };
            format_column(&mut column.values, name, format)?;
        }
        Ok(table)
    }

    /// Replace every value that is not equal to itself (NaN, NaT) with `Null`
    pub fn format_na(&self, table: Table) -> Table {
        table.map_values(|value| if value.is_missing() { Value::Null } else { value })
    }

    /// Join `table` with a referential, either given as a table or read from a path
    ///
    /// A path is read with `extractor`, or a [`FileExtractor`] when none is given, passing
    /// `options` through. Without `keys` the columns common to both tables are used.
    ///
    /// # Errors
    /// Returns an error if the referential cannot be read or a key column is missing
    pub fn merge_referential(
        &self,
        table: &Table,
        referential: Referential<'_>,
        keys: Option<&[String]>,
        how: JoinKind,
        extractor: Option<&dyn Extractor>,
        options: &Params,
    ) -> Result<Table> {
        match referential {
            Referential::Table(reference) => join(table, reference, keys, how),
            Referential::Path(path) => {
                let default_extractor;
                let extractor = match extractor {
                    Some(extractor) => extractor,
                    None => {
                        default_extractor = FileExtractor::default();
                        &default_extractor
                    }
                };
                let reference = extractor
                    .extract(path, options)
                    .with_context(|| format!("Failed to read referential {}", path.display()))?;
                join(table, &reference, keys, how)
            }
        }
    }
}

impl Transformer for Normalizer {
    fn transform(&self, table: Table) -> Result<Table> {
        let table = self.format_str_columns(table)?;
        let table = self.format_contents(table);
        let table = self.format_dates(table)?;
        Ok(self.format_na(table))
    }
}

/// Render every datetime of `values` with `format`, in place
pub(crate) fn format_column(values: &mut [Value], column: &str, format: &str) -> Result<()> {
    check_format(format)?;
    for value in values.iter_mut() {
        match value {
            Value::DateTime(dt) => {
                let text = dt.format(format).to_string();
                *value = Value::Text(text);
            }
            v if v.is_missing() || v.is_null() => {}
            other => {
                return Err(EtlError::Type {
                    column: column.to_string(),
                    reason: format!(
                        "non-datetime value {other:?}, the columns to format must be datetimes, parse them first"
                    ),
                }
                .into());
            }
        }
    }
    Ok(())
}

/// Reject strftime patterns chrono cannot render
pub(crate) fn check_format(format: &str) -> Result<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(EtlError::config(format!("invalid date format {format:?}")).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::etl_error;
    use chrono::NaiveDate;
    use serde_json::json;

    fn params(value: serde_json::Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    fn day(d: u32) -> Value {
        Value::DateTime(
            NaiveDate::from_ymd_opt(1970, 1, d)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        )
    }

    #[test]
    fn test_departement_scenario() {
        let normalizer = Normalizer::from_params(&params(json!({
            "column_replace": {"é": "e", " ": "_"},
            "strip": ["DEPARTEMENT"],
        })))
        .unwrap();
        let table = Table::from_rows(vec!["Département"], vec![vec![Value::from(" 75 ")]]).unwrap();

        let output = normalizer.transform(table).unwrap();

        assert_eq!(output.column_names(), vec!["DEPARTEMENT"]);
        assert_eq!(output.get(0, "DEPARTEMENT"), Some(&Value::from("75")));
    }

    #[test]
    fn test_column_normalization_is_idempotent() {
        let normalizer = Normalizer::from_params(&params(json!({
            "column_replace": {"é": "e", " ": "_"},
        })))
        .unwrap();
        let table = Table::from_rows(
            vec![" Code postal ", "Département", "x"],
            vec![vec![Value::Int(1), Value::Int(2), Value::Int(3)]],
        )
        .unwrap();

        let once = normalizer.format_str_columns(table).unwrap();
        let twice = normalizer.format_str_columns(once.clone()).unwrap();

        assert_eq!(once.column_names(), vec!["CODE_POSTAL", "DEPARTEMENT", "X"]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_colliding_names_rejected() {
        let table = Table::from_rows(vec!["a", "A "], vec![]).unwrap();
        assert!(Normalizer::default().format_str_columns(table).is_err());
    }

    #[test]
    fn test_missing_strip_column_is_not_fatal() {
        let normalizer = Normalizer::from_params(&params(json!({"strip": ["NOPE"]}))).unwrap();
        let table = Table::from_rows(vec!["a"], vec![vec![Value::from(" x ")]]).unwrap();
        let output = normalizer.format_str_columns(table).unwrap();
        assert_eq!(output.get(0, "A"), Some(&Value::from(" x ")));
    }

    #[test]
    fn test_format_contents() {
        let normalizer =
            Normalizer::from_params(&params(json!({"df_replace": {"^N/A$": "", ",": "."}}))).unwrap();
        let table = Table::from_rows(
            vec!["A"],
            vec![vec![Value::from("N/A")], vec![Value::from("1,5")], vec![Value::Int(4)]],
        )
        .unwrap();
        let output = normalizer.format_contents(table);
        assert_eq!(output.get(0, "A"), Some(&Value::from("")));
        assert_eq!(output.get(1, "A"), Some(&Value::from("1.5")));
        assert_eq!(output.get(2, "A"), Some(&Value::Int(4)));
    }

    #[test]
    fn test_format_dates() {
        let normalizer = Normalizer::from_params(&params(json!({
            "date_columns": ["D"],
            "date_format": "%d/%m/%Y",
        })))
        .unwrap();
        let table = Table::from_rows(vec!["D"], vec![vec![day(22)], vec![Value::NaT]]).unwrap();
        let output = normalizer.format_dates(table).unwrap();
        assert_eq!(output.get(0, "D"), Some(&Value::from("22/01/1970")));
        assert!(output.get(1, "D").unwrap().is_missing());
    }

    #[test]
    fn test_format_dates_rejects_text() {
        let normalizer = Normalizer::from_params(&params(json!({
            "date_columns": ["D"],
            "date_format": "%Y",
        })))
        .unwrap();
        let table = Table::from_rows(vec!["D"], vec![vec![Value::from("yesterday")]]).unwrap();
        let err = normalizer.format_dates(table).unwrap_err();
        assert!(matches!(etl_error(&err), Some(EtlError::Type { column, .. }) if column == "D"));
    }

    #[test]
    fn test_format_dates_incomplete_settings_do_nothing() {
        let normalizer =
            Normalizer::from_params(&params(json!({"date_columns": ["D"]}))).unwrap();
        let table = Table::from_rows(vec!["D"], vec![vec![day(1)]]).unwrap();
        let output = normalizer.format_dates(table.clone()).unwrap();
        assert_eq!(output, table);
    }

    #[test]
    fn test_format_na_only_touches_missing_values() {
        let table = Table::from_rows(
            vec!["A", "B"],
            vec![
                vec![Value::Float(f64::NAN), Value::from("x")],
                vec![Value::NaT, Value::Float(0.5)],
            ],
        )
        .unwrap();
        let output = Normalizer::default().format_na(table);
        assert_eq!(output.get(0, "A"), Some(&Value::Null));
        assert_eq!(output.get(1, "A"), Some(&Value::Null));
        assert_eq!(output.get(0, "B"), Some(&Value::from("x")));
        assert_eq!(output.get(1, "B"), Some(&Value::Float(0.5)));
    }

    #[test]
    fn test_transform_leaves_no_missing_values() {
        let table = Table::from_rows(
            vec!["a", "b"],
            vec![vec![Value::Float(f64::NAN), Value::Int(1)], vec![Value::NaT, Value::Null]],
        )
        .unwrap();
        let output = Normalizer::default().transform(table).unwrap();
        for column in output.columns() {
            assert!(column.values.iter().all(|v| !v.is_missing()));
        }
    }

    #[test]
    fn test_merge_referential_table() {
        let table = Table::from_rows(vec!["CODE"], vec![vec![Value::Int(75)]]).unwrap();
        let reference = Table::from_rows(
            vec!["CODE", "NOM"],
            vec![vec![Value::Int(75), Value::from("Paris")]],
        )
        .unwrap();
        let output = Normalizer::default()
            .merge_referential(
                &table,
                Referential::from(&reference),
                None,
                JoinKind::Inner,
                None,
                &Params::new(),
            )
            .unwrap();
        assert_eq!(output.get(0, "NOM"), Some(&Value::from("Paris")));
    }

    #[test]
    fn test_merge_referential_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ref.csv");
        std::fs::write(&path, "CODE;NOM\n75;Paris\n13;Marseille\n").unwrap();
        let table = Table::from_rows(vec!["CODE"], vec![vec![Value::Int(13)]]).unwrap();

        let output = Normalizer::default()
            .merge_referential(
                &table,
                Referential::from(path.as_path()),
                Some(&["CODE".to_string()]),
                JoinKind::Left,
                None,
                &params(json!({"sep": ";"})),
            )
            .unwrap();
        assert_eq!(output.get(0, "NOM"), Some(&Value::from("Marseille")));
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = Normalizer::from_params(&params(json!({"stripp": []}))).unwrap_err();
        assert!(etl_error(&err).is_some_and(EtlError::is_config));
    }
}
