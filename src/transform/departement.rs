//! French département code normalization

use crate::error::EtlError;
use crate::etl::{Params, Transformer, parse_params};
use crate::table::{Table, Value};
use eyre::Result;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Columns {
    One(String),
    Many(Vec<String>),
}

fn default_coerce() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct DepartementOptions {
    columns: Columns,
    #[serde(default = "default_coerce")]
    coerce: bool,
}

/// Normalizes French département codes
///
/// Metropolitan codes become two digits (`"1"` and `"015"` give `"01"` and `"15"`), Corsica
/// is `"2A"`/`"2B"` in any case and overseas codes 971 to 976 are kept. Anything else is
/// invalid: it becomes `Null` when coercing (the default), an error otherwise.
///
/// Corsican codes must match exactly: a value merely containing `2A`, such as `"Corse 2A"`,
/// is invalid.
#[derive(Debug, Clone)]
pub struct DepartementCodeParser {
    columns: Vec<String>,
    coerce: bool,
}

impl DepartementCodeParser {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            coerce: true,
        }
    }

    pub fn with_coerce(mut self, coerce: bool) -> Self {
        self.coerce = coerce;
        self
    }

    pub fn from_params(params: &Params) -> Result<Self> {
        let options: DepartementOptions = parse_params("DepartementCodeParser", params)?;
        let columns = match options.columns {
            Columns::One(column) => vec![column],
            Columns::Many(columns) => columns,
        };
        Ok(Self::new(columns).with_coerce(options.coerce))
    }

    fn parse(&self, column: &str, value: &Value) -> Result<Value> {
        let raw = if value.is_missing() || value.is_null() {
            None
        } else {
            Some(value.to_string())
        };
        match raw.as_deref().and_then(departement_code) {
            Some(code) => Ok(Value::Text(code)),
            None if self.coerce => Ok(Value::Null),
            None => Err(EtlError::Type {
                column: column.to_string(),
                reason: format!(
                    "value {} is not a valid département code",
                    raw.unwrap_or_else(|| "null".to_string())
                ),
            }
            .into()),
        }
    }
}

/// Canonical form of a département code, `None` when invalid
fn departement_code(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let upper = raw.to_uppercase();
    if upper == "2A" || upper == "2B" {
        return Some(upper);
    }
    if !(1..=3).contains(&raw.len()) || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let code: u16 = raw.parse().ok()?;
    match (raw.len(), code) {
        (_, 1..=95) => Some(format!("{code:02}")),
        (3, 971..=976) => Some(raw.to_string()),
        _ => None,
    }
}

impl Transformer for DepartementCodeParser {
    fn transform(&self, mut table: Table) -> Result<Table> {
        for name in &self.columns {
            let column = table
                .column_mut(name)
                .ok_or_else(|| EtlError::MissingColumn(name.clone()))?;
            for value in &mut column.values {
                *value = self.parse(name, value)?;
            }
        }
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::etl_error;

    fn column(values: Vec<Value>) -> Table {
        let rows = values.into_iter().map(|v| vec![v]).collect();
        Table::from_rows(vec!["col1"], rows).unwrap()
    }

    fn parser() -> DepartementCodeParser {
        DepartementCodeParser::new(vec!["col1".into()])
    }

    #[test]
    fn test_valid_values() {
        let input = column(vec![
            Value::from("1"),
            Value::from("015"),
            Value::Int(974),
            Value::from("2A"),
            Value::from("2b"),
            Value::Int(95),
        ]);
        let output = parser().transform(input).unwrap();
        let expected = column(
            ["01", "15", "974", "2A", "2B", "95"]
                .into_iter()
                .map(Value::from)
                .collect(),
        );
        assert_eq!(output, expected);
    }

    #[test]
    fn test_invalid_values_become_null() {
        let input = column(vec![
            Value::Null,
            Value::from("0"),
            Value::from("99"),
            Value::from("999"),
            Value::from("1000"),
            Value::from("-15"),
            Value::from("A"),
            Value::from("4A"),
            Value::Float(f64::NAN),
            Value::from("00"),
            Value::from("000"),
            Value::from("100"),
            Value::Float(14.4),
            Value::from("97A"),
        ]);
        let output = parser().transform(input).unwrap();
        assert!(output.column("col1").unwrap().values.iter().all(Value::is_null));
    }

    #[test]
    fn test_corsica_requires_exact_code() {
        let output = parser()
            .transform(column(vec![
                Value::from(" 2b "),
                Value::from("Corse 2A"),
                Value::from("2AB"),
            ]))
            .unwrap();
        let values = &output.column("col1").unwrap().values;
        assert_eq!(values, &vec![Value::from("2B"), Value::Null, Value::Null]);
    }

    #[test]
    fn test_raises_without_coerce() {
        for raw in ["0", "99", "100", "bonjour", "10A", "A4"] {
            let err = parser()
                .with_coerce(false)
                .transform(column(vec![Value::from(raw)]))
                .unwrap_err();
            assert!(matches!(etl_error(&err), Some(EtlError::Type { .. })));
            assert!(err.to_string().contains(&format!("value {raw} is not")));
        }
    }

    #[test]
    fn test_multiple_columns_from_params() {
        let params = serde_json::json!({"columns": ["col1", "col2"]});
        let parser = DepartementCodeParser::from_params(params.as_object().unwrap()).unwrap();
        let table = Table::from_rows(
            vec!["col1", "col2"],
            vec![
                vec![Value::from("a"), Value::from("5")],
                vec![Value::from("75"), Value::Int(7)],
            ],
        )
        .unwrap();
        let output = parser.transform(table).unwrap();
        assert_eq!(output.get(0, "col1"), Some(&Value::Null));
        assert_eq!(output.get(0, "col2"), Some(&Value::from("05")));
        assert_eq!(output.get(1, "col2"), Some(&Value::from("07")));
    }
}
