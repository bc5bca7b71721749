//! Equi-joins between tables

use crate::error::EtlError;
use crate::table::{Column, Table, Value};
use eyre::Result;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;

/// Which rows survive a join
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JoinKind {
    /// Rows whose key is on both sides
    #[default]
    Inner,
    /// Every left row, unmatched ones padded with missing values
    Left,
    /// Every right row, in right order
    Right,
    /// Left join rows followed by the unmatched right rows
    Outer,
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Inner => "inner",
            Self::Left => "left",
            Self::Right => "right",
            Self::Outer => "outer",
        };
        write!(f, "{name}")
    }
}

/// Join `left` and `right` on equal values of `keys`
///
/// Without `keys`, the columns the two tables have in common are used. Output columns are
/// the left columns followed by the right non-key columns; non-key names present on both
/// sides are suffixed `_x` (left) and `_y` (right). Rows with a null or missing key never
/// match. Duplicate keys yield every combination of matching rows.
///
/// # Errors
/// Returns an error if a key is missing from either table or no key can be determined
pub fn join(left: &Table, right: &Table, keys: Option<&[String]>, how: JoinKind) -> Result<Table> {
    let keys: Vec<String> = match keys {
        Some(keys) => keys.to_vec(),
        None => left
            .column_names()
            .into_iter()
            .filter(|name| right.has_column(name))
            .map(str::to_string)
            .collect(),
    };
    if keys.is_empty() {
        return Err(EtlError::config("No common columns to perform merge on").into());
    }
    for key in &keys {
        for table in [left, right] {
            if !table.has_column(key) {
                return Err(EtlError::MissingColumn(key.clone()).into());
            }
        }
    }

    let left_keys = row_keys(left, &keys);
    let right_keys = row_keys(right, &keys);

    let mut right_index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (row, key) in right_keys.iter().enumerate() {
        if let Some(key) = key {
            right_index.entry(key.as_str()).or_default().push(row);
        }
    }

    // (left row, right row) pairs in output order
    let mut pairs: Vec<(Option<usize>, Option<usize>)> = Vec::new();
    match how {
        JoinKind::Inner | JoinKind::Left | JoinKind::Outer => {
            let mut matched_right = vec![false; right.n_rows()];
            for (l, key) in left_keys.iter().enumerate() {
                let matches = key
                    .as_deref()
                    .and_then(|k| right_index.get(k))
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                if matches.is_empty() {
                    if how != JoinKind::Inner {
                        pairs.push((Some(l), None));
                    }
                    continue;
                }
                for &r in matches {
                    matched_right[r] = true;
                    pairs.push((Some(l), Some(r)));
                }
            }
            if how == JoinKind::Outer {
                pairs.extend(
                    matched_right
                        .iter()
                        .enumerate()
                        .filter(|(_, matched)| !**matched)
                        .map(|(r, _)| (None, Some(r))),
                );
            }
        }
        JoinKind::Right => {
            let mut left_index: HashMap<&str, Vec<usize>> = HashMap::new();
            for (row, key) in left_keys.iter().enumerate() {
                if let Some(key) = key {
                    left_index.entry(key.as_str()).or_default().push(row);
                }
            }
            for (r, key) in right_keys.iter().enumerate() {
                match key.as_deref().and_then(|k| left_index.get(k)) {
                    Some(matches) => pairs.extend(matches.iter().map(|&l| (Some(l), Some(r)))),
                    None => pairs.push((None, Some(r))),
                }
            }
        }
    }

    let missing = || Value::Float(f64::NAN);
    let mut columns = Vec::with_capacity(left.n_columns() + right.n_columns());

    for column in left.columns() {
        let is_key = keys.contains(&column.name);
        let name = if !is_key && right.has_column(&column.name) {
            format!("{}_x", column.name)
        } else {
            column.name.clone()
        };
        // Key cells come from whichever side has the row
        let right_key = is_key.then(|| right.column(&column.name)).flatten();
        let values = pairs
            .iter()
            .map(|(l, r)| match (l, r, right_key) {
                (Some(l), _, _) => column.values[*l].clone(),
                (None, Some(r), Some(rk)) => rk.values[*r].clone(),
                _ => missing(),
            })
            .collect();
        columns.push(Column::new(name, values));
    }

    for column in right.columns() {
        if keys.contains(&column.name) {
            continue;
        }
        let name = if left.has_column(&column.name) {
            format!("{}_y", column.name)
        } else {
            column.name.clone()
        };
        let values = pairs
            .iter()
            .map(|(_, r)| r.map_or_else(missing, |r| column.values[r].clone()))
            .collect();
        columns.push(Column::new(name, values));
    }

    log::debug!(
        "{} join on [{}]: {} x {} rows -> {} rows",
        how,
        keys.join(", "),
        left.n_rows(),
        right.n_rows(),
        pairs.len()
    );
    Table::new(columns)
}

/// Composite join key of every row, `None` when any part is null or missing
fn row_keys(table: &Table, keys: &[String]) -> Vec<Option<String>> {
    let columns: Vec<&Column> = keys.iter().filter_map(|k| table.column(k)).collect();
    (0..table.n_rows())
        .map(|row| {
            columns
                .iter()
                .map(|c| c.values[row].join_key())
                .collect::<Option<Vec<String>>>()
                .map(|parts| parts.join("\u{1f}"))
        })
        .collect()
}
