//! Cell values

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

/// Format used to render datetimes when they leave the crate (JSON payloads, backups)
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Patterns tried, in order, when no explicit date format is configured
const DATE_PATTERNS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y",
    "%Y/%m/%d",
];

/// Parse a datetime with `format`, or with the common patterns when `format` is `None`.
///
/// Date-only patterns yield midnight.
pub fn parse_datetime(raw: &str, format: Option<&str>) -> Option<NaiveDateTime> {
    let parse = |pattern: &str| {
        NaiveDateTime::parse_from_str(raw, pattern).ok().or_else(|| {
            NaiveDate::parse_from_str(raw, pattern)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
    };
    match format {
        Some(pattern) => parse(pattern),
        None => DATE_PATTERNS.iter().find_map(|p| parse(p)),
    }
}

/// A single cell of a [`Table`](super::Table).
///
/// `Float(NaN)` and `NaT` are the "missing" sentinels produced by readers for empty cells and
/// unparsable dates. Like their floating point counterpart they are never equal to
/// themselves, which is what [`Value::is_missing`] checks.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
    /// Not-a-time
    NaT,
}

impl Value {
    /// Parse a raw cell the way delimited readers see it: empty is missing, then integer,
    /// float, boolean, and text as the fallback.
    pub fn infer(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Float(f64::NAN);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return Self::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return Self::Float(f);
        }
        match raw {
            "True" | "true" | "TRUE" => Self::Bool(true),
            "False" | "false" | "FALSE" => Self::Bool(false),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// True for values that are not equal to themselves (NaN, NaT)
    #[allow(clippy::eq_op)]
    pub fn is_missing(&self) -> bool {
        self != self
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_datetime(&self) -> Option<&NaiveDateTime> {
        match self {
            Self::DateTime(dt) => Some(dt),
            _ => None,
        }
    }

    /// Key used to match values across tables in joins.
    ///
    /// Missing and null values have no key. Integral floats share the key of the integer.
    pub(crate) fn join_key(&self) -> Option<String> {
        match self {
            Self::Null | Self::NaT => None,
            Self::Float(f) if f.is_nan() => None,
            Self::Float(f) if f.fract() == 0.0 && f.abs() < 9.0e15 => Some(format!("n:{}", *f as i64)),
            Self::Float(f) => Some(format!("n:{f}")),
            Self::Int(i) => Some(format!("n:{i}")),
            Self::Bool(b) => Some(format!("b:{b}")),
            Self::Text(s) => Some(format!("s:{s}")),
            Self::DateTime(dt) => Some(format!("d:{dt}")),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            (Self::DateTime(a), Self::DateTime(b)) => a == b,
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

/// Renders a cell as backup files store it: missing values are empty.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null | Self::NaT => Ok(()),
            Self::Float(v) if v.is_nan() => Ok(()),
            Self::Bool(b) => write!(f, "{}", if *b { "True" } else { "False" }),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Null | Self::NaT => serializer.serialize_none(),
            Self::Float(f) if !f.is_finite() => serializer.serialize_none(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Int(i) => serializer.serialize_i64(*i),
            Self::Float(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
            Self::DateTime(dt) => serializer.collect_str(&dt.format(DATETIME_FORMAT)),
        }
    }
}
