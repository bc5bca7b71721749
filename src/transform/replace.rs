//! Ordered regex replacement maps

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

/// Ordered list of `pattern -> replacement` rules
///
/// Deserialized from a JSON object whose key order is kept. Rules are applied one after the
/// other, each on the output of the previous one, replacing every match. Replacements use
/// the `regex` syntax (`$1`, `${name}`).
///
/// # Example
/// ```
/// use tabload::transform::ReplaceMap;
///
/// let map = ReplaceMap::new([("é", "e"), (" ", "_")]).unwrap();
/// assert_eq!(map.apply("Code département"), "Code_departement");
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(try_from = "Map<String, JsonValue>")]
pub struct ReplaceMap {
    rules: Vec<(Regex, String)>,
}

impl ReplaceMap {
    /// Build from `(pattern, replacement)` pairs, in order
    pub fn new<I, P, R>(pairs: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = (P, R)>,
        P: AsRef<str>,
        R: Into<String>,
    {
        let rules = pairs
            .into_iter()
            .map(|(pattern, replacement)| Ok((Regex::new(pattern.as_ref())?, replacement.into())))
            .collect::<Result<Vec<_>, regex::Error>>()?;
        Ok(Self { rules })
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Apply every rule in order
    pub fn apply(&self, input: &str) -> String {
        self.rules
            .iter()
            .fold(input.to_string(), |text, (regex, replacement)| {
                regex.replace_all(&text, replacement.as_str()).into_owned()
            })
    }
}

impl TryFrom<Map<String, JsonValue>> for ReplaceMap {
    type Error = String;

    fn try_from(map: Map<String, JsonValue>) -> Result<Self, Self::Error> {
        let mut pairs = Vec::with_capacity(map.len());
        for (pattern, replacement) in map {
            let replacement = match replacement {
                JsonValue::String(s) => s,
                JsonValue::Null => String::new(),
                other => other.to_string(),
            };
            pairs.push((pattern, replacement));
        }
        Self::new(pairs).map_err(|e| format!("invalid pattern: {e}"))
    }
}
