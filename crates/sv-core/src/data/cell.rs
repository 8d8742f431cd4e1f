//! Cell values and JSON coercion
//!
//! Request payloads carry cells as `number | string | null`. Strings that
//! parse as numbers become numeric, empty or whitespace-only strings become
//! missing, everything else stays text (candidate categorical levels).

use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// A single cell of a tabular dataset
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Numeric value
    Number(f64),
    /// Non-numeric text (categorical level)
    Text(String),
    /// Missing value (null, empty, or whitespace-only)
    Missing,
}

impl Cell {
    /// Coerce a raw string the way the wire contract requires
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Cell::Number(v),
            _ => Cell::Text(trimmed.to_string()),
        }
    }

    /// Numeric view of the cell, if it has one
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    /// Categorical label of the cell: text as-is, numbers by display form
    pub fn category_label(&self) -> Option<String> {
        match self {
            Cell::Number(v) => Some(v.to_string()),
            Cell::Text(s) => Some(s.clone()),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        if v.is_finite() {
            Cell::Number(v)
        } else {
            Cell::Missing
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::from_text(s)
    }
}

#[derive(serde::Deserialize)]
#[serde(untagged)]
enum RawCell {
    Number(f64),
    Text(String),
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<RawCell>::deserialize(deserializer)? {
            None => Cell::Missing,
            Some(RawCell::Number(v)) => Cell::from(v),
            Some(RawCell::Text(s)) => Cell::from_text(&s),
        })
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Cell::Number(v) => serializer.serialize_f64(*v),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Missing => serializer.serialize_none(),
        }
    }
}
