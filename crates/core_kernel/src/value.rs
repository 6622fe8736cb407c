//! Scalar attribute values
//!
//! Contact attributes are a flat map from a canonical key (the CRM field
//! name) to a scalar value. Submitted form data, order billing fields and
//! posted profile fields all arrive in this shape.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single scalar value synced to or from the CRM
///
/// `Null` and `Other` carry submitted values that are not scalars (empty
/// inputs, compound name/address fields). They pass through the mapper
/// unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Text(String),
    Decimal(Decimal),
    List(Vec<String>),
    Other(serde_json::Value),
}

/// Canonical attribute map, ordered by key for deterministic output
pub type Attributes = BTreeMap<String, FieldValue>;

impl FieldValue {
    /// Creates a text value
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    /// Returns the text content, if this is a text value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true for null, blank text and empty lists
    pub fn is_empty(&self) -> bool {
        match self {
            FieldValue::Null => true,
            FieldValue::Text(s) => s.trim().is_empty(),
            FieldValue::List(items) => items.is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Decimal(d) => write!(f, "{}", d),
            FieldValue::List(items) => f.write_str(&items.join(", ")),
            FieldValue::Other(value) => write!(f, "{}", value),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Integer(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        FieldValue::Decimal(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        FieldValue::List(value)
    }
}
