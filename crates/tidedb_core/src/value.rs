//! Scalar values and records.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A typed scalar value held in a record column.
///
/// Values map one-to-one onto JSON scalars, which is also the wire
/// representation used by the sync protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Absent / null value (only legal for nullable columns).
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value (stored as f64, like JSON numbers).
    Number(f64),
    /// Text value.
    Text(String),
}

impl Value {
    /// Returns the text content, if this is a text value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the numeric content, if this is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean content, if this is a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns true if this is the null value.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// A row in a table: a stable opaque identifier plus a mapping of
/// column name to scalar value.
///
/// The owning table is not part of the record itself; records are
/// always handled in the context of a table (the store keys tables by
/// name, and the wire format nests records under their table name).
///
/// On the wire a record is a flat JSON object: `{"id": "...", <column>:
/// <scalar>, ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Stable opaque identifier.
    pub id: String,
    /// Column values, keyed by column name.
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Record {
    /// Creates a record with the given identifier and fields.
    pub fn new(id: impl Into<String>, fields: BTreeMap<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }

    /// Creates a record with a freshly generated identifier.
    pub fn generate(fields: BTreeMap<String, Value>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            fields,
        }
    }

    /// Returns the value of a column, if set.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.fields.get(column)
    }

    /// Sets the value of a column, returning `self` for chaining.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Overwrites this record's fields with those of `other`,
    /// column by column. Columns absent from `other` are kept.
    pub fn merge_fields(&mut self, other: &Record) {
        for (column, value) in &other.fields {
            self.fields.insert(column.clone(), value.clone());
        }
    }
}
