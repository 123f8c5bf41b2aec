//! Schema descriptors.
//!
//! Tables and columns are declared as explicit data, not derived by
//! reflection. The same descriptors are consulted by the store (for
//! write validation) and by the sync layer (to describe schema
//! transitions to the remote endpoint).

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// The scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarType {
    /// UTF-8 text.
    Text,
    /// Floating-point number.
    Number,
    /// Boolean.
    Boolean,
}

impl ScalarType {
    /// Returns true if `value` inhabits this scalar type.
    pub fn admits(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ScalarType::Text, Value::Text(_))
                | (ScalarType::Number, Value::Number(_))
                | (ScalarType::Boolean, Value::Bool(_))
        )
    }
}

/// Descriptor for a single column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    /// Column name.
    pub name: String,
    /// Scalar type of the column.
    pub column_type: ScalarType,
    /// Whether null is a legal value.
    pub nullable: bool,
    /// Whether the store should index this column.
    pub indexed: bool,
}

impl ColumnSchema {
    /// Creates a required, unindexed column.
    pub fn new(name: impl Into<String>, column_type: ScalarType) -> Self {
        Self {
            name: name.into(),
            column_type,
            nullable: false,
            indexed: false,
        }
    }

    /// Marks the column nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Marks the column indexed.
    pub fn indexed(mut self) -> Self {
        self.indexed = true;
        self
    }
}

/// Descriptor for a single table: name plus ordered columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub name: String,
    /// Ordered column descriptors.
    pub columns: Vec<ColumnSchema>,
}

impl TableSchema {
    /// Creates a table descriptor.
    pub fn new(name: impl Into<String>, columns: Vec<ColumnSchema>) -> Self {
        Self {
            name: name.into(),
            columns,
        }
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// The full local schema: a version number plus table descriptors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema version, advanced by migrations.
    pub version: u32,
    /// Table descriptors.
    pub tables: Vec<TableSchema>,
}

impl Schema {
    /// Creates a schema.
    pub fn new(version: u32, tables: Vec<TableSchema>) -> Self {
        Self { version, tables }
    }

    /// Looks up a table by name.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.iter().find(|t| t.name == name)
    }
}
