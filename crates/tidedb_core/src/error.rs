//! Error types for TideDB core.

use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in core store operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The named table is not declared in the schema.
    #[error("table not found: {name}")]
    TableNotFound {
        /// Name of the table.
        name: String,
    },

    /// An insert targeted an identifier that already exists.
    #[error("duplicate record id {record_id} in table {table}")]
    DuplicateId {
        /// Table the insert targeted.
        table: String,
        /// The colliding identifier.
        record_id: String,
    },

    /// An update targeted an identifier that does not exist.
    #[error("record not found: {record_id} in table {table}")]
    RecordNotFound {
        /// Table that was searched.
        table: String,
        /// The missing identifier.
        record_id: String,
    },

    /// A write carried a column the schema does not declare.
    #[error("unknown column {column} in table {table}")]
    UnknownColumn {
        /// Table the write targeted.
        table: String,
        /// The undeclared column.
        column: String,
    },

    /// A write carried a value of the wrong scalar type.
    #[error("type mismatch for column {column} in table {table}")]
    TypeMismatch {
        /// Table the write targeted.
        table: String,
        /// The offending column.
        column: String,
    },

    /// A null value was written to a non-nullable column.
    #[error("null written to non-nullable column {column} in table {table}")]
    NullViolation {
        /// Table the write targeted.
        table: String,
        /// The non-nullable column.
        column: String,
    },

    /// The transaction closure aborted.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for abort.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CoreError::DuplicateId {
            table: "products".into(),
            record_id: "p1".into(),
        };
        assert!(err.to_string().contains("products"));
        assert!(err.to_string().contains("p1"));
    }
}
