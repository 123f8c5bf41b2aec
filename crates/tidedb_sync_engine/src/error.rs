//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
///
/// No error here is fatal to the host application: the local store
/// remains fully usable offline after any sync failure, and no error
/// mutates the checkpoint.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Network failure, timeout, or non-2xx response. Retryable on
    /// the next trigger.
    #[error("transport error: {message}")]
    Transport {
        /// Error detail (for non-2xx responses, the response body).
        message: String,
        /// Whether the next trigger may retry.
        retryable: bool,
    },

    /// A pull response failed to parse. Retryable; nothing was
    /// applied, so local state is untouched.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// A path was entered whose contract does not hold, e.g. a turbo
    /// load attempted while local changes are pending.
    #[error("precondition failed: {reason}")]
    PreconditionFailed {
        /// What the violated precondition was.
        reason: String,
    },

    /// The client's schema version exceeds the highest version the
    /// migration table knows. A packaging defect, not retryable.
    #[error("schema mismatch: client at version {from_version}, highest known {highest_known}")]
    SchemaMismatch {
        /// The client's recorded version.
        from_version: u32,
        /// The highest version registered with the migration manager.
        highest_known: u32,
    },

    /// Delta application found a created record that already exists
    /// locally and is not a pending-delete tombstone.
    #[error("duplicate record {record_id} in table {table}")]
    DuplicateRecord {
        /// Table the create targeted.
        table: String,
        /// The colliding identifier.
        record_id: String,
    },

    /// A pulled record does not fit the local schema (unknown column,
    /// wrong scalar type, or null in a non-nullable column). The
    /// client and server disagree about the table's shape; not
    /// retryable.
    #[error("apply conflict in table {table}: {detail}")]
    ApplyConflict {
        /// Table where the conflict occurred.
        table: String,
        /// Description of the conflict.
        detail: String,
    },

    /// The local store rejected an operation.
    #[error("store error: {0}")]
    Store(#[from] tidedb_core::CoreError),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Returns true if the next trigger may retry after this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::MalformedPayload(_) => true,
            _ => false,
        }
    }
}

impl From<tidedb_sync_protocol::ProtocolError> for SyncError {
    fn from(err: tidedb_sync_protocol::ProtocolError) -> Self {
        SyncError::MalformedPayload(err.to_string())
    }
}
