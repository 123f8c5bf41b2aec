//! Error types for the sync protocol.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors that can occur while encoding or decoding protocol messages.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A payload failed to parse as the expected JSON shape (this
    /// includes missing required fields; serde reports them).
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Malformed(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_errors_become_malformed() {
        let err = serde_json::from_str::<u64>("not json").unwrap_err();
        let protocol: ProtocolError = err.into();
        assert!(matches!(protocol, ProtocolError::Malformed(_)));
        assert!(protocol.to_string().starts_with("malformed payload"));
    }
}
