//! Grid-specific error types

use thiserror::Error;

/// Errors that can occur in grid trading operations
#[derive(Error, Debug, Clone)]
pub enum GridError {
    #[error("Invalid grid configuration: {0}")]
    InvalidConfig(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Exchange error {code}: {message}")]
    Exchange { code: i64, message: String },

    #[error("Quantization error: {0}")]
    Quantization(String),

    #[error("Asset not found: {0}")]
    AssetNotFound(String),

    #[error("Event feed error: {0}")]
    Feed(String),

    #[error("Engine is in invalid state for operation: {current_state}")]
    InvalidState { current_state: String },

    #[error("SDK error: {0}")]
    Sdk(String),
}

impl From<crate::Error> for GridError {
    fn from(err: crate::Error) -> Self {
        match err {
            crate::Error::Transport(msg) => GridError::Transport(msg),
            crate::Error::Exchange { code, message } => GridError::Exchange { code, message },
            crate::Error::WebSocket(msg) => GridError::Feed(msg),
            other => GridError::Sdk(other.to_string()),
        }
    }
}

/// Result type for grid operations
pub type GridResult<T> = std::result::Result<T, GridError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sdk_error_keeps_kind() {
        let err: GridError = crate::Error::Exchange { code: -2010, message: "insufficient balance".into() }.into();
        assert!(matches!(err, GridError::Exchange { code: -2010, .. }));

        let err: GridError = crate::Error::Transport("connection reset".into()).into();
        assert!(matches!(err, GridError::Transport(_)));

        let err: GridError = crate::Error::JsonParse("eof".into()).into();
        assert!(matches!(err, GridError::Sdk(_)));
    }
}
