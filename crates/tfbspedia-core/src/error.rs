//! Error types for the TFBS search engine.
//!
//! Only two kinds reach callers of the search operations: invalid input
//! (`InvalidArgument`) and record-store failures (`Store` / `StoreTimeout`).
//! Source and cache problems are absorbed below the cache boundary and show
//! up as empty identifier sets or zero counts.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for the TFBS library.
#[derive(Debug, Error)]
pub enum TfbsError {
    // Input validation
    #[error("Invalid argument {field}: {message}")]
    InvalidArgument { field: String, message: String },

    // Record store errors
    #[error("Store error: {message}")]
    Store {
        message: String,
        #[source]
        source: Option<rusqlite::Error>,
    },

    #[error("Store query timed out after {0:?}")]
    StoreTimeout(Duration),

    // File system errors
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    // Serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    #[error("CSV error: {message}")]
    Csv { message: String },

    // Configuration errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("{0}")]
    Other(String),
}

/// Result type alias for TFBS operations.
pub type Result<T> = std::result::Result<T, TfbsError>;

impl From<std::io::Error> for TfbsError {
    fn from(err: std::io::Error) -> Self {
        TfbsError::Io {
            message: err.to_string(),
            path: None,
            source: Some(err),
        }
    }
}

impl From<serde_json::Error> for TfbsError {
    fn from(err: serde_json::Error) -> Self {
        TfbsError::Json {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<rusqlite::Error> for TfbsError {
    fn from(err: rusqlite::Error) -> Self {
        TfbsError::Store {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

impl From<csv::Error> for TfbsError {
    fn from(err: csv::Error) -> Self {
        TfbsError::Csv {
            message: err.to_string(),
        }
    }
}

impl TfbsError {
    /// Create an invalid-argument error for a named input.
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        TfbsError::InvalidArgument {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a store error without an underlying SQLite cause.
    pub fn store(message: impl Into<String>) -> Self {
        TfbsError::Store {
            message: message.into(),
            source: None,
        }
    }

    /// Create an IO error with path context.
    pub fn io_with_path(err: std::io::Error, path: impl Into<PathBuf>) -> Self {
        TfbsError::Io {
            message: err.to_string(),
            path: Some(path.into()),
            source: Some(err),
        }
    }

    /// Whether this error belongs to the store-failure kind (unreachable,
    /// rejected query, or timeout).
    pub fn is_store_error(&self) -> bool {
        matches!(self, TfbsError::Store { .. } | TfbsError::StoreTimeout(_))
    }

    /// Convert to a JSON-RPC error code.
    ///
    /// - -32602: Invalid params
    /// - -32603: Internal error
    /// - -32000: Record store unavailable, rejected the query, or timed out
    pub fn to_rpc_error_code(&self) -> i32 {
        match self {
            TfbsError::InvalidArgument { .. } => -32602,
            TfbsError::Store { .. } | TfbsError::StoreTimeout(_) => -32000,
            _ => -32603,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TfbsError::invalid("region", "start must not exceed end");
        assert_eq!(
            err.to_string(),
            "Invalid argument region: start must not exceed end"
        );
    }

    #[test]
    fn test_rpc_error_codes() {
        assert_eq!(TfbsError::invalid("page", "too large").to_rpc_error_code(), -32602);
        assert_eq!(TfbsError::store("gone").to_rpc_error_code(), -32000);
        assert_eq!(
            TfbsError::StoreTimeout(Duration::from_secs(1)).to_rpc_error_code(),
            -32000
        );
        assert_eq!(TfbsError::Other("x".into()).to_rpc_error_code(), -32603);
    }

    #[test]
    fn test_store_error_kind() {
        assert!(TfbsError::StoreTimeout(Duration::from_secs(5)).is_store_error());
        assert!(TfbsError::from(rusqlite::Error::InvalidQuery).is_store_error());
        assert!(!TfbsError::invalid("batch", "empty").is_store_error());
    }
}
