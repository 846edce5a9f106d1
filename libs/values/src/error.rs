//! Error types for the evaluation engine
//!
//! Resolution misses are never errors: they degrade to null values. Errors are
//! reserved for malformed text and for callers asking a node for a type it did
//! not declare.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Format error: {0}")]
    FormatError(String),

    #[error("Type mismatch: node declares {actual}, caller requested {expected}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    #[error("Unknown function: {0}")]
    UnknownFunction(String),

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    #[error("JSON error: {0}")]
    Json(String),
}

impl Error {
    pub(crate) fn type_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Error::TypeMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json(err.to_string())
    }
}
