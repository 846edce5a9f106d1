//! Error types for schema, document and discovery loading

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Unknown type: {0}")]
    UnknownType(String),

    #[error("Invalid schema: {0}")]
    InvalidSchema(String),

    #[error("Malformed document at line {line}: {message}")]
    Document { line: usize, message: String },

    #[error("Value error: {0}")]
    Value(#[from] assetlsp_values::Error),

    #[error("Invalid key pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn document(line: usize, message: impl Into<String>) -> Self {
        Error::Document {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
