//! Error types for Caddyclub

use thiserror::Error;

/// Result type for Caddyclub operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for Caddyclub
#[derive(Error, Debug)]
pub enum Error {
    /// Input refused by the validator before parsing
    #[error("Validation rejected input: {}", errors.join("; "))]
    ValidationRejected { errors: Vec<String> },

    /// Administrative JSON could not be read or written
    #[error("JSON error: {0}")]
    Json(String),

    /// Conversion options could not be loaded
    #[error("Options error: {0}")]
    Options(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Json(e.to_string())
    }
}
