//! Error types for the roaringish library.
//!
//! All fallible operations return [`Result`], whose error side is the
//! [`RoaringishError`] enum.
//!
//! # Examples
//!
//! ```
//! use roaringish::error::{Result, RoaringishError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(RoaringishError::query("empty query"))
//! }
//!
//! assert!(example_operation().is_err());
//! ```

use std::io;

use thiserror::Error;

/// The main error type for roaringish operations.
#[derive(Error, Debug)]
pub enum RoaringishError {
    /// I/O errors (file operations, mapping, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Index construction errors
    #[error("Index error: {0}")]
    Index(String),

    /// Query execution errors
    #[error("Query error: {0}")]
    Query(String),

    /// Boolean query syntax errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// On-disk format errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Analysis errors (tokenization, normalization)
    #[error("Analysis error: {0}")]
    Analysis(String),

    /// Argument outside the accepted range
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid operation for the current state
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("Error: {0}")]
    Other(String),

    /// Errors raised by user supplied collaborators
    #[error("Anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with RoaringishError.
pub type Result<T> = std::result::Result<T, RoaringishError>;

impl RoaringishError {
    /// Create a new index error.
    pub fn index<S: Into<String>>(msg: S) -> Self {
        RoaringishError::Index(msg.into())
    }

    /// Create a new query error.
    pub fn query<S: Into<String>>(msg: S) -> Self {
        RoaringishError::Query(msg.into())
    }

    /// Create a new parse error.
    pub fn parse<S: Into<String>>(msg: S) -> Self {
        RoaringishError::Parse(msg.into())
    }

    /// Create a new storage error.
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        RoaringishError::Storage(msg.into())
    }

    /// Create a new analysis error.
    pub fn analysis<S: Into<String>>(msg: S) -> Self {
        RoaringishError::Analysis(msg.into())
    }

    /// Create a new invalid argument error.
    pub fn invalid_argument<S: Into<String>>(msg: S) -> Self {
        RoaringishError::InvalidArgument(msg.into())
    }

    /// Create a new invalid operation error.
    pub fn invalid_operation<S: Into<String>>(msg: S) -> Self {
        RoaringishError::InvalidOperation(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        RoaringishError::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let error = RoaringishError::index("Test index error");
        assert_eq!(error.to_string(), "Index error: Test index error");

        let error = RoaringishError::parse("Missing closing parenthesis");
        assert_eq!(error.to_string(), "Parse error: Missing closing parenthesis");

        let error = RoaringishError::invalid_operation("indexer is closed");
        assert_eq!(error.to_string(), "Invalid operation: indexer is closed");

        let error = RoaringishError::invalid_argument("n must be positive");
        assert_eq!(error.to_string(), "Invalid argument: n must be positive");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "File not found");
        let error = RoaringishError::from(io_error);

        match error {
            RoaringishError::Io(_) => {}
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_anyhow_conversion() {
        let error = RoaringishError::from(anyhow::anyhow!("tokenizer failed"));
        assert!(error.to_string().contains("tokenizer failed"));
    }
}
