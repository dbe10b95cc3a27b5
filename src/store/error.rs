//! Member store error types

use thiserror::Error;

/// Errors that can occur in the member store
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite failure
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Requested record does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Write would violate a uniqueness or state rule
    #[error("{0}")]
    Conflict(String),

    /// Stored value could not be decoded
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StoreError::NotFound("Member 42".to_string());
        assert_eq!(err.to_string(), "Member 42 not found");

        let err = StoreError::Conflict("Member number 7 is already taken".to_string());
        assert_eq!(err.to_string(), "Member number 7 is already taken");
    }
}
