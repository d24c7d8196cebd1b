//! Common error types for Easel

use thiserror::Error;

/// Common result type for Easel operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Easel tools
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sqlx_error_converts_to_database() {
        let err: Error = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, Error::Database(_)));
        assert!(err.to_string().starts_with("Database error:"));
    }

    #[test]
    fn test_config_error_message() {
        let err = Error::Config("missing [server] port".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing [server] port");
    }
}
