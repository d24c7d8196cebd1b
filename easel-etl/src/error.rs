//! Error types for easel-etl
//!
//! Only whole-source and storage failures are errors. Problems with a single
//! record are reported as [`crate::diagnostics::Diagnostic`]s instead.

use std::path::PathBuf;
use thiserror::Error;

/// Batch error type
#[derive(Debug, Error)]
pub enum EtlError {
    /// Source file missing or unreadable
    #[error("Failed to read {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV header could not be decoded
    #[error("Failed to parse CSV {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Required column absent from a CSV header
    #[error("Missing column '{column}' in {path}")]
    MissingColumn { path: PathBuf, column: String },

    /// Storage failure during the load transaction
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// easel-common error
    #[error(transparent)]
    Common(#[from] easel_common::Error),
}

/// Result type for batch operations
pub type EtlResult<T> = Result<T, EtlError>;
