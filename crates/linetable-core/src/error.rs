//! Error types for LineTable operations
//!
//! All LineTable errors are represented by the TableError enum, which keeps
//! enough context (table, row, path) to tell a caller-side "missing resource"
//! apart from a genuine internal failure.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::table::RowId;

/// LineTable error types with detailed context
#[derive(Debug, Clone, Error)]
pub enum TableError {
    /// Table name does not match `[A-Za-z0-9_.-]+`
    #[error("Invalid table name: {name:?}")]
    InvalidTableName {
        /// The rejected name
        name: String,
    },

    /// Row id is outside the table's current row count
    #[error("Record with ID={row_id} not found in '{table}'")]
    RowNotFound {
        /// Table that was queried
        table: String,
        /// Requested row id
        row_id: RowId,
    },

    /// On-disk line count disagrees with the tracked row count
    #[error("Corrupted table file: {table} ({reason})")]
    Corrupted {
        /// Affected table
        table: String,
        /// Path of the table file
        path: PathBuf,
        /// What the check found
        reason: String,
    },

    /// I/O operation failed
    #[error("I/O error in {}: {message} ({kind})", .path.display())]
    Io {
        /// The file path where the error occurred
        path: PathBuf,
        /// The underlying I/O error kind
        kind: io::ErrorKind,
        /// Human-readable description
        message: String,
    },

    /// Configuration rejected by `Config::validate` or failed to load
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl TableError {
    /// Build an `Io` variant from an `io::Error` with the path and a short context.
    pub fn io(path: &Path, context: &str, err: io::Error) -> Self {
        TableError::Io {
            path: path.to_path_buf(),
            kind: err.kind(),
            message: format!("{}: {}", context, err),
        }
    }

    /// True for `RowNotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TableError::RowNotFound { .. })
    }

    /// True for `Corrupted`.
    pub fn is_corruption(&self) -> bool {
        matches!(self, TableError::Corrupted { .. })
    }
}

/// Result type alias for LineTable operations
pub type TableResult<T> = Result<T, TableError>;
