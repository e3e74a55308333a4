//! Request-level classification of LineTable errors.
//!
//! `Status` decides which response a failure becomes; `ErrorMessage` is the
//! serializable body sent with it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::error;

use linetable_core::TableError;

/// Response class of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Malformed request: invalid table name or configuration
    BadRequest,
    /// Row id at or beyond the table's row count
    NotFound,
    /// Corruption or I/O failure
    Internal,
}

impl Status {
    /// HTTP status code for this class.
    pub fn code(self) -> u16 {
        match self {
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::Internal => 500,
        }
    }
}

impl From<&TableError> for Status {
    fn from(err: &TableError) -> Self {
        match err {
            TableError::InvalidTableName { .. } | TableError::InvalidConfig(_) => Status::BadRequest,
            TableError::RowNotFound { .. } => Status::NotFound,
            TableError::Corrupted { .. } | TableError::Io { .. } => Status::Internal,
        }
    }
}

/// Error body returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorMessage {
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
    pub message: String,
    /// Caller-supplied description of the request, e.g. `uri=/database/users/5`
    pub description: String,
}

impl ErrorMessage {
    /// Build the body for `err` and log it.
    pub fn new(err: &TableError, description: impl Into<String>) -> Self {
        let status = Status::from(err);
        let message = Self {
            status_code: status.code(),
            timestamp: Utc::now(),
            message: err.to_string(),
            description: description.into(),
        };
        error!(status = message.status_code, error = %message.message,
               description = %message.description, "request failed");
        message
    }

    /// Response class of this body.
    pub fn status(&self) -> Status {
        match self.status_code {
            400 => Status::BadRequest,
            404 => Status::NotFound,
            _ => Status::Internal,
        }
    }
}
