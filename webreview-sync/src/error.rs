//! Error types for the sync pipeline.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that abort a whole `write`/`read`/`delete`/`finalize` call.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("signing RPC failed ({}): {message}", .status.map_or_else(|| "no response".to_string(), |s| s.to_string()))]
    SigningRpc { status: Option<u16>, message: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("signing service returned an unusable request: {0}")]
    InvalidSignedRequest(String),

    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// A single object-store call that did not succeed.
///
/// Captured per path in [`crate::executor::ExecutionResult`]; never aborts
/// sibling operations.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ObjectStoreError {
    #[error("object store returned {status}: {message}")]
    Status {
        status: u16,
        message: String,
        /// Parsed body when the store answered with a JSON error document.
        data: Option<serde_json::Value>,
    },

    #[error("object store request timed out after {0:?}")]
    Timeout(Duration),

    #[error("object store transport error: {0}")]
    Transport(String),
}

impl ObjectStoreError {
    /// Builds a status error from a raw response body.
    ///
    /// A JSON body with an `error_message` field supplies the message.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let data = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .filter(|v| v.is_object());
        let message = data
            .as_ref()
            .and_then(|d| d.get("error_message"))
            .and_then(|m| m.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
        ObjectStoreError::Status {
            status,
            message,
            data,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ObjectStoreError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ObjectStoreError::Timeout(_))
    }
}
