//! Error types module
//!
//! All SDK operations return `CoreError`. The variants mirror the failure
//! classes a caller can meaningfully react to: bad input, a lifecycle
//! precondition violation, a Core API rejection, a storage failure during a
//! single file, or a completed transfer whose final status write failed.

use crate::models::FileInfo;

/// Result type for SDK operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required identifier, name, path or project was missing or malformed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The artifact is not in the lifecycle state the operation requires.
    /// Uploads require `CREATED`; any other observed state blocks.
    #[error("artifact is not in CREATED state, current state: {current}")]
    InvalidState { current: String },

    /// The storage locator could not be parsed or uses an unsupported scheme.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// The Core API answered with a non-2xx status.
    #[error("core responded with status {status}: {message}")]
    Remote { status: u16, message: String },

    /// The Core API could not be reached at the transport level.
    #[error("core connection failed: {0}")]
    Connection(String),

    /// Local I/O or object-store failure while transferring a single file.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// All files were transferred, but persisting the final READY status
    /// failed. Carries everything needed to retry only the metadata write.
    #[error("upload succeeded but failed to update artifact {artifact_id} status")]
    PartialSuccess {
        artifact_id: String,
        files: Vec<FileInfo>,
    },

    /// A Core API response did not match the documented document shape.
    #[error("unexpected response shape: {0}")]
    Malformed(String),

    /// The cancellation token was observed at a per-file boundary.
    #[error("operation cancelled")]
    Cancelled,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
