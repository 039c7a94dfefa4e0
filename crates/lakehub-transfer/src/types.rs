//! Request and outcome types for the transfer orchestrator.

use std::path::PathBuf;

use lakehub_core::FileInfo;

/// Bucket assumed when a new artifact is created without an explicit one.
pub const DEFAULT_BUCKET: &str = "datalake";

/// Parameters for an artifact upload.
///
/// With `id` set the upload targets an existing artifact document, which
/// must still be in its initial state. Without `id` a new document is
/// created first, and `name` becomes mandatory.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub project: String,
    /// Canonical resource endpoint, e.g. `artifacts`.
    pub resource: String,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Local file or directory to upload.
    pub input: PathBuf,
    /// Storage bucket for newly created artifacts; `DEFAULT_BUCKET` when
    /// absent. Ignored for existing artifacts, whose locator is read from
    /// the document.
    pub bucket: Option<String>,
    /// Run to record as the artifact's producer.
    pub run_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub artifact_id: String,
    pub files: Vec<FileInfo>,
}

/// Parameters for an artifact download. Exactly one of `id` or `name` must
/// be set; lookup by name resolves the latest version.
#[derive(Debug, Clone, Default)]
pub struct DownloadRequest {
    pub project: String,
    pub resource: String,
    pub id: Option<String>,
    pub name: Option<String>,
    /// Local destination; the current directory when absent.
    pub destination: Option<PathBuf>,
}

/// One local file materialized by a download, reported from a post-transfer
/// stat of the written file.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub filename: String,
    pub size: u64,
    pub path: PathBuf,
}
