//! Artifact transfer orchestration.
//!
//! Couples the Core API (artifact documents and their lifecycle state) with
//! an object store (the bytes). Uploads drive the document through
//! `CREATED -> UPLOADING -> READY` (or `ERROR`), keeping the remote status
//! authoritative; downloads resolve the document's storage locators and
//! materialize them locally.
//!
//! All state transitions are merge-based updates of the last-read document,
//! never blind overwrites, so concurrently-added fields survive.

mod download;
mod fsutil;
mod meter;
mod types;
mod upload;

use lakehub_client::CoreApi;
use lakehub_storage::ObjectStore;

pub use types::{
    DownloadRequest, DownloadedFile, UploadOutcome, UploadRequest, DEFAULT_BUCKET,
};

/// Observer of aggregated transfer progress: invoked with cumulative bytes
/// done and the known total (when there is one) after every update of the
/// shared meter.
pub type ProgressFn = dyn Fn(u64, Option<u64>) + Send + Sync;

/// Transfer orchestrator, generic over the API client and the store so
/// tests can substitute in-memory fakes at both seams.
pub struct TransferService<C: CoreApi, S: ObjectStore> {
    core: C,
    store: S,
    progress: Option<Box<ProgressFn>>,
}

impl<C: CoreApi, S: ObjectStore> TransferService<C, S> {
    pub fn new(core: C, store: S) -> Self {
        TransferService {
            core,
            store,
            progress: None,
        }
    }

    /// Register an observer of aggregated progress, alongside the built-in
    /// stderr meter.
    pub fn with_progress(
        mut self,
        observer: impl Fn(u64, Option<u64>) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Box::new(observer));
        self
    }

    pub fn core(&self) -> &C {
        &self.core
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn observer(&self) -> Option<&ProgressFn> {
        self.progress.as_deref()
    }
}
