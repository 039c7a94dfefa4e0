//! Object-store contract: listing, transfer, and the progress-hook seam.

use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

/// Objects at or below this size are transferred with a single atomic put;
/// larger objects use a multi-part strategy. Policy constant, not
/// caller-configurable.
pub const MULTIPART_THRESHOLD: u64 = 100 * 1024 * 1024;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// One stored object, as seen in listings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    pub key: String,
    pub size: u64,
    pub last_modified: Option<String>,
}

impl ObjectEntry {
    /// True for zero-byte "directory marker" placeholders, which carry no
    /// payload and are excluded from listings.
    pub fn is_placeholder(&self) -> bool {
        self.size == 0 && self.key.ends_with('/')
    }
}

/// Byte-level progress observation for a single object transfer.
///
/// Per object: at most one `on_start` (only when the total is known), any
/// number of `on_progress` calls (one per internal write; expensive
/// consumers throttle rendering, not the call frequency), and exactly one
/// `on_done`, reached only on success.
pub trait ProgressHook: Send + Sync {
    fn on_start(&self, _key: &str, _total: u64) {}
    fn on_progress(&self, _key: &str, _written: u64, _total: Option<u64>) {}
    fn on_done(&self, _key: &str, _total: Option<u64>, _elapsed: Duration) {}
}

/// Hook that observes nothing.
pub struct NoopHook;

impl ProgressHook for NoopHook {}

/// Storage backend seam used by the transfer orchestrator.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// One page of a listing under `prefix`, with an opaque continuation
    /// token when more pages follow.
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: i32,
        token: Option<String>,
    ) -> StorageResult<(Vec<ObjectEntry>, Option<String>)>;

    /// Stream one object to a local file, firing `hook` per internal write.
    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()>;

    /// Upload one local file, single put at or below `MULTIPART_THRESHOLD`,
    /// multi-part above.
    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: &str,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()>;
}

/// List every object under `prefix`, following continuation tokens.
/// Placeholder entries are excluded.
pub async fn list_all<S>(store: &S, bucket: &str, prefix: &str) -> StorageResult<Vec<ObjectEntry>>
where
    S: ObjectStore + ?Sized,
{
    let mut all = Vec::new();
    let mut token = None;
    loop {
        let (entries, next) = store.list_page(bucket, prefix, 1000, token).await?;
        all.extend(entries.into_iter().filter(|e| !e.is_placeholder()));
        if next.is_none() {
            break;
        }
        token = next;
    }
    Ok(all)
}

/// Lazy paginated walk over the objects under a prefix.
///
/// Fetches one page at a time; a listing error aborts the walk immediately.
/// Restartable from scratch only, not resumable mid-walk.
///
/// ```ignore
/// let mut walk = PrefixWalk::new(&store, "datalake", "proj/artifacts/id/", 1000);
/// while let Some(entry) = walk.next().await? {
///     // per-object work; returning early aborts the walk
/// }
/// ```
pub struct PrefixWalk<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    bucket: String,
    prefix: String,
    page_size: i32,
    token: Option<String>,
    buffer: VecDeque<ObjectEntry>,
    finished: bool,
}

impl<'a, S: ObjectStore + ?Sized> PrefixWalk<'a, S> {
    pub fn new(store: &'a S, bucket: &str, prefix: &str, page_size: i32) -> Self {
        PrefixWalk {
            store,
            bucket: bucket.to_string(),
            prefix: prefix.to_string(),
            page_size,
            token: None,
            buffer: VecDeque::new(),
            finished: false,
        }
    }

    /// Next non-placeholder object, or `None` when the prefix is exhausted.
    pub async fn next(&mut self) -> StorageResult<Option<ObjectEntry>> {
        loop {
            while let Some(entry) = self.buffer.pop_front() {
                if !entry.is_placeholder() {
                    return Ok(Some(entry));
                }
            }
            if self.finished {
                return Ok(None);
            }
            let (entries, next) = self
                .store
                .list_page(&self.bucket, &self.prefix, self.page_size, self.token.take())
                .await?;
            self.buffer.extend(entries);
            self.finished = next.is_none();
            self.token = next;
        }
    }
}
