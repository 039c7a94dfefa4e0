//! Object-store abstraction for the lakehub SDK.
//!
//! The `ObjectStore` trait is the seam between transfer logic and a concrete
//! backend: paginated listing plus file-level get/put with a byte-progress
//! hook. `S3Store` implements it against any S3-compatible endpoint.
//!
//! Directory placeholder keys (zero-byte keys ending in `/`) carry no payload
//! and are excluded from listings by `list_all` and `PrefixWalk`.

pub mod s3;
pub mod traits;

pub use s3::{S3Config, S3Store};
pub use traits::{
    list_all, NoopHook, ObjectEntry, ObjectStore, PrefixWalk, ProgressHook, StorageError,
    StorageResult, MULTIPART_THRESHOLD,
};
