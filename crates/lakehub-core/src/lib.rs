//! Core types for the lakehub SDK.
//!
//! This crate holds what every other lakehub crate shares: the wire-contract
//! models for artifact documents, the SDK error taxonomy, the JSON deep-merge
//! used for status updates, the storage locator parser, and the single-line
//! progress meter.

pub mod error;
pub mod merge;
pub mod models;
pub mod path;
pub mod progress;

pub use error::{CoreError, Result};
pub use merge::{merge_values, MergeRules};
pub use models::{ArtifactState, FileInfo, Relationship, PRODUCED_BY};
pub use path::StoragePath;
pub use progress::{human_bytes, ProgressMeter};
