//! Wire-contract types for artifact documents.
//!
//! Field names here are fixed contract with the Core API, not internal
//! naming. Artifact documents themselves travel as `serde_json::Value` maps
//! because the SDK never owns them exclusively and must round-trip fields it
//! does not understand.

use serde::{Deserialize, Serialize};

/// Relationship type recorded for lineage annotations.
pub const PRODUCED_BY: &str = "produced_by";

/// Lifecycle state of an artifact, as stored in `status.state`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ArtifactState {
    Created,
    Uploading,
    Ready,
    Error,
}

impl ArtifactState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactState::Created => "CREATED",
            ArtifactState::Uploading => "UPLOADING",
            ArtifactState::Ready => "READY",
            ArtifactState::Error => "ERROR",
        }
    }
}

impl std::fmt::Display for ArtifactState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of `status.files`, describing an uploaded object.
///
/// `path` is relative to the artifact storage root; the empty string marks a
/// single-file artifact's own root file. `last_modified` is an RFC1123-style
/// timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    pub path: String,
    pub name: String,
    pub content_type: String,
    pub last_modified: String,
    pub size: u64,
}

/// One entry of `metadata.relationships`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(rename = "type")]
    pub rel_type: String,
    pub dest: String,
}
