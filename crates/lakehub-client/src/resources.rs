//! Resource endpoint names and their accepted aliases.

use lakehub_core::{CoreError, Result};

const RESOURCES: &[(&str, &[&str])] = &[
    ("artifacts", &["artifact"]),
    ("dataitems", &["dataitem"]),
    ("functions", &["function", "fn"]),
    ("models", &["model"]),
    ("projects", &["project"]),
    ("runs", &["run"]),
    ("workflows", &["workflow"]),
    ("logs", &["log"]),
];

/// Resolve a resource name or alias to its canonical endpoint segment.
pub fn canonical_endpoint(resource: &str) -> Result<&'static str> {
    RESOURCES
        .iter()
        .find(|(endpoint, aliases)| *endpoint == resource || aliases.contains(&resource))
        .map(|(endpoint, _)| *endpoint)
        .ok_or_else(|| CoreError::InvalidInput(format!("resource '{resource}' is not supported")))
}
