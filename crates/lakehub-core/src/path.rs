//! Storage locator parsing.
//!
//! The Core API points at stored content with locators of the form
//! `scheme://host[:port]/path`. A trailing `/` on the path marks a directory
//! (multi-object) target; anything else is a single object.

use url::Url;

use crate::error::CoreError;

/// A parsed storage locator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    pub scheme: String,
    /// Host component; the bucket name for object-store locators.
    pub host: String,
    pub port: Option<u16>,
    /// Path component, leading slash included, trailing slash preserved.
    pub path: String,
}

impl StoragePath {
    /// Parse a locator string. Fails with `InvalidPath` when the input does
    /// not parse or has no host.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let url = Url::parse(raw).map_err(|e| CoreError::InvalidPath(format!("{raw}: {e}")))?;

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CoreError::InvalidPath(format!("{raw}: missing host")))?
            .to_string();

        Ok(StoragePath {
            scheme: url.scheme().to_string(),
            host,
            port: url.port(),
            path: url.path().to_string(),
        })
    }

    /// True when the locator targets a directory (trailing separator).
    pub fn is_dir(&self) -> bool {
        self.path.ends_with('/')
    }

    /// Object key: the path with the leading separator stripped. Some
    /// documents store keys with a leading `/`; the store never does.
    pub fn key(&self) -> &str {
        self.path.trim_start_matches('/')
    }

    /// Deepest path segment, empty for directory locators.
    pub fn filename(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or("")
    }
}

impl std::fmt::Display for StoragePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.port {
            Some(p) => write!(f, "{}://{}:{}{}", self.scheme, self.host, p, self.path),
            None => write!(f, "{}://{}{}", self.scheme, self.host, self.path),
        }
    }
}
