//! Local filesystem helpers shared by upload and download.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;

use lakehub_core::{CoreError, Result};

/// Bytes inspected for content-type sniffing.
const SNIFF_LEN: usize = 512;

/// Regular files under `root`, as paths relative to it, in lexical order.
pub(crate) fn enumerate_files(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in walkdir::WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| CoreError::Transfer(format!("walking {}: {e}", root.display())))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(root)
            .map_err(|e| CoreError::Transfer(format!("{}: {e}", entry.path().display())))?;
        files.push(rel.to_path_buf());
    }
    Ok(files)
}

/// Slash-separated object key for a relative local path under `prefix`.
pub(crate) fn object_key(prefix: &str, rel: &Path) -> String {
    let rel = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    if prefix.is_empty() || prefix.ends_with('/') {
        format!("{prefix}{rel}")
    } else {
        format!("{prefix}/{rel}")
    }
}

/// Guess a MIME type from the leading bytes of a file. Recognized magic
/// numbers win; otherwise valid UTF-8 is reported as plain text and
/// everything else as an opaque byte stream.
pub(crate) async fn sniff_content_type(path: &Path) -> Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut buf = vec![0u8; SNIFF_LEN];
    let mut filled = 0;
    while filled < buf.len() {
        let n = file.read(&mut buf[filled..]).await?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    buf.truncate(filled);

    let mime = match infer::get(&buf) {
        Some(kind) => kind.mime_type().to_string(),
        None if std::str::from_utf8(&buf).is_ok() => "text/plain; charset=utf-8".to_string(),
        None => "application/octet-stream".to_string(),
    };
    Ok(mime)
}

/// RFC1123 timestamp (the HTTP date format) for a file modification time.
pub(crate) fn http_timestamp(time: SystemTime) -> String {
    DateTime::<Utc>::from(time)
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}

/// Resolve where a download lands locally.
///
/// No destination: `filename` in the current directory. An existing
/// directory: inside it. An existing file: overwritten in place. A missing
/// path: created as a directory, with the file inside it.
pub(crate) async fn choose_local_target(dest: Option<&Path>, filename: &str) -> Result<PathBuf> {
    let dest = match dest {
        Some(d) if !d.as_os_str().is_empty() => d,
        _ => return Ok(PathBuf::from(filename)),
    };
    match tokio::fs::metadata(dest).await {
        Ok(meta) if meta.is_dir() => Ok(dest.join(filename)),
        Ok(_) => Ok(dest.to_path_buf()),
        Err(_) => {
            tokio::fs::create_dir_all(dest).await?;
            Ok(dest.join(filename))
        }
    }
}

/// Root directory for a directory-style download: the resolved target with
/// its deepest segment stripped back off, so object keys land directly
/// under the caller-chosen destination.
pub(crate) fn local_base(target: &Path) -> PathBuf {
    target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerates_files_relative_to_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("b.txt"), b"b").unwrap();

        let files = enumerate_files(dir.path()).unwrap();
        assert_eq!(files, vec![PathBuf::from("a.txt"), PathBuf::from("sub/b.txt")]);
    }

    #[test]
    fn local_base_strips_deepest_segment() {
        assert_eq!(
            local_base(Path::new("output/myartifact")),
            PathBuf::from("output")
        );
        assert_eq!(local_base(Path::new("myartifact")), PathBuf::new());
    }

    #[test]
    fn object_key_joins_with_forward_slashes() {
        let rel: PathBuf = ["sub", "b.txt"].iter().collect();
        assert_eq!(object_key("proj/artifacts/id/", &rel), "proj/artifacts/id/sub/b.txt");
        assert_eq!(object_key("proj/artifacts/id", &rel), "proj/artifacts/id/sub/b.txt");
    }

    #[tokio::test]
    async fn sniffs_text_and_binary() {
        let dir = tempfile::tempdir().unwrap();
        let text = dir.path().join("t.txt");
        tokio::fs::write(&text, b"hello world").await.unwrap();
        assert_eq!(
            sniff_content_type(&text).await.unwrap(),
            "text/plain; charset=utf-8"
        );

        let bin = dir.path().join("b.bin");
        tokio::fs::write(&bin, [0u8, 159, 146, 150]).await.unwrap();
        assert_eq!(
            sniff_content_type(&bin).await.unwrap(),
            "application/octet-stream"
        );
    }

    #[tokio::test]
    async fn target_resolution_follows_destination_shape() {
        let dir = tempfile::tempdir().unwrap();

        // Existing directory: file lands inside.
        let t = choose_local_target(Some(dir.path()), "f.csv").await.unwrap();
        assert_eq!(t, dir.path().join("f.csv"));

        // Existing file: overwritten in place.
        let existing = dir.path().join("out.csv");
        std::fs::write(&existing, b"x").unwrap();
        let t = choose_local_target(Some(&existing), "f.csv").await.unwrap();
        assert_eq!(t, existing);

        // Missing path: created as a directory.
        let fresh = dir.path().join("newdir");
        let t = choose_local_target(Some(&fresh), "f.csv").await.unwrap();
        assert_eq!(t, fresh.join("f.csv"));
        assert!(fresh.is_dir());

        // No destination at all: bare filename.
        let t = choose_local_target(None, "f.csv").await.unwrap();
        assert_eq!(t, PathBuf::from("f.csv"));
    }
}
