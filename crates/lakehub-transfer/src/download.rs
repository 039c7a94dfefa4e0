//! Artifact download: locator resolution and local materialization.

use std::path::PathBuf;
use std::sync::Mutex;

use futures::StreamExt;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use lakehub_client::CoreApi;
use lakehub_core::{CoreError, ProgressMeter, Result, StoragePath};
use lakehub_storage::{list_all, ObjectStore, PrefixWalk};

use crate::fsutil;
use crate::meter::MeterHook;
use crate::types::{DownloadRequest, DownloadedFile};
use crate::TransferService;

impl<C: CoreApi, S: ObjectStore> TransferService<C, S> {
    /// Download the content of an artifact, addressed by id or by name (the
    /// latest version). Each storage locator in the document is fetched
    /// independently; a locator that fails is logged and skipped so the
    /// rest of the batch still lands. The returned report lists what was
    /// actually written, from a post-transfer stat of each file.
    pub async fn download(
        &self,
        cancel: &CancellationToken,
        req: &DownloadRequest,
    ) -> Result<Vec<DownloadedFile>> {
        if req.resource.is_empty() {
            return Err(CoreError::InvalidInput("resource not specified".to_string()));
        }
        if req.project.is_empty() {
            return Err(CoreError::InvalidInput("project not specified".to_string()));
        }

        let (id, params): (&str, Vec<(&str, String)>) =
            match (req.id.as_deref(), req.name.as_deref()) {
                (Some(id), _) if !id.is_empty() => (id, Vec::new()),
                (_, Some(name)) if !name.is_empty() => (
                    "",
                    vec![
                        ("name", name.to_string()),
                        ("versions", "latest".to_string()),
                    ],
                ),
                _ => {
                    return Err(CoreError::InvalidInput(
                        "either id or name must be specified".to_string(),
                    ))
                }
            };

        let url = self.core.build_url(&req.project, &req.resource, id, &params);
        let body = self.core.execute("GET", &url, None).await?;
        let locators = extract_locators(&body)?;

        let mut report = Vec::new();
        for locator in locators {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let parsed = match StoragePath::parse(&locator) {
                Ok(p) => p,
                Err(err) => {
                    tracing::warn!(locator = %locator, error = %err, "skipping unparseable locator");
                    continue;
                }
            };

            let outcome = match parsed.scheme.as_str() {
                "s3" if parsed.is_dir() => self.fetch_directory(cancel, &parsed, req).await,
                "s3" => self.fetch_object(&parsed, req).await,
                "http" | "https" => self.fetch_url(&locator, &parsed, req).await,
                other => {
                    tracing::warn!(locator = %locator, scheme = %other, "unsupported scheme, skipping");
                    continue;
                }
            };

            match outcome {
                Ok(files) => report.extend(files),
                Err(CoreError::Cancelled) => return Err(CoreError::Cancelled),
                Err(err) => {
                    tracing::warn!(locator = %locator, error = %err, "download failed, skipping");
                }
            }
        }
        Ok(report)
    }

    /// Every object under the locator's prefix, re-creating the remote
    /// layout under the destination.
    async fn fetch_directory(
        &self,
        cancel: &CancellationToken,
        parsed: &StoragePath,
        req: &DownloadRequest,
    ) -> Result<Vec<DownloadedFile>> {
        // Target resolution runs with the deepest prefix segment appended
        // (keeping its mkdir side effect for a missing destination), then
        // that segment is stripped back off: objects land at
        // `{destination}/{key relative to prefix}`.
        let dir_name = parsed
            .key()
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or("")
            .to_string();
        let target =
            fsutil::choose_local_target(req.destination.as_deref(), &dir_name).await?;
        let root = fsutil::local_base(&target);

        let prefix = parsed.key();
        // Listing up front gives the meter a byte total; a listing failure
        // degrades to a spinner rather than aborting the transfer.
        let meter = match list_all(&self.store, &parsed.host, prefix).await {
            Ok(entries) => {
                let total: u64 = entries.iter().map(|e| e.size).sum();
                Mutex::new(ProgressMeter::with_total(total))
            }
            Err(err) => {
                tracing::warn!(error = %err, "prefix listing failed, progress total unknown");
                Mutex::new(ProgressMeter::new())
            }
        };

        let mut written = Vec::new();
        let mut walk = PrefixWalk::new(&self.store, &parsed.host, prefix, 1000);
        while let Some(entry) = walk
            .next()
            .await
            .map_err(|e| CoreError::Transfer(e.to_string()))?
        {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let rel = entry.key.strip_prefix(prefix).unwrap_or(&entry.key);
            let local: PathBuf = root.join(rel_to_path(rel));
            if let Some(parent) = local.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let hook = MeterHook::new(&meter, self.observer());
            self.store
                .download_file(&parsed.host, &entry.key, &local, &hook)
                .await
                .map_err(|e| CoreError::Transfer(format!("{}: {e}", entry.key)))?;
            written.push(local);
        }
        finish(&meter);

        Ok(stat_report(&written).await)
    }

    /// A single stored object.
    async fn fetch_object(
        &self,
        parsed: &StoragePath,
        req: &DownloadRequest,
    ) -> Result<Vec<DownloadedFile>> {
        let target =
            fsutil::choose_local_target(req.destination.as_deref(), parsed.filename()).await?;

        let meter = Mutex::new(ProgressMeter::new());
        let hook = MeterHook::adopting_total(&meter, self.observer());
        self.store
            .download_file(&parsed.host, parsed.key(), &target, &hook)
            .await
            .map_err(|e| CoreError::Transfer(format!("{}: {e}", parsed.key())))?;
        finish(&meter);

        Ok(stat_report(&[target]).await)
    }

    /// An http(s) locator, streamed straight to disk.
    async fn fetch_url(
        &self,
        locator: &str,
        parsed: &StoragePath,
        req: &DownloadRequest,
    ) -> Result<Vec<DownloadedFile>> {
        let target =
            fsutil::choose_local_target(req.destination.as_deref(), parsed.filename()).await?;

        let response = reqwest::get(locator)
            .await
            .map_err(|e| CoreError::Transfer(format!("{locator}: {e}")))?;
        if !response.status().is_success() {
            return Err(CoreError::Transfer(format!(
                "{locator}: http status {}",
                response.status()
            )));
        }

        let mut meter = match response.content_length() {
            Some(total) => ProgressMeter::with_total(total),
            None => ProgressMeter::new(),
        };
        let mut file = tokio::fs::File::create(&target).await?;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| CoreError::Transfer(format!("{locator}: {e}")))?;
            file.write_all(&chunk).await?;
            meter.add(chunk.len() as u64);
            meter.render(false);
            if let Some(observer) = self.observer() {
                observer(meter.done_bytes(), meter.total());
            }
        }
        file.flush().await?;
        meter.finish();

        Ok(stat_report(&[target]).await)
    }
}

/// Storage locators referenced by a lookup response: `spec.path` of a
/// single document, or of each element under `content[]` for a
/// name-versions listing.
fn extract_locators(body: &Value) -> Result<Vec<String>> {
    let spec_path = |doc: &Value| {
        doc.pointer("/spec/path")
            .and_then(Value::as_str)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    };

    match body.get("content").and_then(Value::as_array) {
        Some(content) => {
            let locators: Vec<String> = content.iter().filter_map(spec_path).collect();
            if locators.is_empty() {
                return Err(CoreError::Malformed(
                    "no storage locators in lookup response".to_string(),
                ));
            }
            Ok(locators)
        }
        None => spec_path(body).map(|p| vec![p]).ok_or_else(|| {
            CoreError::Malformed("artifact document has no spec.path".to_string())
        }),
    }
}

fn rel_to_path(rel: &str) -> PathBuf {
    rel.split('/').filter(|s| !s.is_empty()).collect()
}

/// Stat each written path and build the report. Only regular files appear;
/// a path that cannot be stat-ed is logged and dropped from the report
/// without affecting the other entries.
async fn stat_report(paths: &[PathBuf]) -> Vec<DownloadedFile> {
    let mut report = Vec::with_capacity(paths.len());
    for path in paths {
        let meta = match tokio::fs::metadata(path).await {
            Ok(meta) => meta,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "written file missing from report");
                continue;
            }
        };
        if !meta.is_file() {
            continue;
        }
        report.push(DownloadedFile {
            filename: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            size: meta.len(),
            path: path.clone(),
        });
    }
    report
}

fn finish(meter: &Mutex<ProgressMeter>) {
    meter.lock().unwrap_or_else(|e| e.into_inner()).finish();
}
