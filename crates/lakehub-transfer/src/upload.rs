//! Artifact upload: document lifecycle plus the byte transfer.

use std::path::Path;
use std::sync::Mutex;

use serde_json::{json, Map, Value};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use lakehub_client::{CoreApi, RunService};
use lakehub_core::{
    merge_values, ArtifactState, CoreError, FileInfo, MergeRules, ProgressMeter, Result,
    StoragePath, PRODUCED_BY,
};
use lakehub_storage::ObjectStore;

use crate::fsutil;
use crate::meter::MeterHook;
use crate::types::{UploadOutcome, UploadRequest, DEFAULT_BUCKET};
use crate::TransferService;

impl<C: CoreApi, S: ObjectStore> TransferService<C, S> {
    /// Upload a local file or directory as the content of an artifact.
    ///
    /// The artifact document must be in the `CREATED` state (a fresh
    /// document is created when `req.id` is absent). The transfer drives
    /// `status.state` through `UPLOADING` to `READY`, recording the
    /// uploaded files alongside; a failed transfer leaves the document in
    /// `ERROR`. When the bytes land but the final `READY` update cannot be
    /// persisted, the error is `PartialSuccess`, carrying everything the
    /// caller needs to reconcile by hand.
    pub async fn upload(
        &self,
        cancel: &CancellationToken,
        req: &UploadRequest,
    ) -> Result<UploadOutcome> {
        if req.input.as_os_str().is_empty() {
            return Err(CoreError::InvalidInput(
                "input file or directory not specified".to_string(),
            ));
        }
        if req.resource.is_empty() {
            return Err(CoreError::InvalidInput("resource not specified".to_string()));
        }
        if req.project.is_empty() {
            return Err(CoreError::InvalidInput("project not specified".to_string()));
        }

        let input_meta = tokio::fs::metadata(&req.input).await.map_err(|e| {
            CoreError::InvalidInput(format!("cannot access input {}: {e}", req.input.display()))
        })?;

        // Lineage lookup happens up front: a run that cannot be resolved
        // aborts the upload before anything is written anywhere.
        let run_key = match req.run_id.as_deref().filter(|r| !r.is_empty()) {
            Some(run_id) => Some(
                RunService::new(&self.core)
                    .fetch_run_key(&req.project, run_id)
                    .await?,
            ),
            None => None,
        };

        let artifact_id = match req.id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => self.create_artifact(req, input_meta.is_dir()).await?,
        };

        let get_url = self
            .core
            .build_url(&req.project, &req.resource, &artifact_id, &[]);
        let mut artifact = self.core.execute("GET", &get_url, None).await?;
        if !artifact.is_object() {
            return Err(CoreError::Malformed(format!(
                "artifact {artifact_id} is not a json object"
            )));
        }

        let state = artifact
            .pointer("/status/state")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        if state != ArtifactState::Created.as_str() {
            return Err(CoreError::InvalidState { current: state });
        }

        let locator = artifact
            .pointer("/spec/path")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                CoreError::Malformed(format!("artifact {artifact_id} has no spec.path"))
            })?;
        let parsed = StoragePath::parse(locator)?;
        if parsed.scheme != "s3" {
            return Err(CoreError::InvalidPath(format!(
                "upload requires an s3 locator, got scheme '{}'",
                parsed.scheme
            )));
        }

        if let Some(key) = &run_key {
            add_relationship(&mut artifact, PRODUCED_BY, key);
        }

        self.update_status(req, &artifact_id, &mut artifact, json!({"state": "UPLOADING"}))
            .await?;

        tracing::info!(
            artifact_id = %artifact_id,
            locator = %parsed,
            "starting upload"
        );

        let transfer = if input_meta.is_dir() {
            self.upload_directory(cancel, &parsed, &req.input).await
        } else {
            self.upload_single(cancel, &parsed, &req.input).await
        };

        let files = match transfer {
            Ok(files) => files,
            Err(err) => {
                // Best effort: the original transfer error is what the
                // caller must see even if this update fails too.
                if let Err(update_err) = self
                    .update_status(req, &artifact_id, &mut artifact, json!({"state": "ERROR"}))
                    .await
                {
                    tracing::warn!(
                        artifact_id = %artifact_id,
                        error = %update_err,
                        "failed to record error state"
                    );
                }
                return Err(err);
            }
        };

        let overlay = json!({
            "state": "READY",
            "files": serde_json::to_value(&files)?,
        });
        if let Err(err) = self
            .update_status(req, &artifact_id, &mut artifact, overlay)
            .await
        {
            tracing::warn!(
                artifact_id = %artifact_id,
                error = %err,
                "content uploaded but final status update failed"
            );
            return Err(CoreError::PartialSuccess { artifact_id, files });
        }

        tracing::info!(artifact_id = %artifact_id, files = files.len(), "upload complete");
        Ok(UploadOutcome { artifact_id, files })
    }

    /// Create a fresh artifact document in `CREATED` state and return its
    /// client-generated id.
    async fn create_artifact(&self, req: &UploadRequest, is_dir: bool) -> Result<String> {
        let name = req
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .ok_or_else(|| {
                CoreError::InvalidInput(
                    "name is required when creating a new artifact".to_string(),
                )
            })?;

        let id = Uuid::new_v4().simple().to_string();
        let bucket = req
            .bucket
            .as_deref()
            .filter(|b| !b.is_empty())
            .unwrap_or(DEFAULT_BUCKET);
        let prefix = format!("s3://{bucket}/{}/{}/{id}/", req.project, req.resource);
        let locator = if is_dir {
            prefix
        } else {
            let basename = req
                .input
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    CoreError::InvalidInput(format!(
                        "input {} has no file name",
                        req.input.display()
                    ))
                })?;
            format!("{prefix}{basename}")
        };

        let document = json!({
            "id": id,
            "project": req.project,
            "kind": req.resource,
            "name": name,
            "spec": { "path": locator },
            "status": { "state": "CREATED" },
        });

        let url = self.core.build_url(&req.project, &req.resource, "", &[]);
        self.core.execute("POST", &url, Some(&document)).await?;
        tracing::debug!(artifact_id = %id, locator = %locator, "created artifact document");
        Ok(id)
    }

    /// Merge `overlay` into the document's current status and PUT the whole
    /// document back.
    async fn update_status(
        &self,
        req: &UploadRequest,
        artifact_id: &str,
        artifact: &mut Value,
        overlay: Value,
    ) -> Result<()> {
        let base = artifact
            .get("status")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();
        let overlay = overlay.as_object().cloned().unwrap_or_else(Map::new);
        let merged = merge_values(&base, &overlay, &MergeRules::new());
        artifact["status"] = Value::Object(merged);

        let url = self
            .core
            .build_url(&req.project, &req.resource, artifact_id, &[]);
        self.core.execute("PUT", &url, Some(artifact)).await?;
        Ok(())
    }

    async fn upload_single(
        &self,
        cancel: &CancellationToken,
        parsed: &StoragePath,
        input: &Path,
    ) -> Result<Vec<FileInfo>> {
        if cancel.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        let basename = input
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                CoreError::InvalidInput(format!("input {} has no file name", input.display()))
            })?;
        // A directory-style locator gets the file's own name appended.
        let key = if parsed.is_dir() {
            format!("{}{basename}", parsed.key())
        } else {
            parsed.key().to_string()
        };

        let meta = tokio::fs::metadata(input).await?;
        let content_type = fsutil::sniff_content_type(input).await?;

        let meter = Mutex::new(ProgressMeter::with_total(meta.len()));
        let hook = MeterHook::new(&meter, self.observer());
        self.store
            .upload_file(&parsed.host, &key, input, &content_type, &hook)
            .await
            .map_err(|e| CoreError::Transfer(format!("{}: {e}", input.display())))?;
        finish(&meter);

        Ok(vec![FileInfo {
            path: String::new(),
            name: basename,
            content_type,
            last_modified: fsutil::http_timestamp(meta.modified()?),
            size: meta.len(),
        }])
    }

    async fn upload_directory(
        &self,
        cancel: &CancellationToken,
        parsed: &StoragePath,
        root: &Path,
    ) -> Result<Vec<FileInfo>> {
        let rel_paths = fsutil::enumerate_files(root)?;

        // Pre-compute the byte total so the meter can show a percentage
        // across the whole directory.
        let mut total = 0u64;
        let mut entries = Vec::with_capacity(rel_paths.len());
        for rel in rel_paths {
            let meta = tokio::fs::metadata(root.join(&rel)).await?;
            total += meta.len();
            entries.push((rel, meta));
        }
        let meter = Mutex::new(ProgressMeter::with_total(total));

        let mut files = Vec::with_capacity(entries.len());
        for (rel, meta) in entries {
            if cancel.is_cancelled() {
                return Err(CoreError::Cancelled);
            }

            let local = root.join(&rel);
            let key = fsutil::object_key(parsed.key(), &rel);
            let content_type = fsutil::sniff_content_type(&local).await?;

            let hook = MeterHook::new(&meter, self.observer());
            self.store
                .upload_file(&parsed.host, &key, &local, &content_type, &hook)
                .await
                .map_err(|e| CoreError::Transfer(format!("{}: {e}", local.display())))?;

            let rel_slash = rel
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            let name = rel
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| rel_slash.clone());
            files.push(FileInfo {
                path: rel_slash,
                name,
                content_type,
                last_modified: fsutil::http_timestamp(meta.modified()?),
                size: meta.len(),
            });
        }
        finish(&meter);

        Ok(files)
    }
}

/// Append a relationship entry under `metadata.relationships`, creating the
/// containers on the way as needed.
fn add_relationship(artifact: &mut Value, rel_type: &str, dest: &str) {
    let Some(doc) = artifact.as_object_mut() else {
        return;
    };
    let metadata = doc
        .entry("metadata")
        .or_insert_with(|| Value::Object(Map::new()));
    if !metadata.is_object() {
        *metadata = Value::Object(Map::new());
    }
    let relationships = metadata
        .as_object_mut()
        .map(|m| {
            m.entry("relationships")
                .or_insert_with(|| Value::Array(Vec::new()))
        })
        .and_then(Value::as_array_mut);
    if let Some(list) = relationships {
        list.push(json!({ "type": rel_type, "dest": dest }));
    }
}

fn finish(meter: &Mutex<ProgressMeter>) {
    meter.lock().unwrap_or_else(|e| e.into_inner()).finish();
}
