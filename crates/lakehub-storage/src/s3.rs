//! S3 backend for the `ObjectStore` trait.
//!
//! Works against AWS S3 or any S3-compatible endpoint (MinIO, etc.) via a
//! custom endpoint URL with path-style addressing. Credentials and endpoint
//! are explicit call-time configuration, never ambient process state.

use std::path::Path;
use std::time::Instant;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::{ByteStream, DateTimeFormat};
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

use crate::traits::{
    ObjectEntry, ObjectStore, ProgressHook, StorageError, StorageResult, MULTIPART_THRESHOLD,
};

/// Part size for multi-part uploads.
const PART_SIZE: usize = 8 * 1024 * 1024;

/// Read granularity when buffering single-put uploads.
const READ_CHUNK: usize = 128 * 1024;

/// Explicit S3 connection settings.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub access_key: String,
    pub secret_key: String,
    pub session_token: Option<String>,
    pub region: String,
    /// Custom endpoint for S3-compatible providers; enables path-style
    /// addressing.
    pub endpoint_url: Option<String>,
}

/// S3 implementation of `ObjectStore`.
#[derive(Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub async fn connect(cfg: S3Config) -> StorageResult<Self> {
        let creds = Credentials::new(
            cfg.access_key,
            cfg.secret_key,
            cfg.session_token,
            None,
            "lakehub",
        );

        let shared = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(creds)
            .region(Region::new(cfg.region))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = cfg.endpoint_url {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }

        Ok(S3Store {
            client: aws_sdk_s3::Client::from_conf(builder.build()),
        })
    }

    async fn put_single(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: &str,
        size: u64,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()> {
        let mut file = tokio::fs::File::open(src).await?;
        let mut buf = Vec::with_capacity(size as usize);
        let mut chunk = vec![0u8; READ_CHUNK];

        loop {
            let n = file.read(&mut chunk).await?;
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
        }
        let actual = buf.len() as u64;

        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .content_length(buf.len() as i64)
            .body(ByteStream::from(buf))
            .send()
            .await
            .map_err(|e| {
                StorageError::UploadFailed(DisplayErrorContext(e.into_service_error()).to_string())
            })?;

        // Progress is reported once the object is actually on the wire;
        // the buffering read above is local work only.
        hook.on_progress(key, actual, Some(size));

        Ok(())
    }

    async fn put_multipart(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: &str,
        size: u64,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()> {
        let created = self
            .client
            .create_multipart_upload()
            .bucket(bucket)
            .key(key)
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                StorageError::UploadFailed(DisplayErrorContext(e.into_service_error()).to_string())
            })?;
        let upload_id = created
            .upload_id()
            .ok_or_else(|| StorageError::UploadFailed("missing multipart upload id".to_string()))?
            .to_string();

        match self
            .put_parts(bucket, key, src, &upload_id, size, hook)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) => {
                // Best-effort cleanup; the original error is what matters.
                let _ = self
                    .client
                    .abort_multipart_upload()
                    .bucket(bucket)
                    .key(key)
                    .upload_id(&upload_id)
                    .send()
                    .await;
                Err(e)
            }
        }
    }

    async fn put_parts(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        upload_id: &str,
        size: u64,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()> {
        let mut file = tokio::fs::File::open(src).await?;
        let mut parts = Vec::new();
        let mut part_number: i32 = 1;
        let mut written = 0u64;

        loop {
            let mut buf = vec![0u8; PART_SIZE];
            let mut filled = 0;
            while filled < PART_SIZE {
                let n = file.read(&mut buf[filled..]).await?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            if filled == 0 {
                break;
            }
            buf.truncate(filled);

            let uploaded = self
                .client
                .upload_part()
                .bucket(bucket)
                .key(key)
                .upload_id(upload_id)
                .part_number(part_number)
                .body(ByteStream::from(buf))
                .send()
                .await
                .map_err(|e| {
                    StorageError::UploadFailed(
                        DisplayErrorContext(e.into_service_error()).to_string(),
                    )
                })?;

            written += filled as u64;
            hook.on_progress(key, written, Some(size));

            parts.push(
                CompletedPart::builder()
                    .part_number(part_number)
                    .e_tag(uploaded.e_tag().unwrap_or_default())
                    .build(),
            );
            part_number += 1;

            if filled < PART_SIZE {
                break;
            }
        }

        self.client
            .complete_multipart_upload()
            .bucket(bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(
                CompletedMultipartUpload::builder()
                    .set_parts(Some(parts))
                    .build(),
            )
            .send()
            .await
            .map_err(|e| {
                StorageError::UploadFailed(DisplayErrorContext(e.into_service_error()).to_string())
            })?;

        Ok(())
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: i32,
        token: Option<String>,
    ) -> StorageResult<(Vec<ObjectEntry>, Option<String>)> {
        let mut req = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .max_keys(max_keys);
        if let Some(t) = token {
            req = req.continuation_token(t);
        }

        let resp = req.send().await.map_err(|e| {
            StorageError::Backend(DisplayErrorContext(e.into_service_error()).to_string())
        })?;

        let entries = resp
            .contents()
            .iter()
            .map(|obj| ObjectEntry {
                key: obj.key().unwrap_or_default().to_string(),
                size: obj.size().unwrap_or(0).max(0) as u64,
                last_modified: obj
                    .last_modified()
                    .and_then(|t| t.fmt(DateTimeFormat::DateTime).ok()),
            })
            .collect();

        let next = resp
            .next_continuation_token()
            .filter(|t| !t.is_empty())
            .map(str::to_string);

        Ok((entries, next))
    }

    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()> {
        let start = Instant::now();

        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let svc = e.into_service_error();
                if svc.is_no_such_key() {
                    StorageError::NotFound(format!("s3://{bucket}/{key}"))
                } else {
                    StorageError::DownloadFailed(DisplayErrorContext(svc).to_string())
                }
            })?;

        let total = resp.content_length().filter(|n| *n > 0).map(|n| n as u64);
        if let Some(t) = total {
            hook.on_start(key, t);
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut body = resp.body;
        let mut written = 0u64;

        while let Some(chunk) = body
            .try_next()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
            hook.on_progress(key, written, total);
        }
        file.flush().await?;

        tracing::info!(
            bucket = %bucket,
            key = %key,
            size_bytes = written,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );
        hook.on_done(key, total, start.elapsed());
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        content_type: &str,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()> {
        let start = Instant::now();
        let size = tokio::fs::metadata(src).await?.len();

        hook.on_start(key, size);

        let result = if size > MULTIPART_THRESHOLD {
            self.put_multipart(bucket, key, src, content_type, size, hook)
                .await
        } else {
            self.put_single(bucket, key, src, content_type, size, hook)
                .await
        };

        match result {
            Ok(()) => {
                tracing::info!(
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload successful"
                );
                hook.on_done(key, Some(size), start.elapsed());
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    key = %key,
                    size_bytes = size,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 upload failed"
                );
                Err(e)
            }
        }
    }
}
