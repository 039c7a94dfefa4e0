//! In-memory fakes for both orchestrator seams.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;

use lakehub_client::CoreApi;
use lakehub_core::{CoreError, Result};
use lakehub_storage::{ObjectEntry, ObjectStore, ProgressHook, StorageError, StorageResult};

/// Core API fake: documents keyed by `{project}/{resource}/{id}` (or the
/// full URL for canned query responses), recording every request and the
/// `status.state` carried by each PUT.
#[derive(Default)]
pub struct FakeCore {
    pub docs: Mutex<HashMap<String, Value>>,
    /// Shared so tests can observe the sequence from progress callbacks
    /// while the service owns the core.
    pub put_states: Arc<Mutex<Vec<String>>>,
    pub requests: Mutex<Vec<(String, String)>>,
    /// Fail the n-th and later PUTs (0-based) with a server error.
    pub fail_puts_from: Mutex<Option<usize>>,
    put_count: AtomicUsize,
}

impl FakeCore {
    pub fn with_doc(key: &str, doc: Value) -> Self {
        let core = FakeCore::default();
        core.docs.lock().unwrap().insert(key.to_string(), doc);
        core
    }

    pub fn insert(&self, key: &str, doc: Value) {
        self.docs.lock().unwrap().insert(key.to_string(), doc);
    }

    pub fn doc(&self, key: &str) -> Option<Value> {
        self.docs.lock().unwrap().get(key).cloned()
    }

    pub fn methods(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(m, _)| m.clone())
            .collect()
    }
}

#[async_trait]
impl CoreApi for FakeCore {
    fn build_url(&self, project: &str, resource: &str, id: &str, params: &[(&str, String)]) -> String {
        let mut url = format!("{project}/{resource}");
        if !id.is_empty() {
            url.push('/');
            url.push_str(id);
        }
        let mut first = true;
        for (k, v) in params {
            if v.is_empty() {
                continue;
            }
            url.push(if first { '?' } else { '&' });
            first = false;
            url.push_str(k);
            url.push('=');
            url.push_str(v);
        }
        url
    }

    async fn execute(&self, method: &str, url: &str, body: Option<&Value>) -> Result<Value> {
        self.requests
            .lock()
            .unwrap()
            .push((method.to_string(), url.to_string()));
        let path = url.split_once('?').map_or(url, |(p, _)| p);

        match method {
            "GET" => {
                let docs = self.docs.lock().unwrap();
                docs.get(url)
                    .or_else(|| docs.get(path))
                    .cloned()
                    .ok_or_else(|| CoreError::Remote {
                        status: 404,
                        message: format!("not found: {url}"),
                    })
            }
            "POST" => {
                let doc = body.cloned().ok_or_else(|| {
                    CoreError::InvalidInput("post without body".to_string())
                })?;
                let id = doc
                    .get("id")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                self.docs
                    .lock()
                    .unwrap()
                    .insert(format!("{path}/{id}"), doc.clone());
                Ok(doc)
            }
            "PUT" => {
                let seq = self.put_count.fetch_add(1, Ordering::SeqCst);
                if let Some(from) = *self.fail_puts_from.lock().unwrap() {
                    if seq >= from {
                        return Err(CoreError::Remote {
                            status: 500,
                            message: "injected put failure".to_string(),
                        });
                    }
                }
                let doc = body.cloned().ok_or_else(|| {
                    CoreError::InvalidInput("put without body".to_string())
                })?;
                let state = doc
                    .pointer("/status/state")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                self.put_states.lock().unwrap().push(state);
                self.docs.lock().unwrap().insert(path.to_string(), doc.clone());
                Ok(doc)
            }
            other => Err(CoreError::InvalidInput(format!("unhandled method {other}"))),
        }
    }
}

/// Object store fake holding bytes in memory, keyed `{bucket}/{key}`.
/// Listings are served in key order, paginated by `page_limit`.
#[derive(Default)]
pub struct FakeStore {
    pub objects: Mutex<HashMap<String, Vec<u8>>>,
    pub fail_uploads: AtomicBool,
    /// Page size cap for listings; exercises continuation tokens.
    pub page_limit: Option<usize>,
}

impl FakeStore {
    pub fn put(&self, bucket: &str, key: &str, bytes: &[u8]) {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{bucket}/{key}"), bytes.to_vec());
    }

    pub fn get(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{bucket}/{key}"))
            .cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl ObjectStore for FakeStore {
    async fn list_page(
        &self,
        bucket: &str,
        prefix: &str,
        max_keys: i32,
        token: Option<String>,
    ) -> StorageResult<(Vec<ObjectEntry>, Option<String>)> {
        let full_prefix = format!("{bucket}/{prefix}");
        let mut matching: Vec<(String, usize)> = self
            .objects
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k.starts_with(&full_prefix))
            .map(|(k, v)| (k[bucket.len() + 1..].to_string(), v.len()))
            .collect();
        matching.sort();

        let start: usize = token.as_deref().map_or(0, |t| t.parse().unwrap_or(0));
        let limit = self
            .page_limit
            .unwrap_or(max_keys as usize)
            .min(max_keys as usize);
        let page: Vec<ObjectEntry> = matching
            .iter()
            .skip(start)
            .take(limit)
            .map(|(key, size)| ObjectEntry {
                key: key.clone(),
                size: *size as u64,
                last_modified: None,
            })
            .collect();
        let next = if start + page.len() < matching.len() {
            Some((start + page.len()).to_string())
        } else {
            None
        };
        Ok((page, next))
    }

    async fn download_file(
        &self,
        bucket: &str,
        key: &str,
        dest: &Path,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()> {
        let bytes = self
            .get(bucket, key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        let started = Instant::now();
        hook.on_start(key, bytes.len() as u64);
        tokio::fs::write(dest, &bytes).await?;
        hook.on_progress(key, bytes.len() as u64, Some(bytes.len() as u64));
        hook.on_done(key, Some(bytes.len() as u64), started.elapsed());
        Ok(())
    }

    async fn upload_file(
        &self,
        bucket: &str,
        key: &str,
        src: &Path,
        _content_type: &str,
        hook: &dyn ProgressHook,
    ) -> StorageResult<()> {
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(StorageError::UploadFailed(format!(
                "injected failure for {key}"
            )));
        }
        let bytes = tokio::fs::read(src).await?;
        let started = Instant::now();
        hook.on_start(key, bytes.len() as u64);
        // Report in two halves so delta accounting is exercised.
        let half = bytes.len() as u64 / 2;
        hook.on_progress(key, half, Some(bytes.len() as u64));
        self.put(bucket, key, &bytes);
        hook.on_progress(key, bytes.len() as u64, Some(bytes.len() as u64));
        hook.on_done(key, Some(bytes.len() as u64), started.elapsed());
        Ok(())
    }
}
