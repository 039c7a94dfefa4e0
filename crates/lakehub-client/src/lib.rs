//! HTTP client for the Core API.
//!
//! `CoreClient` speaks JSON over HTTP to the platform: URL building follows
//! the `{base}/api/{version}[/-/{project}]/{resource}[/{id}]` pattern, and
//! every non-2xx answer surfaces the status plus the `message` field of the
//! JSON error body when one is present.
//!
//! The `CoreApi` trait is the seam consumed by the CRUD, run and transfer
//! services; tests substitute in-memory implementations.

pub mod crud;
pub mod resources;
pub mod run;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use lakehub_core::{CoreError, Result};

pub use crud::CrudService;
pub use resources::canonical_endpoint;
pub use run::RunService;

/// Authentication strategy for the Core API.
#[derive(Clone, Debug)]
pub enum Auth {
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// HTTP Basic auth
    Basic { username: String, password: String },
}

/// Explicit client configuration. All settings are call-time values; nothing
/// is read from ambient process state, so multiple differently-configured
/// clients can coexist in one process.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    pub base_url: String,
    pub api_version: String,
    pub auth: Option<Auth>,
}

/// Core API seam: URL construction plus a generic JSON request executor.
#[async_trait]
pub trait CoreApi: Send + Sync {
    /// `{base}/api/{version}[/-/{project}]/{resource}[/{id}][?k=v&...]`,
    /// omitting the project segment for the top-level projects collection
    /// and skipping parameters with empty values.
    fn build_url(&self, project: &str, resource: &str, id: &str, params: &[(&str, String)])
        -> String;

    /// Perform a JSON request. Empty response bodies parse to `Value::Null`;
    /// a non-2xx status yields `CoreError::Remote`.
    async fn execute(&self, method: &str, url: &str, body: Option<&Value>) -> Result<Value>;
}

/// Reqwest-backed `CoreApi` implementation.
#[derive(Clone, Debug)]
pub struct CoreClient {
    http: reqwest::Client,
    config: CoreConfig,
}

impl CoreClient {
    pub fn new(mut config: CoreConfig) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CoreError::Connection(e.to_string()))?;
        Ok(CoreClient { http, config })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.auth {
            Some(Auth::Bearer(token)) => request.bearer_auth(token),
            Some(Auth::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            None => request,
        }
    }
}

#[async_trait]
impl CoreApi for CoreClient {
    fn build_url(
        &self,
        project: &str,
        resource: &str,
        id: &str,
        params: &[(&str, String)],
    ) -> String {
        let mut url = format!("{}/api/{}", self.config.base_url, self.config.api_version);
        if resource != "projects" && !project.is_empty() {
            url.push_str("/-/");
            url.push_str(project);
        }
        url.push('/');
        url.push_str(resource);
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
            url.push_str(&urlencoding::encode(v));
        }
        url
    }

    async fn execute(&self, method: &str, url: &str, body: Option<&Value>) -> Result<Value> {
        let method = reqwest::Method::from_bytes(method.as_bytes())
            .map_err(|_| CoreError::InvalidInput(format!("invalid http method: {method}")))?;

        let mut request = self.apply_auth(self.http.request(method.clone(), url));
        if let Some(json) = body {
            request = request.json(json);
        }

        tracing::debug!(method = %method, url = %url, "core request");

        let response = request
            .send()
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CoreError::Connection(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("request failed")
                        .to_string()
                });
            return Err(CoreError::Remote {
                status: status.as_u16(),
                message,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}
