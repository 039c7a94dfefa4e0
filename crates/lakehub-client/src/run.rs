//! Run control: logs, stop/resume, metrics, and the lineage key lookup.

use serde_json::Value;

use lakehub_core::{CoreError, Result};

use crate::CoreApi;

pub struct RunService<'a, C: CoreApi + ?Sized> {
    core: &'a C,
}

impl<'a, C: CoreApi + ?Sized> RunService<'a, C> {
    pub fn new(core: &'a C) -> Self {
        RunService { core }
    }

    /// GET `{project}/{endpoint}/{id}/logs`.
    pub async fn logs(&self, project: &str, endpoint: &str, id: &str) -> Result<Value> {
        require_all(project, endpoint, id)?;
        let url = self.core.build_url(project, endpoint, id, &[]) + "/logs";
        self.core.execute("GET", &url, None).await
    }

    /// POST `{project}/{endpoint}/{id}/stop`.
    pub async fn stop(&self, project: &str, endpoint: &str, id: &str) -> Result<Value> {
        require_all(project, endpoint, id)?;
        let url = self.core.build_url(project, endpoint, id, &[]) + "/stop";
        self.core.execute("POST", &url, None).await
    }

    /// POST `{project}/{endpoint}/{id}/resume`.
    pub async fn resume(&self, project: &str, endpoint: &str, id: &str) -> Result<Value> {
        require_all(project, endpoint, id)?;
        let url = self.core.build_url(project, endpoint, id, &[]) + "/resume";
        self.core.execute("POST", &url, None).await
    }

    /// Metrics of one run container: selects the matching container log
    /// entry and returns its `status.metrics`, `None` when the run recorded
    /// no metrics. Without an explicit container name, the main container is
    /// derived from the run's `spec.task` as `c-{task}-{id}`.
    pub async fn metrics(
        &self,
        project: &str,
        endpoint: &str,
        id: &str,
        container: Option<&str>,
    ) -> Result<Option<Value>> {
        require_all(project, endpoint, id)?;

        let url = self.core.build_url(project, endpoint, id, &[]) + "/logs";
        let logs = self.core.execute("GET", &url, None).await?;
        let entries = logs
            .as_array()
            .ok_or_else(|| CoreError::Malformed("logs response is not an array".to_string()))?;

        let container_name = match container {
            Some(name) => name.to_string(),
            None => self.main_container_name(project, endpoint, id).await?,
        };

        let entry = entries
            .iter()
            .find(|e| {
                e.get("status")
                    .and_then(|s| s.get("container"))
                    .and_then(Value::as_str)
                    == Some(container_name.as_str())
            })
            .ok_or_else(|| {
                CoreError::Malformed(format!("container '{container_name}' not found in logs"))
            })?;

        let status = entry
            .get("status")
            .ok_or_else(|| CoreError::Malformed("log entry missing status".to_string()))?;
        Ok(status.get("metrics").filter(|m| !m.is_null()).cloned())
    }

    /// GET the run document and return its top-level `key`, used for
    /// `produced_by` lineage annotations.
    pub async fn fetch_run_key(&self, project: &str, run_id: &str) -> Result<String> {
        let url = self.core.build_url(project, "runs", run_id, &[]);
        let run = self.core.execute("GET", &url, None).await?;
        run.get("key")
            .and_then(Value::as_str)
            .filter(|k| !k.is_empty())
            .map(str::to_string)
            .ok_or_else(|| CoreError::Malformed("run key not found in response".to_string()))
    }

    async fn main_container_name(
        &self,
        project: &str,
        endpoint: &str,
        id: &str,
    ) -> Result<String> {
        let url = self.core.build_url(project, endpoint, id, &[]);
        let run = self.core.execute("GET", &url, None).await?;

        let task = run
            .get("spec")
            .and_then(|s| s.get("task"))
            .and_then(Value::as_str)
            .ok_or_else(|| CoreError::Malformed("run is missing spec.task".to_string()))?;

        let kind = task
            .split(':')
            .next()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| CoreError::Malformed(format!("invalid task format: {task}")))?
            .replace('+', "");

        Ok(format!("c-{kind}-{id}"))
    }
}

fn require_all(project: &str, endpoint: &str, id: &str) -> Result<()> {
    if project.is_empty() {
        return Err(CoreError::InvalidInput("project not specified".to_string()));
    }
    if endpoint.is_empty() {
        return Err(CoreError::InvalidInput("endpoint not specified".to_string()));
    }
    if id.is_empty() {
        return Err(CoreError::InvalidInput("id not specified".to_string()));
    }
    Ok(())
}
