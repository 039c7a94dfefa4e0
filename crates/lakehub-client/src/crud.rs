//! Generic resource CRUD over the Core API.
//!
//! Resources are opaque JSON documents addressed as
//! `{project}/{resource}/{id}`; this service is a thin parameter-to-URL
//! mapping with the platform's pagination shape on listings.

use serde_json::Value;

use lakehub_core::{CoreError, Result};

use crate::CoreApi;

pub struct CrudService<'a, C: CoreApi + ?Sized> {
    core: &'a C,
}

impl<'a, C: CoreApi + ?Sized> CrudService<'a, C> {
    pub fn new(core: &'a C) -> Self {
        CrudService { core }
    }

    pub async fn create(&self, project: &str, endpoint: &str, document: &Value) -> Result<Value> {
        require_scope(project, endpoint)?;
        let url = self.core.build_url(project, endpoint, "", &[]);
        self.core.execute("POST", &url, Some(document)).await
    }

    pub async fn get(&self, project: &str, endpoint: &str, id: &str) -> Result<Value> {
        require_scope(project, endpoint)?;
        require_id(id)?;
        let url = self.core.build_url(project, endpoint, id, &[]);
        self.core.execute("GET", &url, None).await
    }

    pub async fn update(
        &self,
        project: &str,
        endpoint: &str,
        id: &str,
        document: &Value,
    ) -> Result<Value> {
        require_scope(project, endpoint)?;
        require_id(id)?;
        let url = self.core.build_url(project, endpoint, id, &[]);
        self.core.execute("PUT", &url, Some(document)).await
    }

    pub async fn delete(&self, project: &str, endpoint: &str, id: &str) -> Result<()> {
        require_scope(project, endpoint)?;
        require_id(id)?;
        let url = self.core.build_url(project, endpoint, id, &[]);
        self.core.execute("DELETE", &url, None).await?;
        Ok(())
    }

    /// List every element of a collection, following the platform's
    /// page-numbered pagination (`content[]`, `pageable.pageNumber`,
    /// `totalPages`).
    pub async fn list_all_pages(
        &self,
        project: &str,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<Value>> {
        require_scope(project, endpoint)?;

        let mut elements = Vec::new();
        let mut page = 0u64;
        loop {
            let mut query: Vec<(&str, String)> = params.to_vec();
            if page > 0 {
                query.push(("page", page.to_string()));
            }
            let url = self.core.build_url(project, endpoint, "", &query);
            let body = self.core.execute("GET", &url, None).await?;

            if let Some(content) = body.get("content").and_then(Value::as_array) {
                elements.extend(content.iter().cloned());
            }

            let current = body
                .get("pageable")
                .and_then(|p| p.get("pageNumber"))
                .and_then(Value::as_u64)
                .unwrap_or(0);
            let total_pages = body
                .get("totalPages")
                .and_then(Value::as_u64)
                .unwrap_or(1);

            if current + 1 >= total_pages {
                break;
            }
            page = current + 1;
        }
        Ok(elements)
    }
}

fn require_scope(project: &str, endpoint: &str) -> Result<()> {
    if endpoint.is_empty() {
        return Err(CoreError::InvalidInput("endpoint is required".to_string()));
    }
    if endpoint != "projects" && project.is_empty() {
        return Err(CoreError::InvalidInput(
            "project is mandatory for non-project resources".to_string(),
        ));
    }
    Ok(())
}

fn require_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(CoreError::InvalidInput("id is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    /// Serves canned pages and records requested URLs.
    struct PagedCore {
        pages: Vec<Value>,
        urls: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CoreApi for PagedCore {
        fn build_url(
            &self,
            _project: &str,
            _resource: &str,
            _id: &str,
            params: &[(&str, String)],
        ) -> String {
            params
                .iter()
                .find(|(k, _)| *k == "page")
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| "0".to_string())
        }

        async fn execute(&self, _method: &str, url: &str, _body: Option<&Value>) -> Result<Value> {
            self.urls.lock().unwrap().push(url.to_string());
            let idx: usize = url.parse().unwrap();
            Ok(self.pages[idx].clone())
        }
    }

    #[tokio::test]
    async fn list_walks_every_page() {
        let core = PagedCore {
            pages: vec![
                json!({
                    "content": [{"id": "a"}, {"id": "b"}],
                    "pageable": {"pageNumber": 0},
                    "totalPages": 2
                }),
                json!({
                    "content": [{"id": "c"}],
                    "pageable": {"pageNumber": 1},
                    "totalPages": 2
                }),
            ],
            urls: Mutex::new(Vec::new()),
        };

        let all = CrudService::new(&core)
            .list_all_pages("proj", "artifacts", &[])
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(core.urls.lock().unwrap().as_slice(), ["0", "1"]);
    }

    #[tokio::test]
    async fn project_required_for_non_project_resources() {
        let core = PagedCore {
            pages: vec![],
            urls: Mutex::new(Vec::new()),
        };
        let err = CrudService::new(&core)
            .get("", "artifacts", "abc")
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::InvalidInput(_)));
    }
}
