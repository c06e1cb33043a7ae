//! Typed boundary to the notebook backend
//!
//! Stateless: no caching, no retries. Every failure is surfaced verbatim as an
//! [`ApiError`].

use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::Notebook;
use async_trait::async_trait;
use reqwest::{multipart, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;

/// Request/response contract of the backend REST service
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotebookApi: Send + Sync {
    /// POST `/notebooks`
    async fn create_notebook(&self) -> Result<Notebook, ApiError>;

    /// GET `/notebooks/{id}`
    async fn get_notebook(&self, notebook_id: &str) -> Result<Notebook, ApiError>;

    /// PUT `/notebooks/{id}` with the whole notebook; answers with an echo
    async fn update_notebook(&self, notebook: &Notebook) -> Result<Notebook, ApiError>;

    /// POST `/cells/{id}/execute`; the response body is not part of the contract
    async fn execute_cell(&self, cell_id: &str) -> Result<Value, ApiError>;

    /// POST `/columns/{id}/execute`
    async fn execute_column(&self, column_id: &str) -> Result<Value, ApiError>;

    /// POST `/notebooks/{id}/execute`
    async fn execute_notebook(&self, notebook_id: &str) -> Result<Value, ApiError>;

    /// POST `/upload`, multipart field `file`
    async fn upload_notebook(&self, file_name: &str, contents: Vec<u8>)
        -> Result<Value, ApiError>;
}

#[async_trait]
impl<T: NotebookApi + ?Sized> NotebookApi for Arc<T> {
    async fn create_notebook(&self) -> Result<Notebook, ApiError> {
        (**self).create_notebook().await
    }

    async fn get_notebook(&self, notebook_id: &str) -> Result<Notebook, ApiError> {
        (**self).get_notebook(notebook_id).await
    }

    async fn update_notebook(&self, notebook: &Notebook) -> Result<Notebook, ApiError> {
        (**self).update_notebook(notebook).await
    }

    async fn execute_cell(&self, cell_id: &str) -> Result<Value, ApiError> {
        (**self).execute_cell(cell_id).await
    }

    async fn execute_column(&self, column_id: &str) -> Result<Value, ApiError> {
        (**self).execute_column(column_id).await
    }

    async fn execute_notebook(&self, notebook_id: &str) -> Result<Value, ApiError> {
        (**self).execute_notebook(notebook_id).await
    }

    async fn upload_notebook(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Value, ApiError> {
        (**self).upload_notebook(file_name, contents).await
    }
}

/// HTTP implementation of [`NotebookApi`]
#[derive(Debug, Clone)]
pub struct HttpNotebookApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpNotebookApi {
    /// Client for `base_url` with default settings
    pub fn new(base_url: &str) -> Result<Self, ApiError> {
        Self::from_config(&ClientConfig {
            base_url: base_url.to_string(),
            ..ClientConfig::default()
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ApiError> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| ApiError::Transport {
            operation: "build_client",
            source,
        })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Endpoint URL; each segment is percent-encoded, so IDs stay opaque
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Response, ApiError> {
        tracing::debug!(operation, "sending backend request");

        let response = request.send().await.map_err(|source| {
            tracing::warn!(operation, error = %source, "backend unreachable");
            ApiError::Transport { operation, source }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(operation, status = status.as_u16(), "backend rejected request");
            return Err(ApiError::Status {
                operation,
                status: status.as_u16(),
                body,
            });
        }

        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        self.send(operation, request)
            .await?
            .json::<T>()
            .await
            .map_err(|source| ApiError::Decode { operation, source })
    }

    /// For endpoints whose body is not part of the contract
    async fn send_ack(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> Result<Value, ApiError> {
        let body = self
            .send(operation, request)
            .await?
            .text()
            .await
            .map_err(|source| ApiError::Decode { operation, source })?;
        Ok(parse_ack(&body))
    }
}

#[async_trait]
impl NotebookApi for HttpNotebookApi {
    async fn create_notebook(&self) -> Result<Notebook, ApiError> {
        let url = self.endpoint(&["notebooks"]);
        self.send_json("create_notebook", self.client.post(url)).await
    }

    async fn get_notebook(&self, notebook_id: &str) -> Result<Notebook, ApiError> {
        let url = self.endpoint(&["notebooks", notebook_id]);
        self.send_json("get_notebook", self.client.get(url)).await
    }

    async fn update_notebook(&self, notebook: &Notebook) -> Result<Notebook, ApiError> {
        let url = self.endpoint(&["notebooks", &notebook.id]);
        self.send_json("update_notebook", self.client.put(url).json(notebook))
            .await
    }

    async fn execute_cell(&self, cell_id: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&["cells", cell_id, "execute"]);
        self.send_ack("execute_cell", self.client.post(url)).await
    }

    async fn execute_column(&self, column_id: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&["columns", column_id, "execute"]);
        self.send_ack("execute_column", self.client.post(url)).await
    }

    async fn execute_notebook(&self, notebook_id: &str) -> Result<Value, ApiError> {
        let url = self.endpoint(&["notebooks", notebook_id, "execute"]);
        self.send_ack("execute_notebook", self.client.post(url)).await
    }

    async fn upload_notebook(
        &self,
        file_name: &str,
        contents: Vec<u8>,
    ) -> Result<Value, ApiError> {
        let url = self.endpoint(&["upload"]);
        let part = multipart::Part::bytes(contents).file_name(file_name.to_string());
        let form = multipart::Form::new().part("file", part);
        self.send_ack("upload_notebook", self.client.post(url).multipart(form))
            .await
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ApiError> {
    let url = Url::parse(raw.trim()).map_err(|e| ApiError::InvalidBaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.cannot_be_a_base() || !matches!(url.scheme(), "http" | "https") {
        return Err(ApiError::InvalidBaseUrl {
            url: raw.to_string(),
            reason: "expected an http(s) URL".to_string(),
        });
    }

    Ok(url)
}

/// Execute/upload bodies are informational: empty becomes `null`, non-JSON
/// text is kept as a string
fn parse_ack(body: &str) -> Value {
    if body.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
