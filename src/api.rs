//! HTTP client for the `/api/tasks` endpoints.

use crate::error::ApiError;
use crate::task::{NewTask, Task, TaskId};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct TaskClient {
    client: Client,
    base: String,
}

impl TaskClient {
    pub fn new(base: &Url, timeout: Option<Duration>) -> Result<Self, ApiError> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|source| ApiError::Transport {
            action: "create HTTP client",
            source,
        })?;
        Ok(Self::with_client(client, base))
    }

    pub fn with_client(client: Client, base: &Url) -> Self {
        Self {
            client,
            base: base.as_str().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, suffix: &str) -> String {
        format!("{}/api/tasks{}", self.base, suffix)
    }

    fn request(&self, method: Method, suffix: &str) -> RequestBuilder {
        let url = self.url(suffix);
        debug!(%method, %url, "sending request");
        self.client.request(method, url)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        action: &'static str,
    ) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|source| {
            warn!(action, error = %source, "request failed");
            ApiError::Transport { action, source }
        })?;
        let status = response.status();
        if !status.is_success() {
            warn!(action, %status, "server rejected request");
            return Err(ApiError::Status { action, status });
        }
        Ok(response)
    }

    async fn read_body(response: Response, action: &'static str) -> Result<Vec<u8>, ApiError> {
        response
            .bytes()
            .await
            .map(|bytes| bytes.to_vec())
            .map_err(|source| ApiError::Transport { action, source })
    }

    async fn json<T: DeserializeOwned>(
        response: Response,
        action: &'static str,
    ) -> Result<T, ApiError> {
        let body = Self::read_body(response, action).await?;
        serde_json::from_slice(&body).map_err(|source| ApiError::Decode { action, source })
    }

    pub async fn list_tasks(&self) -> Result<Vec<Task>, ApiError> {
        const ACTION: &str = "fetch tasks";
        let response = self.send(self.request(Method::GET, ""), ACTION).await?;
        let tasks: Vec<Task> = Self::json(response, ACTION).await?;
        debug!(count = tasks.len(), "fetched tasks");
        Ok(tasks)
    }

    pub async fn get_task(&self, id: TaskId) -> Result<Task, ApiError> {
        const ACTION: &str = "fetch task";
        let response = self
            .send(self.request(Method::GET, &format!("/{id}")), ACTION)
            .await?;
        Self::json(response, ACTION).await
    }

    pub async fn create_task(&self, task: &NewTask) -> Result<Task, ApiError> {
        const ACTION: &str = "create task";
        let response = self
            .send(self.request(Method::POST, "").json(task), ACTION)
            .await?;
        Self::json(response, ACTION).await
    }

    /// Replaces every mutable field of the task. Servers may answer with the
    /// updated record or with an empty body.
    pub async fn update_task(&self, id: TaskId, task: &NewTask) -> Result<Option<Task>, ApiError> {
        const ACTION: &str = "update task";
        let response = self
            .send(self.request(Method::PUT, &format!("/{id}")).json(task), ACTION)
            .await?;
        let body = Self::read_body(response, ACTION).await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        serde_json::from_slice(&body)
            .map(Some)
            .map_err(|source| ApiError::Decode {
                action: ACTION,
                source,
            })
    }

    pub async fn delete_task(&self, id: TaskId) -> Result<(), ApiError> {
        const ACTION: &str = "delete task";
        self.send(self.request(Method::DELETE, &format!("/{id}")), ACTION)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_ignore_trailing_slash() {
        let base = Url::parse("http://localhost:3000/").unwrap();
        let client = TaskClient::with_client(Client::new(), &base);
        assert_eq!(client.url(""), "http://localhost:3000/api/tasks");
        assert_eq!(client.url("/7"), "http://localhost:3000/api/tasks/7");

        let base = Url::parse("http://example.com/board").unwrap();
        let client = TaskClient::with_client(Client::new(), &base);
        assert_eq!(client.url("/1"), "http://example.com/board/api/tasks/1");
    }
}
