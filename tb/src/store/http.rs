//! HTTP implementation of the task store
//!
//! Speaks JSON to the store's REST surface with a bearer credential on every
//! request. Failed calls are not retried; the user re-triggers the action.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use super::{StoreError, TaskStore};
use crate::config::ApiConfig;
use crate::domain::{ListId, Task, TaskId, TaskList};

/// Task store reached over HTTP
pub struct HttpTaskStore {
    base_url: String,
    token: String,
    http: Client,
    timeout: Duration,
}

/// Body of a non-success response
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

impl HttpTaskStore {
    /// Create a client for `base_url` (e.g. `http://127.0.0.1:5000/api`)
    pub fn new(base_url: impl Into<String>, token: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        debug!(%base_url, ?timeout, "new: called");
        let http = Client::builder().timeout(timeout).build().map_err(StoreError::Network)?;

        Ok(Self {
            base_url,
            token: token.into(),
            http,
            timeout,
        })
    }

    /// Create a client from configuration
    ///
    /// Reads the bearer token from the environment variable named in config.
    pub fn from_config(config: &ApiConfig) -> Result<Self, StoreError> {
        debug!(base_url = %config.base_url, "from_config: called");
        let token = config.get_token().map_err(|e| StoreError::Config(e.to_string()))?;
        Self::new(
            config.base_url.clone(),
            token,
            Duration::from_millis(config.timeout_ms),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Attach the bearer credential; `.json()` on the builder sets the content type
    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request.bearer_auth(&self.token)
    }

    /// Send a request and return the success response, or the store's reason
    async fn dispatch(&self, request: RequestBuilder) -> Result<reqwest::Response, StoreError> {
        let response = match self.authorized(request).send().await {
            Ok(r) => r,
            Err(e) if e.is_timeout() => {
                debug!(error = %e, "dispatch: timed out");
                return Err(StoreError::Timeout(self.timeout));
            }
            Err(e) => {
                debug!(error = %e, "dispatch: network error");
                return Err(StoreError::Network(e));
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!(%status, "dispatch: success");
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(|body| body.error.or(body.message))
            .unwrap_or_else(|| format!("Server error: {}", status.as_u16()));
        debug!(status = status.as_u16(), %reason, "dispatch: rejected");
        Err(StoreError::Rejected {
            status: status.as_u16(),
            reason,
        })
    }

    async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, StoreError> {
        let response = self.dispatch(request).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| StoreError::InvalidResponse(format!("{}: {}", e, text)))
    }

    async fn send_empty(&self, request: RequestBuilder) -> Result<(), StoreError> {
        self.dispatch(request).await.map(|_| ())
    }
}

#[async_trait]
impl TaskStore for HttpTaskStore {
    async fn list_lists(&self) -> Result<Vec<TaskList>, StoreError> {
        debug!("list_lists: called");
        self.send_json(self.http.get(self.url("/tasks/lists"))).await
    }

    async fn create_list(&self, title: &str) -> Result<TaskList, StoreError> {
        debug!(%title, "create_list: called");
        let body = serde_json::json!({ "title": title });
        self.send_json(self.http.post(self.url("/tasks/lists")).json(&body)).await
    }

    async fn create_task(&self, list_id: ListId, title: &str) -> Result<Task, StoreError> {
        debug!(%list_id, %title, "create_task: called");
        let body = serde_json::json!({ "title": title });
        let url = self.url(&format!("/tasks/lists/{}/tasks", list_id));
        self.send_json(self.http.post(url).json(&body)).await
    }

    async fn toggle_task(&self, task_id: TaskId) -> Result<Task, StoreError> {
        debug!(%task_id, "toggle_task: called");
        let url = self.url(&format!("/tasks/toggle/{}", task_id));
        self.send_json(self.http.put(url)).await
    }

    async fn update_task(&self, task_id: TaskId, title: &str) -> Result<Task, StoreError> {
        debug!(%task_id, %title, "update_task: called");
        let body = serde_json::json!({ "title": title });
        let url = self.url(&format!("/tasks/update/{}", task_id));
        self.send_json(self.http.put(url).json(&body)).await
    }

    async fn delete_task(&self, task_id: TaskId) -> Result<(), StoreError> {
        debug!(%task_id, "delete_task: called");
        let url = self.url(&format!("/tasks/delete/{}", task_id));
        self.send_empty(self.http.delete(url)).await
    }

    async fn create_subtask(&self, parent_id: TaskId, title: &str, description: &str) -> Result<Task, StoreError> {
        debug!(%parent_id, %title, "create_subtask: called");
        let body = serde_json::json!({ "title": title, "description": description });
        let url = self.url(&format!("/tasks/add/{}/subtasks/create", parent_id));
        self.send_json(self.http.post(url).json(&body)).await
    }

    async fn complete_subtask(&self, subtask_id: TaskId, completed: bool) -> Result<Task, StoreError> {
        debug!(%subtask_id, completed, "complete_subtask: called");
        let body = serde_json::json!({ "completed": completed });
        let url = self.url(&format!("/tasks/complete/subtask/{}", subtask_id));
        self.send_json(self.http.put(url).json(&body)).await
    }

    async fn update_subtask(&self, task_id: TaskId, subtask_id: TaskId, title: &str) -> Result<Task, StoreError> {
        debug!(%task_id, %subtask_id, %title, "update_subtask: called");
        let body = serde_json::json!({ "title": title });
        let url = self.url(&format!("/tasks/update/{}/subtasks/update/{}", task_id, subtask_id));
        self.send_json(self.http.put(url).json(&body)).await
    }

    async fn delete_subtask(&self, task_id: TaskId, subtask_id: TaskId) -> Result<(), StoreError> {
        debug!(%task_id, %subtask_id, "delete_subtask: called");
        let url = self.url(&format!("/tasks/delete/{}/subtasks/delete/{}", task_id, subtask_id));
        self.send_empty(self.http.delete(url)).await
    }

    async fn move_task(&self, task_id: TaskId, list_id: ListId) -> Result<Task, StoreError> {
        debug!(%task_id, %list_id, "move_task: called");
        let body = serde_json::json!({ "list_id": list_id });
        let url = self.url(&format!("/tasks/move/{}/to/{}", task_id, list_id));
        self.send_json(self.http.put(url).json(&body)).await
    }
}
