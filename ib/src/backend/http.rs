//! REST backend client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{Backend, BackendError};
use crate::config::BackendConfig;
use crate::domain::{CreatedProject, ProgressReport, Project, TaskId, TaskStatus, UserId};

/// `Backend` over the REST service
///
/// Users are keyed by the chat identity, sent as a string `tg_id`.
pub struct HttpBackend {
    base_url: String,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

impl HttpBackend {
    pub fn from_config(config: &BackendConfig) -> Result<Self, BackendError> {
        debug!(base_url = %config.base_url, "HttpBackend::from_config: called");
        let http = Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms))
            .build()?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Map non-success statuses to `BackendError`
    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .map(|b| match b.detail {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .unwrap_or(text);

        debug!(status = status.as_u16(), %message, "check: backend error");
        if status.as_u16() == 404 {
            Err(BackendError::NotFound(message))
        } else {
            Err(BackendError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
        let response = Self::check(response).await?;
        let bytes = response.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn register_or_update(&self, user: UserId, name: &str, email: &str) -> Result<(), BackendError> {
        debug!(%user, "register_or_update: called");
        let body = serde_json::json!({
            "tg_id": user.to_string(),
            "name": name,
            "email": email,
        });
        let response = self.http.post(self.url("/users/register")).json(&body).send().await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_projects(&self, user: UserId) -> Result<Vec<Project>, BackendError> {
        debug!(%user, "get_projects: called");
        let response = self
            .http
            .get(self.url(&format!("/users/{}/projects", user)))
            .send()
            .await?;
        let parsed: ProjectsResponse = Self::decode(response).await?;
        Ok(parsed.projects)
    }

    async fn create_from_idea(&self, user: UserId, idea: &str) -> Result<CreatedProject, BackendError> {
        debug!(%user, idea_len = idea.len(), "create_from_idea: called");
        let body = serde_json::json!({
            "tg_id": user.to_string(),
            "idea": idea,
        });
        let response = self.http.post(self.url("/projects/idea")).json(&body).send().await?;
        Self::decode(response).await
    }

    async fn set_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), BackendError> {
        debug!(task_id, %status, "set_status: called");
        let response = self
            .http
            .patch(self.url(&format!("/tasks/{}", task_id)))
            .query(&[("status", status.as_str())])
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn get_progress(&self, user: UserId) -> Result<ProgressReport, BackendError> {
        debug!(%user, "get_progress: called");
        let response = self.http.get(self.url(&format!("/ai/report/{}", user))).send().await?;
        Self::decode(response).await
    }
}
