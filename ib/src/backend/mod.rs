//! Project/task backend collaborators
//!
//! The session layer only sees the `Backend` trait. `HttpBackend` talks to
//! the REST service; `LocalBackend` keeps everything in memory and runs the
//! roadmap pipeline itself.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

mod http;
mod local;
mod review;

pub use http::HttpBackend;
pub use local::LocalBackend;
pub use review::{completion_percent, review_progress};

use crate::config::{BackendConfig, BackendMode};
use crate::domain::{CreatedProject, ProgressReport, Project, TaskId, TaskStatus, UserId};
use crate::roadmap::RoadmapPipeline;

/// Backend failures
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Backend error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, BackendError::NotFound(_))
    }
}

/// User registry, idea-to-project, task update and report collaborators
#[async_trait]
pub trait Backend: Send + Sync {
    /// Create the user or replace their name and email
    async fn register_or_update(&self, user: UserId, name: &str, email: &str) -> Result<(), BackendError>;

    /// All projects of a user, with tasks
    async fn get_projects(&self, user: UserId) -> Result<Vec<Project>, BackendError>;

    /// Generate a roadmap for `idea` and persist it as a new project
    async fn create_from_idea(&self, user: UserId, idea: &str) -> Result<CreatedProject, BackendError>;

    async fn set_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), BackendError>;

    /// Completion percent over all of a user's tasks, with a comment
    async fn get_progress(&self, user: UserId) -> Result<ProgressReport, BackendError>;
}

/// Build the backend selected by configuration
///
/// The pipeline is only used by the local backend.
pub fn create_backend(config: &BackendConfig, pipeline: RoadmapPipeline) -> Result<Arc<dyn Backend>, BackendError> {
    debug!(mode = ?config.mode, "create_backend: called");
    match config.mode {
        BackendMode::Local => Ok(Arc::new(LocalBackend::new(pipeline))),
        BackendMode::Http => Ok(Arc::new(HttpBackend::from_config(config)?)),
    }
}
