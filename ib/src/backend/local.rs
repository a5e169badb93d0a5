//! In-process backend
//!
//! Memory-only: everything is lost on restart. Useful for `ib chat` and for
//! running the bot without the REST service.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::review::{completion_percent, review_progress};
use super::{Backend, BackendError};
use crate::domain::{CreatedProject, ProgressReport, Project, ProjectId, Task, TaskId, TaskStatus, UserId};
use crate::roadmap::RoadmapPipeline;
use crate::text::truncate_chars;

/// Longest project title derived from an idea
const PROJECT_TITLE_MAX: usize = 120;

#[derive(Debug, Clone)]
struct UserRecord {
    name: String,
    email: String,
}

#[derive(Debug, Default)]
struct Store {
    users: HashMap<UserId, UserRecord>,
    /// Projects per user in creation order
    projects: HashMap<UserId, Vec<Project>>,
    next_project_id: ProjectId,
    next_task_id: TaskId,
}

impl Store {
    fn find_task_mut(&mut self, task_id: TaskId) -> Option<&mut Task> {
        self.projects
            .values_mut()
            .flat_map(|ps| ps.iter_mut())
            .flat_map(|p| p.tasks.iter_mut())
            .find(|t| t.id == task_id)
    }
}

/// Memory-backed `Backend` that generates roadmaps in-process
pub struct LocalBackend {
    pipeline: RoadmapPipeline,
    store: Mutex<Store>,
}

impl LocalBackend {
    pub fn new(pipeline: RoadmapPipeline) -> Self {
        Self {
            pipeline,
            store: Mutex::new(Store::default()),
        }
    }

    /// Registered name and email, if any
    pub async fn user(&self, user: UserId) -> Option<(String, String)> {
        let store = self.store.lock().await;
        store.users.get(&user).map(|u| (u.name.clone(), u.email.clone()))
    }

    fn not_found(user: UserId) -> BackendError {
        BackendError::NotFound(format!("User {} not found", user))
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn register_or_update(&self, user: UserId, name: &str, email: &str) -> Result<(), BackendError> {
        debug!(%user, "register_or_update: called");
        let mut store = self.store.lock().await;
        let record = UserRecord {
            name: name.to_string(),
            email: email.to_string(),
        };
        if store.users.insert(user, record).is_none() {
            info!(%user, "register_or_update: new user");
        }
        Ok(())
    }

    async fn get_projects(&self, user: UserId) -> Result<Vec<Project>, BackendError> {
        debug!(%user, "get_projects: called");
        let store = self.store.lock().await;
        if !store.users.contains_key(&user) {
            return Err(Self::not_found(user));
        }
        Ok(store.projects.get(&user).cloned().unwrap_or_default())
    }

    async fn create_from_idea(&self, user: UserId, idea: &str) -> Result<CreatedProject, BackendError> {
        debug!(%user, idea_len = idea.len(), "create_from_idea: called");
        if !self.store.lock().await.users.contains_key(&user) {
            return Err(Self::not_found(user));
        }

        // Generation runs without the store lock held
        let roadmap = self.pipeline.generate(idea).await;

        let mut store = self.store.lock().await;
        store.next_project_id += 1;
        let project_id = store.next_project_id;

        let mut tasks = Vec::with_capacity(roadmap.tasks.len());
        for (order, title) in roadmap.tasks.iter().enumerate() {
            store.next_task_id += 1;
            tasks.push(Task {
                id: store.next_task_id,
                title: title.clone(),
                order: order as u32,
                status: TaskStatus::Pending,
            });
        }

        let project = Project {
            id: project_id,
            title: truncate_chars(idea, PROJECT_TITLE_MAX),
            description: roadmap.description.clone(),
            tasks,
        };
        store.projects.entry(user).or_default().push(project);
        info!(%user, project_id, "create_from_idea: project created");

        Ok(CreatedProject {
            project_id,
            description: roadmap.description,
            tasks: roadmap.tasks,
        })
    }

    async fn set_status(&self, task_id: TaskId, status: TaskStatus) -> Result<(), BackendError> {
        debug!(task_id, %status, "set_status: called");
        let mut store = self.store.lock().await;
        let task = store
            .find_task_mut(task_id)
            .ok_or_else(|| BackendError::NotFound(format!("Task {} not found", task_id)))?;
        task.status = status;
        Ok(())
    }

    async fn get_progress(&self, user: UserId) -> Result<ProgressReport, BackendError> {
        debug!(%user, "get_progress: called");
        let store = self.store.lock().await;
        if !store.users.contains_key(&user) {
            return Err(Self::not_found(user));
        }
        let percent = store
            .projects
            .get(&user)
            .map(|projects| completion_percent(projects.iter()))
            .unwrap_or(0.0);
        Ok(ProgressReport {
            percent,
            comment: review_progress(percent).to_string(),
        })
    }
}
