//! Domain types shared by the backend, transport and session layers

mod ids;
mod project;

pub use ids::{ChatId, MessageRef, ProjectId, TaskId, UserId};
pub use project::{CreatedProject, ProgressReport, Project, Task, TaskStatus, UnknownStatus};
