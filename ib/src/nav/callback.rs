//! Inline button payloads
//!
//! Every button carries one `CallbackAction` encoded as a compact string.
//! Payloads are decoded once, where the update enters the process.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::domain::{ProjectId, TaskId, TaskStatus, UnknownStatus};

/// A decoded button press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    /// Jump to a page of the project list
    Page(usize),
    /// Open a project's task list
    Project(ProjectId),
    /// Open the status picker for a task
    Task { project_id: ProjectId, task_id: TaskId },
    /// Apply a status to a task
    Status {
        status: TaskStatus,
        task_id: TaskId,
        project_id: ProjectId,
    },
    BackToProjects,
    BackToTasks(ProjectId),
    /// Page indicator; does nothing
    Noop,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CallbackError {
    #[error("Malformed callback payload: {0}")]
    Malformed(String),

    #[error(transparent)]
    UnknownStatus(#[from] UnknownStatus),
}

impl CallbackAction {
    pub fn encode(&self) -> String {
        match self {
            CallbackAction::Page(page) => format!("upd:pg:{}", page),
            CallbackAction::Project(pid) => format!("upd:p:{}", pid),
            CallbackAction::Task { project_id, task_id } => format!("upd:t:{}:{}", project_id, task_id),
            CallbackAction::Status {
                status,
                task_id,
                project_id,
            } => format!("upd:s:{}:{}:{}", status, task_id, project_id),
            CallbackAction::BackToProjects => "upd:back:projects".to_string(),
            CallbackAction::BackToTasks(pid) => format!("upd:back:tasks:{}", pid),
            CallbackAction::Noop => "upd:noop:pp".to_string(),
        }
    }

    pub fn decode(data: &str) -> Result<Self, CallbackError> {
        let malformed = || CallbackError::Malformed(data.to_string());
        let parts: Vec<&str> = data.split(':').collect();

        let action = match parts.as_slice() {
            ["upd", "pg", page] => CallbackAction::Page(page.parse().map_err(|_| malformed())?),
            ["upd", "p", pid] => CallbackAction::Project(pid.parse().map_err(|_| malformed())?),
            ["upd", "t", pid, tid] => CallbackAction::Task {
                project_id: pid.parse().map_err(|_| malformed())?,
                task_id: tid.parse().map_err(|_| malformed())?,
            },
            ["upd", "s", status, tid, pid] => CallbackAction::Status {
                status: status.parse()?,
                task_id: tid.parse().map_err(|_| malformed())?,
                project_id: pid.parse().map_err(|_| malformed())?,
            },
            ["upd", "back", "projects"] => CallbackAction::BackToProjects,
            ["upd", "back", "tasks", pid] => CallbackAction::BackToTasks(pid.parse().map_err(|_| malformed())?),
            ["upd", "noop", "pp"] => CallbackAction::Noop,
            _ => return Err(malformed()),
        };
        Ok(action)
    }
}

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for CallbackAction {
    type Err = CallbackError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_formats() {
        assert_eq!(CallbackAction::Page(2).encode(), "upd:pg:2");
        assert_eq!(CallbackAction::Project(7).encode(), "upd:p:7");
        assert_eq!(
            CallbackAction::Task {
                project_id: 7,
                task_id: 31
            }
            .encode(),
            "upd:t:7:31"
        );
        assert_eq!(
            CallbackAction::Status {
                status: TaskStatus::InProgress,
                task_id: 31,
                project_id: 7
            }
            .encode(),
            "upd:s:in_progress:31:7"
        );
        assert_eq!(CallbackAction::BackToTasks(7).encode(), "upd:back:tasks:7");
    }

    #[test]
    fn test_decode_known_payloads() {
        assert_eq!(CallbackAction::decode("upd:pg:0").unwrap(), CallbackAction::Page(0));
        assert_eq!(
            "upd:s:done:5:9".parse::<CallbackAction>().unwrap(),
            CallbackAction::Status {
                status: TaskStatus::Done,
                task_id: 5,
                project_id: 9
            }
        );
        assert_eq!(
            CallbackAction::decode("upd:back:projects").unwrap(),
            CallbackAction::BackToProjects
        );
        assert_eq!(CallbackAction::decode("upd:noop:pp").unwrap(), CallbackAction::Noop);
    }

    #[test]
    fn test_decode_negative_ids() {
        // Telegram group chats use negative ids; backends may too
        assert_eq!(CallbackAction::decode("upd:p:-3").unwrap(), CallbackAction::Project(-3));
    }

    #[test]
    fn test_decode_malformed() {
        for data in ["", "upd", "upd:pg", "upd:pg:-1", "upd:p:abc", "upd:t:1", "upd:back:tasks", "x:p:1", "upd:p:1:2"] {
            assert!(
                matches!(CallbackAction::decode(data), Err(CallbackError::Malformed(_))),
                "expected malformed: {data}"
            );
        }
    }

    #[test]
    fn test_decode_unknown_status() {
        assert_eq!(
            CallbackAction::decode("upd:s:blocked:1:2"),
            Err(CallbackError::UnknownStatus(UnknownStatus("blocked".to_string())))
        );
    }
}
