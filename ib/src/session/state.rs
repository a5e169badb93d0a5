//! Conversation state

use crate::domain::{ProjectId, TaskId};

/// Where a user is in the conversation
///
/// Partially collected registration fields live inside the variants so
/// leaving the flow discards them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConversationState {
    #[default]
    Idle,
    AwaitingName {
        email: Option<String>,
    },
    AwaitingEmail {
        name: Option<String>,
    },
    AwaitingIdea,
    BrowsingProjects {
        page: usize,
    },
    BrowsingTasks {
        project_id: ProjectId,
    },
    PickingStatus {
        project_id: ProjectId,
        task_id: TaskId,
    },
}

impl ConversationState {
    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            ConversationState::Idle => "idle",
            ConversationState::AwaitingName { .. } => "awaiting_name",
            ConversationState::AwaitingEmail { .. } => "awaiting_email",
            ConversationState::AwaitingIdea => "awaiting_idea",
            ConversationState::BrowsingProjects { .. } => "browsing_projects",
            ConversationState::BrowsingTasks { .. } => "browsing_tasks",
            ConversationState::PickingStatus { .. } => "picking_status",
        }
    }
}
