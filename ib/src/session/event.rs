//! Inbound events and trigger recognition

use crate::domain::{ChatId, MessageRef, UserId};
use crate::nav::{CallbackAction, CallbackError};
use crate::transport::Markup;

pub const IDEA_LABEL: &str = "🆕 Idea";
pub const PROJECTS_LABEL: &str = "📋 Projects";
pub const UPDATE_LABEL: &str = "✏️ Update";
pub const REPORT_LABEL: &str = "📊 Report";
pub const HELP_LABEL: &str = "❓ Help";
pub const CANCEL_LABEL: &str = "⛔ Cancel";

/// One inbound event for one user
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub user: UserId,
    pub chat: ChatId,
    pub trigger: Trigger,
}

impl Event {
    pub fn new(user: UserId, chat: ChatId, trigger: Trigger) -> Self {
        Self { user, chat, trigger }
    }

    /// Event for a plain text message, recognizing commands and labels
    pub fn text(user: UserId, chat: ChatId, text: &str) -> Self {
        Self::new(user, chat, Trigger::from_text(text))
    }
}

/// A button press, decoded at the transport boundary
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackQuery {
    /// Transport id used to answer the press
    pub id: String,
    /// Message carrying the pressed button, when still known
    pub message: Option<MessageRef>,
    pub action: Result<CallbackAction, CallbackError>,
}

/// What the user asked for
#[derive(Debug, Clone, PartialEq)]
pub enum Trigger {
    Start,
    Help,
    Cancel,
    SubmitIdea,
    ListProjects,
    BeginUpdate,
    Report,
    /// Free text, interpreted by the current state
    Text(String),
    Callback(CallbackQuery),
    /// A `/command` nobody handles
    Unknown(String),
}

impl Trigger {
    /// Map a text message to a trigger
    ///
    /// Commands match on their first token with any `@botname` suffix
    /// removed; keyboard labels match exactly.
    pub fn from_text(text: &str) -> Self {
        let trimmed = text.trim();

        if let Some(command) = trimmed.strip_prefix('/') {
            let token = command.split_whitespace().next().unwrap_or("");
            let name = token.split('@').next().unwrap_or("");
            return match name.to_lowercase().as_str() {
                "start" => Trigger::Start,
                "help" => Trigger::Help,
                "cancel" => Trigger::Cancel,
                "idea" => Trigger::SubmitIdea,
                "projects" => Trigger::ListProjects,
                "update" => Trigger::BeginUpdate,
                "report" => Trigger::Report,
                _ => Trigger::Unknown(trimmed.to_string()),
            };
        }

        match trimmed {
            IDEA_LABEL => Trigger::SubmitIdea,
            PROJECTS_LABEL => Trigger::ListProjects,
            UPDATE_LABEL => Trigger::BeginUpdate,
            REPORT_LABEL => Trigger::Report,
            HELP_LABEL => Trigger::Help,
            CANCEL_LABEL => Trigger::Cancel,
            _ => Trigger::Text(text.to_string()),
        }
    }
}

/// Persistent reply keyboard with the main actions
pub fn main_keyboard() -> Markup {
    let row = |labels: &[&str]| labels.iter().map(|l| l.to_string()).collect::<Vec<_>>();
    Markup::Reply(vec![
        row(&[IDEA_LABEL, PROJECTS_LABEL]),
        row(&[UPDATE_LABEL, REPORT_LABEL]),
        row(&[HELP_LABEL, CANCEL_LABEL]),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_commands() {
        assert_eq!(Trigger::from_text("/start"), Trigger::Start);
        assert_eq!(Trigger::from_text("  /idea  "), Trigger::SubmitIdea);
        assert_eq!(Trigger::from_text("/projects@IdeaBot"), Trigger::ListProjects);
        assert_eq!(Trigger::from_text("/update now"), Trigger::BeginUpdate);
        assert_eq!(Trigger::from_text("/REPORT"), Trigger::Report);
        assert_eq!(Trigger::from_text("/cancel"), Trigger::Cancel);
        assert_eq!(Trigger::from_text("/help"), Trigger::Help);
        assert_eq!(Trigger::from_text("/nope"), Trigger::Unknown("/nope".to_string()));
    }

    #[test]
    fn test_labels() {
        assert_eq!(Trigger::from_text(IDEA_LABEL), Trigger::SubmitIdea);
        assert_eq!(Trigger::from_text(PROJECTS_LABEL), Trigger::ListProjects);
        assert_eq!(Trigger::from_text(UPDATE_LABEL), Trigger::BeginUpdate);
        assert_eq!(Trigger::from_text(REPORT_LABEL), Trigger::Report);
        assert_eq!(Trigger::from_text(HELP_LABEL), Trigger::Help);
        assert_eq!(Trigger::from_text(CANCEL_LABEL), Trigger::Cancel);
    }

    #[test]
    fn test_plain_text_is_kept_verbatim() {
        assert_eq!(Trigger::from_text(" Ann "), Trigger::Text(" Ann ".to_string()));
        assert_eq!(Trigger::from_text("Idea"), Trigger::Text("Idea".to_string()));
    }

    #[test]
    fn test_main_keyboard_labels_are_recognized() {
        let Markup::Reply(rows) = main_keyboard() else {
            panic!("expected reply keyboard");
        };
        for label in rows.iter().flatten() {
            assert!(!matches!(Trigger::from_text(label), Trigger::Text(_)), "{label}");
        }
    }
}
