//! User-facing texts
//!
//! Everything here is HTML-mode text; user-supplied values are escaped.

use crate::backend::BackendError;
use crate::domain::{CreatedProject, ProgressReport, Project, TaskStatus};
use crate::nav::status_icon;
use crate::text::{escape_html, truncate_chars};

pub const ASK_NAME: &str = "👋 Hi! Let's get you registered.\nWhat is your name? You can also send your email first.";
pub const ASK_NAME_AGAIN: &str = "Please send your name.";
pub const EMAIL_SAVED_ASK_NAME: &str = "📧 Got your email. Now send your name.";
pub const BAD_EMAIL: &str = "That doesn't look like an email. Please try again.";
pub const ASK_IDEA: &str = "💡 Describe your idea in a few sentences.";
pub const IDEA_TOO_SHORT: &str = "The idea is too short. Please describe it in at least 8 characters.";
pub const CANCELLED: &str = "Cancelled.";
pub const NO_PROJECTS: &str = "You have no projects yet. Send /idea to create one.";
pub const NOT_REGISTERED: &str = "You are not registered yet. Send /start.";
pub const FALLBACK: &str = "I didn't get that. Use the buttons below or /help.";
pub const HELP: &str = "<b>IdeaBot</b> turns an idea into a short plan and tracks your tasks.\n\n\
/start - register or update your name and email\n\
/idea - submit an idea and get a roadmap\n\
/projects - list your projects and task statuses\n\
/update - change a task's status\n\
/report - overall progress\n\
/cancel - abort the current step";

pub const ALERT_OUT_OF_DATE: &str = "This menu is out of date.";
pub const ALERT_INVALID_DATA: &str = "Invalid data";
pub const ALERT_PROJECT_NOT_FOUND: &str = "Project not found.";
pub const ALERT_NO_TASKS: &str = "This project has no tasks.";
pub const TOAST_UPDATED: &str = "Updated";

/// Callback alerts are limited to 200 characters
const ALERT_MAX: usize = 200;

pub fn ask_email(name: &str) -> String {
    format!("Thanks, {}! Now send your email.", escape_html(name))
}

pub fn registered(name: &str, email: &str) -> String {
    format!(
        "✅ Registered as <b>{}</b> ({}).\nSend /idea to turn an idea into a plan.",
        escape_html(name),
        escape_html(email)
    )
}

pub fn error_text(detail: &str) -> String {
    format!("⚠️ Something went wrong: {}", escape_html(detail))
}

/// Message for a failed collaborator call
pub fn backend_error(error: &BackendError) -> String {
    if error.is_not_found() {
        NOT_REGISTERED.to_string()
    } else {
        error_text(&error.to_string())
    }
}

/// Alert for a failed collaborator call during a button press
///
/// Alerts are plain text, so nothing is escaped.
pub fn backend_alert(error: &BackendError) -> String {
    if error.is_not_found() {
        NOT_REGISTERED.to_string()
    } else {
        truncate_chars(&format!("⚠️ {}", error), ALERT_MAX)
    }
}

pub fn generation_failed(error: &BackendError) -> String {
    format!(
        "❌ Could not generate a plan: <code>{}</code>",
        escape_html(&error.to_string())
    )
}

pub fn roadmap(created: &CreatedProject) -> String {
    let mut text = format!(
        "<b>Project #{}</b>\n{}\n\n<b>Roadmap:</b>",
        created.project_id,
        escape_html(&created.description)
    );
    for (i, task) in created.tasks.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", i + 1, escape_html(task)));
    }
    text
}

pub fn project_list(projects: &[Project]) -> String {
    let mut blocks = Vec::with_capacity(projects.len());
    for project in projects {
        let mut block = format!("<b>{}</b>", escape_html(&project.title));
        for task in project.sorted_tasks() {
            block.push_str(&format!(
                "\n{} {}. {}",
                status_icon(task.status),
                task.order + 1,
                escape_html(&task.title)
            ));
        }
        blocks.push(block);
    }
    format!("📋 <b>Your projects</b>\n\n{}", blocks.join("\n\n"))
}

pub fn report(report: &ProgressReport) -> String {
    format!(
        "📊 Progress: <b>{}%</b>\n{}",
        report.percent,
        escape_html(&report.comment)
    )
}

pub fn status_updated(status: TaskStatus) -> String {
    format!("Status updated: <b>{}</b> ✅", status)
}
