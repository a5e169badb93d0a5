//! Menu builders for the project → task → status drill-down
//!
//! All functions are pure: they take live backend data and return a `Menu`.

use tracing::debug;

use super::{Button, CallbackAction, Menu};
use crate::domain::{Project, ProjectId, TaskId, TaskStatus};
use crate::text::{escape_html, truncate_chars};

/// Projects per page
pub const PAGE_SIZE: usize = 8;

/// Longest title shown on a button
pub const TITLE_MAX: usize = 40;

/// Number of pages needed for `total` projects; at least one
pub fn page_count(total: usize) -> usize {
    total.div_ceil(PAGE_SIZE).max(1)
}

/// Clamp `page` to `[0, page_count - 1]`
pub fn clamp_page(total: usize, page: usize) -> usize {
    page.min(page_count(total) - 1)
}

/// One button per project on `page`, plus a control row when paged
pub fn build_project_menu(projects: &[Project], page: usize) -> Menu {
    debug!(count = projects.len(), page, "build_project_menu: called");
    let pages = page_count(projects.len());
    let page = clamp_page(projects.len(), page);

    let mut rows: Vec<Vec<Button>> = projects
        .iter()
        .skip(page * PAGE_SIZE)
        .take(PAGE_SIZE)
        .map(|p| {
            vec![Button::new(
                format!("• {}", truncate_chars(&p.title, TITLE_MAX)),
                CallbackAction::Project(p.id),
            )]
        })
        .collect();

    if pages > 1 {
        let mut controls = Vec::with_capacity(3);
        if page > 0 {
            controls.push(Button::new("◀️ Back", CallbackAction::Page(page - 1)));
        }
        controls.push(Button::new(format!("{}/{}", page + 1, pages), CallbackAction::Noop));
        if page + 1 < pages {
            controls.push(Button::new("Forward ▶️", CallbackAction::Page(page + 1)));
        }
        rows.push(controls);
    }

    Menu {
        text: "Choose a project:".to_string(),
        rows,
    }
}

/// The project's tasks in roadmap order, plus a link back to the list
pub fn build_task_menu(project: &Project) -> Menu {
    debug!(project_id = project.id, tasks = project.tasks.len(), "build_task_menu: called");
    let mut rows: Vec<Vec<Button>> = project
        .sorted_tasks()
        .into_iter()
        .map(|t| {
            vec![Button::new(
                format!("{}. {}", t.order + 1, truncate_chars(&t.title, TITLE_MAX)),
                CallbackAction::Task {
                    project_id: project.id,
                    task_id: t.id,
                },
            )]
        })
        .collect();
    rows.push(vec![Button::new("« To projects", CallbackAction::BackToProjects)]);

    Menu {
        text: format!("<b>{}</b>\nChoose a task:", escape_html(&project.title)),
        rows,
    }
}

/// The three statuses, plus a link back to the task list
pub fn build_status_menu(task_id: TaskId, project_id: ProjectId) -> Menu {
    let mut rows: Vec<Vec<Button>> = TaskStatus::ALL
        .iter()
        .map(|&status| {
            vec![Button::new(
                format!("{} {}", status_icon(status), status),
                CallbackAction::Status {
                    status,
                    task_id,
                    project_id,
                },
            )]
        })
        .collect();
    rows.push(vec![Button::new("« To tasks", CallbackAction::BackToTasks(project_id))]);

    Menu {
        text: "Choose a new status:".to_string(),
        rows,
    }
}

pub fn status_icon(status: TaskStatus) -> &'static str {
    match status {
        TaskStatus::Pending => "⏳",
        TaskStatus::InProgress => "🔧",
        TaskStatus::Done => "✅",
    }
}
