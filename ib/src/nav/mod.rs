//! Navigation stack: paged projects, tasks, status picker

mod builder;
mod callback;
mod menu;

pub use builder::{
    PAGE_SIZE, TITLE_MAX, build_project_menu, build_status_menu, build_task_menu, clamp_page, page_count, status_icon,
};
pub use callback::{CallbackAction, CallbackError};
pub use menu::{Button, Menu};
