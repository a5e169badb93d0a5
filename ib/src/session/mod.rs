//! Per-user conversations
//!
//! A `Session` is a state machine driven by `Event`s; the `SessionRegistry`
//! gives every active user one sequential worker.

mod event;
mod machine;
mod registry;
pub mod render;
mod state;

pub use event::{
    CANCEL_LABEL, CallbackQuery, Event, HELP_LABEL, IDEA_LABEL, PROJECTS_LABEL, REPORT_LABEL, Trigger, UPDATE_LABEL,
    main_keyboard,
};
pub use machine::{MIN_IDEA_CHARS, Session, SessionDeps, is_email};
pub use registry::SessionRegistry;
pub use state::ConversationState;
