//! Per-user conversation state machine
//!
//! One `Session` per user. Every event is handled to completion before the
//! next one is taken, so a session never races with itself.

use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{debug, info, warn};

use super::event::{CallbackQuery, Event, Trigger, main_keyboard};
use super::render;
use super::state::ConversationState;
use crate::backend::Backend;
use crate::domain::{ChatId, MessageRef, ProjectId, TaskId, TaskStatus, UserId};
use crate::nav::{CallbackAction, Menu, build_project_menu, build_status_menu, build_task_menu, clamp_page};
use crate::progress::{ProgressAnimator, render_done, render_progress};
use crate::transport::{Markup, Transport, TransportError};

/// Shortest accepted idea, in characters after trimming
pub const MIN_IDEA_CHARS: usize = 8;

static EMAIL_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok());

/// Loose email shape check: something@domain.tld
pub fn is_email(text: &str) -> bool {
    EMAIL_RE.as_ref().is_some_and(|re| re.is_match(text))
}

/// Collaborators shared by every session
#[derive(Clone)]
pub struct SessionDeps {
    pub backend: Arc<dyn Backend>,
    pub transport: Arc<dyn Transport>,
    pub animator: ProgressAnimator,
}

/// Conversation with one user
pub struct Session {
    user: UserId,
    chat: ChatId,
    state: ConversationState,
    deps: SessionDeps,
}

impl Session {
    pub fn new(user: UserId, chat: ChatId, deps: SessionDeps) -> Self {
        Self {
            user,
            chat,
            state: ConversationState::Idle,
            deps,
        }
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    /// Handle one event, reporting transport failures to the user
    pub async fn process(&mut self, event: Event) {
        if let Err(e) = self.handle(event).await {
            warn!(user = %self.user, state = self.state.name(), error = %e, "process: handler failed");
            if let Err(e) = self.send(&render::error_text(&e.to_string()), Markup::None).await {
                warn!(user = %self.user, error = %e, "process: could not report failure");
            }
        }
    }

    /// Handle one event: zero or more renders plus a possible transition
    pub async fn handle(&mut self, event: Event) -> Result<(), TransportError> {
        debug!(user = %self.user, state = self.state.name(), trigger = ?event.trigger, "handle: called");
        self.chat = event.chat;

        match event.trigger {
            Trigger::Start => {
                self.state = ConversationState::AwaitingName { email: None };
                self.send(render::ASK_NAME, Markup::None).await
            }
            Trigger::Cancel => {
                self.state = ConversationState::Idle;
                self.send(render::CANCELLED, main_keyboard()).await
            }
            Trigger::Help => self.send(render::HELP, main_keyboard()).await,
            Trigger::SubmitIdea => {
                self.state = ConversationState::AwaitingIdea;
                self.send(render::ASK_IDEA, Markup::None).await
            }
            Trigger::ListProjects => self.list_projects().await,
            Trigger::BeginUpdate => self.begin_update().await,
            Trigger::Report => self.report().await,
            Trigger::Text(text) => self.on_text(&text).await,
            Trigger::Callback(query) => self.on_callback(query).await,
            Trigger::Unknown(command) => {
                debug!(%command, "handle: unknown command");
                self.send(render::FALLBACK, main_keyboard()).await
            }
        }
    }

    async fn send(&self, text: &str, markup: Markup) -> Result<(), TransportError> {
        self.deps.transport.send_message(self.chat, text, markup).await.map(|_| ())
    }

    async fn answer(&self, query: &CallbackQuery, text: Option<&str>, alert: bool) -> Result<(), TransportError> {
        self.deps.transport.answer_callback(&query.id, text, alert).await
    }

    /// Edit the message carrying a pressed button
    ///
    /// An unchanged message counts as success. On any other failure the
    /// press is still acknowledged before the error is returned, so every
    /// press gets exactly one answer.
    async fn edit_pressed(
        &self,
        query: &CallbackQuery,
        message: &MessageRef,
        text: &str,
        markup: Markup,
    ) -> Result<(), TransportError> {
        match self.deps.transport.edit_message(message, text, markup).await {
            Ok(()) | Err(TransportError::NotModified) => Ok(()),
            Err(e) => {
                if let Err(answer_err) = self.answer(query, None, false).await {
                    debug!(error = %answer_err, "edit_pressed: could not acknowledge press");
                }
                Err(e)
            }
        }
    }

    async fn edit_menu(&self, query: &CallbackQuery, message: &MessageRef, menu: Menu) -> Result<(), TransportError> {
        self.edit_pressed(query, message, &menu.text, Markup::Inline(menu.rows)).await
    }

    // Text input

    async fn on_text(&mut self, text: &str) -> Result<(), TransportError> {
        let input = text.trim();
        match self.state.clone() {
            ConversationState::AwaitingName { email } => {
                if input.is_empty() {
                    return self.send(render::ASK_NAME_AGAIN, Markup::None).await;
                }
                if is_email(input) {
                    self.state = ConversationState::AwaitingName {
                        email: Some(input.to_string()),
                    };
                    return self.send(render::EMAIL_SAVED_ASK_NAME, Markup::None).await;
                }
                match email {
                    Some(email) => self.register(input, &email).await,
                    None => {
                        self.state = ConversationState::AwaitingEmail {
                            name: Some(input.to_string()),
                        };
                        self.send(&render::ask_email(input), Markup::None).await
                    }
                }
            }
            ConversationState::AwaitingEmail { name } => {
                if !is_email(input) {
                    return self.send(render::BAD_EMAIL, Markup::None).await;
                }
                match name {
                    Some(name) => self.register(&name, input).await,
                    None => {
                        self.state = ConversationState::AwaitingName {
                            email: Some(input.to_string()),
                        };
                        self.send(render::EMAIL_SAVED_ASK_NAME, Markup::None).await
                    }
                }
            }
            ConversationState::AwaitingIdea => self.submit_idea(input).await,
            _ => self.send(render::FALLBACK, main_keyboard()).await,
        }
    }

    async fn register(&mut self, name: &str, email: &str) -> Result<(), TransportError> {
        self.state = ConversationState::Idle;
        match self.deps.backend.register_or_update(self.user, name, email).await {
            Ok(()) => {
                info!(user = %self.user, "register: user registered");
                self.send(&render::registered(name, email), main_keyboard()).await?;
            }
            Err(e) => {
                warn!(user = %self.user, error = %e, "register: backend failed");
                self.send(&render::backend_error(&e), main_keyboard()).await?;
            }
        }
        Ok(())
    }

    async fn submit_idea(&mut self, idea: &str) -> Result<(), TransportError> {
        if idea.chars().count() < MIN_IDEA_CHARS {
            return self.send(render::IDEA_TOO_SHORT, Markup::None).await;
        }
        self.state = ConversationState::Idle;

        let width = self.deps.animator.bar_width();
        let progress = self
            .deps
            .transport
            .send_message(self.chat, &render_progress(0, width), Markup::None)
            .await?;
        let animation = self.deps.animator.start(self.deps.transport.clone(), progress);

        let result = self.deps.backend.create_from_idea(self.user, idea).await;
        let outcome = animation.cancel().await;
        debug!(edits = outcome.edits, stopped = ?outcome.stopped, "submit_idea: animation stopped");

        match result {
            Ok(created) => {
                info!(user = %self.user, project_id = created.project_id, "submit_idea: project created");
                if let Err(e) = self
                    .deps
                    .transport
                    .edit_message(&progress, &render_done(width), Markup::None)
                    .await
                {
                    warn!(error = %e, "submit_idea: could not mark progress done");
                }
                self.send(&render::roadmap(&created), main_keyboard()).await?;
            }
            Err(e) => {
                warn!(user = %self.user, error = %e, "submit_idea: backend failed");
                let text = if e.is_not_found() {
                    render::NOT_REGISTERED.to_string()
                } else {
                    render::generation_failed(&e)
                };
                if let Err(edit_err) = self.deps.transport.edit_message(&progress, &text, Markup::None).await {
                    debug!(error = %edit_err, "submit_idea: edit failed, sending instead");
                    self.send(&text, main_keyboard()).await?;
                }
            }
        }
        Ok(())
    }

    // Non-transitioning commands

    async fn list_projects(&mut self) -> Result<(), TransportError> {
        let text = match self.deps.backend.get_projects(self.user).await {
            Ok(projects) if projects.is_empty() => render::NO_PROJECTS.to_string(),
            Ok(projects) => render::project_list(&projects),
            Err(e) => {
                warn!(user = %self.user, error = %e, "list_projects: backend failed");
                render::backend_error(&e)
            }
        };
        self.send(&text, main_keyboard()).await
    }

    async fn report(&mut self) -> Result<(), TransportError> {
        let text = match self.deps.backend.get_progress(self.user).await {
            Ok(report) => render::report(&report),
            Err(e) => {
                warn!(user = %self.user, error = %e, "report: backend failed");
                render::backend_error(&e)
            }
        };
        self.send(&text, main_keyboard()).await
    }

    async fn begin_update(&mut self) -> Result<(), TransportError> {
        match self.deps.backend.get_projects(self.user).await {
            Ok(projects) if projects.is_empty() => {
                self.state = ConversationState::Idle;
                self.send(render::NO_PROJECTS, main_keyboard()).await?;
            }
            Ok(projects) => {
                let menu = build_project_menu(&projects, 0);
                self.send(&menu.text, Markup::Inline(menu.rows)).await?;
                self.state = ConversationState::BrowsingProjects { page: 0 };
            }
            Err(e) => {
                warn!(user = %self.user, error = %e, "begin_update: backend failed");
                self.state = ConversationState::Idle;
                self.send(&render::backend_error(&e), main_keyboard()).await?;
            }
        }
        Ok(())
    }

    // Button presses

    async fn on_callback(&mut self, query: CallbackQuery) -> Result<(), TransportError> {
        let action = match &query.action {
            Ok(action) => *action,
            Err(e) => {
                debug!(error = %e, "on_callback: undecodable payload");
                return self.answer(&query, Some(render::ALERT_INVALID_DATA), true).await;
            }
        };

        if action == CallbackAction::Noop {
            return self.answer(&query, None, false).await;
        }

        let Some(message) = query.message else {
            return self.answer(&query, Some(render::ALERT_OUT_OF_DATE), true).await;
        };

        match (self.state.clone(), action) {
            (ConversationState::BrowsingProjects { .. }, CallbackAction::Page(page)) => {
                self.show_projects(&query, &message, page).await
            }
            (ConversationState::BrowsingProjects { .. }, CallbackAction::Project(project_id)) => {
                self.show_tasks(&query, &message, project_id).await
            }
            (ConversationState::BrowsingTasks { .. }, CallbackAction::BackToProjects) => {
                self.show_projects(&query, &message, 0).await
            }
            (
                ConversationState::BrowsingTasks { project_id },
                CallbackAction::Task {
                    project_id: pressed,
                    task_id,
                },
            ) if pressed == project_id => {
                self.edit_menu(&query, &message, build_status_menu(task_id, project_id)).await?;
                self.state = ConversationState::PickingStatus { project_id, task_id };
                self.answer(&query, None, false).await
            }
            (ConversationState::PickingStatus { project_id, .. }, CallbackAction::BackToTasks(pressed))
                if pressed == project_id =>
            {
                self.show_tasks(&query, &message, project_id).await
            }
            (
                ConversationState::PickingStatus { project_id, task_id },
                CallbackAction::Status {
                    status,
                    task_id: pressed_task,
                    project_id: pressed_project,
                },
            ) if pressed_task == task_id && pressed_project == project_id => {
                self.apply_status(&query, &message, task_id, status).await
            }
            (state, action) => {
                debug!(state = state.name(), %action, "on_callback: stale button");
                self.answer(&query, Some(render::ALERT_OUT_OF_DATE), true).await
            }
        }
    }

    /// Re-fetch and show a page of the project list
    async fn show_projects(
        &mut self,
        query: &CallbackQuery,
        message: &MessageRef,
        page: usize,
    ) -> Result<(), TransportError> {
        let projects = match self.deps.backend.get_projects(self.user).await {
            Ok(projects) => projects,
            Err(e) => {
                warn!(user = %self.user, error = %e, "show_projects: backend failed");
                return self.answer(query, Some(&render::backend_alert(&e)), true).await;
            }
        };

        if projects.is_empty() {
            self.state = ConversationState::Idle;
            self.edit_pressed(query, message, render::NO_PROJECTS, Markup::None).await?;
            return self.answer(query, None, false).await;
        }

        let page = clamp_page(projects.len(), page);
        self.edit_menu(query, message, build_project_menu(&projects, page)).await?;
        self.state = ConversationState::BrowsingProjects { page };
        self.answer(query, None, false).await
    }

    /// Re-fetch and show one project's tasks
    async fn show_tasks(
        &mut self,
        query: &CallbackQuery,
        message: &MessageRef,
        project_id: ProjectId,
    ) -> Result<(), TransportError> {
        let projects = match self.deps.backend.get_projects(self.user).await {
            Ok(projects) => projects,
            Err(e) => {
                warn!(user = %self.user, error = %e, "show_tasks: backend failed");
                return self.answer(query, Some(&render::backend_alert(&e)), true).await;
            }
        };

        if projects.is_empty() {
            self.state = ConversationState::Idle;
            self.edit_pressed(query, message, render::NO_PROJECTS, Markup::None).await?;
            return self.answer(query, None, false).await;
        }

        let Some(project) = projects.iter().find(|p| p.id == project_id) else {
            return self.answer(query, Some(render::ALERT_PROJECT_NOT_FOUND), true).await;
        };
        if project.tasks.is_empty() {
            return self.answer(query, Some(render::ALERT_NO_TASKS), true).await;
        }

        self.edit_menu(query, message, build_task_menu(project)).await?;
        self.state = ConversationState::BrowsingTasks { project_id };
        self.answer(query, None, false).await
    }

    async fn apply_status(
        &mut self,
        query: &CallbackQuery,
        message: &MessageRef,
        task_id: TaskId,
        status: TaskStatus,
    ) -> Result<(), TransportError> {
        if let Err(e) = self.deps.backend.set_status(task_id, status).await {
            warn!(user = %self.user, task_id, error = %e, "apply_status: backend failed");
            return self.answer(query, Some(&render::backend_alert(&e)), true).await;
        }

        info!(user = %self.user, task_id, %status, "apply_status: status updated");
        self.state = ConversationState::Idle;
        self.edit_pressed(query, message, &render::status_updated(status), Markup::None)
            .await?;
        self.answer(query, Some(render::TOAST_UPDATED), false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mock::{BackendCall, MockBackend};
    use crate::domain::{Project, Task};
    use crate::nav::CallbackError;
    use crate::transport::mock::{RecordingTransport, Sent};
    use std::time::Duration;

    const USER: UserId = UserId(42);
    const CHAT: ChatId = ChatId(42);
    const MENU: MessageRef = MessageRef { chat: CHAT, message_id: 900 };

    fn project(id: ProjectId, tasks: usize) -> Project {
        Project {
            id,
            title: format!("Project {}", id),
            description: String::new(),
            tasks: (0..tasks)
                .map(|i| Task {
                    id: id * 100 + i as i64,
                    title: format!("Task {}", i),
                    order: i as u32,
                    status: TaskStatus::Pending,
                })
                .collect(),
        }
    }

    struct Harness {
        session: Session,
        backend: Arc<MockBackend>,
        transport: Arc<RecordingTransport>,
    }

    impl Harness {
        fn new(backend: MockBackend) -> Self {
            let backend = Arc::new(backend);
            let transport = Arc::new(RecordingTransport::new());
            let deps = SessionDeps {
                backend: backend.clone(),
                transport: transport.clone(),
                animator: ProgressAnimator::new(Duration::from_millis(10), 1, 3, 12),
            };
            Self {
                session: Session::new(USER, CHAT, deps),
                backend,
                transport,
            }
        }

        async fn text(&mut self, text: &str) {
            self.session.handle(Event::text(USER, CHAT, text)).await.unwrap();
        }

        async fn press(&mut self, data: &str) {
            let query = CallbackQuery {
                id: format!("cb-{}", data),
                message: Some(MENU),
                action: CallbackAction::decode(data),
            };
            self.session
                .handle(Event::new(USER, CHAT, Trigger::Callback(query)))
                .await
                .unwrap();
        }

        fn state(&self) -> &ConversationState {
            self.session.state()
        }

        fn registrations(&self) -> Vec<BackendCall> {
            self.backend
                .calls()
                .into_iter()
                .filter(|c| matches!(c, BackendCall::Register { .. }))
                .collect()
        }

        fn last_answer(&self) -> Option<(String, Option<String>, bool)> {
            self.transport.answers().pop()
        }
    }

    #[test]
    fn test_is_email() {
        assert!(is_email("ann@example.com"));
        assert!(is_email("a.b+c@sub.example.io"));
        assert!(!is_email("ann"));
        assert!(!is_email("ann@example"));
        assert!(!is_email("ann @example.com"));
        assert!(!is_email("@example.com"));
    }

    #[tokio::test]
    async fn test_registration_name_then_email() {
        let mut h = Harness::new(MockBackend::new());
        h.text("/start").await;
        assert_eq!(*h.state(), ConversationState::AwaitingName { email: None });

        h.text("Ann").await;
        assert_eq!(
            *h.state(),
            ConversationState::AwaitingEmail {
                name: Some("Ann".to_string())
            }
        );

        h.text("not an email").await;
        assert_eq!(h.transport.last_text().as_deref(), Some(render::BAD_EMAIL));

        h.text("ann@example.com").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert_eq!(
            h.registrations(),
            vec![BackendCall::Register {
                user: USER,
                name: "Ann".to_string(),
                email: "ann@example.com".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_registration_email_then_name() {
        let mut h = Harness::new(MockBackend::new());
        h.text("/start").await;
        h.text("ann@example.com").await;
        assert_eq!(
            *h.state(),
            ConversationState::AwaitingName {
                email: Some("ann@example.com".to_string())
            }
        );

        h.text("   ").await;
        assert_eq!(h.transport.last_text().as_deref(), Some(render::ASK_NAME_AGAIN));

        h.text("Ann").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert_eq!(
            h.registrations(),
            vec![BackendCall::Register {
                user: USER,
                name: "Ann".to_string(),
                email: "ann@example.com".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_start_discards_partial_registration() {
        let mut h = Harness::new(MockBackend::new());
        h.text("/start").await;
        h.text("Ann").await;
        h.text("/start").await;
        assert_eq!(*h.state(), ConversationState::AwaitingName { email: None });
        h.text("/cancel").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert!(h.registrations().is_empty());
    }

    #[tokio::test]
    async fn test_registration_failure_returns_to_idle() {
        let backend = MockBackend::new();
        backend.set_failing(true);
        let mut h = Harness::new(backend);
        h.text("/start").await;
        h.text("Ann").await;
        h.text("ann@example.com").await;

        assert_eq!(*h.state(), ConversationState::Idle);
        assert!(h.transport.last_text().unwrap().starts_with("⚠️ Something went wrong"));
    }

    #[tokio::test]
    async fn test_short_idea_reprompts() {
        let mut h = Harness::new(MockBackend::new());
        h.text("/idea").await;
        assert_eq!(*h.state(), ConversationState::AwaitingIdea);

        h.text("  app   ").await;
        assert_eq!(*h.state(), ConversationState::AwaitingIdea);
        assert_eq!(h.transport.last_text().as_deref(), Some(render::IDEA_TOO_SHORT));
        assert!(h.backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_idea_flow_success() {
        let backend = MockBackend::new();
        backend.set_idea_delay(Duration::from_millis(60));
        let mut h = Harness::new(backend);
        h.text("/idea").await;
        h.transport.clear();

        h.text("  A marketplace for pet sitters  ").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert_eq!(
            h.backend.calls(),
            vec![BackendCall::CreateFromIdea {
                user: USER,
                idea: "A marketplace for pet sitters".to_string()
            }]
        );

        let messages = h.transport.messages();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].0.contains("0%"));
        assert!(messages[1].0.starts_with("<b>Project #1</b>\nA &lt;useful&gt; thing."));
        assert_eq!(messages[1].1, main_keyboard());

        // The final edit is the completed bar, after any animation edits
        let progress = h
            .transport
            .sent()
            .into_iter()
            .find_map(|s| match s {
                Sent::Message { message, .. } => Some(message),
                _ => None,
            })
            .unwrap();
        let edits = h.transport.edits();
        let (target, text, _) = edits.last().unwrap();
        assert_eq!(*target, progress);
        assert!(text.starts_with("✅ Done!"));
        assert!(text.contains("100%"));
    }

    #[tokio::test]
    async fn test_idea_flow_failure_edits_progress() {
        let backend = MockBackend::new();
        backend.set_failing(true);
        let mut h = Harness::new(backend);
        h.text("/idea").await;
        h.text("A marketplace for pet sitters").await;

        assert_eq!(*h.state(), ConversationState::Idle);
        let (_, text, _) = h.transport.edits().pop().unwrap();
        assert!(text.starts_with("❌ Could not generate a plan: <code>"));
    }

    #[tokio::test]
    async fn test_idea_flow_failure_sends_when_edit_fails() {
        let backend = MockBackend::new();
        backend.set_failing(true);
        let mut h = Harness::new(backend);
        h.transport.fail_edits_with(400);
        h.text("/idea").await;
        h.text("A marketplace for pet sitters").await;

        let (text, _) = h.transport.messages().pop().unwrap();
        assert!(text.starts_with("❌ Could not generate a plan"));
    }

    #[tokio::test]
    async fn test_begin_update_without_projects() {
        let mut h = Harness::new(MockBackend::new());
        h.text("/idea").await;
        h.text("/update").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert_eq!(h.transport.last_text().as_deref(), Some(render::NO_PROJECTS));
    }

    #[tokio::test]
    async fn test_begin_update_not_registered() {
        let backend = MockBackend::new();
        backend.set_not_found(true);
        let mut h = Harness::new(backend);
        h.text("/update").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert_eq!(h.transport.last_text().as_deref(), Some(render::NOT_REGISTERED));
    }

    #[tokio::test]
    async fn test_paging_projects() {
        let projects: Vec<Project> = (1..=20).map(|id| project(id, 1)).collect();
        let mut h = Harness::new(MockBackend::with_projects(projects));
        h.text("/update").await;
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 0 });

        h.press("upd:pg:2").await;
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 2 });
        let (target, _, markup) = h.transport.edits().pop().unwrap();
        assert_eq!(target, MENU);
        let Markup::Inline(rows) = markup else {
            panic!("expected inline menu");
        };
        assert_eq!(rows.len(), 5);

        // Clamped when the list shrank in the meantime
        h.press("upd:pg:9").await;
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 2 });
    }

    #[tokio::test]
    async fn test_noop_is_acknowledged_silently() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 1)]));
        h.text("/update").await;
        h.press("upd:noop:pp").await;
        assert_eq!(h.last_answer(), Some(("cb-upd:noop:pp".to_string(), None, false)));
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 0 });
    }

    #[tokio::test]
    async fn test_drill_down_and_back_navigation() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 2), project(2, 3)]));
        h.text("/update").await;

        h.press("upd:p:2").await;
        assert_eq!(*h.state(), ConversationState::BrowsingTasks { project_id: 2 });

        h.press("upd:t:2:201").await;
        assert_eq!(
            *h.state(),
            ConversationState::PickingStatus {
                project_id: 2,
                task_id: 201
            }
        );

        h.press("upd:back:tasks:2").await;
        assert_eq!(*h.state(), ConversationState::BrowsingTasks { project_id: 2 });
        let (_, text, _) = h.transport.edits().pop().unwrap();
        assert_eq!(text, "<b>Project 2</b>\nChoose a task:");

        h.press("upd:back:projects").await;
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 0 });
    }

    #[tokio::test]
    async fn test_back_to_projects_starts_from_first_page() {
        let projects: Vec<Project> = (1..=12).map(|id| project(id, 2)).collect();
        let mut h = Harness::new(MockBackend::with_projects(projects));
        h.text("/update").await;

        h.press("upd:pg:1").await;
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 1 });
        h.press("upd:p:10").await;
        assert_eq!(*h.state(), ConversationState::BrowsingTasks { project_id: 10 });

        h.press("upd:back:projects").await;
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 0 });
        let (target, text, markup) = h.transport.edits().pop().unwrap();
        assert_eq!(target, MENU);
        assert_eq!(text, "Choose a project:");
        let Markup::Inline(rows) = markup else {
            panic!("expected inline menu");
        };
        assert_eq!(rows[0][0].data, "upd:p:1");
        let controls: Vec<&str> = rows[8].iter().map(|b| b.data.as_str()).collect();
        assert_eq!(controls, vec!["upd:noop:pp", "upd:pg:1"]);
    }

    #[tokio::test]
    async fn test_set_status_confirms_and_idles() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 2)]));
        h.text("/update").await;
        h.press("upd:p:1").await;
        h.press("upd:t:1:101").await;
        h.press("upd:s:done:101:1").await;

        assert_eq!(*h.state(), ConversationState::Idle);
        assert!(h.backend.calls().contains(&BackendCall::SetStatus {
            task_id: 101,
            status: TaskStatus::Done
        }));
        let (_, text, markup) = h.transport.edits().pop().unwrap();
        assert_eq!(text, "Status updated: <b>done</b> ✅");
        assert_eq!(markup, Markup::None);
        assert_eq!(h.last_answer().unwrap().1.as_deref(), Some(render::TOAST_UPDATED));
    }

    #[tokio::test]
    async fn test_project_without_tasks_alerts() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 0)]));
        h.text("/update").await;
        h.press("upd:p:1").await;
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 0 });
        let (_, text, alert) = h.last_answer().unwrap();
        assert_eq!(text.as_deref(), Some(render::ALERT_NO_TASKS));
        assert!(alert);

        h.press("upd:p:77").await;
        assert_eq!(h.last_answer().unwrap().1.as_deref(), Some(render::ALERT_PROJECT_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_refetch_with_no_projects_goes_idle() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 1)]));
        h.text("/update").await;
        h.backend.set_projects(vec![]);
        h.press("upd:p:1").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert_eq!(h.transport.last_text().as_deref(), Some(render::NO_PROJECTS));
    }

    #[tokio::test]
    async fn test_fetch_failure_during_callback_keeps_state() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 1)]));
        h.text("/update").await;
        h.backend.set_failing(true);
        h.press("upd:p:1").await;
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 0 });
        assert!(h.last_answer().unwrap().2);
    }

    #[tokio::test]
    async fn test_stale_buttons_are_rejected() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 2), project(2, 2)]));

        // Idle: no menu is active
        h.press("upd:p:1").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert_eq!(h.last_answer().unwrap().1.as_deref(), Some(render::ALERT_OUT_OF_DATE));

        h.text("/update").await;
        h.press("upd:p:1").await;

        // Task button from another project's menu
        h.press("upd:t:2:200").await;
        assert_eq!(*h.state(), ConversationState::BrowsingTasks { project_id: 1 });
        assert_eq!(h.last_answer().unwrap().1.as_deref(), Some(render::ALERT_OUT_OF_DATE));

        // Status button while not picking a status
        h.press("upd:s:done:100:1").await;
        assert_eq!(*h.state(), ConversationState::BrowsingTasks { project_id: 1 });
        assert!(!h.backend.calls().iter().any(|c| matches!(c, BackendCall::SetStatus { .. })));
    }

    #[tokio::test]
    async fn test_invalid_payload_alerts() {
        let mut h = Harness::new(MockBackend::new());
        h.press("garbage").await;
        let (_, text, alert) = h.last_answer().unwrap();
        assert_eq!(text.as_deref(), Some(render::ALERT_INVALID_DATA));
        assert!(alert);

        let query = CallbackQuery {
            id: "x".to_string(),
            message: Some(MENU),
            action: Err(CallbackError::Malformed(String::new())),
        };
        h.session
            .handle(Event::new(USER, CHAT, Trigger::Callback(query)))
            .await
            .unwrap();
        assert_eq!(h.transport.answers().len(), 2);
    }

    #[tokio::test]
    async fn test_every_press_answered_once() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 2)]));
        h.text("/update").await;
        let presses = ["upd:noop:pp", "upd:p:1", "upd:t:1:100", "upd:back:tasks:1", "upd:back:projects", "bad"];
        for p in presses {
            h.press(p).await;
        }
        assert_eq!(h.transport.answers().len(), presses.len());
    }

    #[tokio::test]
    async fn test_failed_edit_still_answers_press() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 2)]));
        h.text("/update").await;
        h.transport.fail_edits_with(403);

        let query = CallbackQuery {
            id: "cb".to_string(),
            message: Some(MENU),
            action: Ok(CallbackAction::Project(1)),
        };
        let result = h.session.handle(Event::new(USER, CHAT, Trigger::Callback(query))).await;
        assert!(result.is_err());
        assert_eq!(h.transport.answers().len(), 1);
        assert_eq!(*h.state(), ConversationState::BrowsingProjects { page: 0 });
    }

    #[tokio::test]
    async fn test_unrecognized_input_keeps_state() {
        let mut h = Harness::new(MockBackend::new());
        h.text("hello there").await;
        assert_eq!(*h.state(), ConversationState::Idle);
        assert_eq!(h.transport.last_text().as_deref(), Some(render::FALLBACK));

        h.text("/idea").await;
        h.text("/frobnicate").await;
        assert_eq!(*h.state(), ConversationState::AwaitingIdea);
        assert_eq!(h.transport.last_text().as_deref(), Some(render::FALLBACK));
    }

    #[tokio::test]
    async fn test_help_and_report_do_not_transition() {
        let mut h = Harness::new(MockBackend::with_projects(vec![project(1, 2)]));
        h.text("/start").await;
        h.text("/help").await;
        assert_eq!(*h.state(), ConversationState::AwaitingName { email: None });

        h.text("/report").await;
        assert_eq!(*h.state(), ConversationState::AwaitingName { email: None });
        assert!(h.transport.last_text().unwrap().starts_with("📊 Progress: <b>0%</b>"));

        h.text("/projects").await;
        assert_eq!(*h.state(), ConversationState::AwaitingName { email: None });
        assert!(h.transport.last_text().unwrap().contains("<b>Project 1</b>"));
    }
}
