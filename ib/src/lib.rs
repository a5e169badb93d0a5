//! IdeaBot - ideas in, roadmaps and task tracking out
//!
//! A chat assistant that turns a free-text idea into a short project plan,
//! stores it as a project with ordered tasks, and lets the user browse the
//! projects and change task statuses from inline menus.
//!
//! # Modules
//!
//! - [`session`] - per-user conversation state machine and worker registry
//! - [`roadmap`] - idea-to-roadmap pipeline with caching and fallback
//! - [`nav`] - paginated project/task/status menus and button payloads
//! - [`progress`] - animated progress message while a plan is generated
//! - [`backend`] - project/task collaborators (local or REST)
//! - [`transport`] - Telegram Bot API and terminal transports
//! - [`llm`] - text-generation provider clients
//! - [`cache`] - roadmap cache stores
//! - [`bot`] - poll-and-dispatch loop
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod backend;
pub mod bot;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod llm;
pub mod nav;
pub mod progress;
pub mod roadmap;
pub mod session;
pub mod text;
pub mod transport;

// Re-export commonly used types
pub use backend::{Backend, BackendError, HttpBackend, LocalBackend, create_backend};
pub use cache::{CacheError, CacheStore, FileCache, MemoryCache, NullCache, create_store};
pub use config::{BackendConfig, CacheConfig, Config, LlmConfig, ProgressConfig, SessionConfig, TelegramConfig};
pub use domain::{ChatId, CreatedProject, MessageRef, ProgressReport, Project, ProjectId, Task, TaskId, TaskStatus, UserId};
pub use llm::{AnthropicClient, CompletionRequest, CompletionResponse, LlmClient, LlmError, OpenAIClient, create_client};
pub use nav::{CallbackAction, CallbackError};
pub use progress::ProgressAnimator;
pub use roadmap::{RoadmapOrigin, RoadmapPipeline, RoadmapResult};
pub use session::{ConversationState, Event, Session, SessionDeps, SessionRegistry, Trigger};
pub use transport::{ConsoleTransport, Markup, TelegramTransport, Transport, TransportError, UpdateSource};
