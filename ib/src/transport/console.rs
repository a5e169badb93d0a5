//! Terminal transport for local use
//!
//! One local user talks to the bot through stdin. Messages are printed as
//! plain text and inline buttons are numbered; typing `#n` presses button
//! `n` of the most recent menu.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{LazyLock, Mutex};

use async_trait::async_trait;
use colored::Colorize;
use regex::Regex;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Markup, Transport, TransportError, UpdateSource};
use crate::domain::{ChatId, MessageRef, UserId};
use crate::nav::{Button, CallbackAction};
use crate::session::{CallbackQuery, Event, Trigger};
use crate::text::unescape_html;

/// The only user and chat on a console
pub const CONSOLE_USER: UserId = UserId(0);
pub const CONSOLE_CHAT: ChatId = ChatId(0);

static TAG_RE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"<[^>]+>").ok());

/// HTML-mode text as terminal text
pub fn plain_text(html: &str) -> String {
    let stripped = match TAG_RE.as_ref() {
        Some(re) => re.replace_all(html, "").into_owned(),
        None => html.to_string(),
    };
    unescape_html(&stripped)
}

/// Button rows as numbered lines, numbering across rows
fn numbered_buttons(rows: &[Vec<Button>]) -> Vec<String> {
    let mut n = 0;
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|b| {
                    n += 1;
                    format!("[#{}] {}", n, plain_text(&b.label))
                })
                .collect::<Vec<_>>()
                .join("  ")
        })
        .collect()
}

/// Latest inline menu, for resolving `#n`
struct ActiveMenu {
    message: MessageRef,
    buttons: Vec<Button>,
}

pub struct ConsoleTransport {
    input: tokio::sync::Mutex<mpsc::UnboundedReceiver<String>>,
    menu: Mutex<Option<ActiveMenu>>,
    next_message_id: AtomicI64,
    next_callback_id: AtomicU64,
}

impl ConsoleTransport {
    /// Start reading stdin on a dedicated thread
    pub fn new() -> Result<Self, TransportError> {
        let mut rl = DefaultEditor::new().map_err(|e| TransportError::Io(std::io::Error::other(e.to_string())))?;
        let (tx, rx) = mpsc::unbounded_channel();

        std::thread::spawn(move || {
            loop {
                match rl.readline(&format!("{} ", ">".bright_green())) {
                    Ok(line) => {
                        let input = line.trim();
                        if input.is_empty() {
                            continue;
                        }
                        let _ = rl.add_history_entry(input);
                        if tx.send(input.to_string()).is_err() {
                            break;
                        }
                    }
                    Err(ReadlineError::Interrupted) => {
                        println!("^C");
                        continue;
                    }
                    Err(ReadlineError::Eof) => {
                        println!();
                        break;
                    }
                    Err(err) => {
                        warn!(error = %err, "console: readline failed");
                        break;
                    }
                }
            }
        });

        Ok(Self::with_input(rx))
    }

    /// Console fed from a channel instead of stdin
    pub(crate) fn with_input(input: mpsc::UnboundedReceiver<String>) -> Self {
        Self {
            input: tokio::sync::Mutex::new(input),
            menu: Mutex::new(None),
            next_message_id: AtomicI64::new(1),
            next_callback_id: AtomicU64::new(1),
        }
    }

    pub fn print_welcome(&self) {
        println!();
        println!("{}", "IdeaBot console".bright_cyan().bold());
        println!(
            "Type {} to begin, {} to press a button, Ctrl+D to quit",
            "/start".yellow(),
            "#n".yellow()
        );
        println!();
    }

    fn remember_menu(&self, message: MessageRef, markup: &Markup) {
        if let Markup::Inline(rows) = markup
            && let Ok(mut menu) = self.menu.lock()
        {
            *menu = Some(ActiveMenu {
                message,
                buttons: rows.iter().flatten().cloned().collect(),
            });
        }
    }

    fn print_message(&self, text: &str, markup: &Markup) {
        println!("{}", plain_text(text));
        match markup {
            Markup::Inline(rows) => {
                for line in numbered_buttons(rows) {
                    println!("  {}", line.cyan());
                }
            }
            Markup::Reply(rows) => {
                let labels: Vec<&str> = rows.iter().flatten().map(String::as_str).collect();
                println!("{}", labels.join(" | ").dimmed());
            }
            Markup::None => {}
        }
        println!();
    }

    /// Turn one input line into an event
    ///
    /// `#n` becomes a press of button `n` of the latest menu; an unknown
    /// number yields no event.
    fn parse_line(&self, line: &str) -> Option<Event> {
        let Some(number) = line.strip_prefix('#') else {
            return Some(Event::text(CONSOLE_USER, CONSOLE_CHAT, line));
        };

        let index = number.trim().parse::<usize>().ok()?.checked_sub(1)?;
        let menu = self.menu.lock().ok()?;
        let active = menu.as_ref()?;
        let button = active.buttons.get(index)?;

        let id = self.next_callback_id.fetch_add(1, Ordering::SeqCst);
        let callback = CallbackQuery {
            id: format!("console-{}", id),
            message: Some(active.message),
            action: CallbackAction::decode(&button.data),
        };
        Some(Event::new(CONSOLE_USER, CONSOLE_CHAT, Trigger::Callback(callback)))
    }
}

#[async_trait]
impl Transport for ConsoleTransport {
    async fn send_message(&self, chat: ChatId, text: &str, markup: Markup) -> Result<MessageRef, TransportError> {
        let message = MessageRef::new(chat, self.next_message_id.fetch_add(1, Ordering::SeqCst));
        debug!(message_id = message.message_id, "send_message: called");
        self.print_message(text, &markup);
        self.remember_menu(message, &markup);
        Ok(message)
    }

    async fn edit_message(&self, target: &MessageRef, text: &str, markup: Markup) -> Result<(), TransportError> {
        debug!(message_id = target.message_id, "edit_message: called");
        println!("{}", format!("[edit #{}]", target.message_id).dimmed());
        self.print_message(text, &markup);
        self.remember_menu(*target, &markup);
        Ok(())
    }

    async fn send_typing(&self, _chat: ChatId) -> Result<(), TransportError> {
        println!("{}", "typing…".dimmed());
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str, text: Option<&str>, alert: bool) -> Result<(), TransportError> {
        debug!(callback_id, alert, "answer_callback: called");
        if let Some(text) = text {
            if alert {
                println!("{} {}", "!".bright_red().bold(), text.bright_red());
            } else {
                println!("{}", text.dimmed());
            }
        }
        Ok(())
    }
}

#[async_trait]
impl UpdateSource for ConsoleTransport {
    async fn next_events(&self) -> Result<Vec<Event>, TransportError> {
        let line = self.input.lock().await.recv().await.ok_or(TransportError::Closed)?;
        match self.parse_line(&line) {
            Some(event) => Ok(vec![event]),
            None => {
                println!("{}", "No such button.".yellow());
                Ok(Vec::new())
            }
        }
    }
}
