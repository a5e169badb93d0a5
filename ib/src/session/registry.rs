//! One sequential worker per active user
//!
//! Events for a user are queued to that user's worker, so sessions proceed
//! in parallel while each one handles its own events in order.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::event::Event;
use super::machine::{Session, SessionDeps};
use crate::config::SessionConfig;
use crate::domain::UserId;

struct Worker {
    tx: mpsc::Sender<Event>,
    task: JoinHandle<()>,
}

/// Routes events to per-user session workers
pub struct SessionRegistry {
    deps: SessionDeps,
    idle_timeout: Duration,
    queue_depth: usize,
    workers: Mutex<HashMap<UserId, Worker>>,
}

impl SessionRegistry {
    pub fn new(deps: SessionDeps, config: &SessionConfig) -> Self {
        Self {
            deps,
            idle_timeout: config.idle_timeout(),
            queue_depth: config.queue_depth.max(1),
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Queue an event for its user, starting a worker when needed
    ///
    /// Waits only when that user's own queue is full.
    pub async fn dispatch(&self, event: Event) {
        debug!(user = %event.user, "dispatch: called");
        let mut event = event;

        // A worker may retire between lookup and send; one retry with a fresh worker
        for _ in 0..2 {
            let tx = self.sender_for(&event).await;
            match tx.send(event).await {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    debug!(user = %returned.user, "dispatch: worker retired, respawning");
                    event = returned;
                }
            }
        }
        warn!(user = %event.user, "dispatch: dropping event, no worker accepted it");
    }

    /// Number of workers still accepting events
    pub async fn active_sessions(&self) -> usize {
        self.workers.lock().await.values().filter(|w| !w.tx.is_closed()).count()
    }

    /// Stop accepting events and wait for every worker to drain its queue
    pub async fn shutdown(&self) {
        let workers: Vec<Worker> = self.workers.lock().await.drain().map(|(_, w)| w).collect();
        info!(count = workers.len(), "shutdown: stopping session workers");

        let tasks: Vec<JoinHandle<()>> = workers
            .into_iter()
            .map(|w| {
                drop(w.tx);
                w.task
            })
            .collect();

        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                warn!(error = %e, "shutdown: session worker failed");
            }
        }
    }

    async fn sender_for(&self, event: &Event) -> mpsc::Sender<Event> {
        let mut workers = self.workers.lock().await;
        // Drop workers that retired and finished draining
        workers.retain(|_, w| !(w.tx.is_closed() && w.task.is_finished()));
        if let Some(worker) = workers.get(&event.user)
            && !worker.tx.is_closed()
        {
            return worker.tx.clone();
        }

        debug!(user = %event.user, "sender_for: starting session worker");
        let (tx, rx) = mpsc::channel(self.queue_depth);
        let session = Session::new(event.user, event.chat, self.deps.clone());
        let task = tokio::spawn(run_worker(session, rx, self.idle_timeout));
        workers.insert(event.user, Worker { tx: tx.clone(), task });
        tx
    }
}

async fn run_worker(mut session: Session, mut rx: mpsc::Receiver<Event>, idle_timeout: Duration) {
    loop {
        match tokio::time::timeout(idle_timeout, rx.recv()).await {
            Ok(Some(event)) => session.process(event).await,
            Ok(None) => break,
            Err(_) => {
                // Refuse new events, then finish what is already queued
                rx.close();
                while let Ok(event) = rx.try_recv() {
                    session.process(event).await;
                }
                debug!("run_worker: idle timeout, retiring");
                break;
            }
        }
    }
}
