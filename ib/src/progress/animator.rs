//! Cancellable progress animation task

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ANIMATION_CAP, render_progress};
use crate::config::ProgressConfig;
use crate::domain::MessageRef;
use crate::transport::{Markup, Transport, TransportError};

/// Why an animation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopCause {
    Cancelled,
    /// A terminal transport error ended the animation early
    TransportFailed,
}

/// Summary returned when an animation has fully stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationOutcome {
    /// Successful edits
    pub edits: u32,
    pub last_percent: u8,
    pub stopped: StopCause,
}

/// Starts animations with shared settings
#[derive(Debug, Clone)]
pub struct ProgressAnimator {
    interval: Duration,
    min_step: u8,
    max_step: u8,
    bar_width: usize,
}

impl ProgressAnimator {
    pub fn new(interval: Duration, min_step: u8, max_step: u8, bar_width: usize) -> Self {
        Self {
            interval,
            min_step: min_step.min(max_step),
            max_step: min_step.max(max_step),
            bar_width,
        }
    }

    pub fn from_config(config: &ProgressConfig) -> Self {
        Self::new(
            Duration::from_millis(config.interval_ms),
            config.min_step,
            config.max_step,
            config.bar_width,
        )
    }

    pub fn bar_width(&self) -> usize {
        self.bar_width
    }

    /// Spawn an animation editing `target` until cancelled
    ///
    /// The first edit happens one interval after start.
    pub fn start(&self, transport: Arc<dyn Transport>, target: MessageRef) -> AnimationHandle {
        debug!(chat = %target.chat, message_id = target.message_id, "start: called");
        let token = CancellationToken::new();
        let task = tokio::spawn(animate(self.clone(), transport, target, token.clone()));
        AnimationHandle {
            token,
            task: Some(task),
        }
    }

    fn next_step(&self) -> u8 {
        rand::rng().random_range(self.min_step..=self.max_step)
    }
}

/// Owner's handle on a running animation
///
/// Dropping the handle cancels the animation without waiting for it.
pub struct AnimationHandle {
    token: CancellationToken,
    task: Option<JoinHandle<AnimationOutcome>>,
}

impl AnimationHandle {
    /// Stop the animation and wait until its task has exited
    ///
    /// After this returns no further edits are made to the message.
    pub async fn cancel(mut self) -> AnimationOutcome {
        debug!("cancel: called");
        self.token.cancel();
        let stopped = AnimationOutcome {
            edits: 0,
            last_percent: 0,
            stopped: StopCause::Cancelled,
        };
        match self.task.take() {
            Some(task) => match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(error = %e, "cancel: animation task failed");
                    stopped
                }
            },
            None => stopped,
        }
    }
}

impl Drop for AnimationHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn animate(
    settings: ProgressAnimator,
    transport: Arc<dyn Transport>,
    target: MessageRef,
    token: CancellationToken,
) -> AnimationOutcome {
    let mut outcome = AnimationOutcome {
        edits: 0,
        last_percent: 0,
        stopped: StopCause::Cancelled,
    };

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => return outcome,
            _ = tokio::time::sleep(settings.interval) => {}
        }

        let percent = outcome
            .last_percent
            .saturating_add(settings.next_step())
            .min(ANIMATION_CAP);

        // A started tick runs to completion so no request is left in flight
        let typing = transport.send_typing(target.chat).await;
        if token.is_cancelled() {
            return outcome;
        }
        if let Err(e) = typing {
            if stop_on(&e) {
                outcome.stopped = StopCause::TransportFailed;
                return outcome;
            }
            continue;
        }

        let text = render_progress(percent, settings.bar_width);
        let edit = transport.edit_message(&target, &text, Markup::None).await;
        match edit {
            Ok(()) => {
                outcome.edits += 1;
                outcome.last_percent = percent;
            }
            Err(e) if stop_on(&e) => {
                outcome.stopped = StopCause::TransportFailed;
                return outcome;
            }
            Err(_) => {}
        }
        if token.is_cancelled() {
            return outcome;
        }
    }
}

fn stop_on(error: &TransportError) -> bool {
    if error.is_terminal() {
        debug!(error = %error, "animate: terminal transport error, stopping");
        true
    } else {
        debug!(error = %error, "animate: transient transport error, skipping tick");
        false
    }
}
