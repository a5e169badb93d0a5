//! Poll-and-dispatch loop
//!
//! Pulls events from an `UpdateSource` and hands each one to the session
//! registry until the source closes or shutdown is requested.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::session::SessionRegistry;
use crate::transport::{TransportError, UpdateSource};

/// First wait after a failed poll
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);

/// Longest wait between failed polls
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Why the loop stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// Shutdown was requested
    Shutdown,
    /// The source has no more events
    SourceClosed,
}

/// Run until the source closes or `shutdown` fires, then drain every session
pub async fn run(source: Arc<dyn UpdateSource>, registry: Arc<SessionRegistry>, shutdown: CancellationToken) -> ExitReason {
    info!("bot: started");
    let mut backoff = INITIAL_BACKOFF;

    let reason = loop {
        let polled = tokio::select! {
            biased;
            _ = shutdown.cancelled() => break ExitReason::Shutdown,
            polled = source.next_events() => polled,
        };

        match polled {
            Ok(events) => {
                backoff = INITIAL_BACKOFF;
                for event in events {
                    registry.dispatch(event).await;
                }
            }
            Err(TransportError::Closed) => break ExitReason::SourceClosed,
            Err(e) => {
                let wait = match &e {
                    TransportError::RateLimited { retry_after } => *retry_after,
                    _ => backoff,
                };
                warn!(error = %e, wait_ms = wait.as_millis() as u64, "bot: poll failed, backing off");
                backoff = (backoff * 2).min(MAX_BACKOFF);

                tokio::select! {
                    _ = shutdown.cancelled() => break ExitReason::Shutdown,
                    _ = tokio::time::sleep(wait) => {}
                }
            }
        }
    };

    debug!(?reason, "bot: loop ended, draining sessions");
    registry.shutdown().await;
    info!(?reason, "bot: stopped");
    reason
}
