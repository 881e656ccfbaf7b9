//! # LogWriter: events rendered through `tracing`.
//!
//! Lifecycle events log at `info`, failures and drops at `warn`, per-fire
//! chatter at `debug`.
//!
//! ```text
//! INFO  server started addr=127.0.0.1:9000 elapsed_ms=41 backend=epoll
//! WARN  task fire failed task=task-0 fire=3 reason="error: disk full"
//! DEBUG task fired task=report fire=12 elapsed_ms=3
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let task = e.task.as_deref().unwrap_or("-");
        let component = e.component.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::ServerStarting => info!(seq = e.seq, "server starting"),
            EventKind::ServerStarted => info!(
                addr = ?e.addr,
                elapsed_ms = e.elapsed_ms,
                backend = reason,
                "server started"
            ),
            EventKind::ShutdownRequested => info!(source = reason, "shutdown requested"),
            EventKind::ShutdownCompleted => {
                info!(elapsed_ms = e.elapsed_ms, "shutdown completed")
            }
            EventKind::TaskScheduled => info!(task, schedule = reason, "task scheduled"),
            EventKind::TaskFiring => debug!(task, fire = e.fire, "task firing"),
            EventKind::TaskCompleted => {
                debug!(task, fire = e.fire, elapsed_ms = e.elapsed_ms, "task fired")
            }
            EventKind::TaskFailed => warn!(task, fire = e.fire, reason, "task fire failed"),
            EventKind::TaskCancelled => info!(task, "task cancelled"),
            EventKind::TaskRejected => warn!(task, reason, "task rejected"),
            EventKind::ComponentRegistered => debug!(component, roles = reason, "component registered"),
            EventKind::ComponentSkipped => warn!(component, reason, "component skipped"),
            EventKind::SubscriberOverflow => {
                warn!(subscriber = component, reason, "subscriber dropped an event")
            }
            EventKind::SubscriberPanicked => {
                warn!(subscriber = component, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }

    fn queue_capacity(&self) -> usize {
        4096
    }
}
