//! # Runtime events emitted by the orchestrator, scheduler and registrar.
//!
//! [`EventKind`] groups events into four families:
//! - **Server lifecycle**: starting, started, shutdown requested/completed
//! - **Task lifecycle**: scheduled, firing, completed, failed, cancelled, rejected
//! - **Component registration**: registered, skipped
//! - **Subscriber health**: overflow, panic
//!
//! ## Ordering guarantees
//! Each event carries a process-wide monotonic `seq`; use it to restore order
//! when subscribers receive events from different queues.
//!
//! ## Example
//! ```rust
//! use bootvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::TaskFailed)
//!     .with_task("task-0")
//!     .with_fire(3)
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::TaskFailed);
//! assert_eq!(ev.task.as_deref(), Some("task-0"));
//! assert_eq!(ev.fire, Some(3));
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Server lifecycle ===
    /// `start()` accepted; registration is about to begin.
    ServerStarting,

    /// Listener bound and tasks submitted.
    ///
    /// Sets:
    /// - `addr`: bound local address
    /// - `elapsed_ms`: startup duration
    /// - `reason`: chosen transport backend
    ServerStarted,

    /// First stop request observed (API call or OS signal).
    ///
    /// Sets:
    /// - `reason`: `"stop"`, `"stop_and_wait"` or the signal hook
    ShutdownRequested,

    /// Release sequence finished.
    ///
    /// Sets:
    /// - `elapsed_ms`: time spent releasing resources
    ShutdownCompleted,

    // === Task lifecycle ===
    /// Task accepted by the scheduler.
    ///
    /// Sets:
    /// - `task`: task name
    /// - `reason`: rendered schedule
    TaskScheduled,

    /// A fire is about to invoke the task body.
    ///
    /// Sets:
    /// - `task`, `fire` (1-based ordinal)
    TaskFiring,

    /// A fire returned `Ok`.
    ///
    /// Sets:
    /// - `task`, `fire`, `elapsed_ms`
    TaskCompleted,

    /// A fire returned an error or panicked; the task keeps its schedule.
    ///
    /// Sets:
    /// - `task`, `fire`, `reason`
    TaskFailed,

    /// Task stopped firing (handle cancelled or scheduler shut down).
    ///
    /// Sets:
    /// - `task`
    TaskCancelled,

    /// Submission refused.
    ///
    /// Sets:
    /// - `task`, `reason`
    TaskRejected,

    // === Component registration ===
    /// A class was classified and registered.
    ///
    /// Sets:
    /// - `component`: type name
    /// - `reason`: comma separated roles
    ComponentRegistered,

    /// A class or producer failed and was skipped.
    ///
    /// Sets:
    /// - `component`: type name
    /// - `reason`: failure message
    ComponentSkipped,

    // === Subscriber health ===
    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: `"full"` / `"closed"`
    SubscriberOverflow,

    /// Subscriber panicked while processing an event.
    ///
    /// Sets:
    /// - `component`: subscriber name
    /// - `reason`: panic message
    SubscriberPanicked,
}

impl EventKind {
    /// Stable snake_case label.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::ServerStarting => "server_starting",
            EventKind::ServerStarted => "server_started",
            EventKind::ShutdownRequested => "shutdown_requested",
            EventKind::ShutdownCompleted => "shutdown_completed",
            EventKind::TaskScheduled => "task_scheduled",
            EventKind::TaskFiring => "task_firing",
            EventKind::TaskCompleted => "task_completed",
            EventKind::TaskFailed => "task_failed",
            EventKind::TaskCancelled => "task_cancelled",
            EventKind::TaskRejected => "task_rejected",
            EventKind::ComponentRegistered => "component_registered",
            EventKind::ComponentSkipped => "component_skipped",
            EventKind::SubscriberOverflow => "subscriber_overflow",
            EventKind::SubscriberPanicked => "subscriber_panicked",
        }
    }
}

/// Runtime event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    pub kind: EventKind,

    pub task: Option<Arc<str>>,
    pub component: Option<Arc<str>>,
    pub reason: Option<Arc<str>>,
    /// 1-based fire ordinal of a task.
    pub fire: Option<u64>,
    pub elapsed_ms: Option<u64>,
    pub addr: Option<SocketAddr>,
}

impl Event {
    /// Creates an event with the current timestamp and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            task: None,
            component: None,
            reason: None,
            fire: None,
            elapsed_ms: None,
            addr: None,
        }
    }

    #[inline]
    pub fn with_task(mut self, task: impl Into<Arc<str>>) -> Self {
        self.task = Some(task.into());
        self
    }

    #[inline]
    pub fn with_component(mut self, component: impl Into<Arc<str>>) -> Self {
        self.component = Some(component.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_fire(mut self, fire: u64) -> Self {
        self.fire = Some(fire);
        self
    }

    /// Stores the duration in whole milliseconds.
    #[inline]
    pub fn with_elapsed(mut self, d: Duration) -> Self {
        self.elapsed_ms = Some(u64::try_from(d.as_millis()).unwrap_or(u64::MAX));
        self
    }

    #[inline]
    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = Some(addr);
        self
    }

    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_component(subscriber)
            .with_reason(reason)
    }

    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_component(subscriber)
            .with_reason(info)
    }

    /// Subscriber health events are never re-queued into the subscriber that produced them.
    #[inline]
    pub fn is_subscriber_health(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::ServerStarting);
        let b = Event::new(EventKind::ServerStarted);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn elapsed_is_truncated_to_millis() {
        let ev = Event::new(EventKind::TaskCompleted).with_elapsed(Duration::from_micros(2_500));
        assert_eq!(ev.elapsed_ms, Some(2));
    }
}
