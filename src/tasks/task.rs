//! # Scheduled task entity.
//!
//! A [`Task`] bundles a unique name, a [`Schedule`], the invocable captured
//! at registration time, a [`TaskHandle`] and its live status.
//!
//! ## Status flow
//! ```text
//! Pending ──submit──► Scheduled ──fire──► Running ──► Completed ─┐
//!                         ▲                                      │
//!                         └──────────────next fire───────────────┘
//!        any state ──cancel/shutdown──► Cancelled (absorbing)
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use crate::cron::Schedule;
use crate::error::{TaskError, panic_message};
use crate::tasks::context::TaskContext;
use crate::tasks::handle::TaskHandle;

/// Closure fired by the scheduler.
pub type Invocable = Arc<dyn Fn(&TaskContext) -> Result<(), TaskError> + Send + Sync>;

/// Lifecycle status of a task.
#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending = 0,
    Scheduled = 1,
    Running = 2,
    Completed = 3,
    Cancelled = 4,
}

impl TaskStatus {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => TaskStatus::Pending,
            1 => TaskStatus::Scheduled,
            2 => TaskStatus::Running,
            3 => TaskStatus::Completed,
            _ => TaskStatus::Cancelled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Scheduled => "scheduled",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

/// A named, scheduled unit of work.
pub struct Task {
    name: Arc<str>,
    schedule: Schedule,
    invocable: Invocable,
    handle: TaskHandle,
    status: AtomicU8,
    fires: AtomicU64,
}

impl Task {
    /// Creates a pending task from a closure.
    ///
    /// # Example
    /// ```
    /// use bootvisor::cron::Schedule;
    /// use bootvisor::tasks::{Task, TaskStatus};
    ///
    /// let task = Task::new("cleanup", Schedule::parse("1000").unwrap(), |ctx| {
    ///     println!("fire #{}", ctx.fire());
    ///     Ok(())
    /// });
    /// assert_eq!(task.status(), TaskStatus::Pending);
    /// ```
    pub fn new<F>(name: impl Into<Arc<str>>, schedule: Schedule, f: F) -> Self
    where
        F: Fn(&TaskContext) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        Self::from_invocable(name, schedule, Arc::new(f))
    }

    pub fn from_invocable(name: impl Into<Arc<str>>, schedule: Schedule, invocable: Invocable) -> Self {
        Self {
            name: name.into(),
            schedule,
            invocable,
            handle: TaskHandle::new(),
            status: AtomicU8::new(TaskStatus::Pending as u8),
            fires: AtomicU64::new(0),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    pub fn handle(&self) -> &TaskHandle {
        &self.handle
    }

    pub fn status(&self) -> TaskStatus {
        TaskStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Number of fires started so far.
    pub fn fire_count(&self) -> u64 {
        self.fires.load(Ordering::Acquire)
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// Moves to `next` unless the task is already cancelled.
    pub(crate) fn set_status(&self, next: TaskStatus) {
        let _ = self
            .status
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |cur| {
                (cur != TaskStatus::Cancelled as u8).then_some(next as u8)
            });
    }

    /// Increments the fire counter and returns the new ordinal.
    pub(crate) fn begin_fire(&self) -> u64 {
        self.fires.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Runs the invocable once; panics become [`TaskError::Panicked`].
    pub(crate) fn invoke(&self, ctx: &TaskContext) -> Result<(), TaskError> {
        match catch_unwind(AssertUnwindSafe(|| (self.invocable)(ctx))) {
            Ok(res) => res,
            Err(payload) => Err(TaskError::Panicked {
                info: panic_message(payload.as_ref()),
            }),
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("status", &self.status())
            .field("fires", &self.fire_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn every_second() -> Schedule {
        Schedule::FixedDelay(Duration::from_secs(1))
    }

    #[test]
    fn cancelled_is_absorbing() {
        let task = Task::new("t", every_second(), |_| Ok(()));
        task.set_status(TaskStatus::Scheduled);
        task.set_status(TaskStatus::Cancelled);
        task.set_status(TaskStatus::Running);
        assert_eq!(task.status(), TaskStatus::Cancelled);
    }

    #[test]
    fn invoke_catches_panics() {
        let task = Task::new("p", every_second(), |_| panic!("boom"));
        let ctx = TaskContext::new(task.shared_name(), task.begin_fire(), task.handle().clone());
        match task.invoke(&ctx) {
            Err(TaskError::Panicked { info }) => assert_eq!(info, "boom"),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(task.fire_count(), 1);
    }

    #[test]
    fn context_stop_cancels_handle() {
        let task = Task::new("s", every_second(), |ctx| {
            ctx.stop();
            Ok(())
        });
        let ctx = TaskContext::new(task.shared_name(), 1, task.handle().clone());
        task.invoke(&ctx).unwrap();
        assert!(task.handle().is_cancelled());
    }
}
