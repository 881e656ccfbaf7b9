//! # TaskActor: fire loop of one scheduled task.
//!
//! ```text
//! loop {
//!   ├─► delay = schedule.delay_from_now()      (None → stop)
//!   ├─► status = Scheduled
//!   ├─► sleep(delay) | cancelled → break
//!   ├─► status = Running, publish TaskFiring
//!   ├─► block_in_place(task.invoke(ctx))       (panic → TaskError::Panicked)
//!   │     ├─► Ok  → publish TaskCompleted
//!   │     └─► Err → warn!, publish TaskFailed  (schedule kept)
//!   └─► status = Completed
//! }
//! status = Cancelled, publish TaskCancelled
//! ```
//!
//! ## Rules
//! - Fires of one task run sequentially; the next delay is computed only
//!   after the previous fire returned.
//! - A failing or panicking fire never ends the loop.
//! - Cancellation is observed while sleeping; an in-flight fire finishes.

use std::sync::Arc;
use std::time::Instant;

use tokio::select;
use tracing::warn;

use crate::events::{Bus, Event, EventKind};
use crate::tasks::{Task, TaskContext, TaskStatus};

pub(crate) struct TaskActor {
    task: Arc<Task>,
    bus: Bus,
}

impl TaskActor {
    pub(crate) fn new(task: Arc<Task>, bus: Bus) -> Self {
        Self { task, bus }
    }

    /// Runs on a cron pool worker (multi-thread runtime required).
    pub(crate) async fn run(self) {
        let token = self.task.handle().token().clone();

        loop {
            if token.is_cancelled() {
                break;
            }
            let Some(delay) = self.task.schedule().delay_from_now() else {
                warn!(task = self.task.name(), "schedule has no further fire time");
                break;
            };
            self.task.set_status(TaskStatus::Scheduled);

            select! {
                _ = tokio::time::sleep(delay) => {}
                _ = token.cancelled() => break,
            }

            self.fire();
        }

        self.task.set_status(TaskStatus::Cancelled);
        self.bus
            .publish(Event::new(EventKind::TaskCancelled).with_task(self.task.shared_name()));
    }

    fn fire(&self) {
        let task = &self.task;
        let fire = task.begin_fire();
        task.set_status(TaskStatus::Running);
        self.bus.publish(
            Event::new(EventKind::TaskFiring)
                .with_task(task.shared_name())
                .with_fire(fire),
        );

        let ctx = TaskContext::new(task.shared_name(), fire, task.handle().clone());
        let started = Instant::now();
        let res = tokio::task::block_in_place(|| task.invoke(&ctx));

        match res {
            Ok(()) => self.bus.publish(
                Event::new(EventKind::TaskCompleted)
                    .with_task(task.shared_name())
                    .with_fire(fire)
                    .with_elapsed(started.elapsed()),
            ),
            Err(err) => {
                warn!(task = task.name(), fire, error = %err, label = err.as_label(), "task fire failed");
                self.bus.publish(
                    Event::new(EventKind::TaskFailed)
                        .with_task(task.shared_name())
                        .with_fire(fire)
                        .with_reason(err.as_message()),
                );
            }
        }
        task.set_status(TaskStatus::Completed);
    }
}
