//! # Scheduled tasks.
//!
//! - [`Task`] named unit of work with a [`Schedule`](crate::cron::Schedule) and live [`TaskStatus`]
//! - [`TaskHandle`] cancellation capability
//! - [`TaskContext`] per-fire context passed to the invocable
//! - [`TaskDefinition`] / [`Scheduled`] task methods discovered on components
//! - [`NameSequence`] `task-N` names for unnamed definitions

mod context;
mod definition;
mod handle;
mod task;

pub use context::TaskContext;
pub use definition::{NameSequence, Scheduled, TaskDefinition};
pub use handle::TaskHandle;
pub use task::{Invocable, Task, TaskStatus};
