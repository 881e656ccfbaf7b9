//! # Task scheduler.
//!
//! - [`TaskScheduler`] explicit scheduling context (init, submit, lookups, shutdown)
//! - [`TaskInfo`] snapshot returned by lookups
//!
//! Internals: `pool` (dedicated `task@N` runtime) and `actor` (one fire
//! loop per task).

mod actor;
mod pool;
#[allow(clippy::module_inception)]
mod scheduler;

pub use scheduler::{TaskInfo, TaskScheduler};
