//! # Cron expression evaluator.
//!
//! Turns a schedule string into a recurrence that answers "when is the next
//! fire after T". Pure: no clocks are read except by
//! [`Schedule::delay_from_now`].
//!
//! ```text
//! "*/5 * * * * *"  ──► CronExpression ─┐
//!                                       ├─► Schedule ──► next_fire(t) > t
//! "1000"           ──► FixedDelay ─────┘
//! ```

mod expr;
mod field;
mod schedule;

pub use expr::{CronExpression, SEARCH_HORIZON_YEARS};
pub use schedule::Schedule;
