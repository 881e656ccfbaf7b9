//! # Event subscribers.
//!
//! ```text
//! Server / TaskScheduler / Registrar ── publish ──► Bus
//!                                                    │
//!                        housekeeping loop ◄─────────┘
//!                               │
//!                         SubscriberSet
//!                     ┌─────────┼─────────┐
//!                 LogWriter   metrics   custom
//! ```
//!
//! Implement [`Subscribe`] and add it with
//! [`Application::subscribe`](crate::Application::subscribe).

mod log;
mod set;
mod subscribe;

pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscribe::Subscribe;
