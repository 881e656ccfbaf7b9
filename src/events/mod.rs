//! Runtime events: types and broadcast bus.
//!
//! - [`EventKind`], [`Event`] classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! Publishers: `Server` (lifecycle), `TaskScheduler` (task fires),
//! `Registrar` (component registration), `SubscriberSet` workers (health).
//! The only consumer is the housekeeping listener that feeds the
//! application's [`SubscriberSet`](crate::SubscriberSet).

mod bus;
mod event;

pub use bus::{Bus, DEFAULT_BUS_CAPACITY};
pub use event::{Event, EventKind};
