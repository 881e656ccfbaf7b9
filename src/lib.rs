//! # bootvisor
//!
//! **Bootvisor** boots and tears down an embedded application server: it
//! registers discovered components, binds the network transport, supervises
//! recurring cron/fixed-delay jobs and runs an ordered, exactly-once
//! shutdown.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ComponentClass   ComponentClass   ComponentClass
//!         └────────────────┼────────────────┘
//!                          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Server (bootstrap orchestrator)                                  │
//! │  - Registrar   (classify ─► registry / routes / loaders / tasks)  │
//! │  - Transport   (probe ─► backend, boss@N / worker@N, TLS, bind)   │
//! │  - Housekeeping loop (schedule@loop: sessions, env, signals)      │
//! │  - TaskScheduler (task@N cron pool)                               │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!   TaskActor          TaskActor          TaskActor      (one per task)
//!   sleep ─► fire      sleep ─► fire      sleep ─► fire
//!        │                  │                  │
//!        └──── TaskFiring / TaskCompleted / TaskFailed ────┐
//!                                                          ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                     Bus (broadcast channel)                       │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                           SubscriberSet ──► LogWriter, custom …
//! ```
//!
//! ### Lifecycle
//! ```text
//! NotStarted ──start()──► Starting ──► Running ──stop()/signal──► Stopping ──► Stopped
//!
//! start:   web settings ─► registration ─► routes ─► loaders ─► transport + bind
//!          ─► housekeeping ─► cron pool ─► submit tasks
//! release: shutdown listeners ─► periodic jobs ─► acceptor ─► io ─► cron pool
//! ```
//!
//! ## Features
//! | Area              | Description                                                | Key types / traits                      |
//! |-------------------|------------------------------------------------------------|-----------------------------------------|
//! | **Orchestration** | Ordered start, idempotent stop, join                       | [`Server`], [`Application`]             |
//! | **Components**    | Marker classification and registration                     | [`components::ComponentClass`], [`components::Registrar`] |
//! | **Scheduling**    | Cron and fixed-delay tasks on an isolated pool             | [`TaskScheduler`], [`cron::Schedule`]   |
//! | **Transport**     | Backend probe, socket options, TLS                         | [`transport::select_transport`]         |
//! | **Subscriber API**| Hook into runtime events                                   | [`Subscribe`]                           |
//! | **Errors**        | Typed errors by blast radius                               | [`BootError`], [`TaskError`]            |
//! | **Configuration** | Property store with TOML/properties loading                | [`config::Environment`]                 |
//!
//! ## Optional features
//! - `logging` (default): `tracing-subscriber` setup helpers in [`logging`].
//!
//! ## Example
//! ```rust,no_run
//! use bootvisor::components::ComponentClass;
//! use bootvisor::tasks::Scheduled;
//! use bootvisor::{Application, BootError, TaskError};
//!
//! #[derive(Default)]
//! struct Reports;
//!
//! impl Reports {
//!     fn flush(&self) -> Result<(), TaskError> {
//!         Ok(())
//!     }
//! }
//!
//! fn main() -> Result<(), BootError> {
//!     bootvisor::logging::init();
//!
//!     let server = Application::new()
//!         .set("server.port", "9000")
//!         .set("app.task.thread-count", "2")
//!         .scan(
//!             ComponentClass::builder(Reports::default)
//!                 .bean()
//!                 .scheduled("flush", Scheduled::fixed_delay(1_000), |r: &Reports, _ctx| r.flush())
//!                 .build(),
//!         )
//!         .start()?;
//!
//!     // SIGINT/SIGTERM run the same stop routine as `server.stop()`.
//!     server.join();
//!     Ok(())
//! }
//! ```

pub mod components;
pub mod config;
mod core;
pub mod cron;
mod error;
mod events;
pub mod logging;
pub mod scheduler;
mod subscribers;
pub mod tasks;
pub mod transport;

// ---- Public re-exports ----

pub use core::{
    Application, DEFAULT_STATICS, DEFAULT_STOP_GRACE, ENV_WATCH_INTERVAL, SESSION_CLEAN_INTERVAL, Server,
    ServerState, SessionManager, ShutdownListener, WebSettings, wait_for_shutdown_signal,
};
pub use error::{BootError, ComponentError, ScheduleError, TaskError};
pub use events::{Bus, DEFAULT_BUS_CAPACITY, Event, EventKind};
pub use scheduler::{TaskInfo, TaskScheduler};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
