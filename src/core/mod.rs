//! Bootstrap orchestrator.
//!
//! - [`application`]: the builder a server boots from;
//! - [`server`]: start/stop/join and the boot and release sequences;
//! - [`lifecycle`]: atomic server state machine;
//! - [`housekeeping`]: the dedicated low-frequency loop;
//! - [`shutdown`]: OS termination signals;
//! - `report`: startup log lines.

mod application;
mod housekeeping;
mod lifecycle;
mod report;
mod server;
mod shutdown;

pub use application::{Application, DEFAULT_STATICS, DEFAULT_STOP_GRACE, ShutdownListener, WebSettings};
pub use housekeeping::{ENV_WATCH_INTERVAL, SESSION_CLEAN_INTERVAL, SessionManager};
pub use lifecycle::ServerState;
pub use server::Server;
pub use shutdown::wait_for_shutdown_signal;
