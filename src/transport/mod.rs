//! # Network transport.
//!
//! - [`CapabilityProbe`] / [`OsProbe`] runtime backend detection
//! - [`select_transport`] → [`TransportSelection`] backend, port reuse, pool sizes
//! - [`EventLoopGroups`] acceptor (`boss@N`) and I/O (`worker@N`) runtimes
//! - [`TlsSettings`] / [`build_server_config`] rustls context from PEM files
//! - [`bind_listener`] socket2 listener with backlog and reuse options
//! - [`ConnectionHandler`] / [`ServerStream`] seam to the HTTP layer

mod groups;
pub(crate) mod listener;
mod probe;
mod selector;
mod stream;
mod tls;

pub use groups::EventLoopGroups;
pub use listener::bind_listener;
pub use probe::{CapabilityProbe, OsProbe, backend_available};
pub use selector::{Backend, TransportSelection, select_transport};
pub use stream::{CloseHandler, ConnectionHandler, ServerStream};
pub use tls::{TlsSettings, build_server_config};
