//! # Listening socket and accept loop.
//!
//! ```text
//! bind_listener ──► socket2 (SO_REUSEADDR, SO_REUSEPORT?, backlog)
//!                        │ into std → tokio TcpListener (acceptor runtime)
//!                        ▼
//! accept_loop (boss@N) ──accept──► child options ──spawn──► io (worker@N)
//!      │                                                    ├─► TLS handshake?
//!      │                                                    └─► ConnectionHandler::handle
//!      └─ shutdown token / runtime drop ──► `closed` cancelled
//! ```

use std::io;
use std::net::{SocketAddr, TcpListener as StdTcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use socket2::{Domain, Protocol, SockRef, Socket, Type};
use tokio::net::{TcpListener, TcpStream};
use tokio::runtime::Handle;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::{ChildOptions, TransportConfig, keys};
use crate::error::BootError;
use crate::transport::stream::{ConnectionHandler, ServerStream};

/// Resolves and binds the configured address. Blocks until bound or failed.
pub fn bind_listener(config: &TransportConfig, reuse_port: bool) -> Result<StdTcpListener, BootError> {
    let authority = config.authority();
    let bind_err = |source: io::Error| BootError::Bind {
        addr: authority.clone(),
        source,
    };

    let addr = (config.address.as_str(), config.port)
        .to_socket_addrs()
        .map_err(bind_err)?
        .next()
        .ok_or_else(|| bind_err(io::Error::new(io::ErrorKind::AddrNotAvailable, "address resolved to nothing")))?;

    open(addr, config.backlog.unwrap_or(keys::DEFAULT_BACKLOG), reuse_port).map_err(bind_err)
}

fn open(addr: SocketAddr, backlog: i32, reuse_port: bool) -> io::Result<StdTcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    #[cfg(all(unix, not(any(target_os = "solaris", target_os = "illumos"))))]
    if reuse_port {
        socket.set_reuse_port(true)?;
    }
    #[cfg(not(all(unix, not(any(target_os = "solaris", target_os = "illumos")))))]
    let _ = reuse_port;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    socket.set_nonblocking(true)?;
    Ok(socket.into())
}

/// Everything the accept loop needs.
pub(crate) struct Acceptor {
    pub(crate) listener: StdTcpListener,
    pub(crate) io: Handle,
    pub(crate) handler: Arc<dyn ConnectionHandler>,
    pub(crate) tls: Option<TlsAcceptor>,
    pub(crate) child: ChildOptions,
}

impl Acceptor {
    /// Spawns the accept loop on `acceptor`. `closed` is cancelled when the loop ends
    /// for any reason, including the runtime being shut down.
    pub(crate) fn spawn(
        self,
        acceptor: &Handle,
        shutdown: CancellationToken,
        closed: CancellationToken,
    ) -> io::Result<()> {
        let listener = {
            let _guard = acceptor.enter();
            TcpListener::from_std(self.listener)?
        };
        let state = AcceptState {
            io: self.io,
            handler: self.handler,
            tls: self.tls,
            child: self.child,
        };
        acceptor.spawn(async move {
            let _closed = closed.drop_guard();
            state.run(listener, shutdown).await;
        });
        Ok(())
    }
}

struct AcceptState {
    io: Handle,
    handler: Arc<dyn ConnectionHandler>,
    tls: Option<TlsAcceptor>,
    child: ChildOptions,
}

impl AcceptState {
    async fn run(self, listener: TcpListener, shutdown: CancellationToken) {
        loop {
            let accepted = tokio::select! {
                _ = shutdown.cancelled() => break,
                accepted = listener.accept() => accepted,
            };
            match accepted {
                Ok((stream, peer)) => self.dispatch(stream, peer),
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    tokio::time::sleep(Duration::from_millis(50)).await;
                }
            }
        }
        debug!("accept loop stopped");
    }

    fn dispatch(&self, stream: TcpStream, peer: SocketAddr) {
        if let Err(err) = apply_child_options(&stream, self.child) {
            debug!(%peer, error = %err, "cannot apply socket options");
        }
        let handler = Arc::clone(&self.handler);
        let tls = self.tls.clone();
        self.io.spawn(async move {
            let stream = match tls {
                Some(acceptor) => match acceptor.accept(stream).await {
                    Ok(tls_stream) => ServerStream::Tls(Box::new(tls_stream)),
                    Err(err) => {
                        debug!(%peer, error = %err, "tls handshake failed");
                        return;
                    }
                },
                None => ServerStream::Plain(stream),
            };
            handler.handle(stream, peer).await;
        });
    }
}

fn apply_child_options(stream: &TcpStream, child: ChildOptions) -> io::Result<()> {
    stream.set_nodelay(child.tcp_nodelay)?;
    SockRef::from(stream).set_keepalive(child.so_keepalive)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binds_ephemeral_port_with_backlog() {
        let config = TransportConfig {
            address: "127.0.0.1".into(),
            port: 0,
            backlog: Some(16),
            ..TransportConfig::default()
        };
        let listener = bind_listener(&config, false).unwrap();
        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[test]
    fn port_in_use_is_a_bind_error() {
        let first = StdTcpListener::bind("127.0.0.1:0").unwrap();
        let config = TransportConfig {
            address: "127.0.0.1".into(),
            port: first.local_addr().unwrap().port(),
            ..TransportConfig::default()
        };
        let err = bind_listener(&config, false).unwrap_err();
        assert_eq!(err.as_label(), "boot_bind");
    }

    #[test]
    fn unresolvable_address_is_a_bind_error() {
        let config = TransportConfig {
            address: "no such host.invalid".into(),
            port: 0,
            ..TransportConfig::default()
        };
        assert!(matches!(bind_listener(&config, false), Err(BootError::Bind { .. })));
    }
}
