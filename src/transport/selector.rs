//! # Transport selection.
//!
//! Pure decision from a probe result and requested pool sizes:
//!
//! | probe            | backend    | reuse_port |
//! |------------------|------------|------------|
//! | `Ok(true)`       | `Epoll`    | `true`     |
//! | `Ok(false)`/`Err`/panic | `Portable` | `false` |
//!
//! `io = 0` sizes the I/O pool to the available cores; `accept = 0` means 1.

use std::fmt;

use crate::transport::probe::{CapabilityProbe, backend_available};

/// Event-loop backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Backend {
    Epoll,
    Portable,
}

impl Backend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Backend::Epoll => "epoll",
            Backend::Portable => "portable",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of [`select_transport`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransportSelection {
    pub backend: Backend,
    pub reuse_port: bool,
    pub acceptor_threads: usize,
    pub io_threads: usize,
}

pub fn select_transport(
    probe: &dyn CapabilityProbe,
    requested_accept: usize,
    requested_io: usize,
) -> TransportSelection {
    let fast = backend_available(probe);
    TransportSelection {
        backend: if fast { Backend::Epoll } else { Backend::Portable },
        reuse_port: fast,
        acceptor_threads: requested_accept.max(1),
        io_threads: if requested_io == 0 {
            num_cpus::get()
        } else {
            requested_io
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    struct Fixed(bool);

    impl CapabilityProbe for Fixed {
        fn probe(&self) -> io::Result<bool> {
            Ok(self.0)
        }
    }

    struct Broken;

    impl CapabilityProbe for Broken {
        fn probe(&self) -> io::Result<bool> {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "no /proc"))
        }
    }

    struct Exploding;

    impl CapabilityProbe for Exploding {
        fn probe(&self) -> io::Result<bool> {
            panic!("probe bug")
        }
    }

    #[test]
    fn available_backend_enables_reuse_port() {
        let sel = select_transport(&Fixed(true), 1, 4);
        assert_eq!(sel.backend, Backend::Epoll);
        assert!(sel.reuse_port);
        assert_eq!(sel.io_threads, 4);
    }

    #[test]
    fn unavailable_backend_never_reuses_port() {
        for probe in [&Fixed(false) as &dyn CapabilityProbe, &Broken, &Exploding] {
            let sel = select_transport(probe, 1, 1);
            assert_eq!(sel.backend, Backend::Portable);
            assert!(!sel.reuse_port);
        }
    }

    #[test]
    fn selection_is_deterministic() {
        assert_eq!(select_transport(&Fixed(true), 2, 3), select_transport(&Fixed(true), 2, 3));
        assert_eq!(select_transport(&Fixed(false), 2, 3), select_transport(&Fixed(false), 2, 3));
    }

    #[test]
    fn zero_threads_pick_defaults() {
        let sel = select_transport(&Fixed(false), 0, 0);
        assert_eq!(sel.acceptor_threads, 1);
        assert_eq!(sel.io_threads, num_cpus::get());
    }
}
