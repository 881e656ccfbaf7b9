use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::debug;

/// Runtime check for the high-performance event-notification backend.
pub trait CapabilityProbe: Send + Sync {
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// `Ok(true)` when the backend is usable on this host.
    fn probe(&self) -> io::Result<bool>;
}

/// Probes the running kernel for epoll support.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsProbe;

impl CapabilityProbe for OsProbe {
    fn name(&self) -> &'static str {
        "os"
    }

    #[cfg(target_os = "linux")]
    fn probe(&self) -> io::Result<bool> {
        std::fs::metadata("/proc/sys/fs/epoll/max_user_watches").map(|_| true)
    }

    #[cfg(not(target_os = "linux"))]
    fn probe(&self) -> io::Result<bool> {
        Ok(false)
    }
}

/// Runs the probe; errors and panics read as "unavailable".
pub fn backend_available(probe: &dyn CapabilityProbe) -> bool {
    match catch_unwind(AssertUnwindSafe(|| probe.probe())) {
        Ok(Ok(available)) => available,
        Ok(Err(err)) => {
            debug!(probe = probe.name(), error = %err, "capability probe failed; using portable backend");
            false
        }
        Err(_) => {
            debug!(probe = probe.name(), "capability probe panicked; using portable backend");
            false
        }
    }
}
