use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::runtime::{Builder, Handle, Runtime};

use crate::transport::selector::TransportSelection;

/// Acceptor (`boss@N`) and I/O (`worker@N`) runtimes.
///
/// Dropping the groups shuts both runtimes down in the background.
pub struct EventLoopGroups {
    acceptor: Option<Runtime>,
    io: Option<Runtime>,
    acceptor_handle: Handle,
    io_handle: Handle,
}

impl EventLoopGroups {
    pub fn build(selection: &TransportSelection) -> io::Result<Self> {
        let acceptor = runtime("boss", selection.acceptor_threads)?;
        let io = runtime("worker", selection.io_threads)?;
        Ok(Self {
            acceptor_handle: acceptor.handle().clone(),
            io_handle: io.handle().clone(),
            acceptor: Some(acceptor),
            io: Some(io),
        })
    }

    pub fn acceptor(&self) -> &Handle {
        &self.acceptor_handle
    }

    pub fn io(&self) -> &Handle {
        &self.io_handle
    }

    /// Acceptor first, then I/O; returns immediately.
    pub fn shutdown_background(&mut self) {
        if let Some(rt) = self.acceptor.take() {
            rt.shutdown_background();
        }
        if let Some(rt) = self.io.take() {
            rt.shutdown_background();
        }
    }

    /// Acceptor first, then I/O; each waits up to `grace` for its tasks.
    ///
    /// Blocks the caller; must not run inside an async context.
    pub fn shutdown_timeout(&mut self, grace: Duration) {
        if let Some(rt) = self.acceptor.take() {
            rt.shutdown_timeout(grace);
        }
        if let Some(rt) = self.io.take() {
            rt.shutdown_timeout(grace);
        }
    }
}

impl Drop for EventLoopGroups {
    fn drop(&mut self) {
        self.shutdown_background();
    }
}

fn runtime(prefix: &'static str, threads: usize) -> io::Result<Runtime> {
    let next_id = AtomicUsize::new(0);
    Builder::new_multi_thread()
        .worker_threads(threads.max(1))
        .thread_name_fn(move || format!("{prefix}@{}", next_id.fetch_add(1, Ordering::Relaxed)))
        .enable_all()
        .build()
}
