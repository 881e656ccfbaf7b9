//! Dedicated cron thread pool.
//!
//! A multi-thread tokio runtime whose workers are named `task@N`. It is
//! isolated from the acceptor/I/O pools so a slow job cannot delay
//! connection handling.

use std::future::Future;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle, Runtime};

pub(crate) struct CronPool {
    runtime: Mutex<Option<Runtime>>,
    handle: Handle,
    size: usize,
}

impl CronPool {
    pub(crate) fn build(size: usize) -> io::Result<Self> {
        let size = size.max(1);
        let next_id = AtomicUsize::new(0);
        let runtime = Builder::new_multi_thread()
            .worker_threads(size)
            .thread_name_fn(move || format!("task@{}", next_id.fetch_add(1, Ordering::Relaxed)))
            .enable_time()
            .build()?;
        Ok(Self {
            handle: runtime.handle().clone(),
            runtime: Mutex::new(Some(runtime)),
            size,
        })
    }

    pub(crate) fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn spawn<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(fut);
    }

    /// Stops the workers without waiting for in-flight fires.
    pub(crate) fn shutdown(&self) {
        if let Some(runtime) = self.runtime.lock().take() {
            runtime.shutdown_background();
        }
    }
}

impl Drop for CronPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
