//! # Housekeeping loop.
//!
//! A single-threaded tokio runtime on its own OS thread (`schedule@loop`),
//! isolated from the acceptor, I/O and cron pools. It hosts low-frequency
//! periodic work: session expiry, the environment watcher, the shutdown
//! signal hook and the event subscriber fan-out.
//!
//! ```text
//! Housekeeping::start ──► thread "schedule@loop"
//!                            └─ block_on(stop) ──► await drains ──► exit
//!   spawn_job / every ──► cancelled by cancel_jobs()
//!   spawn_drain        ──► awaited (bounded) after stop(), joined only when waiting
//! ```

use std::future::Future;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::runtime::{Builder, Handle};
use tokio::task::JoinHandle as TaskHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Session expiry period.
pub const SESSION_CLEAN_INTERVAL: Duration = Duration::from_millis(1000);
/// Environment file poll period.
pub const ENV_WATCH_INTERVAL: Duration = Duration::from_millis(1000);

const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Session store hook driven by the housekeeping loop.
pub trait SessionManager: Send + Sync + 'static {
    /// Removes expired sessions.
    fn clean_expired(&self);
}

pub(crate) struct Housekeeping {
    handle: Handle,
    jobs: CancellationToken,
    stop: CancellationToken,
    drains: Arc<Mutex<Vec<TaskHandle<()>>>>,
    thread: Option<JoinHandle<()>>,
    thread_id: ThreadId,
}

impl Housekeeping {
    pub(crate) fn start() -> io::Result<Self> {
        let rt = Builder::new_current_thread().enable_all().build()?;
        let handle = rt.handle().clone();
        let stop = CancellationToken::new();
        let drains: Arc<Mutex<Vec<TaskHandle<()>>>> = Arc::default();

        let token = stop.clone();
        let pending = Arc::clone(&drains);
        let thread = thread::Builder::new()
            .name("schedule@loop".into())
            .spawn(move || {
                rt.block_on(async move {
                    token.cancelled().await;
                    let drains = std::mem::take(&mut *pending.lock());
                    for drain in drains {
                        if tokio::time::timeout(DRAIN_TIMEOUT, drain).await.is_err() {
                            warn!("housekeeping drain timed out");
                        }
                    }
                });
                rt.shutdown_background();
            })?;

        Ok(Self {
            handle,
            jobs: CancellationToken::new(),
            stop,
            drains,
            thread_id: thread.thread().id(),
            thread: Some(thread),
        })
    }

    /// Token cancelled by [`stop`](Self::stop); for long-lived drains.
    pub(crate) fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Spawns a job that is dropped on [`cancel_jobs`](Self::cancel_jobs).
    pub(crate) fn spawn_job<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let jobs = self.jobs.clone();
        self.handle.spawn(async move {
            tokio::select! {
                biased;
                _ = jobs.cancelled() => {}
                _ = fut => {}
            }
        });
    }

    /// Runs `f` every `period`, the first time after one period.
    pub(crate) fn every<F>(&self, label: &'static str, period: Duration, f: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.spawn_job(async move {
            loop {
                tokio::time::sleep(period).await;
                if catch_unwind(AssertUnwindSafe(|| f())).is_err() {
                    warn!(job = label, "housekeeping job panicked");
                }
            }
        });
    }

    /// Spawns a future that [`stop`](Self::stop) waits for (bounded).
    pub(crate) fn spawn_drain<F>(&self, fut: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = self.handle.spawn(fut);
        self.drains.lock().push(handle);
    }

    /// Cancels periodic jobs; drains keep running.
    pub(crate) fn cancel_jobs(&self) {
        self.jobs.cancel();
    }

    /// Stops the loop. With `wait` the thread is joined, unless called from
    /// that thread; without it the thread finishes its drains detached.
    pub(crate) fn stop(mut self, wait: bool) {
        self.jobs.cancel();
        self.stop.cancel();
        if let Some(thread) = self.thread.take() {
            if !wait {
                return;
            }
            if thread::current().id() == self.thread_id {
                debug!("housekeeping stopped from its own thread; not joining");
                return;
            }
            if thread.join().is_err() {
                warn!("housekeeping thread panicked");
            }
        }
    }
}

impl Drop for Housekeeping {
    fn drop(&mut self) {
        self.jobs.cancel();
        self.stop.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn periodic_job_runs_until_cancelled() {
        let hk = Housekeeping::start().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        hk.every("count", Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        thread::sleep(Duration::from_millis(200));
        hk.cancel_jobs();
        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 3, "ran {seen} times");

        thread::sleep(Duration::from_millis(100));
        assert!(runs.load(Ordering::SeqCst) <= seen + 1);
        hk.stop(true);
    }

    #[test]
    fn panicking_job_keeps_its_period() {
        let hk = Housekeeping::start().unwrap();
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        hk.every("flaky", Duration::from_millis(20), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            panic!("session store unavailable");
        });
        thread::sleep(Duration::from_millis(200));
        assert!(runs.load(Ordering::SeqCst) >= 3);
        hk.stop(true);
    }

    #[test]
    fn drains_finish_before_stop_returns() {
        let hk = Housekeeping::start().unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&done);
        let stop = hk.stop_token();
        hk.spawn_drain(async move {
            stop.cancelled().await;
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(1, Ordering::SeqCst);
        });
        hk.stop(true);
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stop_without_wait_leaves_drains_running() {
        let hk = Housekeeping::start().unwrap();
        let done = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&done);
        let stop = hk.stop_token();
        hk.spawn_drain(async move {
            stop.cancelled().await;
            tokio::time::sleep(Duration::from_millis(500)).await;
            flag.store(1, Ordering::SeqCst);
        });

        let began = std::time::Instant::now();
        hk.stop(false);
        assert!(began.elapsed() < Duration::from_millis(250));
        assert_eq!(done.load(Ordering::SeqCst), 0);

        thread::sleep(Duration::from_millis(1000));
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }
}
