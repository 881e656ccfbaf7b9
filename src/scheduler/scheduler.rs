//! # TaskScheduler: explicit scheduling context.
//!
//! Owns the cron pool and every submitted [`Task`]. Cheap to clone; all
//! clones share one pool and one task table.
//!
//! ## Lifecycle
//! ```text
//! new() ──► initialize(n) ──► submit(task)* ──► shutdown()
//!              │  (2nd call: no-op)   │               │
//!              ▼                      ▼               ▼
//!         CronPool(task@N)     TaskActor::run    cancel all, stop pool
//! ```
//!
//! ## Rules
//! - `submit` before `initialize` → [`ScheduleError::NotInitialized`]
//! - `submit` after `shutdown` → [`ScheduleError::ShutDown`]
//! - names are unique among tasks that are not cancelled
//! - `shutdown` does not wait for in-flight fires

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Local;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::ScheduleError;
use crate::events::{Bus, Event, EventKind};
use crate::scheduler::actor::TaskActor;
use crate::scheduler::pool::CronPool;
use crate::tasks::{Task, TaskHandle, TaskStatus};

/// Point-in-time view of one task.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TaskInfo {
    pub name: String,
    pub schedule: String,
    pub status: TaskStatus,
    pub fires: u64,
}

/// Scheduling context for recurring tasks.
#[derive(Clone, Default)]
pub struct TaskScheduler {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    pool: Mutex<Option<Arc<CronPool>>>,
    tasks: RwLock<HashMap<String, Arc<Task>>>,
    closed: AtomicBool,
    bus: Bus,
}

impl TaskScheduler {
    /// Creates an uninitialised scheduler with a private event bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an uninitialised scheduler that publishes to `bus`.
    pub fn with_bus(bus: Bus) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus,
                ..Inner::default()
            }),
        }
    }

    /// Builds the cron pool once; later calls return the existing pool size.
    pub fn initialize(&self, pool_size: usize) -> io::Result<usize> {
        let mut pool = self.inner.pool.lock();
        if let Some(existing) = pool.as_ref() {
            debug!(size = existing.size(), "task pool already initialized");
            return Ok(existing.size());
        }
        let built = CronPool::build(pool_size)?;
        let size = built.size();
        *pool = Some(Arc::new(built));
        info!(size, "task pool initialized");
        Ok(size)
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.pool.lock().is_some()
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Registers the task and starts its fire loop on the pool.
    pub fn submit(&self, task: Task) -> Result<TaskHandle, ScheduleError> {
        match self.try_submit(task) {
            Ok(handle) => Ok(handle),
            Err((name, err)) => {
                self.inner.bus.publish(
                    Event::new(EventKind::TaskRejected)
                        .with_task(name)
                        .with_reason(err.as_message()),
                );
                Err(err)
            }
        }
    }

    fn try_submit(&self, task: Task) -> Result<TaskHandle, (String, ScheduleError)> {
        let name = task.name().to_string();
        if self.is_shut_down() {
            return Err((name, ScheduleError::ShutDown));
        }
        let pool = self
            .inner
            .pool
            .lock()
            .clone()
            .ok_or_else(|| (name.clone(), ScheduleError::NotInitialized))?;

        if task.schedule().next_fire(&Local::now()).is_none() {
            let schedule = task.schedule().to_string();
            return Err((name, ScheduleError::NoFutureFire { schedule }));
        }

        let task = Arc::new(task);
        {
            let mut tasks = self.inner.tasks.write();
            if tasks
                .get(&name)
                .is_some_and(|existing| !existing.handle().is_cancelled())
            {
                return Err((name.clone(), ScheduleError::DuplicateName { name }));
            }
            tasks.insert(name.clone(), Arc::clone(&task));
        }

        task.set_status(TaskStatus::Scheduled);
        let handle = task.handle().clone();
        self.inner.bus.publish(
            Event::new(EventKind::TaskScheduled)
                .with_task(task.shared_name())
                .with_reason(task.schedule().to_string()),
        );
        pool.spawn(TaskActor::new(task, self.inner.bus.clone()).run());
        Ok(handle)
    }

    /// Names of every known task, sorted.
    pub fn tasks(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.tasks.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn task(&self, name: &str) -> Option<TaskInfo> {
        self.inner.tasks.read().get(name).map(|task| TaskInfo {
            name: task.name().to_string(),
            schedule: task.schedule().to_string(),
            status: task.status(),
            fires: task.fire_count(),
        })
    }

    /// Cancels the named task. Returns `false` if it is unknown or already cancelled.
    pub fn cancel(&self, name: &str) -> bool {
        match self.inner.tasks.read().get(name) {
            Some(task) if !task.handle().is_cancelled() => {
                task.handle().cancel();
                true
            }
            _ => false,
        }
    }

    /// Refuses new submissions, cancels every task and stops the pool.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        for task in self.inner.tasks.read().values() {
            task.handle().cancel();
            task.set_status(TaskStatus::Cancelled);
        }
        if let Some(pool) = self.inner.pool.lock().take() {
            pool.shutdown();
        }
        debug!("task scheduler shut down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cron::Schedule;
    use crate::error::TaskError;
    use std::sync::atomic::AtomicU64;
    use std::time::{Duration, Instant};

    fn every(ms: u64) -> Schedule {
        Schedule::FixedDelay(Duration::from_millis(ms))
    }

    fn wait_for(mut cond: impl FnMut() -> bool, within: Duration) -> bool {
        let deadline = Instant::now() + within;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        cond()
    }

    #[test]
    fn submit_requires_initialize() {
        let scheduler = TaskScheduler::new();
        let err = scheduler
            .submit(Task::new("t", every(10), |_| Ok(())))
            .unwrap_err();
        assert_eq!(err, ScheduleError::NotInitialized);
    }

    #[test]
    fn initialize_is_idempotent() {
        let scheduler = TaskScheduler::new();
        assert_eq!(scheduler.initialize(2).unwrap(), 2);
        assert_eq!(scheduler.initialize(8).unwrap(), 2);
        scheduler.shutdown();
    }

    #[test]
    fn failing_task_keeps_firing() {
        let scheduler = TaskScheduler::new();
        scheduler.initialize(2).unwrap();
        let attempts = Arc::new(AtomicU64::new(0));
        let seen = Arc::clone(&attempts);
        scheduler
            .submit(Task::new("flaky", every(20), move |_| {
                seen.fetch_add(1, Ordering::SeqCst);
                Err(TaskError::fail("always broken"))
            }))
            .unwrap();

        assert!(wait_for(|| attempts.load(Ordering::SeqCst) >= 5, Duration::from_secs(3)));
        let info = scheduler.task("flaky").unwrap();
        assert!(info.fires >= 5);
        assert_ne!(info.status, TaskStatus::Cancelled);
        scheduler.shutdown();
    }

    #[test]
    fn panicking_task_does_not_starve_neighbours() {
        let scheduler = TaskScheduler::new();
        scheduler.initialize(2).unwrap();
        let healthy = Arc::new(AtomicU64::new(0));
        let h = Arc::clone(&healthy);
        scheduler
            .submit(Task::new("panics", every(15), |_| panic!("bad job")))
            .unwrap();
        scheduler
            .submit(Task::new("healthy", every(15), move |_| {
                h.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        assert!(wait_for(|| healthy.load(Ordering::SeqCst) >= 3, Duration::from_secs(3)));
        assert!(wait_for(
            || scheduler.task("panics").is_some_and(|t| t.fires >= 3),
            Duration::from_secs(3)
        ));
        scheduler.shutdown();
    }

    #[test]
    fn fires_of_one_task_never_overlap() {
        let scheduler = TaskScheduler::new();
        scheduler.initialize(4).unwrap();
        let running = Arc::new(AtomicU64::new(0));
        let overlap = Arc::new(AtomicBool::new(false));
        let (r, o) = (Arc::clone(&running), Arc::clone(&overlap));
        scheduler
            .submit(Task::new("slow", every(5), move |_| {
                if r.fetch_add(1, Ordering::SeqCst) > 0 {
                    o.store(true, Ordering::SeqCst);
                }
                std::thread::sleep(Duration::from_millis(30));
                r.fetch_sub(1, Ordering::SeqCst);
                Ok(())
            }))
            .unwrap();

        assert!(wait_for(
            || scheduler.task("slow").is_some_and(|t| t.fires >= 4),
            Duration::from_secs(3)
        ));
        assert!(!overlap.load(Ordering::SeqCst));
        scheduler.shutdown();
    }

    #[test]
    fn duplicate_names_rejected_until_cancelled() {
        let scheduler = TaskScheduler::new();
        scheduler.initialize(1).unwrap();
        scheduler.submit(Task::new("job", every(1_000), |_| Ok(()))).unwrap();

        let err = scheduler
            .submit(Task::new("job", every(1_000), |_| Ok(())))
            .unwrap_err();
        assert_eq!(err, ScheduleError::DuplicateName { name: "job".into() });

        assert!(scheduler.cancel("job"));
        assert!(!scheduler.cancel("job"));
        scheduler.submit(Task::new("job", every(1_000), |_| Ok(()))).unwrap();
        scheduler.shutdown();
    }

    #[test]
    fn impossible_cron_is_rejected() {
        let scheduler = TaskScheduler::new();
        scheduler.initialize(1).unwrap();
        let err = scheduler
            .submit(Task::new("never", Schedule::parse("0 0 0 30 2 ?").unwrap(), |_| Ok(())))
            .unwrap_err();
        assert!(matches!(err, ScheduleError::NoFutureFire { .. }));
        scheduler.shutdown();
    }

    #[test]
    fn shutdown_cancels_and_refuses() {
        let scheduler = TaskScheduler::new();
        scheduler.initialize(1).unwrap();
        let handle = scheduler.submit(Task::new("a", every(50), |_| Ok(()))).unwrap();

        scheduler.shutdown();
        scheduler.shutdown();

        assert!(handle.is_cancelled());
        assert_eq!(scheduler.task("a").unwrap().status, TaskStatus::Cancelled);
        let err = scheduler
            .submit(Task::new("b", every(50), |_| Ok(())))
            .unwrap_err();
        assert_eq!(err, ScheduleError::ShutDown);
        assert_eq!(scheduler.tasks(), vec!["a".to_string()]);
    }
}
