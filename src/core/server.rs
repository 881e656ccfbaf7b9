//! # Server: boot and release sequence.
//!
//! ```text
//! start()
//!   ├─ report ─► web settings (template path, statics, context path)
//!   ├─ registration: classify + register every class ─► routes.register()
//!   │     ─► loaders pre_load ─► task discovery ─► loaders load
//!   ├─ transport: config ─► TLS ─► select backend ─► boss/worker pools ─► bind ─► accept loop
//!   ├─ housekeeping loop: subscribers, session cleaner, env watcher, signal hook
//!   └─ cron pool ─► submit tasks ─► ServerStarted
//!
//! stop() / stop_and_wait() / signal hook
//!   └─ begin_stop (exactly one caller) ─► release:
//!        shutdown listeners ─► periodic jobs ─► accept loop ─► boss ─► worker
//!        ─► cron pool ─► closed ─► ShutdownCompleted ─► housekeeping loop
//! ```
//!
//! ## Rules
//! - Tasks are submitted only after registration finished.
//! - A failing start releases what it acquired and returns the error.
//! - A stop requested while starting runs as soon as the start completes.
//! - `stop_and_wait` and `join` block the calling thread; do not call them
//!   from inside an async runtime.

use std::net::SocketAddr;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio_rustls::TlsAcceptor;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::components::{BeanRegistry, Loader, OrderedLoader, Registrar};
use crate::config::{TransportConfig, keys, thread_count};
use crate::core::application::Application;
use crate::core::housekeeping::{ENV_WATCH_INTERVAL, Housekeeping, SESSION_CLEAN_INTERVAL};
use crate::core::lifecycle::{Lifecycle, ServerState};
use crate::core::report;
use crate::core::shutdown::wait_for_shutdown_signal;
use crate::error::{BootError, panic_message};
use crate::events::{Event, EventKind};
use crate::scheduler::TaskScheduler;
use crate::subscribers::SubscriberSet;
use crate::tasks::{NameSequence, Task, TaskDefinition};
use crate::transport::listener::Acceptor;
use crate::transport::{Backend, EventLoopGroups, bind_listener, build_server_config, select_transport};

/// Handle to one server instance. Clones share the instance.
#[derive(Clone)]
pub struct Server {
    inner: Arc<Inner>,
}

struct Inner {
    app: Application,
    state: Lifecycle,
    stop_pending: AtomicBool,
    resources: Mutex<Resources>,
    /// Cancelled when the accept loop ends.
    closed: CancellationToken,
    /// Cancelled when the release sequence finished.
    stopped: CancellationToken,
}

#[derive(Default)]
struct Resources {
    groups: Option<EventLoopGroups>,
    housekeeping: Option<Housekeeping>,
    accept_shutdown: Option<CancellationToken>,
    local_addr: Option<SocketAddr>,
    backend: Option<Backend>,
}

impl Server {
    pub fn new(app: Application) -> Self {
        Self {
            inner: Arc::new(Inner {
                app,
                state: Lifecycle::default(),
                stop_pending: AtomicBool::new(false),
                resources: Mutex::new(Resources::default()),
                closed: CancellationToken::new(),
                stopped: CancellationToken::new(),
            }),
        }
    }

    pub fn app(&self) -> &Application {
        &self.inner.app
    }

    pub fn state(&self) -> ServerState {
        self.inner.state.get()
    }

    /// Bound address (resolves ephemeral ports). `None` before bind.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.resources.lock().local_addr
    }

    pub fn backend(&self) -> Option<Backend> {
        self.inner.resources.lock().backend
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        self.inner.app.scheduler()
    }

    /// Runs the boot sequence. Blocks until the listener is bound and tasks are submitted.
    ///
    /// A server starts at most once; later calls fail with [`BootError::AlreadyStarted`].
    pub fn start(&self) -> Result<(), BootError> {
        if !self.inner.state.begin_start() {
            return Err(BootError::AlreadyStarted);
        }
        let began = Instant::now();
        match self.boot(began) {
            Ok(()) => {
                self.inner.state.mark_running();
                if self.inner.stop_pending.swap(false, Ordering::AcqRel) {
                    debug!("running deferred stop request");
                    self.request_stop(None, "deferred");
                }
                Ok(())
            }
            Err(err) => {
                error!(label = err.as_label(), error = %err, "server failed to start");
                if self.inner.state.abort_start() {
                    self.release(None, "start_failed");
                }
                Err(err)
            }
        }
    }

    /// Triggers shutdown without waiting for the network pools. Idempotent.
    pub fn stop(&self) {
        self.request_stop(None, "stop");
    }

    /// Shuts down and waits (up to the configured grace per pool). Idempotent;
    /// a caller that loses the race waits for the winner to finish.
    pub fn stop_and_wait(&self) {
        if self.state() == ServerState::NotStarted {
            return;
        }
        if !self.request_stop(Some(self.inner.app.stop_grace()), "stop_and_wait") {
            futures::executor::block_on(self.inner.stopped.cancelled());
        }
    }

    /// Blocks until the listening socket is closed.
    pub fn join(&self) {
        if self.state() == ServerState::NotStarted {
            return;
        }
        futures::executor::block_on(self.inner.closed.cancelled());
    }

    /// Returns `true` when this call ran the release sequence.
    fn request_stop(&self, grace: Option<Duration>, source: &'static str) -> bool {
        loop {
            if self.inner.state.begin_stop() {
                self.release(grace, source);
                return true;
            }
            if self.state() != ServerState::Starting {
                return false;
            }
            self.inner.stop_pending.store(true, Ordering::Release);
            if self.state() == ServerState::Starting {
                debug!(source, "stop deferred until start completes");
                return false;
            }
        }
    }

    fn boot(&self, began: Instant) -> Result<(), BootError> {
        let app = &self.inner.app;
        let events = app.bus().subscribe();
        app.bus().publish(Event::new(EventKind::ServerStarting));

        let web = app.resolve_web();
        report::startup(app, &web);

        let tasks = self.register_components()?;

        let config = TransportConfig::from_env(app.env())?;
        let tls = match &config.tls {
            Some(settings) => Some(TlsAcceptor::from(build_server_config(settings)?)),
            None => None,
        };
        let selection = select_transport(app.probe(), config.accept_threads, config.io_threads);
        debug!(
            backend = %selection.backend,
            reuse_port = selection.reuse_port,
            acceptors = selection.acceptor_threads,
            io = selection.io_threads,
            "transport selected"
        );
        let groups = EventLoopGroups::build(&selection).map_err(|source| BootError::Runtime {
            pool: "event_loop",
            source,
        })?;
        let listener = bind_listener(&config, selection.reuse_port)?;
        let bind_err = |source| BootError::Bind {
            addr: config.authority(),
            source,
        };
        let local_addr = listener.local_addr().map_err(bind_err)?;
        let accept_shutdown = CancellationToken::new();
        Acceptor {
            listener,
            io: groups.io().clone(),
            handler: app.connection_handler(),
            tls,
            child: config.child,
        }
        .spawn(groups.acceptor(), accept_shutdown.clone(), self.inner.closed.clone())
        .map_err(bind_err)?;
        {
            let mut res = self.inner.resources.lock();
            res.groups = Some(groups);
            res.accept_shutdown = Some(accept_shutdown);
            res.local_addr = Some(local_addr);
            res.backend = Some(selection.backend);
        }

        let housekeeping = Housekeeping::start().map_err(|source| BootError::Runtime {
            pool: "housekeeping",
            source,
        })?;
        self.start_housekeeping(&housekeeping, events);
        self.inner.resources.lock().housekeeping = Some(housekeeping);

        self.submit_tasks(tasks)?;

        let elapsed = began.elapsed();
        report::ready(local_addr, selection.backend, config.tls.is_some(), elapsed);
        app.bus().publish(
            Event::new(EventKind::ServerStarted)
                .with_addr(local_addr)
                .with_elapsed(elapsed)
                .with_reason(selection.backend.as_str()),
        );
        Ok(())
    }

    fn register_components(&self) -> Result<Vec<Task>, BootError> {
        let app = &self.inner.app;
        let mut registrar = Registrar::new(app.registry(), app.bus().clone());
        for loader in app.loaders() {
            registrar.add_loader(Arc::clone(loader));
        }
        {
            let mut routes = app.routes.lock();
            for class in app.classes() {
                registrar.register(class, &mut **routes);
            }
            routes.register();
        }
        let registration = registrar.finish();
        if let Some(handler) = registration.exception_handler {
            app.set_exception_handler(handler);
        }
        debug!(
            classes = app.classes().len(),
            loaders = registration.loaders.len(),
            tasks = registration.tasks.len(),
            "registration finished"
        );

        run_loaders(app, &registration.loaders, "pre_load", |l, app| l.pre_load(app));
        let tasks = discover_tasks(&registration.tasks, &app.registry())?;
        run_loaders(app, &registration.loaders, "load", |l, app| l.load(app));
        Ok(tasks)
    }

    fn start_housekeeping(&self, hk: &Housekeeping, events: tokio::sync::broadcast::Receiver<Event>) {
        let app = &self.inner.app;

        let subscribers = app.subscribers();
        let bus = app.bus().clone();
        let stop = hk.stop_token();
        hk.spawn_drain(async move {
            SubscriberSet::new(subscribers, bus).listen(events, stop).await;
        });

        if let Some(sessions) = app.session_manager() {
            hk.every("session-cleaner", SESSION_CLEAN_INTERVAL, move || sessions.clean_expired());
        }

        let env = app.env().clone();
        if env.get_bool_or(keys::APP_WATCH_ENV, false) {
            if env.source().is_some() {
                hk.every("env-watcher", ENV_WATCH_INTERVAL, move || match env.reload() {
                    Ok(true) => info!("environment reloaded"),
                    Ok(false) => {}
                    Err(err) => warn!(label = err.as_label(), error = %err, "environment reload failed"),
                });
            } else {
                debug!("{} is set but the environment has no source file", keys::APP_WATCH_ENV);
            }
        }

        if app.signal_hook() {
            let server: Weak<Inner> = Arc::downgrade(&self.inner);
            hk.spawn_job(async move {
                match wait_for_shutdown_signal().await {
                    Ok(signal) => {
                        info!(signal, "shutdown signal received");
                        let Some(inner) = server.upgrade() else {
                            return;
                        };
                        let spawned = thread::Builder::new()
                            .name("shutdown-hook".into())
                            .spawn(move || {
                                Server { inner }.request_stop(None, "signal");
                            });
                        if let Err(err) = spawned {
                            warn!(error = %err, "cannot spawn shutdown hook");
                        }
                    }
                    Err(err) => warn!(error = %err, "cannot install shutdown signal handlers"),
                }
            });
        }
    }

    fn submit_tasks(&self, tasks: Vec<Task>) -> Result<(), BootError> {
        if tasks.is_empty() {
            return Ok(());
        }
        let scheduler = self.scheduler();
        let size = thread_count(
            self.inner.app.env(),
            keys::APP_TASK_THREAD_COUNT,
            keys::default_task_threads(),
        )?;
        let size = scheduler
            .initialize(size)
            .map_err(|source| BootError::Runtime { pool: "task", source })?;
        debug!(threads = size, tasks = tasks.len(), "task pool ready");

        for task in tasks {
            let name = task.name().to_string();
            if let Err(err) = scheduler.submit(task) {
                warn!(task = %name, label = err.as_label(), error = %err, "task skipped");
            }
        }
        Ok(())
    }

    /// The release sequence. Runs once per server.
    fn release(&self, grace: Option<Duration>, source: &'static str) {
        let began = Instant::now();
        let app = &self.inner.app;
        info!(source, "server stopping");
        app.bus()
            .publish(Event::new(EventKind::ShutdownRequested).with_reason(source));

        let (groups, housekeeping, accept_shutdown) = {
            let mut res = self.inner.resources.lock();
            (res.groups.take(), res.housekeeping.take(), res.accept_shutdown.take())
        };

        for listener in app.shutdown_listeners() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| listener())) {
                warn!(error = %panic_message(payload.as_ref()), "shutdown listener panicked");
            }
        }
        if let Some(hk) = &housekeeping {
            hk.cancel_jobs();
        }
        if let Some(token) = accept_shutdown {
            token.cancel();
        }
        if let Some(mut groups) = groups {
            let in_runtime = tokio::runtime::Handle::try_current().is_ok();
            match grace {
                Some(grace) if !in_runtime => groups.shutdown_timeout(grace),
                _ => groups.shutdown_background(),
            }
        }
        app.scheduler().shutdown();
        self.inner.closed.cancel();

        let elapsed = began.elapsed();
        info!(elapsed_ms = elapsed.as_millis() as u64, "server stopped");
        app.bus()
            .publish(Event::new(EventKind::ShutdownCompleted).with_elapsed(elapsed));
        if let Some(hk) = housekeeping {
            hk.stop(grace.is_some());
        }

        self.inner.state.mark_stopped();
        self.inner.stopped.cancel();
    }
}

fn run_loaders<F>(app: &Application, loaders: &[OrderedLoader], pass: &'static str, f: F)
where
    F: Fn(&dyn Loader, &Application),
{
    for entry in loaders {
        if let Err(payload) = catch_unwind(AssertUnwindSafe(|| f(entry.loader.as_ref(), app))) {
            let error = panic_message(payload.as_ref());
            warn!(pass, order = entry.order, %error, "loader panicked");
            app.bus().publish(
                Event::new(EventKind::ComponentSkipped)
                    .with_component("loader")
                    .with_reason(format!("{pass}: {error}")),
            );
        }
    }
}

/// Turns definitions into tasks, naming unnamed ones `task-N` in order.
fn discover_tasks(defs: &[TaskDefinition], registry: &Arc<dyn BeanRegistry>) -> Result<Vec<Task>, BootError> {
    let names = NameSequence::new();
    defs.iter()
        .map(|def| {
            let name = def.attrs().name.clone().unwrap_or_else(|| names.next_name());
            let schedule = def.schedule().map_err(|source| BootError::Schedule {
                task: name.clone(),
                source,
            })?;
            debug!(task = %name, owner = def.owner(), method = def.method(), %schedule, "task discovered");
            Ok(Task::from_invocable(name, schedule, def.bind(Arc::clone(registry))))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{ComponentClass, Ioc};
    use crate::error::ScheduleError;
    use crate::tasks::Scheduled;

    #[derive(Default)]
    struct Jobs;

    fn definitions(attrs: Vec<Scheduled>) -> Vec<TaskDefinition> {
        let mut builder = ComponentClass::builder(Jobs::default).bean();
        for a in attrs {
            builder = builder.scheduled("run", a, |_: &Jobs, _| Ok(()));
        }
        builder.build().task_definitions().to_vec()
    }

    #[test]
    fn unnamed_tasks_get_sequential_names() {
        let registry: Arc<dyn BeanRegistry> = Arc::new(Ioc::new());
        let defs = definitions(vec![
            Scheduled::fixed_delay(100),
            Scheduled::fixed_delay(100).named("report"),
            Scheduled::cron("*/5 * * * * *"),
        ]);
        let names: Vec<String> = discover_tasks(&defs, &registry)
            .unwrap()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["task-0", "report", "task-1"]);
    }

    #[test]
    fn unparsable_schedule_is_fatal() {
        let registry: Arc<dyn BeanRegistry> = Arc::new(Ioc::new());
        let defs = definitions(vec![Scheduled::cron("every tuesday")]);
        match discover_tasks(&defs, &registry) {
            Err(BootError::Schedule { task, source }) => {
                assert_eq!(task, "task-0");
                assert!(matches!(source, ScheduleError::Parse { .. }));
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("schedule should not parse"),
        }
    }

    #[test]
    fn stop_before_start_is_a_no_op() {
        let server = Server::new(Application::new().with_signal_hook(false));
        server.stop();
        server.stop_and_wait();
        server.join();
        assert_eq!(server.state(), ServerState::NotStarted);
    }
}
