//! # Application: everything a [`Server`](crate::Server) boots from.
//!
//! Built fluently, then handed to [`Server::new`](crate::Server::new) (or
//! started directly with [`Application::start`]).
//!
//! ```rust,no_run
//! use bootvisor::components::ComponentClass;
//! use bootvisor::tasks::Scheduled;
//! use bootvisor::Application;
//!
//! #[derive(Default)]
//! struct Cleanup;
//!
//! let server = Application::new()
//!     .set("server.port", "8080")
//!     .scan(
//!         ComponentClass::builder(Cleanup::default)
//!             .bean()
//!             .scheduled("sweep", Scheduled::cron("0 */10 * * * *"), |_c: &Cleanup, _| Ok(()))
//!             .build(),
//!     )
//!     .start()
//!     .expect("server failed to start");
//! server.join();
//! ```

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, warn};

use crate::components::{
    BeanRegistry, ComponentClass, ExceptionHandler, Ioc, Loader, RouteBuilder, RouteTable,
};
use crate::config::{Environment, keys, normalize_template_path, parse_statics};
use crate::core::housekeeping::SessionManager;
use crate::core::server::Server;
use crate::error::BootError;
use crate::events::Bus;
use crate::scheduler::TaskScheduler;
use crate::subscribers::{LogWriter, Subscribe};
use crate::transport::{CapabilityProbe, CloseHandler, ConnectionHandler, OsProbe};

/// Static resource prefixes served without routing.
pub const DEFAULT_STATICS: [&str; 4] = ["/favicon.ico", "/static/", "/upload/", "/webjars/"];

/// Grace period used by [`Server::stop_and_wait`](crate::Server::stop_and_wait).
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// Callback run once at the start of the release sequence.
pub type ShutdownListener = Arc<dyn Fn() + Send + Sync>;

/// Web-facing settings resolved at startup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WebSettings {
    pub statics: Vec<String>,
    pub context_path: String,
    pub template_path: String,
    pub dev_mode: bool,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            statics: DEFAULT_STATICS.iter().map(|s| s.to_string()).collect(),
            context_path: keys::DEFAULT_CONTEXT_PATH.to_string(),
            template_path: keys::DEFAULT_TEMPLATE_PATH.to_string(),
            dev_mode: true,
        }
    }
}

pub struct Application {
    env: Environment,
    registry: Arc<dyn BeanRegistry>,
    pub(crate) routes: Mutex<Box<dyn RouteBuilder>>,
    classes: Vec<ComponentClass>,
    loaders: Vec<Arc<dyn Loader>>,
    exception_handler: RwLock<Option<Arc<dyn ExceptionHandler>>>,
    session_manager: Option<Arc<dyn SessionManager>>,
    handler: Arc<dyn ConnectionHandler>,
    probe: Arc<dyn CapabilityProbe>,
    shutdown_listeners: Vec<ShutdownListener>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    scheduler: TaskScheduler,
    bus: Bus,
    statics: Vec<String>,
    web: RwLock<WebSettings>,
    signal_hook: bool,
    banner: bool,
    stop_grace: Duration,
}

impl Default for Application {
    fn default() -> Self {
        let bus = Bus::default();
        Self {
            env: Environment::new(),
            registry: Arc::new(Ioc::new()),
            routes: Mutex::new(Box::new(RouteTable::new())),
            classes: Vec::new(),
            loaders: Vec::new(),
            exception_handler: RwLock::new(None),
            session_manager: None,
            handler: Arc::new(CloseHandler),
            probe: Arc::new(OsProbe),
            shutdown_listeners: Vec::new(),
            subscribers: vec![Arc::new(LogWriter::new())],
            scheduler: TaskScheduler::with_bus(bus.clone()),
            bus,
            statics: DEFAULT_STATICS.iter().map(|s| s.to_string()).collect(),
            web: RwLock::new(WebSettings::default()),
            signal_hook: true,
            banner: true,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

impl Application {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the environment. Keys set earlier through [`set`](Self::set) are lost.
    pub fn with_env(mut self, env: Environment) -> Self {
        self.env = env;
        self
    }

    /// Sets one configuration property.
    pub fn set(self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.set(key, value);
        self
    }

    pub fn with_registry(mut self, registry: Arc<dyn BeanRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_routes(mut self, routes: impl RouteBuilder + 'static) -> Self {
        self.routes = Mutex::new(Box::new(routes));
        self
    }

    /// Adds a class to the registration pass. Classes are registered in scan order.
    pub fn scan(mut self, class: ComponentClass) -> Self {
        self.classes.push(class);
        self
    }

    pub fn scan_all(mut self, classes: impl IntoIterator<Item = ComponentClass>) -> Self {
        self.classes.extend(classes);
        self
    }

    /// Adds a loader that is not declared through a class.
    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loaders.push(loader);
        self
    }

    /// Installs an exception handler; a scanned handler class replaces it.
    pub fn with_exception_handler(self, handler: Arc<dyn ExceptionHandler>) -> Self {
        *self.exception_handler.write() = Some(handler);
        self
    }

    pub fn with_session_manager(mut self, sessions: Arc<dyn SessionManager>) -> Self {
        self.session_manager = Some(sessions);
        self
    }

    pub fn with_connection_handler(mut self, handler: Arc<dyn ConnectionHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn CapabilityProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Adds an event subscriber next to the default [`LogWriter`].
    pub fn subscribe(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Removes every subscriber added so far, including the default one.
    pub fn without_subscribers(mut self) -> Self {
        self.subscribers.clear();
        self
    }

    /// Registers a callback for the start of the release sequence.
    pub fn on_shutdown<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.shutdown_listeners.push(Arc::new(f));
        self
    }

    /// Adds static resource prefixes (merged with `mvc.statics`).
    pub fn add_statics<I, S>(mut self, statics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statics.extend(statics.into_iter().map(Into::into));
        self
    }

    pub fn with_template_path(self, path: impl Into<String>) -> Self {
        self.set(keys::MVC_TEMPLATE_PATH, path)
    }

    pub fn with_context_path(self, path: impl Into<String>) -> Self {
        self.set(keys::APP_CONTEXT_PATH, path)
    }

    pub fn with_dev_mode(self, dev: bool) -> Self {
        self.set(keys::APP_DEV_MODE, dev.to_string())
    }

    /// Whether the housekeeping loop listens for termination signals (default `true`).
    pub fn with_signal_hook(mut self, enabled: bool) -> Self {
        self.signal_hook = enabled;
        self
    }

    pub fn with_banner(mut self, enabled: bool) -> Self {
        self.banner = enabled;
        self
    }

    pub fn with_stop_grace(mut self, grace: Duration) -> Self {
        self.stop_grace = grace;
        self
    }

    /// Builds a server and starts it.
    pub fn start(self) -> Result<Server, BootError> {
        let server = Server::new(self);
        server.start()?;
        Ok(server)
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn registry(&self) -> Arc<dyn BeanRegistry> {
        Arc::clone(&self.registry)
    }

    /// Typed lookup in the dependency registry.
    pub fn get_bean<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.registry.get::<T>()
    }

    pub fn scheduler(&self) -> &TaskScheduler {
        &self.scheduler
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Settings resolved by the last start (defaults before that).
    pub fn web(&self) -> WebSettings {
        self.web.read().clone()
    }

    pub fn exception_handler(&self) -> Option<Arc<dyn ExceptionHandler>> {
        self.exception_handler.read().clone()
    }

    /// Passes `error` to the exception handler, or logs it when none is installed.
    pub fn handle_error(&self, error: &(dyn std::error::Error + 'static)) {
        match self.exception_handler() {
            Some(handler) => handler.handle(error),
            None => error!(error = %error, "unhandled error"),
        }
    }

    pub(crate) fn classes(&self) -> &[ComponentClass] {
        &self.classes
    }

    pub(crate) fn loaders(&self) -> &[Arc<dyn Loader>] {
        &self.loaders
    }

    pub(crate) fn set_exception_handler(&self, handler: Arc<dyn ExceptionHandler>) {
        if self.exception_handler.write().replace(handler).is_some() {
            warn!("exception handler replaced by a scanned class");
        }
    }

    pub(crate) fn session_manager(&self) -> Option<Arc<dyn SessionManager>> {
        self.session_manager.clone()
    }

    pub(crate) fn connection_handler(&self) -> Arc<dyn ConnectionHandler> {
        Arc::clone(&self.handler)
    }

    pub(crate) fn probe(&self) -> &dyn CapabilityProbe {
        self.probe.as_ref()
    }

    pub(crate) fn shutdown_listeners(&self) -> &[ShutdownListener] {
        &self.shutdown_listeners
    }

    pub(crate) fn subscribers(&self) -> Vec<Arc<dyn Subscribe>> {
        self.subscribers.clone()
    }

    pub(crate) fn signal_hook(&self) -> bool {
        self.signal_hook
    }

    pub(crate) fn banner(&self) -> bool {
        self.banner
    }

    pub(crate) fn stop_grace(&self) -> Duration {
        self.stop_grace
    }

    /// Reads template path, statics, context path and dev mode from the environment.
    pub(crate) fn resolve_web(&self) -> WebSettings {
        let mut statics = self.statics.clone();
        if let Some(raw) = self.env.get(keys::MVC_STATICS) {
            statics.extend(parse_statics(&raw));
        }
        let mut seen = std::collections::HashSet::new();
        statics.retain(|s| seen.insert(s.clone()));

        let web = WebSettings {
            statics,
            context_path: self.env.get_or(keys::APP_CONTEXT_PATH, keys::DEFAULT_CONTEXT_PATH),
            template_path: normalize_template_path(
                &self.env.get_or(keys::MVC_TEMPLATE_PATH, keys::DEFAULT_TEMPLATE_PATH),
            ),
            dev_mode: self.env.get_bool_or(keys::APP_DEV_MODE, true),
        };
        debug!(
            template = %web.template_path,
            context = %web.context_path,
            statics = web.statics.len(),
            "web settings resolved"
        );
        *self.web.write() = web.clone();
        web
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_path_is_trimmed_once_at_each_end() {
        let app = Application::new().with_template_path("/templates/");
        assert_eq!(app.resolve_web().template_path, "templates");
    }

    #[test]
    fn statics_merge_without_duplicates() {
        let app = Application::new()
            .add_statics(["/assets/"])
            .set(keys::MVC_STATICS, "/static/, /docs/");
        let statics = app.resolve_web().statics;
        assert_eq!(statics.iter().filter(|s| *s == "/static/").count(), 1);
        assert!(statics.contains(&"/assets/".to_string()));
        assert!(statics.contains(&"/docs/".to_string()));
    }

    #[test]
    fn defaults_before_start() {
        let app = Application::new();
        assert_eq!(app.web(), WebSettings::default());
        assert!(app.exception_handler().is_none());
        assert!(app.get_bean::<String>().is_none());
    }
}
