//! Configuration key names and their defaults.

/// Version string printed in the startup banner.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const APP_ENV: &str = "app.env";
pub const APP_NAME: &str = "app.name";
pub const APP_DEV_MODE: &str = "app.dev-mode";
pub const APP_WATCH_ENV: &str = "app.watch-env";
pub const APP_TASK_THREAD_COUNT: &str = "app.task.thread-count";
pub const APP_CONTEXT_PATH: &str = "app.context-path";

pub const MVC_STATICS: &str = "mvc.statics";
pub const MVC_TEMPLATE_PATH: &str = "mvc.template.path";

pub const SERVER_ADDRESS: &str = "server.address";
pub const SERVER_PORT: &str = "server.port";
pub const SERVER_SSL_ENABLE: &str = "server.ssl.enable";
pub const SERVER_SSL_CERT_PATH: &str = "server.ssl.cert-path";
pub const SERVER_SSL_PRIVATE_KEY_PATH: &str = "server.ssl.private-key-path";
pub const SERVER_SSL_PRIVATE_KEY_PASS: &str = "server.ssl.private-key-pass";
pub const SERVER_TCP_NODELAY: &str = "server.netty.tcp-nodelay";
pub const SERVER_SO_KEEPALIVE: &str = "server.netty.so-keepalive";
pub const SERVER_SO_BACKLOG: &str = "server.netty.so-backlog";
pub const SERVER_ACCEPT_THREAD_COUNT: &str = "server.netty.accept-thread-count";
pub const SERVER_IO_THREAD_COUNT: &str = "server.netty.io-thread-count";

pub const DEFAULT_APP_NAME: &str = "bootvisor";
pub const DEFAULT_ENV: &str = "default";
pub const DEFAULT_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 9000;
pub const DEFAULT_CONTEXT_PATH: &str = "/";
pub const DEFAULT_TEMPLATE_PATH: &str = "templates";
pub const DEFAULT_ACCEPT_THREADS: usize = 1;
/// `0` lets the transport pick a pool sized to the available cores.
pub const DEFAULT_IO_THREADS: usize = 0;
/// Listen backlog used when `server.netty.so-backlog` is absent.
pub const DEFAULT_BACKLOG: i32 = 1024;

/// Default cron pool size: one thread per core plus one.
pub fn default_task_threads() -> usize {
    num_cpus::get() + 1
}
