//! Startup report lines.

use std::fmt::Display;
use std::net::SocketAddr;
use std::time::Duration;

use tracing::info;

use crate::config::keys;
use crate::core::application::{Application, WebSettings};
use crate::transport::Backend;

fn line(key: &str, value: impl Display) {
    info!(target: "bootvisor::startup", "{key:<14} => {value}");
}

pub(crate) fn startup(app: &Application, web: &WebSettings) {
    let env = app.env();
    if app.banner() {
        info!(
            target: "bootvisor::startup",
            "{} v{}",
            env.get_or(keys::APP_NAME, keys::DEFAULT_APP_NAME),
            keys::VERSION
        );
    }
    line("app.env", env.get_or(keys::APP_ENV, keys::DEFAULT_ENV));
    line("app.pid", std::process::id());
    line("app.dev_mode", web.dev_mode);
    line("rust.target", format!("{}/{}", std::env::consts::OS, std::env::consts::ARCH));
    match std::env::current_dir() {
        Ok(dir) => line("user.dir", dir.display()),
        Err(_) => line("user.dir", "-"),
    }
    line("tmp.dir", std::env::temp_dir().display());
    match std::env::current_exe() {
        Ok(exe) => line("app.exe", exe.display()),
        Err(_) => line("app.exe", "-"),
    }
    if let Some(source) = env.source() {
        line("app.config", source.display());
    }
}

pub(crate) fn ready(addr: SocketAddr, backend: Backend, tls: bool, elapsed: Duration) {
    let scheme = if tls { "https" } else { "http" };
    line("transport", backend);
    info!(
        target: "bootvisor::startup",
        %addr,
        %backend,
        elapsed_ms = elapsed.as_millis() as u64,
        "server listening on {scheme}://{addr}"
    );
}
