//! Resolved configuration snapshots.
//!
//! [`TransportConfig`] is read once from the [`Environment`] during the bind
//! stage and never mutated afterwards.

use std::path::PathBuf;

use crate::config::env::Environment;
use crate::config::keys;
use crate::error::BootError;
use crate::transport::TlsSettings;

/// Socket options applied to every accepted connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChildOptions {
    pub tcp_nodelay: bool,
    pub so_keepalive: bool,
}

impl Default for ChildOptions {
    fn default() -> Self {
        Self {
            tcp_nodelay: true,
            so_keepalive: true,
        }
    }
}

/// Immutable transport settings.
///
/// ## Field semantics
/// - `backlog`: `None` when `server.netty.so-backlog` is absent
/// - `accept_threads`: acceptor pool size (default 1)
/// - `io_threads`: I/O pool size (`0` = sized to available cores)
/// - `tls`: `Some` only when `server.ssl.enable = true`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportConfig {
    pub address: String,
    pub port: u16,
    pub backlog: Option<i32>,
    pub child: ChildOptions,
    pub accept_threads: usize,
    pub io_threads: usize,
    pub tls: Option<TlsSettings>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: keys::DEFAULT_ADDRESS.to_string(),
            port: keys::DEFAULT_PORT,
            backlog: None,
            child: ChildOptions::default(),
            accept_threads: keys::DEFAULT_ACCEPT_THREADS,
            io_threads: keys::DEFAULT_IO_THREADS,
            tls: None,
        }
    }
}

impl TransportConfig {
    /// Resolves transport settings from the environment.
    ///
    /// Fails with [`BootError::Config`] for out-of-range numbers or a
    /// non-boolean `server.ssl.enable`, and with [`BootError::Tls`] when TLS
    /// is enabled without certificate or key paths.
    pub fn from_env(env: &Environment) -> Result<Self, BootError> {
        let port = env.get_int_or(keys::SERVER_PORT, i64::from(keys::DEFAULT_PORT));
        let port = u16::try_from(port)
            .map_err(|_| BootError::config(keys::SERVER_PORT, format!("{port} is not a valid port")))?;

        let backlog = match env.get_int(keys::SERVER_SO_BACKLOG) {
            Some(v) => Some(
                i32::try_from(v)
                    .ok()
                    .filter(|b| *b > 0)
                    .ok_or_else(|| BootError::config(keys::SERVER_SO_BACKLOG, format!("{v} is out of range")))?,
            ),
            None => None,
        };

        let ssl_enabled = match env.get(keys::SERVER_SSL_ENABLE) {
            Some(raw) if !raw.trim().is_empty() => env.get_bool(keys::SERVER_SSL_ENABLE).ok_or_else(|| {
                BootError::config(keys::SERVER_SSL_ENABLE, format!("{raw:?} is not true or false"))
            })?,
            _ => false,
        };
        let tls = if ssl_enabled {
            Some(tls_from_env(env)?)
        } else {
            None
        };

        Ok(Self {
            address: env.get_or(keys::SERVER_ADDRESS, keys::DEFAULT_ADDRESS),
            port,
            backlog,
            child: ChildOptions {
                tcp_nodelay: env.get_bool_or(keys::SERVER_TCP_NODELAY, true),
                so_keepalive: env.get_bool_or(keys::SERVER_SO_KEEPALIVE, true),
            },
            accept_threads: thread_count(env, keys::SERVER_ACCEPT_THREAD_COUNT, keys::DEFAULT_ACCEPT_THREADS)?,
            io_threads: thread_count(env, keys::SERVER_IO_THREAD_COUNT, keys::DEFAULT_IO_THREADS)?,
            tls,
        })
    }

    /// `address:port` as configured (before resolution).
    pub fn authority(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

fn tls_from_env(env: &Environment) -> Result<TlsSettings, BootError> {
    let path = |key: &str| -> Result<PathBuf, BootError> {
        env.get(key)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| BootError::tls(format!("{key} is required when ssl is enabled")))
    };
    Ok(TlsSettings {
        cert_path: path(keys::SERVER_SSL_CERT_PATH)?,
        private_key_path: path(keys::SERVER_SSL_PRIVATE_KEY_PATH)?,
        private_key_pass: env
            .get(keys::SERVER_SSL_PRIVATE_KEY_PASS)
            .filter(|v| !v.is_empty()),
    })
}

/// Reads a thread-count key; negative values are rejected.
pub(crate) fn thread_count(env: &Environment, key: &str, default: usize) -> Result<usize, BootError> {
    match env.get_int(key) {
        Some(v) => usize::try_from(v).map_err(|_| BootError::config(key, format!("{v} is negative"))),
        None => Ok(default),
    }
}

/// Strips exactly one leading and one trailing `/`.
///
/// # Example
/// ```
/// use bootvisor::config::normalize_template_path;
///
/// assert_eq!(normalize_template_path("/templates/"), "templates");
/// assert_eq!(normalize_template_path("//views//"), "/views/");
/// ```
pub fn normalize_template_path(path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    let path = path.strip_suffix('/').unwrap_or(path);
    path.to_string()
}

/// Splits the comma separated `mvc.statics` value, dropping blanks.
pub fn parse_statics(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_without_keys() {
        let cfg = TransportConfig::from_env(&Environment::new()).unwrap();
        assert_eq!(cfg, TransportConfig::default());
        assert_eq!(cfg.authority(), "0.0.0.0:9000");
    }

    #[test]
    fn reads_every_transport_key() {
        let env = Environment::from_pairs([
            (keys::SERVER_ADDRESS, "127.0.0.1"),
            (keys::SERVER_PORT, "0"),
            (keys::SERVER_SO_BACKLOG, "64"),
            (keys::SERVER_TCP_NODELAY, "false"),
            (keys::SERVER_ACCEPT_THREAD_COUNT, "2"),
            (keys::SERVER_IO_THREAD_COUNT, "4"),
        ]);
        let cfg = TransportConfig::from_env(&env).unwrap();
        assert_eq!(cfg.port, 0);
        assert_eq!(cfg.backlog, Some(64));
        assert!(!cfg.child.tcp_nodelay);
        assert!(cfg.child.so_keepalive);
        assert_eq!((cfg.accept_threads, cfg.io_threads), (2, 4));
    }

    #[test]
    fn rejects_bad_port_and_negative_threads() {
        let env = Environment::from_pairs([(keys::SERVER_PORT, "70000")]);
        assert_eq!(TransportConfig::from_env(&env).unwrap_err().as_label(), "boot_config");

        let env = Environment::from_pairs([(keys::SERVER_IO_THREAD_COUNT, "-1")]);
        assert_eq!(TransportConfig::from_env(&env).unwrap_err().as_label(), "boot_config");
    }

    #[test]
    fn unreadable_ssl_switch_is_fatal() {
        let env = Environment::from_pairs([(keys::SERVER_SSL_ENABLE, "on")]);
        let err = TransportConfig::from_env(&env).unwrap_err();
        assert_eq!(err.as_label(), "boot_config");
        assert!(err.as_message().contains("server.ssl.enable"), "{err}");

        let env = Environment::from_pairs([(keys::SERVER_SSL_ENABLE, "FALSE")]);
        assert!(TransportConfig::from_env(&env).unwrap().tls.is_none());
    }

    #[test]
    fn ssl_without_paths_is_fatal() {
        let env = Environment::from_pairs([(keys::SERVER_SSL_ENABLE, "true")]);
        assert_eq!(TransportConfig::from_env(&env).unwrap_err().as_label(), "boot_tls");
    }

    #[test]
    fn template_path_strips_one_slash_each_side() {
        assert_eq!(normalize_template_path("/templates/"), "templates");
        assert_eq!(normalize_template_path("templates"), "templates");
        assert_eq!(normalize_template_path("/"), "");
        assert_eq!(normalize_template_path("//a//"), "/a/");
    }

    #[test]
    fn statics_split_on_commas() {
        assert_eq!(parse_statics(" /static, /upload ,,"), vec!["/static", "/upload"]);
    }
}
