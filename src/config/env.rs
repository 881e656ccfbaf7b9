//! # Environment: the application property store.
//!
//! [`Environment`] is a cloneable handle over a shared `key → value` map.
//! Values are always stored as strings; typed getters parse on read.
//!
//! ## Sources
//! - programmatic: [`Environment::new`] + [`Environment::set`]
//! - TOML text: nested tables flatten to dotted keys (`[server] port = 1`
//!   becomes `server.port = "1"`), arrays join with `,`
//! - properties text: `key=value` / `key: value` lines, `#`/`!` comments
//!
//! ## Rules
//! - A file-backed environment remembers its path; [`Environment::reload`]
//!   re-reads it in place so every clone observes the new values.
//! - Malformed typed values are treated as absent and logged at `warn`.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::{Mutex, RwLock};
use tracing::warn;

use crate::error::BootError;

/// Shared application properties.
#[derive(Clone, Debug, Default)]
pub struct Environment {
    props: Arc<RwLock<BTreeMap<String, String>>>,
    source: Option<Arc<FileSource>>,
}

#[derive(Debug)]
struct FileSource {
    path: PathBuf,
    modified: Mutex<Option<SystemTime>>,
}

impl Environment {
    /// Creates an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an environment from key/value pairs.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let env = Self::new();
        {
            let mut props = env.props.write();
            for (k, v) in pairs {
                props.insert(k.into(), v.into());
            }
        }
        env
    }

    /// Parses TOML text into a flat environment.
    pub fn from_toml_str(text: &str) -> Result<Self, BootError> {
        let props = parse_toml(text)?;
        Ok(Self {
            props: Arc::new(RwLock::new(props)),
            source: None,
        })
    }

    /// Parses `key=value` properties text.
    pub fn from_properties_str(text: &str) -> Self {
        Self {
            props: Arc::new(RwLock::new(parse_properties(text))),
            source: None,
        }
    }

    /// Loads a file, choosing the format by extension (`.toml` or properties).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BootError> {
        let path = path.as_ref();
        let props = read_file(path)?;
        let modified = fs::metadata(path).and_then(|m| m.modified()).ok();
        Ok(Self {
            props: Arc::new(RwLock::new(props)),
            source: Some(Arc::new(FileSource {
                path: path.to_path_buf(),
                modified: Mutex::new(modified),
            })),
        })
    }

    /// Path of the backing file, if the environment was loaded from one.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref().map(|s| s.path.as_path())
    }

    /// Re-reads the backing file when its modification time changed.
    ///
    /// Returns `Ok(true)` when properties were replaced. Keys set
    /// programmatically are overwritten by the file contents.
    pub fn reload(&self) -> Result<bool, BootError> {
        let Some(source) = self.source.as_deref() else {
            return Ok(false);
        };
        let modified = fs::metadata(&source.path)
            .and_then(|m| m.modified())
            .map_err(|e| BootError::config(&source.path.display().to_string(), e.to_string()))?;

        let mut last = source.modified.lock();
        if *last == Some(modified) {
            return Ok(false);
        }
        let fresh = read_file(&source.path)?;
        *self.props.write() = fresh;
        *last = Some(modified);
        Ok(true)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.props.read().get(key).cloned()
    }

    pub fn get_or(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    /// Parses `true`/`false` (case-insensitive).
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        let raw = self.get(key)?;
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => {
                warn!(key, value = %raw, "ignoring non-boolean property");
                None
            }
        }
    }

    pub fn get_bool_or(&self, key: &str, default: bool) -> bool {
        self.get_bool(key).unwrap_or(default)
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        let raw = self.get(key)?;
        match raw.trim().parse::<i64>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(key, value = %raw, "ignoring non-integer property");
                None
            }
        }
    }

    pub fn get_int_or(&self, key: &str, default: i64) -> i64 {
        self.get_int(key).unwrap_or(default)
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.props.write().insert(key.into(), value.into());
    }

    pub fn contains(&self, key: &str) -> bool {
        self.props.read().contains_key(key)
    }

    /// Snapshot of every property, sorted by key.
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.props.read().clone()
    }

    pub fn len(&self) -> usize {
        self.props.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.props.read().is_empty()
    }
}

fn read_file(path: &Path) -> Result<BTreeMap<String, String>, BootError> {
    let text = fs::read_to_string(path)
        .map_err(|e| BootError::config(&path.display().to_string(), e.to_string()))?;
    if path.extension().is_some_and(|ext| ext == "toml") {
        parse_toml(&text)
    } else {
        Ok(parse_properties(&text))
    }
}

fn parse_toml(text: &str) -> Result<BTreeMap<String, String>, BootError> {
    let table: toml::Table = text
        .parse()
        .map_err(|e: toml::de::Error| BootError::config("toml", e.message().to_string()))?;
    let mut out = BTreeMap::new();
    flatten("", &toml::Value::Table(table), &mut out);
    Ok(out)
}

fn flatten(prefix: &str, value: &toml::Value, out: &mut BTreeMap<String, String>) {
    let rendered = match value {
        toml::Value::Table(table) => {
            for (k, v) in table {
                let key = if prefix.is_empty() {
                    k.clone()
                } else {
                    format!("{prefix}.{k}")
                };
                flatten(&key, v, out);
            }
            return;
        }
        toml::Value::String(s) => s.clone(),
        toml::Value::Array(items) => items
            .iter()
            .map(|item| match item {
                toml::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(","),
        other => other.to_string(),
    };
    out.insert(prefix.to_string(), rendered);
}

fn parse_properties(text: &str) -> BTreeMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(['=', ':'])?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_tables_flatten_to_dotted_keys() {
        let env = Environment::from_toml_str(
            r#"
            [server]
            port = 8080
            address = "127.0.0.1"

            [server.netty]
            tcp-nodelay = false

            [mvc]
            statics = ["/static", "/assets"]
            "#,
        )
        .unwrap();

        assert_eq!(env.get_int("server.port"), Some(8080));
        assert_eq!(env.get("server.address").as_deref(), Some("127.0.0.1"));
        assert_eq!(env.get_bool("server.netty.tcp-nodelay"), Some(false));
        assert_eq!(env.get("mvc.statics").as_deref(), Some("/static,/assets"));
    }

    #[test]
    fn properties_text_skips_comments() {
        let env = Environment::from_properties_str(
            "# comment\n! also comment\napp.name = demo\nserver.port: 7000\n\nbroken line\n",
        );
        assert_eq!(env.get("app.name").as_deref(), Some("demo"));
        assert_eq!(env.get_int("server.port"), Some(7000));
        assert_eq!(env.len(), 2);
    }

    #[test]
    fn malformed_typed_values_read_as_absent() {
        let env = Environment::from_pairs([("a", "yes"), ("b", "12x")]);
        assert_eq!(env.get_bool("a"), None);
        assert!(env.get_bool_or("a", true));
        assert_eq!(env.get_int_or("b", 3), 3);
    }

    #[test]
    fn clones_share_properties() {
        let env = Environment::new();
        let other = env.clone();
        other.set("k", "v");
        assert!(env.contains("k"));
    }

    #[test]
    fn reload_picks_up_file_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        fs::write(&path, "app.name=first\n").unwrap();

        let env = Environment::load(&path).unwrap();
        assert_eq!(env.get("app.name").as_deref(), Some("first"));
        assert!(!env.reload().unwrap());

        fs::write(&path, "app.name=second\n").unwrap();
        let file = fs::File::options().write(true).open(&path).unwrap();
        file.set_modified(SystemTime::now() + std::time::Duration::from_secs(5))
            .unwrap();

        assert!(env.reload().unwrap());
        assert_eq!(env.get("app.name").as_deref(), Some("second"));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = Environment::from_toml_str("[server\nport = ").unwrap_err();
        assert_eq!(err.as_label(), "boot_config");
    }
}
