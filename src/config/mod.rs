//! # Application configuration.
//!
//! - [`Environment`] shared property store (programmatic, TOML or properties file)
//! - [`keys`] every key name and default
//! - [`TransportConfig`] resolved transport snapshot
//! - [`normalize_template_path`] / [`parse_statics`] view-layer helpers

mod env;
pub mod keys;
mod settings;

pub use env::Environment;
pub use settings::{ChildOptions, TransportConfig, normalize_template_path, parse_statics};
pub(crate) use settings::thread_count;
