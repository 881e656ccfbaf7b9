//! # Component registration.
//!
//! Classes are described with [`ComponentClass`], classified into [`Role`]s
//! and applied by the [`Registrar`] against a [`BeanRegistry`] and a
//! [`RouteBuilder`].
//!
//! - [`class`]    class metadata and its builder
//! - [`hooks`]    capability traits (`WebHook`, `Loader`, `ExceptionHandler`)
//! - [`registry`] the component store seam and [`Ioc`]
//! - [`role`]     marker → role classification
//! - [`routes`]   the routing seam and [`RouteTable`]
//! - [`registrar`] role application

pub mod class;
pub mod hooks;
pub mod registrar;
pub mod registry;
pub mod role;
pub mod routes;

pub use class::{ClassBuilder, ComponentClass, Marker, Producer};
pub use hooks::{ExceptionHandler, Loader, WebHook};
pub use registrar::{DEFAULT_HOOK_PATTERN, OrderedLoader, Registrar, Registration};
pub use registry::{Bean, BeanRegistry, Instance, Ioc};
pub use role::{Role, classify};
pub use routes::{RouteBuilder, RouteEntry, RouteTable};
