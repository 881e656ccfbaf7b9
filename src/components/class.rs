//! # Component classes.
//!
//! A [`ComponentClass`] is the metadata the registrar works from: the
//! type's identity, its declarative [`Marker`]s, a factory, value-producer
//! methods, task methods and capability casts. It is built with
//! [`ComponentClass::builder`].
//!
//! ## Example
//! ```rust
//! use bootvisor::components::{ComponentClass, Marker};
//! use bootvisor::tasks::Scheduled;
//!
//! #[derive(Default)]
//! struct Reports;
//!
//! impl Reports {
//!     fn flush(&self) {}
//! }
//!
//! let class = ComponentClass::builder(Reports::default)
//!     .bean()
//!     .scheduled("flush", Scheduled::fixed_delay(1_000), |r: &Reports, _ctx| {
//!         r.flush();
//!         Ok(())
//!     })
//!     .build();
//!
//! assert!(class.has(&Marker::Bean));
//! assert_eq!(class.task_definitions().len(), 1);
//! ```

use std::any::{Any, TypeId, type_name};
use std::fmt::{self, Display};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::components::hooks::{ExceptionHandler, Loader, WebHook};
use crate::components::registry::{Bean, Instance};
use crate::error::TaskError;
use crate::tasks::{Scheduled, TaskContext, TaskDefinition};

/// Declarative markers a class can carry.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Marker {
    /// Injectable component.
    Bean,
    /// Configuration value holder.
    Value,
    /// Route controller mounted at a path.
    Path(String),
    /// Source of producer methods.
    Configuration,
    /// URL patterns a web hook applies to.
    UrlPattern(Vec<String>),
    /// Explicit loader order.
    Order(i32),
}

type Factory = Arc<dyn Fn() -> Instance + Send + Sync>;
type ProducerFn = Arc<dyn Fn(&(dyn Any + Send + Sync)) -> Result<Bean, String> + Send + Sync>;
type Cast<C> = Arc<dyn Fn(Instance) -> Option<Arc<C>> + Send + Sync>;

/// A value-producer method of a configuration source.
#[derive(Clone)]
pub struct Producer {
    name: &'static str,
    call: ProducerFn,
}

impl Producer {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub(crate) fn invoke(&self, source: &(dyn Any + Send + Sync)) -> Result<Bean, String> {
        (self.call)(source)
    }
}

/// Registration metadata for one component type.
#[derive(Clone)]
pub struct ComponentClass {
    type_id: TypeId,
    type_name: &'static str,
    markers: Vec<Marker>,
    factory: Factory,
    producers: Vec<Producer>,
    schedules: Vec<TaskDefinition>,
    webhook: Option<Cast<dyn WebHook>>,
    loader: Option<Cast<dyn Loader>>,
    exception_handler: Option<Cast<dyn ExceptionHandler>>,
}

impl ComponentClass {
    /// Starts a class for `T`, constructed by `factory` when registered.
    pub fn builder<T, F>(factory: F) -> ClassBuilder<T>
    where
        T: Any + Send + Sync,
        F: Fn() -> T + Send + Sync + 'static,
    {
        ClassBuilder {
            class: ComponentClass {
                type_id: TypeId::of::<T>(),
                type_name: type_name::<T>(),
                markers: Vec::new(),
                factory: Arc::new(move || Arc::new(factory()) as Instance),
                producers: Vec::new(),
                schedules: Vec::new(),
                webhook: None,
                loader: None,
                exception_handler: None,
            },
            _type: PhantomData,
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Exact marker match (including attributes).
    pub fn has(&self, marker: &Marker) -> bool {
        self.markers.contains(marker)
    }

    pub fn path(&self) -> Option<&str> {
        self.markers.iter().find_map(|m| match m {
            Marker::Path(p) => Some(p.as_str()),
            _ => None,
        })
    }

    pub fn is_configuration(&self) -> bool {
        self.has(&Marker::Configuration)
    }

    pub fn url_patterns(&self) -> Option<&[String]> {
        self.markers.iter().find_map(|m| match m {
            Marker::UrlPattern(p) => Some(p.as_slice()),
            _ => None,
        })
    }

    pub fn order(&self) -> Option<i32> {
        self.markers.iter().find_map(|m| match m {
            Marker::Order(o) => Some(*o),
            _ => None,
        })
    }

    pub fn producers(&self) -> &[Producer] {
        &self.producers
    }

    pub fn task_definitions(&self) -> &[TaskDefinition] {
        &self.schedules
    }

    pub fn is_webhook(&self) -> bool {
        self.webhook.is_some()
    }

    pub fn is_loader(&self) -> bool {
        self.loader.is_some()
    }

    pub fn is_exception_handler(&self) -> bool {
        self.exception_handler.is_some()
    }

    /// Constructs a fresh instance. May panic if the factory does.
    pub fn instantiate(&self) -> Instance {
        (self.factory)()
    }

    pub(crate) fn as_webhook(&self, instance: Instance) -> Option<Arc<dyn WebHook>> {
        self.webhook.as_ref().and_then(|cast| cast(instance))
    }

    pub(crate) fn as_loader(&self, instance: Instance) -> Option<Arc<dyn Loader>> {
        self.loader.as_ref().and_then(|cast| cast(instance))
    }

    pub(crate) fn as_exception_handler(&self, instance: Instance) -> Option<Arc<dyn ExceptionHandler>> {
        self.exception_handler.as_ref().and_then(|cast| cast(instance))
    }
}

impl fmt::Debug for ComponentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentClass")
            .field("type_name", &self.type_name)
            .field("markers", &self.markers)
            .field("producers", &self.producers.iter().map(Producer::name).collect::<Vec<_>>())
            .field("tasks", &self.schedules.len())
            .finish()
    }
}

/// Typed builder returned by [`ComponentClass::builder`].
pub struct ClassBuilder<T> {
    class: ComponentClass,
    _type: PhantomData<fn() -> T>,
}

impl<T: Any + Send + Sync> ClassBuilder<T> {
    fn marker(mut self, marker: Marker) -> Self {
        self.class.markers.push(marker);
        self
    }

    pub fn bean(self) -> Self {
        self.marker(Marker::Bean)
    }

    pub fn value(self) -> Self {
        self.marker(Marker::Value)
    }

    pub fn path(self, path: impl Into<String>) -> Self {
        self.marker(Marker::Path(path.into()))
    }

    pub fn configuration(self) -> Self {
        self.marker(Marker::Configuration)
    }

    pub fn url_patterns<I, S>(self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.marker(Marker::UrlPattern(patterns.into_iter().map(Into::into).collect()))
    }

    pub fn order(self, order: i32) -> Self {
        self.marker(Marker::Order(order))
    }

    /// Adds a value-producer method; its result is registered under `P`'s type.
    pub fn producer<P, E, F>(mut self, method: &'static str, f: F) -> Self
    where
        P: Any + Send + Sync,
        E: Display,
        F: Fn(&T) -> Result<P, E> + Send + Sync + 'static,
    {
        let call: ProducerFn = Arc::new(move |source: &(dyn Any + Send + Sync)| {
            let this = source
                .downcast_ref::<T>()
                .ok_or_else(|| format!("source is not a {}", type_name::<T>()))?;
            f(this).map(Bean::new).map_err(|e| e.to_string())
        });
        self.class.producers.push(Producer { name: method, call });
        self
    }

    /// Adds a task method fired on `attrs`' schedule.
    pub fn scheduled<F>(mut self, method: &'static str, attrs: Scheduled, f: F) -> Self
    where
        F: Fn(&T, &TaskContext) -> Result<(), TaskError> + Send + Sync + 'static,
    {
        self.class
            .schedules
            .push(TaskDefinition::for_method::<T, F>(method, attrs, f));
        self
    }

    pub fn build(self) -> ComponentClass {
        self.class
    }
}

impl<T: WebHook> ClassBuilder<T> {
    pub fn webhook(mut self) -> Self {
        self.class.webhook = Some(Arc::new(|instance: Instance| {
            instance.downcast::<T>().ok().map(|t| t as Arc<dyn WebHook>)
        }));
        self
    }
}

impl<T: Loader> ClassBuilder<T> {
    pub fn loader(mut self) -> Self {
        self.class.loader = Some(Arc::new(|instance: Instance| {
            instance.downcast::<T>().ok().map(|t| t as Arc<dyn Loader>)
        }));
        self
    }
}

impl<T: ExceptionHandler> ClassBuilder<T> {
    pub fn exception_handler(mut self) -> Self {
        self.class.exception_handler = Some(Arc::new(|instance: Instance| {
            instance.downcast::<T>().ok().map(|t| t as Arc<dyn ExceptionHandler>)
        }));
        self
    }
}
