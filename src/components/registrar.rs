//! # Registrar: applies each class's roles.
//!
//! ```text
//! ComponentClass ──► classify ──► roles (ordered)
//!   Injectable / ValueHolder ──► registry.register_class
//!   RouteController          ──► register_class + routes.add_router
//!   ConfigurationSource      ──► instantiate, run producers, register_bean each
//!   WebHookHandler           ──► routes.add_webhook per url pattern ("/.*" default)
//!   Loader                   ──► loader list (sorted in finish)
//!   ExceptionHandler         ──► single slot, last one wins
//! ```
//!
//! ## Rules
//! - Visiting a class twice is a no-op.
//! - A panicking factory skips that class; a failing producer skips that
//!   producer. Neither stops the scan.
//! - Task definitions survive only for classes that ended up in the registry.

use std::any::TypeId;
use std::collections::{BTreeSet, HashSet};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::components::class::ComponentClass;
use crate::components::hooks::{ExceptionHandler, Loader};
use crate::components::registry::BeanRegistry;
use crate::components::role::{Role, classify};
use crate::components::routes::RouteBuilder;
use crate::error::{ComponentError, panic_message};
use crate::events::{Bus, Event, EventKind};
use crate::tasks::TaskDefinition;

/// Pattern used for web hooks without an explicit URL pattern.
pub const DEFAULT_HOOK_PATTERN: &str = "/.*";

/// A loader with its effective order.
#[derive(Clone)]
pub struct OrderedLoader {
    pub order: i32,
    pub loader: Arc<dyn Loader>,
}

/// Result of a registration pass.
pub struct Registration {
    /// Sorted by `order` (stable).
    pub loaders: Vec<OrderedLoader>,
    pub exception_handler: Option<Arc<dyn ExceptionHandler>>,
    pub tasks: Vec<TaskDefinition>,
}

pub struct Registrar {
    registry: Arc<dyn BeanRegistry>,
    bus: Bus,
    visited: HashSet<TypeId>,
    loaders: Vec<OrderedLoader>,
    exception_handler: Option<(&'static str, Arc<dyn ExceptionHandler>)>,
    tasks: Vec<(TypeId, TaskDefinition)>,
}

impl Registrar {
    pub fn new(registry: Arc<dyn BeanRegistry>, bus: Bus) -> Self {
        Self {
            registry,
            bus,
            visited: HashSet::new(),
            loaders: Vec::new(),
            exception_handler: None,
            tasks: Vec::new(),
        }
    }

    /// Classifies and registers one class. Returns the roles applied
    /// (empty for repeat visits and unmarked classes).
    pub fn register(&mut self, class: &ComponentClass, routes: &mut dyn RouteBuilder) -> BTreeSet<Role> {
        if !self.visited.insert(class.type_id()) {
            debug!(component = class.type_name(), "already registered");
            return BTreeSet::new();
        }
        let roles = classify(class);
        if roles.is_empty() {
            return roles;
        }

        match catch_unwind(AssertUnwindSafe(|| self.apply(class, &roles, routes))) {
            Ok(()) => {
                let listed = roles.iter().map(Role::as_str).collect::<Vec<_>>().join(",");
                self.bus.publish(
                    Event::new(EventKind::ComponentRegistered)
                        .with_component(class.type_name())
                        .with_reason(listed),
                );
            }
            Err(payload) => {
                self.skip(ComponentError::Construct {
                    class: class.type_name(),
                    error: panic_message(payload.as_ref()),
                });
                return BTreeSet::new();
            }
        }

        self.tasks.extend(
            class
                .task_definitions()
                .iter()
                .cloned()
                .map(|def| (class.type_id(), def)),
        );
        roles
    }

    fn apply(&mut self, class: &ComponentClass, roles: &BTreeSet<Role>, routes: &mut dyn RouteBuilder) {
        for role in roles {
            match role {
                Role::Injectable | Role::ValueHolder => {
                    self.registry.register_class(class);
                }
                Role::RouteController => {
                    self.registry.register_class(class);
                    if let Some(controller) = self.registry.get_bean(class.type_id()) {
                        routes.add_router(class, controller);
                    }
                }
                Role::ConfigurationSource => self.run_producers(class),
                Role::WebHookHandler => {
                    let Some(hook) = self
                        .registry
                        .get_bean(class.type_id())
                        .and_then(|i| class.as_webhook(i))
                    else {
                        continue;
                    };
                    match class.url_patterns().filter(|p| !p.is_empty()) {
                        Some(patterns) => {
                            for pattern in patterns {
                                routes.add_webhook(pattern, Arc::clone(&hook));
                            }
                        }
                        None => routes.add_webhook(DEFAULT_HOOK_PATTERN, hook),
                    }
                }
                Role::Loader => {
                    if let Some(loader) = self
                        .registry
                        .get_bean(class.type_id())
                        .and_then(|i| class.as_loader(i))
                    {
                        let order = class.order().unwrap_or_else(|| loader.order());
                        self.loaders.push(OrderedLoader { order, loader });
                    }
                }
                Role::ExceptionHandler => {
                    if let Some(handler) = self
                        .registry
                        .get_bean(class.type_id())
                        .and_then(|i| class.as_exception_handler(i))
                    {
                        if let Some((previous, _)) = self.exception_handler.replace((class.type_name(), handler)) {
                            warn!(previous, current = class.type_name(), "exception handler replaced");
                        }
                    }
                }
            }
        }
    }

    fn run_producers(&mut self, class: &ComponentClass) {
        let source = class.instantiate();
        for producer in class.producers() {
            let produced = catch_unwind(AssertUnwindSafe(|| producer.invoke(source.as_ref())))
                .unwrap_or_else(|payload| Err(panic_message(payload.as_ref())));
            match produced {
                Ok(bean) => {
                    let name = bean.type_name();
                    if !self.registry.register_bean(bean) {
                        debug!(component = name, producer = producer.name(), "value already registered");
                    }
                }
                Err(error) => self.skip(ComponentError::Producer {
                    class: class.type_name(),
                    method: producer.name(),
                    error,
                }),
            }
        }
    }

    fn skip(&self, err: ComponentError) {
        let component = match &err {
            ComponentError::Producer { class, .. } | ComponentError::Construct { class, .. } => *class,
        };
        warn!(component, label = err.as_label(), error = %err, "component skipped");
        self.bus.publish(
            Event::new(EventKind::ComponentSkipped)
                .with_component(component)
                .with_reason(err.as_message()),
        );
    }

    /// Adds a loader that was not discovered through a class.
    pub fn add_loader(&mut self, loader: Arc<dyn Loader>) {
        let order = loader.order();
        self.loaders.push(OrderedLoader { order, loader });
    }

    pub fn finish(self) -> Registration {
        let Registrar {
            registry,
            mut loaders,
            exception_handler,
            tasks,
            ..
        } = self;
        loaders.sort_by_key(|l| l.order);

        let tasks = tasks
            .into_iter()
            .filter_map(|(owner, def)| {
                if registry.contains(owner) {
                    Some(def)
                } else {
                    debug!(owner = def.owner(), method = def.method(), "task owner not registered; ignored");
                    None
                }
            })
            .collect();

        Registration {
            loaders,
            exception_handler: exception_handler.map(|(_, h)| h),
            tasks,
        }
    }
}
