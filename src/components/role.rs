use std::collections::BTreeSet;
use std::fmt;

use crate::components::class::{ComponentClass, Marker};

/// Registration role derived from a class's markers and capabilities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Injectable,
    ValueHolder,
    RouteController,
    ConfigurationSource,
    WebHookHandler,
    Loader,
    ExceptionHandler,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Injectable => "injectable",
            Role::ValueHolder => "value_holder",
            Role::RouteController => "route_controller",
            Role::ConfigurationSource => "configuration_source",
            Role::WebHookHandler => "webhook",
            Role::Loader => "loader",
            Role::ExceptionHandler => "exception_handler",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles held by `class`; empty when no relevant marker is present.
///
/// - `Bean` → Injectable; `Value` → ValueHolder; `Path` → RouteController
/// - `Configuration` with at least one producer → ConfigurationSource
/// - `Bean` plus a capability → WebHookHandler / Loader / ExceptionHandler
pub fn classify(class: &ComponentClass) -> BTreeSet<Role> {
    let mut roles = BTreeSet::new();
    let bean = class.has(&Marker::Bean);

    if bean {
        roles.insert(Role::Injectable);
    }
    if class.has(&Marker::Value) {
        roles.insert(Role::ValueHolder);
    }
    if class.path().is_some() {
        roles.insert(Role::RouteController);
    }
    if class.is_configuration() && !class.producers().is_empty() {
        roles.insert(Role::ConfigurationSource);
    }
    if bean && class.is_webhook() {
        roles.insert(Role::WebHookHandler);
    }
    if bean && class.is_loader() {
        roles.insert(Role::Loader);
    }
    if bean && class.is_exception_handler() {
        roles.insert(Role::ExceptionHandler);
    }
    roles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::WebHook;

    #[derive(Default)]
    struct Hook;
    impl WebHook for Hook {}

    #[derive(Default)]
    struct Plain;

    #[test]
    fn no_markers_no_roles() {
        assert!(classify(&ComponentClass::builder(Plain::default).build()).is_empty());
    }

    #[test]
    fn class_may_hold_several_roles() {
        let class = ComponentClass::builder(Hook::default)
            .bean()
            .path("/hook")
            .webhook()
            .build();
        let roles: Vec<Role> = classify(&class).into_iter().collect();
        assert_eq!(roles, vec![Role::Injectable, Role::RouteController, Role::WebHookHandler]);
    }

    #[test]
    fn capability_needs_bean_marker() {
        let class = ComponentClass::builder(Hook::default).webhook().build();
        assert!(classify(&class).is_empty());
    }

    #[test]
    fn configuration_without_producers_is_ignored() {
        let class = ComponentClass::builder(Plain::default).configuration().build();
        assert!(classify(&class).is_empty());
    }
}
