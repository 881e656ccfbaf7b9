use std::sync::Arc;

use crate::components::class::ComponentClass;
use crate::components::hooks::WebHook;
use crate::components::registry::Instance;

/// Seam to the routing layer.
///
/// The registrar forwards controllers and hooks; the orchestrator calls
/// [`register`](RouteBuilder::register) once after the scan.
pub trait RouteBuilder: Send + Sync {
    fn add_router(&mut self, class: &ComponentClass, controller: Instance);

    fn add_webhook(&mut self, pattern: &str, hook: Arc<dyn WebHook>);

    /// Finalises the route table.
    fn register(&mut self);
}

/// A mounted controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub controller: &'static str,
    pub path: String,
}

/// Default [`RouteBuilder`]: records what it is given.
#[derive(Default)]
pub struct RouteTable {
    routes: Vec<RouteEntry>,
    hooks: Vec<(String, Arc<dyn WebHook>)>,
    registered: bool,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn routes(&self) -> &[RouteEntry] {
        &self.routes
    }

    pub fn hook_patterns(&self) -> impl Iterator<Item = &str> {
        self.hooks.iter().map(|(p, _)| p.as_str())
    }

    /// Hooks whose pattern matches `path` exactly or as a `/.*` suffix wildcard.
    pub fn hooks_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Arc<dyn WebHook>> + 'a {
        self.hooks
            .iter()
            .filter(move |(pattern, _)| pattern_matches(pattern, path))
            .map(|(_, hook)| hook)
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }
}

impl RouteBuilder for RouteTable {
    fn add_router(&mut self, class: &ComponentClass, _controller: Instance) {
        self.routes.push(RouteEntry {
            controller: class.type_name(),
            path: class.path().unwrap_or("/").to_string(),
        });
    }

    fn add_webhook(&mut self, pattern: &str, hook: Arc<dyn WebHook>) {
        self.hooks.push((pattern.to_string(), hook));
    }

    fn register(&mut self) {
        self.registered = true;
    }
}

fn pattern_matches(pattern: &str, path: &str) -> bool {
    match pattern.strip_suffix(".*") {
        Some(prefix) => path.starts_with(prefix),
        None => pattern == path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Audit;
    impl WebHook for Audit {}

    #[test]
    fn wildcard_pattern_matches_prefix() {
        let mut table = RouteTable::new();
        table.add_webhook("/.*", Arc::new(Audit));
        table.add_webhook("/admin/.*", Arc::new(Audit));
        table.add_webhook("/login", Arc::new(Audit));

        assert_eq!(table.hooks_for("/admin/users").count(), 2);
        assert_eq!(table.hooks_for("/login").count(), 2);
        assert_eq!(table.hooks_for("/logout").count(), 1);
    }
}
