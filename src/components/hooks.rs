//! Capability traits a component can implement.

use crate::core::Application;

/// Request interceptor registered per URL pattern.
pub trait WebHook: Send + Sync + 'static {
    /// Called before the route handler; `false` aborts the request.
    fn before(&self, _path: &str) -> bool {
        true
    }

    fn after(&self, _path: &str) -> bool {
        true
    }
}

/// Startup hook run after registration, in two ordered passes.
pub trait Loader: Send + Sync + 'static {
    /// Lower runs first. A class-level `order` marker overrides this.
    fn order(&self) -> i32 {
        0
    }

    fn pre_load(&self, _app: &Application) {}

    fn load(&self, app: &Application);
}

/// The single application-wide error handler.
pub trait ExceptionHandler: Send + Sync + 'static {
    fn handle(&self, error: &(dyn std::error::Error + 'static));
}
