//! # Subscriber trait.
//!
//! `Subscribe` plugs custom event handlers into a running server. Each
//! subscriber gets its own bounded queue and worker task on the
//! housekeeping loop, so a slow subscriber never delays request handling
//! or task fires.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use bootvisor::{Event, EventKind, Subscribe};
//!
//! struct FailureAlerts;
//!
//! #[async_trait]
//! impl Subscribe for FailureAlerts {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::TaskFailed {
//!             // page someone
//!         }
//!     }
//!     fn name(&self) -> &'static str { "failure-alerts" }
//!     fn queue_capacity(&self) -> usize { 256 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    async fn on_event(&self, event: &Event);

    /// Name used in logs and health events.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue size; events beyond it are dropped for this subscriber only.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
