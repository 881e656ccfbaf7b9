//! # Event bus.
//!
//! [`Bus`] wraps [`tokio::sync::broadcast`]. Publishing never blocks and
//! works from any thread, including cron pool workers and the signal hook.
//!
//! ```text
//! Server ──────┐
//! Scheduler ───┼──► Bus ──► housekeeping listener ──► SubscriberSet
//! Registrar ───┘
//! ```
//!
//! ## Rules
//! - Events sent while no receiver exists are dropped.
//! - Slow receivers observe `Lagged(n)` and skip the `n` oldest events.

use tokio::sync::broadcast;

use super::event::Event;

/// Default ring buffer size.
pub const DEFAULT_BUS_CAPACITY: usize = 1024;

/// Broadcast channel for runtime events. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus; capacity is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Receiver that observes events sent after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

impl Default for Bus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn subscriber_sees_events_after_subscribe() {
        let bus = Bus::new(0);
        bus.publish(Event::new(EventKind::ServerStarting));

        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ServerStarted));
        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ServerStarted);
    }
}
