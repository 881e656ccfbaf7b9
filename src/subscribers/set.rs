//! # Event fan-out.
//!
//! [`SubscriberSet`] drains a bus receiver and hands every event to each
//! subscriber's bounded queue.
//!
//! ```text
//! Bus ──► listen(rx) ──► emit(event)
//!                          ├──► [queue 1] ──► worker 1 ──► sub1.on_event()
//!                          └──► [queue N] ──► worker N ──► subN.on_event()
//!                                               └── panic → SubscriberPanicked
//! ```
//!
//! ## Rules
//! - `emit` never blocks: a full queue drops the event for that subscriber
//!   and publishes `SubscriberOverflow`.
//! - Health events are not re-published when they overflow themselves.
//! - A panic in `on_event` is caught; the worker keeps going.
//! - Workers are spawned on the runtime that calls [`SubscriberSet::new`].

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::panic_message;
use crate::events::{Bus, Event};
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Per-subscriber queues and workers.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Spawns one worker per subscriber. Must be called inside a tokio runtime.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let worker_bus = bus.clone();

            workers.push(tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = sub.on_event(ev.as_ref());
                    if let Err(payload) = AssertUnwindSafe(fut).catch_unwind().await {
                        worker_bus.publish(Event::subscriber_panicked(
                            sub.name(),
                            panic_message(payload.as_ref()),
                        ));
                    }
                }
            }));
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self {
            channels,
            workers,
            bus,
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Queues the event for every subscriber.
    pub fn emit(&self, event: Arc<Event>) {
        let health = event.is_subscriber_health();
        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !health {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }

    /// Forwards bus events until `stop` fires (or the bus closes), then drains the workers.
    ///
    /// Events already queued on `rx` are forwarded before `stop` is honoured.
    pub async fn listen(self, mut rx: broadcast::Receiver<Event>, stop: CancellationToken) {
        loop {
            let received = tokio::select! {
                biased;
                received = rx.recv() => received,
                _ = stop.cancelled() => break,
            };
            match received {
                Ok(ev) => self.emit(Arc::new(ev)),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(skipped = n, "subscriber listener lagged behind the bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
        debug!("stopping subscribers");
        self.shutdown().await;
    }

    /// Closes every queue and waits for the workers to finish.
    pub async fn shutdown(self) {
        drop(self.channels);
        for worker in self.workers {
            let _ = worker.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Subscribe for Counting {
        async fn on_event(&self, _ev: &Event) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    struct Panicky;

    #[async_trait]
    impl Subscribe for Panicky {
        async fn on_event(&self, _ev: &Event) {
            panic!("subscriber exploded");
        }
        fn name(&self) -> &'static str {
            "panicky"
        }
    }

    #[tokio::test]
    async fn panicking_subscriber_does_not_starve_others() {
        let bus = Bus::default();
        let mut health = bus.subscribe();
        let seen = Arc::new(AtomicUsize::new(0));
        let set = SubscriberSet::new(
            vec![
                Arc::new(Panicky) as Arc<dyn Subscribe>,
                Arc::new(Counting(Arc::clone(&seen))),
            ],
            bus.clone(),
        );

        set.emit(Arc::new(Event::new(EventKind::ServerStarted)));
        set.emit(Arc::new(Event::new(EventKind::ShutdownRequested)));
        set.shutdown().await;

        assert_eq!(seen.load(Ordering::SeqCst), 2);
        let ev = health.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.component.as_deref(), Some("panicky"));
    }

    #[tokio::test]
    async fn listen_forwards_until_stopped() {
        let bus = Bus::default();
        let seen = Arc::new(AtomicUsize::new(0));
        let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Counting(Arc::clone(&seen)))];
        let set = SubscriberSet::new(subs, bus.clone());
        let stop = CancellationToken::new();
        let listener = tokio::spawn(set.listen(bus.subscribe(), stop.clone()));

        bus.publish(Event::new(EventKind::TaskScheduled));
        bus.publish(Event::new(EventKind::TaskFiring));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        stop.cancel();
        listener.await.unwrap();

        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }
}
