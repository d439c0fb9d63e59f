//! Typed pub/sub event bus (§4.F).
//!
//! `emit` delivers synchronously to every subscriber of the event's kind,
//! in FIFO order per publisher, awaiting each listener in turn so a panic
//! or error inside one listener never prevents delivery to the rest.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{error, warn};

/// Closed enumeration of domain events (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    MountSlewStarted,
    MountSlewComplete,
    WeatherSafe,
    WeatherUnsafe,
    SafetyStateChanged,
    GuidingLost,
    GuidingSettled,
    SessionStarted,
    SessionEnded,
    ImageCaptured,
    ServiceStarted,
    ServiceStopped,
    ServiceError,
    ShutdownInitiated,
}

/// A single emitted event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorEvent {
    pub kind: EventKind,
    pub source: String,
    pub data: HashMap<String, Value>,
    pub message: String,
    pub at: DateTime<Utc>,
}

impl OrchestratorEvent {
    pub fn new(kind: EventKind, source: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            source: source.into(),
            data: HashMap::new(),
            message: message.into(),
            at: Utc::now(),
        }
    }

    pub fn with_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }
}

/// A listener callback. Implementors should not block for long: the
/// emitter awaits each listener before moving to the next.
#[async_trait::async_trait]
pub trait Listener: Send + Sync {
    async fn handle(&self, event: &OrchestratorEvent);
}

#[async_trait::async_trait]
impl<F> Listener for F
where
    F: Fn(&OrchestratorEvent) + Send + Sync,
{
    async fn handle(&self, event: &OrchestratorEvent) {
        self(event);
    }
}

struct Subscription {
    id: u64,
    listener: Arc<dyn Listener>,
}

#[derive(Default)]
pub struct EventBus {
    subscribers: RwLock<HashMap<EventKind, Vec<Subscription>>>,
    next_id: std::sync::atomic::AtomicU64,
}

/// An opaque handle returned by `subscribe`, used to `unsubscribe` later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64, EventKind);

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn subscribe(&self, kind: EventKind, listener: Arc<dyn Listener>) -> SubscriptionId {
        let id = self
            .next_id
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        let mut subs = self.subscribers.write().await;
        subs.entry(kind).or_default().push(Subscription { id, listener });
        SubscriptionId(id, kind)
    }

    pub async fn unsubscribe(&self, handle: SubscriptionId) {
        let mut subs = self.subscribers.write().await;
        if let Some(list) = subs.get_mut(&handle.1) {
            list.retain(|s| s.id != handle.0);
        }
    }

    /// Delivers `event` to every subscriber of `event.kind`, in
    /// registration order, awaiting each one before moving to the next so
    /// ordering is FIFO per publisher-subscriber pair (§3 invariant).
    pub async fn emit(&self, event: OrchestratorEvent) {
        let listeners: Vec<Arc<dyn Listener>> = {
            let subs = self.subscribers.read().await;
            match subs.get(&event.kind) {
                Some(list) => list.iter().map(|s| s.listener.clone()).collect(),
                None => return,
            }
        };

        for listener in listeners {
            // Listener panics must not take down the bus or stop delivery
            // to the remaining subscribers.
            let result = std::panic::AssertUnwindSafe(listener.handle(&event))
                .catch_unwind()
                .await;
            if result.is_err() {
                error!(kind = ?event.kind, source = %event.source, "listener panicked handling event");
            }
        }
        if event.message.is_empty() {
            warn!(kind = ?event.kind, "event emitted with empty message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(Arc<AtomicUsize>);

    #[async_trait::async_trait]
    impl Listener for Counter {
        async fn handle(&self, _event: &OrchestratorEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn subscribe_emit_unsubscribe_invokes_exactly_once() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let handle = bus
            .subscribe(EventKind::WeatherUnsafe, Arc::new(Counter(count.clone())))
            .await;

        bus.emit(OrchestratorEvent::new(EventKind::WeatherUnsafe, "test", "first"))
            .await;
        bus.unsubscribe(handle).await;
        bus.emit(OrchestratorEvent::new(EventKind::WeatherUnsafe, "test", "second"))
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_kinds_do_not_cross_deliver() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        bus.subscribe(EventKind::SessionStarted, Arc::new(Counter(count.clone())))
            .await;

        bus.emit(OrchestratorEvent::new(EventKind::SessionEnded, "test", "noop"))
            .await;

        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
