//! Broadcast channel carrying build events to any number of listeners.

use tokio::sync::broadcast;

use crate::types::{Event, EventEnvelope};

/// Pull and push output is forwarded line by line, so leave room for bursts.
const DEFAULT_CAPACITY: usize = 4096;

/// Fan-out of build events.
///
/// Sending never blocks and never fails: with no listener the event is
/// dropped, and a listener that falls more than `capacity` events behind
/// sees a `Lagged` error on its next receive. The channel closes once every
/// clone of the bus is gone.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Stamp `event` and hand it to every current listener. Returns how
    /// many listeners it reached.
    pub fn send(&self, event: Event) -> usize {
        self.tx.send(EventEnvelope::new(event)).unwrap_or(0)
    }

    /// Listen for events sent from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
