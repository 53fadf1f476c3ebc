//! Broadcast of engine events to subscribers.

use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Fan-out of events to any number of subscribers.
///
/// Each subscriber owns an unbounded channel, so a slow reader never blocks
/// the emitting workflow and every subscriber sees every event exactly once,
/// in emission order. Subscribers whose receiver was dropped are pruned on
/// the next emit.
#[derive(Debug)]
pub struct EventBus<E> {
    subscribers: Mutex<Vec<mpsc::UnboundedSender<E>>>,
}

impl<E> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl<E: Clone> EventBus<E> {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<E> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.lock().push(tx);
        rx
    }

    /// Deliver an event to every live subscriber.
    pub fn emit(&self, event: E) {
        // Held across the sends so all subscribers observe one global order.
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Number of live subscribers as of the last emit.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
