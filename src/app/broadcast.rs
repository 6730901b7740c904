// LogRelay - app/broadcast.rs
//
// Publish/subscribe boundary for tail events.
//
// The real transport (WebSocket/STOMP topic, SSE, ...) is an external
// collaborator; the tail monitor only sees the `Broadcaster` trait.
// `ChannelBroadcaster` fans each event out to any number of mpsc subscribers,
// dropping subscribers whose receiving end has gone away.

use crate::core::model::TailEvent;
use std::sync::{mpsc, Mutex, PoisonError};

/// Sink for tail events. Publishing never fails from the caller's point of
/// view: a transport problem must not disturb monitoring.
///
/// Line events are published while the tail monitor holds its state lock, so
/// implementations must not call back into the monitor.
pub trait Broadcaster: Send + Sync {
    fn publish(&self, event: &TailEvent);
}

/// In-process fan-out over `std::sync::mpsc` channels.
#[derive(Debug, Default)]
pub struct ChannelBroadcaster {
    subscribers: Mutex<Vec<mpsc::Sender<TailEvent>>>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. It receives every event published after
    /// this call.
    pub fn subscribe(&self) -> mpsc::Receiver<TailEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(tx);
        rx
    }

    /// Number of live subscribers (as of the last publish).
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn publish(&self, event: &TailEvent) {
        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let before = subscribers.len();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
        if subscribers.len() < before {
            tracing::debug!(
                dropped = before - subscribers.len(),
                remaining = subscribers.len(),
                "Broadcaster: removed disconnected subscribers"
            );
        }
    }
}
