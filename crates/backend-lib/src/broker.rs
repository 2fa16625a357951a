// ============================
// crates/backend-lib/src/broker.rs
// ============================
//! Fan-out Broker: per-event push topics.
//!
//! One broadcast channel per event; publishing never waits on subscriber
//! delivery and provides no cross-subscriber ordering. Delivery is
//! at-least-once from the consumer's perspective: a lagged receiver is
//! told it fell behind and must re-fetch a snapshot, hints are never the
//! source of truth.
use dashmap::DashMap;
use eventdesk_common::{EventId, PushMessage, RoleScope};
use metrics::counter;
use tokio::sync::broadcast;

use crate::metrics::{FANOUT_LAGGED, FANOUT_PUBLISHED};

/// Signal delivered to a topic subscriber
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelSignal {
    /// A refresh hint concerning this subscriber's scope
    Hint(PushMessage),
    /// The receiver fell behind and missed this many messages; the
    /// subscriber must resync from a snapshot
    Lagged(u64),
}

/// Publish/subscribe surface keyed by event id and role scope
pub struct FanoutBroker {
    topics: DashMap<EventId, broadcast::Sender<PushMessage>>,
    capacity: usize,
}

impl FanoutBroker {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity,
        }
    }

    fn topic(&self, event_id: EventId) -> broadcast::Sender<PushMessage> {
        self.topics
            .entry(event_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Publish a change hint to every live subscriber of the event's
    /// topic. Returns the number of receivers the hint reached.
    pub fn publish(&self, event_id: EventId, message: PushMessage) -> usize {
        let sender = self.topic(event_id);
        counter!(FANOUT_PUBLISHED).increment(1);
        // A topic with no subscribers is not an error
        sender.send(message).unwrap_or(0)
    }

    /// Register a live connection for (event, scope).
    pub fn subscribe(&self, event_id: EventId, scope: RoleScope) -> TopicReceiver {
        let rx = self.topic(event_id).subscribe();
        TopicReceiver { rx, scope }
    }

    pub fn subscriber_count(&self, event_id: EventId) -> usize {
        self.topics
            .get(&event_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }
}

/// Receiving half of a subscription, filtered to the subscriber's scope.
/// Dropping it unsubscribes immediately with no side effects.
pub struct TopicReceiver {
    rx: broadcast::Receiver<PushMessage>,
    scope: RoleScope,
}

impl TopicReceiver {
    /// Next signal for this subscriber: a scoped hint, or a lag notice
    /// meaning hints were missed. `None` when the topic closed.
    pub async fn next_signal(&mut self) -> Option<ChannelSignal> {
        loop {
            match self.rx.recv().await {
                Ok(message) if message.concerns(self.scope) => {
                    return Some(ChannelSignal::Hint(message));
                },
                Ok(_) => {},
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    counter!(FANOUT_LAGGED).increment(1);
                    return Some(ChannelSignal::Lagged(missed));
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Next scoped hint, skipping lag notices. Convenience for consumers
    /// that resync on every hint anyway.
    pub async fn recv(&mut self) -> Option<PushMessage> {
        loop {
            match self.next_signal().await? {
                ChannelSignal::Hint(message) => return Some(message),
                ChannelSignal::Lagged(_) => {},
            }
        }
    }

    /// Non-blocking variant of [`recv`](Self::recv); `None` when nothing
    /// is queued.
    pub fn try_recv(&mut self) -> Option<PushMessage> {
        loop {
            match self.rx.try_recv() {
                Ok(message) if message.concerns(self.scope) => return Some(message),
                Ok(_) => {},
                Err(broadcast::error::TryRecvError::Lagged(_)) => {},
                Err(_) => return None,
            }
        }
    }
}
