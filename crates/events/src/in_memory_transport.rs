//! In-memory transport for tests/dev.

use std::sync::{Mutex, MutexGuard, mpsc};

use thiserror::Error;
use tracing::{debug, trace};

use crate::transport::{MessageTransport, Subscription};

#[derive(Debug, Error)]
pub enum InMemoryTransportError {
    #[error("transport lock poisoned")]
    Poisoned,
}

#[derive(Debug)]
struct State<M> {
    subscribers: Vec<mpsc::Sender<M>>,
    /// Every published message, oldest first; `None` when nothing is retained.
    retained: Option<Vec<M>>,
}

/// In-memory broadcast transport over mpsc channels.
///
/// - No IO / no async
/// - Subscribers whose receiver was dropped are pruned on the next publish
/// - A [`retaining`](Self::retaining) transport keeps its full history so
///   projections can be rebuilt through
///   [`subscribe_from_start`](MessageTransport::subscribe_from_start)
#[derive(Debug)]
pub struct InMemoryTransport<M> {
    state: Mutex<State<M>>,
}

impl<M> InMemoryTransport<M> {
    /// Live-only transport: late subscribers see nothing published before them.
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport keeping every published message for replay.
    pub fn retaining() -> Self {
        Self {
            state: Mutex::new(State {
                subscribers: Vec::new(),
                retained: Some(Vec::new()),
            }),
        }
    }

    /// Number of live subscriptions as of the last publish.
    pub fn subscriber_count(&self) -> usize {
        self.state.lock().map(|s| s.subscribers.len()).unwrap_or(0)
    }

    /// Number of messages available for replay.
    pub fn retained_count(&self) -> usize {
        self.state
            .lock()
            .ok()
            .and_then(|s| s.retained.as_ref().map(Vec::len))
            .unwrap_or(0)
    }

    fn lock(&self) -> Result<MutexGuard<'_, State<M>>, InMemoryTransportError> {
        self.state.lock().map_err(|_| InMemoryTransportError::Poisoned)
    }
}

impl<M> Default for InMemoryTransport<M> {
    fn default() -> Self {
        Self {
            state: Mutex::new(State {
                subscribers: Vec::new(),
                retained: None,
            }),
        }
    }
}

impl<M> MessageTransport<M> for InMemoryTransport<M>
where
    M: Clone + Send + 'static,
{
    type Error = InMemoryTransportError;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        let mut state = self.lock()?;

        state.subscribers.retain(|tx| tx.send(message.clone()).is_ok());
        let delivered = state.subscribers.len();
        if let Some(retained) = state.retained.as_mut() {
            retained.push(message);
        }
        trace!(subscribers = delivered, "message published");

        Ok(delivered)
    }

    fn subscribe(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // A poisoned lock still yields a subscription; it just never receives.
        if let Ok(mut state) = self.state.lock() {
            state.subscribers.push(tx);
        }

        Subscription::new(rx)
    }

    fn subscribe_from_start(&self) -> Subscription<M> {
        let (tx, rx) = mpsc::channel();

        // Replay and registration happen under one lock, so no publish can
        // slip in between them.
        if let Ok(mut state) = self.state.lock() {
            let replayed = match state.retained.as_ref() {
                Some(retained) => {
                    for message in retained {
                        // The receiver is still in scope, the send cannot fail.
                        let _ = tx.send(message.clone());
                    }
                    retained.len()
                }
                None => 0,
            };
            debug!(replayed, "subscription replays retained messages");
            state.subscribers.push(tx);
        }

        Subscription::new(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn every_subscription_receives_a_copy() {
        let transport = InMemoryTransport::<u32>::new();
        let a = transport.subscribe();
        let b = transport.subscribe();

        assert_eq!(transport.publish(7).unwrap(), 2);

        assert_eq!(a.try_recv().unwrap(), 7);
        assert_eq!(b.recv_timeout(Duration::from_millis(50)).unwrap(), 7);
    }

    #[test]
    fn dropped_subscriptions_are_pruned() {
        let transport = Arc::new(InMemoryTransport::<u32>::new());
        let kept = transport.subscribe();
        drop(transport.subscribe());
        assert_eq!(transport.subscriber_count(), 2);

        assert_eq!(transport.publish(1).unwrap(), 1);
        assert_eq!(transport.subscriber_count(), 1);
        assert_eq!(kept.recv().unwrap(), 1);
    }

    #[test]
    fn late_subscribers_miss_earlier_messages() {
        let transport = InMemoryTransport::<u32>::new();
        assert_eq!(transport.publish(1).unwrap(), 0);
        let late = transport.subscribe();
        assert!(late.try_recv().is_err());
    }

    #[test]
    fn live_only_transport_replays_nothing() {
        let transport = InMemoryTransport::<u32>::new();
        transport.publish(1).unwrap();
        assert_eq!(transport.retained_count(), 0);

        let from_start = transport.subscribe_from_start();
        assert!(from_start.try_recv().is_err());
    }

    #[test]
    fn retaining_transport_replays_history_then_follows_live() {
        let transport = Arc::new(InMemoryTransport::<u32>::retaining());
        transport.publish(1).unwrap();
        transport.publish(2).unwrap();
        assert_eq!(transport.retained_count(), 2);

        let rebuild = transport.subscribe_from_start();
        let live = transport.subscribe();
        transport.publish(3).unwrap();

        let replayed: Vec<u32> = std::iter::from_fn(|| rebuild.try_recv().ok()).collect();
        assert_eq!(replayed, vec![1, 2, 3]);
        assert_eq!(live.try_recv().unwrap(), 3);
        assert!(live.try_recv().is_err());
    }
}
