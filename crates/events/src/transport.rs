//! Cross-context message transport (mechanics only).
//!
//! The in-process [`DomainEventPublisher`](crate::DomainEventPublisher) is
//! scoped to one execution context. Getting a message from one context to
//! another (a producer thread to a projection worker) is the job of a
//! transport:
//!
//! ```text
//! producer → MessageTransport (publish EventEnvelope) → Subscription
//!                                                          └─ worker → DomainEventPublisher → routers
//! ```
//!
//! Delivery is at-least-once and unordered across producers; redelivery and
//! retry policies belong to the transport implementation, never to the
//! routers fed by it.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvError, RecvTimeoutError, TryRecvError};
use std::time::Duration;

/// Receiving end of a transport subscription.
///
/// Each subscription gets its own copy of every message published after it
/// was created (broadcast). Intended for a single consuming thread.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message is available.
    pub fn recv(&self) -> Result<M, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Broadcast transport shared between threads.
pub trait MessageTransport<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    /// Deliver `message` to every live subscription; returns how many received it.
    fn publish(&self, message: M) -> Result<usize, Self::Error>;

    /// Subscribe to messages published from now on.
    fn subscribe(&self) -> Subscription<M>;

    /// Subscribe starting from the oldest message the transport still retains.
    ///
    /// This is how a projection is rebuilt: a fresh worker replays the retained
    /// history and then keeps following live messages, with nothing missed or
    /// delivered twice in between. Transports that retain nothing behave like
    /// [`subscribe`](Self::subscribe).
    fn subscribe_from_start(&self) -> Subscription<M> {
        self.subscribe()
    }
}

impl<M, T> MessageTransport<M> for Arc<T>
where
    T: MessageTransport<M> + ?Sized,
{
    type Error = T::Error;

    fn publish(&self, message: M) -> Result<usize, Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }

    fn subscribe_from_start(&self) -> Subscription<M> {
        (**self).subscribe_from_start()
    }
}
