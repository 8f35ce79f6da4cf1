//! Synchronous in-process publish/subscribe dispatcher.
//!
//! A [`DomainEventPublisher`] is an explicit value owned by one execution
//! context (a worker thread, a task, a test). Clones share the same registry,
//! so a handler can hold a clone and publish through it; the registry is
//! `!Send` and never crosses threads. Isolation between concurrent activities
//! comes from each one creating its own publisher.
//!
//! ## Guards
//!
//! While a publish is in progress on a registry:
//! - a nested `publish` is dropped (no re-entrant fan-out)
//! - `subscribe`, `unsubscribe` and `reset` are ignored
//!
//! The in-progress flag is cleared by a drop guard, so a failing (or
//! panicking) subscriber never leaves the registry locked.

use core::any::{Any, TypeId};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::event::Event;

/// What a subscriber wants to receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interest {
    /// Every published message.
    AnyEvent,
    /// Every [`DomainEvent`](crate::DomainEvent), whatever its `type` attribute.
    DomainEvents,
    /// Messages of exactly this runtime type.
    Type(TypeId),
}

impl Interest {
    pub fn of<T: Any>() -> Self {
        Self::Type(TypeId::of::<T>())
    }

    pub fn matches(&self, event: &dyn Event) -> bool {
        match self {
            Self::AnyEvent => true,
            Self::DomainEvents => event.as_domain_event().is_some(),
            Self::Type(type_id) => Any::type_id(event.as_any()) == *type_id,
        }
    }
}

/// Receiver of published events.
pub trait EventSubscriber {
    fn interest(&self) -> Interest;

    fn handle_event(&self, event: &dyn Event) -> anyhow::Result<()>;

    /// Name used in logs and errors.
    fn name(&self) -> &str {
        core::any::type_name::<Self>()
    }
}

impl<S> EventSubscriber for Arc<S>
where
    S: EventSubscriber + ?Sized,
{
    fn interest(&self) -> Interest {
        (**self).interest()
    }

    fn handle_event(&self, event: &dyn Event) -> anyhow::Result<()> {
        (**self).handle_event(event)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("subscriber {subscriber} failed to handle event: {source}")]
    Subscriber {
        subscriber: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}

#[derive(Default)]
struct Registry {
    subscribers: RefCell<Vec<Rc<dyn EventSubscriber>>>,
    publishing: Cell<bool>,
}

/// Clears the in-progress flag when the fan-out ends, however it ends.
struct PublishingGuard<'a>(&'a Cell<bool>);

impl Drop for PublishingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// Per-context publisher; see the module docs for the guard rules.
#[derive(Clone, Default)]
pub struct DomainEventPublisher {
    inner: Rc<Registry>,
}

impl DomainEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber; returns `false` when ignored during a publish.
    pub fn subscribe(&self, subscriber: Rc<dyn EventSubscriber>) -> bool {
        if self.is_publishing() {
            debug!(subscriber = subscriber.name(), "subscribe ignored during publish");
            return false;
        }
        self.inner.subscribers.borrow_mut().push(subscriber);
        true
    }

    /// Remove a previously registered subscriber (matched by allocation).
    pub fn unsubscribe(&self, subscriber: &Rc<dyn EventSubscriber>) -> bool {
        if self.is_publishing() {
            debug!(subscriber = subscriber.name(), "unsubscribe ignored during publish");
            return false;
        }
        let target = Rc::as_ptr(subscriber) as *const ();
        let mut subscribers = self.inner.subscribers.borrow_mut();
        let before = subscribers.len();
        subscribers.retain(|s| Rc::as_ptr(s) as *const () != target);
        subscribers.len() != before
    }

    /// Deliver `event` to every interested subscriber, in registration order.
    ///
    /// Returns the number of subscribers that handled the event. A nested call
    /// made while a publish is in progress delivers nothing and returns `Ok(0)`.
    /// The first subscriber failure stops the fan-out and is returned.
    pub fn publish(&self, event: &dyn Event) -> Result<usize, PublishError> {
        if self.inner.publishing.replace(true) {
            debug!(?event, "re-entrant publish dropped");
            return Ok(0);
        }
        let _guard = PublishingGuard(&self.inner.publishing);

        let snapshot: Vec<Rc<dyn EventSubscriber>> = self.inner.subscribers.borrow().clone();
        let mut delivered = 0;
        for subscriber in snapshot.iter().filter(|s| s.interest().matches(event)) {
            trace!(subscriber = subscriber.name(), "delivering event");
            if let Err(err) = subscriber.handle_event(event) {
                warn!(subscriber = subscriber.name(), error = %err, "subscriber failed");
                return Err(PublishError::Subscriber {
                    subscriber: subscriber.name().to_string(),
                    source: err.into(),
                });
            }
            delivered += 1;
        }
        Ok(delivered)
    }

    /// Drop every subscriber; ignored during a publish.
    pub fn reset(&self) -> bool {
        if self.is_publishing() {
            debug!("reset ignored during publish");
            return false;
        }
        self.inner.subscribers.borrow_mut().clear();
        true
    }

    pub fn is_publishing(&self) -> bool {
        self.inner.publishing.get()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

impl core::fmt::Debug for DomainEventPublisher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DomainEventPublisher")
            .field("subscribers", &self.subscriber_count())
            .field("publishing", &self.is_publishing())
            .finish()
    }
}
