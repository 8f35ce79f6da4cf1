//! Domain events, commands and the mechanics that move them around:
//! in-process publish/subscribe, projection handler contracts and the
//! transport envelope.

pub mod attribute;
pub mod command;
pub mod envelope;
pub mod event;
pub mod in_memory_transport;
pub mod notification;
pub mod projection;
pub mod publisher;
pub mod query;
pub mod reference;
pub mod transport;

pub use attribute::Attribute;
pub use command::Command;
pub use envelope::{EnvelopeError, EventEnvelope, Message, MessageKind};
pub use event::{DomainEvent, Event};
pub use in_memory_transport::{InMemoryTransport, InMemoryTransportError};
pub use notification::NotificationLog;
pub use projection::{
    NoopObserver, ProjectionError, ProjectionRead, ProjectionTransaction, TransactionOutcome,
    TransactionStateObserver,
};
pub use publisher::{DomainEventPublisher, EventSubscriber, Interest, PublishError};
pub use query::QueryResponse;
pub use reference::EventReference;
pub use transport::{MessageTransport, Subscription};
