use core::any::Any;
use core::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use factline_core::{
    DomainError, DomainResult, Entity, Fact, IdentifiableFact, Identifier, Immutable, Uniqueness,
    Versioned, identified_equals,
};

use crate::attribute::{self, Attribute};
use crate::reference::EventReference;

/// Anything that can be handed to a [`DomainEventPublisher`](crate::DomainEventPublisher).
///
/// Events are:
/// - **immutable** (treat them as facts)
/// - **timestamped** at construction
/// - matched to subscribers by runtime type, or as domain events in general
pub trait Event: Any + core::fmt::Debug {
    /// When the event occurred (business time).
    fn occurred_at(&self) -> DateTime<Utc>;

    /// `Some` when this message is a [`DomainEvent`].
    fn as_domain_event(&self) -> Option<&DomainEvent> {
        None
    }

    fn as_any(&self) -> &dyn Any;
}

/// Something that happened in the system.
///
/// A domain event is optionally identifiable, carries a creation time fixed at
/// construction, and an append-only attribute list (its *specification*).
/// By convention its `type` attribute names the occurrence in the past tense
/// (`ViewCreated`, `OrderConfirmed`).
///
/// Two events are equal iff their identities are equal; an anonymous event is
/// only equal to itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    identity: Option<Entity>,
    occurred_on: DateTime<Utc>,
    #[serde(default)]
    specification: Vec<Attribute>,
}

impl DomainEvent {
    /// Well-known attribute carrying the event type discriminator.
    pub const TYPE: &'static str = "type";

    /// Anonymous event occurring now.
    pub fn new() -> Self {
        Self {
            identity: None,
            occurred_on: Utc::now(),
            specification: Vec::new(),
        }
    }

    /// Identifiable event occurring now; the identity is captured as an independent copy.
    pub fn identified_by(identity: &Entity) -> DomainResult<Self> {
        Ok(Self {
            identity: Some(identity.immutable()?),
            ..Self::new()
        })
    }

    /// Anonymous event with its `type` attribute set.
    pub fn of_type(event_type: &str) -> DomainResult<Self> {
        let mut event = Self::new();
        event.push(Attribute::new(Self::TYPE, event_type)?);
        Ok(event)
    }

    /// Independent copy of the identity, or `None` for anonymous events.
    pub fn identity(&self) -> DomainResult<Option<Entity>> {
        self.identity.as_ref().map(Immutable::immutable).transpose()
    }

    pub fn occurred_on(&self) -> DateTime<Utc> {
        self.occurred_on
    }

    /// Read-only view of the attribute list, in insertion order.
    pub fn specification(&self) -> &[Attribute] {
        &self.specification
    }

    /// Append an attribute, write-once per name.
    ///
    /// Soft-failure contract: returns `false` (no error) when an attribute with
    /// the same name already exists or the attribute is malformed.
    pub fn append_specification(&mut self, attribute: Attribute) -> bool {
        if !attribute.is_well_formed() || self.find_specification(attribute.name()).is_some() {
            return false;
        }
        self.push(attribute);
        true
    }

    pub fn find_specification(&self, name: &str) -> Option<&Attribute> {
        attribute::find_by_name(name, &self.specification)
    }

    /// Value of the `type` attribute, if present.
    pub fn event_type(&self) -> Option<&str> {
        self.find_specification(Self::TYPE).map(Attribute::value)
    }

    /// Snapshot reference to this event's identity; `None` for anonymous events.
    pub fn reference(&self) -> DomainResult<Option<EventReference>> {
        match &self.identity {
            Some(identity) => EventReference::new(identity, None, None).map(Some),
            None => Ok(None),
        }
    }

    fn push(&mut self, attribute: Attribute) {
        self.specification.push(attribute);
    }
}

impl Default for DomainEvent {
    fn default() -> Self {
        Self::new()
    }
}

impl Event for DomainEvent {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_on
    }

    fn as_domain_event(&self) -> Option<&DomainEvent> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Fact for DomainEvent {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_on
    }
}

impl IdentifiableFact for DomainEvent {
    fn identifiers(&self) -> &[Identifier] {
        self.identity
            .as_ref()
            .map(IdentifiableFact::identifiers)
            .unwrap_or(&[])
    }

    fn identified(&self) -> DomainResult<Option<Identifier>> {
        self.identity.as_ref().map(Entity::identity).transpose()
    }
}

impl Immutable for DomainEvent {
    fn immutable(&self) -> DomainResult<Self> {
        if let Some(bad) = self.specification.iter().find(|a| !a.is_well_formed()) {
            return Err(DomainError::immutability(format!(
                "cannot duplicate event with malformed attribute {:?}",
                bad.name()
            )));
        }
        Ok(Self {
            identity: self.identity()?,
            occurred_on: self.occurred_on,
            specification: self.specification.clone(),
        })
    }
}

impl Uniqueness for DomainEvent {
    const BASED_ON: &'static [&'static str] = &["identity"];
}

impl Versioned for DomainEvent {
    const TYPE_NAME: &'static str = "domain_event";
    const SCHEMA_VERSION: u32 = 1;
}

impl PartialEq for DomainEvent {
    fn eq(&self, other: &Self) -> bool {
        core::ptr::eq(self, other) || identified_equals(self, other)
    }
}

impl Eq for DomainEvent {}

impl Hash for DomainEvent {
    fn hash<H: Hasher>(&self, state: &mut H) {
        if let Ok(Some(id)) = self.identified() {
            id.hash(state);
        }
    }
}
