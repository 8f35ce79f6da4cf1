use core::any::Any;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use factline_core::{
    DomainError, DomainResult, Entity, Fact, IdentifiableFact, Identifier, Immutable, Versioned,
};

use crate::attribute::Attribute;
use crate::event::{DomainEvent, Event};
use crate::reference::EventReference;

/// A request addressed to a projection (write intent or read query).
///
/// Commands share the shape of a [`DomainEvent`]: optional identity, creation
/// time, and an attribute specification whose `type` attribute selects the
/// handler. They are not domain events themselves, so subscribers interested
/// in domain events in general do not receive them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Command {
    body: DomainEvent,
}

impl Command {
    /// Default attribute carrying the command/query type discriminator.
    pub const TYPE: &'static str = "type";

    /// Attribute carrying the correlation id (write-once).
    pub const CORRELATION_ID: &'static str = "correlation_id";

    pub fn new() -> Self {
        Self {
            body: DomainEvent::new(),
        }
    }

    pub fn identified_by(identity: &Entity) -> DomainResult<Self> {
        Ok(Self {
            body: DomainEvent::identified_by(identity)?,
        })
    }

    /// Anonymous command with its `type` attribute set.
    pub fn of_type(command_type: &str) -> DomainResult<Self> {
        let mut command = Self::new();
        if !command.append_specification(Attribute::new(Self::TYPE, command_type)?) {
            return Err(DomainError::invariant("type attribute already set"));
        }
        Ok(command)
    }

    /// Builder-style append; fails when the attribute name is already taken.
    pub fn with_attribute(mut self, name: &str, value: impl Into<String>) -> DomainResult<Self> {
        if !self.append_specification(Attribute::new(name, value)?) {
            return Err(DomainError::invalid_argument(format!(
                "attribute {name:?} is already specified"
            )));
        }
        Ok(self)
    }

    pub fn identity(&self) -> DomainResult<Option<Entity>> {
        self.body.identity()
    }

    pub fn occurred_on(&self) -> DateTime<Utc> {
        self.body.occurred_on()
    }

    pub fn specification(&self) -> &[Attribute] {
        self.body.specification()
    }

    /// Same write-once, soft-failure contract as [`DomainEvent::append_specification`].
    pub fn append_specification(&mut self, attribute: Attribute) -> bool {
        self.body.append_specification(attribute)
    }

    pub fn find_specification(&self, name: &str) -> Option<&Attribute> {
        self.body.find_specification(name)
    }

    pub fn command_type(&self) -> Option<&str> {
        self.find_specification(Self::TYPE).map(Attribute::value)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.find_specification(Self::CORRELATION_ID)
            .map(Attribute::value)
    }

    /// Assign the correlation id once; empty values and reassignments are ignored.
    pub fn assign_correlation_id(&mut self, value: &str) -> bool {
        if value.is_empty() {
            return false;
        }
        match Attribute::new(Self::CORRELATION_ID, value) {
            Ok(attribute) => self.append_specification(attribute),
            Err(_) => false,
        }
    }

    pub fn reference(&self) -> DomainResult<Option<EventReference>> {
        self.body.reference()
    }

    /// Structural check of the attribute list (deserialized commands skip constructors).
    pub fn check_well_formed(&self) -> DomainResult<()> {
        match self.specification().iter().find(|a| !a.is_well_formed()) {
            Some(_) => Err(DomainError::invalid_argument(
                "command specification contains an attribute without name",
            )),
            None => Ok(()),
        }
    }
}

impl Default for Command {
    fn default() -> Self {
        Self::new()
    }
}

impl Event for Command {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.body.occurred_on()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Fact for Command {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.body.occurred_on()
    }
}

impl IdentifiableFact for Command {
    fn identifiers(&self) -> &[Identifier] {
        self.body.identifiers()
    }

    fn identified(&self) -> DomainResult<Option<Identifier>> {
        self.body.identified()
    }
}

impl Immutable for Command {
    fn immutable(&self) -> DomainResult<Self> {
        Ok(Self {
            body: self.body.immutable()?,
        })
    }
}

impl Versioned for Command {
    const TYPE_NAME: &'static str = "command";
    const SCHEMA_VERSION: u32 = 1;
}
