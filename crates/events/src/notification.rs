//! Log entries about published events.

use chrono::{DateTime, Utc};

use factline_core::{
    ChildFact, DomainError, DomainResult, Entity, Fact, IdentifiableFact, Identifier, Immutable,
    LocalOnlyDerivation,
};

use crate::event::DomainEvent;

/// Child fact recording that an identified event was logged.
///
/// The log's identity is its own `notification_log_id` identifier and does
/// not depend on the logged subject, so the same log id stays stable whatever
/// event it is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationLog {
    inner: ChildFact<Entity, LocalOnlyDerivation>,
}

impl NotificationLog {
    pub const IDENTIFIER_NAME: &'static str = "notification_log_id";

    pub fn new(logged: &DomainEvent, log_id: Identifier) -> DomainResult<Self> {
        if log_id.name() != Self::IDENTIFIER_NAME {
            return Err(DomainError::invalid_argument(format!(
                "log identifier name must be {:?}",
                Self::IDENTIFIER_NAME
            )));
        }
        let subject = logged.identity()?.ok_or_else(|| {
            DomainError::invalid_argument("only identified events can be logged")
        })?;
        Ok(Self {
            inner: ChildFact::new(&subject, Some(log_id), LocalOnlyDerivation)?,
        })
    }

    /// Log with a freshly generated time-ordered id.
    pub fn generate(logged: &DomainEvent) -> DomainResult<Self> {
        Self::new(logged, Identifier::generate(Self::IDENTIFIER_NAME)?)
    }

    /// Independent copy of the logged event's identity.
    pub fn subject(&self) -> DomainResult<Entity> {
        self.inner.parent()
    }
}

impl Fact for NotificationLog {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.inner.occurred_at()
    }
}

impl IdentifiableFact for NotificationLog {
    fn identifiers(&self) -> &[Identifier] {
        self.inner.identifiers()
    }

    fn identified(&self) -> DomainResult<Option<Identifier>> {
        self.inner.identified()
    }
}

impl Immutable for NotificationLog {
    fn immutable(&self) -> DomainResult<Self> {
        Ok(Self {
            inner: self.inner.immutable()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identified_event(value: &str) -> DomainEvent {
        let entity = Entity::identified_by(Identifier::new("uuid", value).unwrap()).unwrap();
        DomainEvent::identified_by(&entity).unwrap()
    }

    #[test]
    fn identity_is_the_log_id_only() {
        let log_id = Identifier::new(NotificationLog::IDENTIFIER_NAME, "log-1").unwrap();
        let a = NotificationLog::new(&identified_event("e-1"), log_id.clone()).unwrap();
        let b = NotificationLog::new(&identified_event("e-2"), log_id).unwrap();

        assert_eq!(a.identified().unwrap().unwrap().value(), "log-1");
        assert_eq!(a, b);
        assert_eq!(a.subject().unwrap().identity().unwrap().value(), "e-1");
    }

    #[test]
    fn rejects_foreign_identifier_name() {
        let err = NotificationLog::new(
            &identified_event("e-1"),
            Identifier::new("uuid", "log-1").unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_anonymous_event() {
        let err = NotificationLog::generate(&DomainEvent::new()).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
    }

    #[test]
    fn generated_logs_are_distinct() {
        let event = identified_event("e-1");
        let a = NotificationLog::generate(&event).unwrap();
        let b = NotificationLog::generate(&event).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.immutable().unwrap(), a);
    }
}
