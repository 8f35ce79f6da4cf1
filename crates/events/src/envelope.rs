use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use factline_core::Versioned;

use crate::command::Command;
use crate::event::{DomainEvent, Event};

/// Kind of message carried by an [`EventEnvelope`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Event,
    Command,
}

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("failed to serialize {kind:?} payload: {source}")]
    Serialize {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize {kind:?} payload: {source}")]
    Deserialize {
        kind: MessageKind,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported {kind:?} schema version {found} (expected {expected})")]
    UnsupportedSchema {
        kind: MessageKind,
        found: u32,
        expected: u32,
    },
}

/// Unit moved by a [`MessageTransport`](crate::MessageTransport).
///
/// Notes:
/// - `message_id` is time-ordered (UUIDv7), assigned when the envelope is built.
/// - `schema_version` is the payload type's declared version and is checked on decode.
/// - `payload` is the serialized event or command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    message_id: Uuid,
    kind: MessageKind,
    schema_version: u32,
    payload: JsonValue,
}

impl EventEnvelope {
    pub fn encode_event(event: &DomainEvent) -> Result<Self, EnvelopeError> {
        Self::encode(MessageKind::Event, DomainEvent::SCHEMA_VERSION, event)
    }

    pub fn encode_command(command: &Command) -> Result<Self, EnvelopeError> {
        Self::encode(MessageKind::Command, Command::SCHEMA_VERSION, command)
    }

    fn encode<T: Serialize>(
        kind: MessageKind,
        schema_version: u32,
        value: &T,
    ) -> Result<Self, EnvelopeError> {
        let payload = serde_json::to_value(value)
            .map_err(|source| EnvelopeError::Serialize { kind, source })?;
        Ok(Self {
            message_id: Uuid::now_v7(),
            kind,
            schema_version,
            payload,
        })
    }

    pub fn decode(&self) -> Result<Message, EnvelopeError> {
        let kind = self.kind;
        let expected = match kind {
            MessageKind::Event => DomainEvent::SCHEMA_VERSION,
            MessageKind::Command => Command::SCHEMA_VERSION,
        };
        if self.schema_version != expected {
            return Err(EnvelopeError::UnsupportedSchema {
                kind,
                found: self.schema_version,
                expected,
            });
        }
        let map_err = |source| EnvelopeError::Deserialize { kind, source };
        match kind {
            MessageKind::Event => serde_json::from_value(self.payload.clone())
                .map(Message::Event)
                .map_err(map_err),
            MessageKind::Command => serde_json::from_value(self.payload.clone())
                .map(Message::Command)
                .map_err(map_err),
        }
    }

    pub fn message_id(&self) -> Uuid {
        self.message_id
    }

    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn payload(&self) -> &JsonValue {
        &self.payload
    }
}

/// Decoded content of an envelope.
#[derive(Debug, Clone)]
pub enum Message {
    Event(DomainEvent),
    Command(Command),
}

impl Message {
    /// The message as something a publisher can dispatch.
    pub fn as_event(&self) -> &dyn Event {
        match self {
            Self::Event(event) => event,
            Self::Command(command) => command,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Attribute;

    #[test]
    fn event_envelope_decodes_to_an_equal_event() {
        let mut event = DomainEvent::of_type("ViewCreated").unwrap();
        event.append_specification(Attribute::new("label", "X").unwrap());

        let envelope = EventEnvelope::encode_event(&event).unwrap();
        assert_eq!(envelope.kind(), MessageKind::Event);
        assert_eq!(envelope.schema_version(), 1);

        let Message::Event(decoded) = envelope.decode().unwrap() else {
            panic!("expected an event");
        };
        assert_eq!(decoded.event_type(), Some("ViewCreated"));
        assert_eq!(decoded.find_specification("label").unwrap().value(), "X");
        assert_eq!(decoded.occurred_on(), event.occurred_on());
    }

    #[test]
    fn command_envelope_keeps_kind() {
        let command = Command::of_type("FindByLabel").unwrap();
        let envelope = EventEnvelope::encode_command(&command).unwrap();
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["kind"], "command");

        let message = envelope.decode().unwrap();
        assert!(matches!(&message, Message::Command(c) if c.command_type() == Some("FindByLabel")));
        assert!(message.as_event().as_domain_event().is_none());
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let mut json = serde_json::to_value(EventEnvelope::encode_event(&DomainEvent::new()).unwrap())
            .unwrap();
        json["schema_version"] = 99.into();
        let envelope: EventEnvelope = serde_json::from_value(json).unwrap();
        assert!(matches!(
            envelope.decode(),
            Err(EnvelopeError::UnsupportedSchema { found: 99, .. })
        ));
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        let json = serde_json::json!({
            "message_id": Uuid::now_v7(),
            "kind": "event",
            "schema_version": 1,
            "payload": {"occurred_on": "not a date"}
        });
        let envelope: EventEnvelope = serde_json::from_value(json).unwrap();
        assert!(matches!(envelope.decode(), Err(EnvelopeError::Deserialize { .. })));
    }
}
