//! Entity: a fact whose identity is the canonical combination of its identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};
use crate::fact::{Fact, IdentifiableFact, identified_equals};
use crate::identifier::Identifier;
use crate::immutable::{Immutable, Uniqueness};

/// Separator between names in a combined identifier.
const NAME_SEPARATOR: &str = "+";
/// Separator between values in a combined identifier.
const VALUE_SEPARATOR: &str = ":";

/// Identifiable fact with an ordered, duplicate-free identifier set.
///
/// The canonical identity is computed on demand from the set:
/// - a single identifier is its own canonical identity;
/// - several identifiers combine into one, names joined with `+` and values
///   joined with `:`, in insertion order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    identifiers: Vec<Identifier>,
    occurred_at: DateTime<Utc>,
}

impl Entity {
    /// Create an entity observed now.
    pub fn new(identifiers: impl IntoIterator<Item = Identifier>) -> DomainResult<Self> {
        Self::at(identifiers, Utc::now())
    }

    /// Create an entity with an explicit creation time (rehydration, tests).
    pub fn at(
        identifiers: impl IntoIterator<Item = Identifier>,
        occurred_at: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let mut set: Vec<Identifier> = Vec::new();
        for id in identifiers {
            if !id.is_well_formed() {
                return Err(DomainError::invalid_argument(
                    "every entity identifier requires a name and a value",
                ));
            }
            if !set.contains(&id) {
                set.push(id);
            }
        }
        if set.is_empty() {
            return Err(DomainError::invalid_argument(
                "an entity requires at least one identifier",
            ));
        }
        Ok(Self {
            identifiers: set,
            occurred_at,
        })
    }

    /// Shorthand for a single-identifier entity.
    pub fn identified_by(id: Identifier) -> DomainResult<Self> {
        Self::new([id])
    }

    /// Canonical identity; never absent for an entity.
    pub fn identity(&self) -> DomainResult<Identifier> {
        combine(&self.identifiers)
    }
}

fn combine(identifiers: &[Identifier]) -> DomainResult<Identifier> {
    match identifiers {
        [] => Err(DomainError::immutability("entity has no identifier")),
        [single] => single.immutable(),
        many => {
            let parts = many
                .iter()
                .map(Immutable::immutable)
                .collect::<DomainResult<Vec<_>>>()?;
            let name = parts
                .iter()
                .map(Identifier::name)
                .collect::<Vec<_>>()
                .join(NAME_SEPARATOR);
            let value = parts
                .iter()
                .map(Identifier::value)
                .collect::<Vec<_>>()
                .join(VALUE_SEPARATOR);
            Identifier::new(name, value).map_err(|e| DomainError::immutability(e.to_string()))
        }
    }
}

impl Fact for Entity {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl IdentifiableFact for Entity {
    fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    fn identified(&self) -> DomainResult<Option<Identifier>> {
        self.identity().map(Some)
    }
}

impl Immutable for Entity {
    fn immutable(&self) -> DomainResult<Self> {
        let copies = self
            .identifiers
            .iter()
            .map(Immutable::immutable)
            .collect::<DomainResult<Vec<_>>>()?;
        Self::at(copies, self.occurred_at).map_err(|e| DomainError::immutability(e.to_string()))
    }
}

impl Uniqueness for Entity {
    const BASED_ON: &'static [&'static str] = &["identifiers"];
}

impl PartialEq for Entity {
    fn eq(&self, other: &Self) -> bool {
        identified_equals(self, other)
    }
}
