//! Dereference-safe pointers to entities.

use serde::{Deserialize, Serialize};

use factline_core::{DomainResult, Entity, Immutable, RelationRole};

/// Frozen pointer to an entity, optionally qualified by a relation role.
///
/// Holds a copy of the referenced entity's identity taken when the reference
/// was created, never a live handle, so it can outlive the referenced object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventReference {
    target: Entity,
    relation: Option<RelationRole>,
    label: Option<String>,
}

impl EventReference {
    pub fn new(
        target: &Entity,
        relation: Option<RelationRole>,
        label: Option<String>,
    ) -> DomainResult<Self> {
        Ok(Self {
            target: target.immutable()?,
            relation: relation.as_ref().map(Immutable::immutable).transpose()?,
            label: label.filter(|l| !l.is_empty()),
        })
    }

    /// Independent copy of the referenced entity.
    pub fn target(&self) -> DomainResult<Entity> {
        self.target.immutable()
    }

    pub fn relation(&self) -> Option<&RelationRole> {
        self.relation.as_ref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl Immutable for EventReference {
    fn immutable(&self) -> DomainResult<Self> {
        Self::new(&self.target, self.relation.clone(), self.label.clone())
    }
}
