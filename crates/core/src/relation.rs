//! Named, typed and directed relations between facts.

use core::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::immutable::{Immutable, Uniqueness, Versioned};

/// Logical type of a fact (e.g. `"department"`, `"domain_event"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactType(String);

impl FactType {
    pub fn new(name: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("fact type name is required"));
        }
        Ok(Self(name))
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for FactType {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role played by a relation between an owner fact and a target fact.
///
/// The name follows graph edge conventions (`"source->target"`) or a logical
/// relation name (`"composed of"`, `"delivered by"`). Two roles are the same
/// role when they share `name` and `owner_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationRole {
    name: String,
    id: String,
    owner_type: FactType,
    target_type: FactType,
}

impl RelationRole {
    /// Create a role; when `id` is absent or empty a location-independent id is
    /// generated from the role name (stable across processes).
    pub fn new(
        name: impl Into<String>,
        owner_type: FactType,
        target_type: FactType,
        id: Option<String>,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("role name is required"));
        }
        let id = match id {
            Some(id) if !id.is_empty() => id,
            _ => Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string(),
        };
        Ok(Self {
            name,
            id,
            owner_type,
            target_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn owner_type(&self) -> &FactType {
        &self.owner_type
    }

    pub fn target_type(&self) -> &FactType {
        &self.target_type
    }
}

impl Immutable for RelationRole {
    fn immutable(&self) -> DomainResult<Self> {
        Self::new(
            self.name.clone(),
            self.owner_type.clone(),
            self.target_type.clone(),
            Some(self.id.clone()),
        )
        .map_err(|e| DomainError::immutability(e.to_string()))
    }
}

impl Uniqueness for RelationRole {
    const BASED_ON: &'static [&'static str] = &["name", "owner_type"];
}

impl Versioned for RelationRole {
    const TYPE_NAME: &'static str = "relation_role";
    const SCHEMA_VERSION: u32 = 1;
}

impl PartialEq for RelationRole {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.owner_type == other.owner_type
    }
}

impl Eq for RelationRole {}

impl Hash for RelationRole {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.owner_type.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact_type(name: &str) -> FactType {
        FactType::new(name).unwrap()
    }

    #[test]
    fn generated_id_is_stable_for_a_name() {
        let a = RelationRole::new("composed of", fact_type("order"), fact_type("line"), None)
            .unwrap();
        let b = RelationRole::new(
            "composed of",
            fact_type("order"),
            fact_type("line"),
            Some(String::new()),
        )
        .unwrap();
        assert_eq!(a.id(), b.id());
        assert!(!a.id().is_empty());
    }

    #[test]
    fn explicit_id_is_kept() {
        let role =
            RelationRole::new("owns", fact_type("a"), fact_type("b"), Some("r-1".into())).unwrap();
        assert_eq!(role.id(), "r-1");
    }

    #[test]
    fn rejects_missing_name() {
        let err = RelationRole::new(" ", fact_type("a"), fact_type("b"), None).unwrap_err();
        assert!(matches!(err, DomainError::InvalidArgument(_)));
        assert!(FactType::new("").is_err());
    }

    #[test]
    fn equality_uses_name_and_owner_type_only() {
        let a = RelationRole::new("owns", fact_type("a"), fact_type("b"), Some("1".into())).unwrap();
        let b = RelationRole::new("owns", fact_type("a"), fact_type("c"), Some("2".into())).unwrap();
        let c = RelationRole::new("owns", fact_type("x"), fact_type("b"), None).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.immutable().unwrap(), a);
    }
}
