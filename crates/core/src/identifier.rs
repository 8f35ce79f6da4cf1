//! Named identifying information, the atomic unit of identity.

use core::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{DomainError, DomainResult};
use crate::immutable::{Immutable, Uniqueness};

/// A named, immutable identifying value.
///
/// Equality, ordering and hashing are based on `value` only: two identifiers
/// carrying the same value under different names designate the same thing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identifier {
    name: String,
    value: String,
}

impl Identifier {
    /// Build a validated identifier (both `name` and `value` non-empty).
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        let value = value.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("identifier name is required"));
        }
        if value.is_empty() {
            return Err(DomainError::invalid_argument(format!(
                "identifier value is required (name: {name})"
            )));
        }
        Ok(Self { name, value })
    }

    /// Create an identifier with a fresh time-ordered (UUIDv7) value.
    ///
    /// Prefer passing values explicitly in tests for determinism.
    pub fn generate(name: impl Into<String>) -> DomainResult<Self> {
        Self::new(name, Uuid::now_v7().to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    /// True when both name and value are present.
    ///
    /// Always true for values built through [`Identifier::new`]; deserialized
    /// values may not be.
    pub fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty() && !self.value.is_empty()
    }
}

impl Immutable for Identifier {
    fn immutable(&self) -> DomainResult<Self> {
        if !self.is_well_formed() {
            return Err(DomainError::immutability(format!(
                "cannot duplicate malformed identifier (name: {:?}, value: {:?})",
                self.name, self.value
            )));
        }
        Ok(Self {
            name: self.name.clone(),
            value: self.value.clone(),
        })
    }
}

impl Uniqueness for Identifier {
    const BASED_ON: &'static [&'static str] = &["value"];
}

impl PartialEq for Identifier {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for Identifier {}

impl Hash for Identifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl PartialOrd for Identifier {
    fn partial_cmp(&self, other: &Self) -> Option<core::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Identifier {
    fn cmp(&self, other: &Self) -> core::cmp::Ordering {
        self.value.cmp(&other.value)
    }
}

impl core::fmt::Display for Identifier {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}
