//! Named attributes describing an event or command ("specification").

use serde::{Deserialize, Serialize};

use factline_core::{DomainError, DomainResult};

/// A `(name, value)` pair contributing to the definition of an event.
///
/// New event kinds are expressed through attribute content (e.g. a `type`
/// attribute) rather than through new Rust types, so routing code can
/// discriminate on values without knowing the concrete event.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::invalid_argument("attribute name is required"));
        }
        Ok(Self {
            name,
            value: value.into(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn is_well_formed(&self) -> bool {
        !self.name.trim().is_empty()
    }
}

/// First attribute named `name` in `specification`, if any.
pub fn find_by_name<'a>(name: &str, specification: &'a [Attribute]) -> Option<&'a Attribute> {
    specification.iter().find(|a| a.name == name)
}
