//! Immutability contracts: independent copies, declared uniqueness, schema versions.
//!
//! Facts are **never mutated** once built. Anything that must outlive the call
//! that produced it (a parent captured by a child, the identity carried by an
//! event, a reference handed to another component) is obtained through
//! [`Immutable::immutable`], which returns a fully independent copy.

use crate::error::DomainResult;

/// Produces an independent copy sharing no mutable state with the original.
///
/// Unlike `Clone`, duplication is fallible: implementations re-check that the
/// value they copy is still well-formed (data coming from a deserializer never
/// went through a validating constructor), and report
/// [`DomainError::Immutability`](crate::DomainError::Immutability) otherwise.
pub trait Immutable: Sized {
    fn immutable(&self) -> DomainResult<Self>;
}

/// Static declaration of the fields contributing to a type's equality.
///
/// ```ignore
/// impl Uniqueness for RelationRole {
///     const BASED_ON: &'static [&'static str] = &["name", "owner_type"];
/// }
/// ```
pub trait Uniqueness {
    const BASED_ON: &'static [&'static str];
}

/// Static schema version of a serializable type.
pub trait Versioned {
    /// Stable type name (kept across renames of the Rust type).
    const TYPE_NAME: &'static str;

    /// Bumped whenever the serialized shape changes.
    const SCHEMA_VERSION: u32;

    /// Canonical version tag, e.g. `"domain_event@1"`.
    fn version_hash() -> String {
        format!("{}@{}", Self::TYPE_NAME, Self::SCHEMA_VERSION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Sample;

    impl Versioned for Sample {
        const TYPE_NAME: &'static str = "sample";
        const SCHEMA_VERSION: u32 = 3;
    }

    impl Uniqueness for Sample {
        const BASED_ON: &'static [&'static str] = &["a", "b"];
    }

    #[test]
    fn version_hash_combines_name_and_version() {
        assert_eq!(Sample::version_hash(), "sample@3");
    }

    #[test]
    fn uniqueness_is_a_static_list() {
        assert_eq!(Sample::BASED_ON, &["a", "b"]);
    }
}
