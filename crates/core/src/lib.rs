//! `factline-core`: immutable fact and identity building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! identifiers, facts, entities, parent-owned child facts and relation roles.

pub mod child_fact;
pub mod entity;
pub mod error;
pub mod fact;
pub mod identifier;
pub mod immutable;
pub mod relation;

pub use child_fact::{ChildFact, IdentifierDerivation, LocalOnlyDerivation, ParentBasedDerivation};
pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use fact::{Fact, IdentifiableFact, identified_equals};
pub use identifier::Identifier;
pub use immutable::{Immutable, Uniqueness, Versioned};
pub use relation::{FactType, RelationRole};
