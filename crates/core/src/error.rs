//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic failures of the fact model (malformed
/// input, duplication failures, broken invariants). Routing and store failures
/// belong to the layers that own them.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A mandatory parameter is missing or structurally malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// An independent copy of a fact or identifier could not be produced.
    #[error("immutability violation: {0}")]
    Immutability(String),

    /// A domain invariant was violated.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn immutability(msg: impl Into<String>) -> Self {
        Self::Immutability(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// True for the `Immutability` family (used where equality degrades instead of failing).
    pub fn is_immutability(&self) -> bool {
        matches!(self, Self::Immutability(_))
    }
}
