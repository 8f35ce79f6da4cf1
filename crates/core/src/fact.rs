//! Fact contracts: something that occurred, optionally identifiable.

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::DomainResult;
use crate::identifier::Identifier;

/// Anything that occurred and is described by an immutable timestamp.
pub trait Fact {
    /// When the fact was created or observed. Fixed at construction.
    fn occurred_at(&self) -> DateTime<Utc>;
}

/// A fact described by one or more identifiers.
pub trait IdentifiableFact: Fact {
    /// The identifying information, in canonical order. Empty for anonymous facts.
    fn identifiers(&self) -> &[Identifier];

    /// Canonical identity derived from [`identifiers`](Self::identifiers).
    ///
    /// Pure: recomputed on every call. `Ok(None)` for anonymous facts;
    /// `Err(Immutability)` when an independent copy of the identity cannot be
    /// produced.
    fn identified(&self) -> DomainResult<Option<Identifier>>;
}

/// Identity-based equality shared by every fact type.
///
/// Equal iff both sides expose a derived identity and those identities are
/// equal by value. Anonymous facts are never equal through this function, and a
/// duplication failure on either side degrades to `false`.
pub fn identified_equals(a: &dyn IdentifiableFact, b: &dyn IdentifiableFact) -> bool {
    match (a.identified(), b.identified()) {
        (Ok(Some(left)), Ok(Some(right))) => left == right,
        (Err(err), _) | (_, Err(err)) => {
            debug!(error = %err, "identity comparison degraded to not-equal");
            false
        }
        _ => false,
    }
}
