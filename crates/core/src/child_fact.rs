//! Parent-owned facts (ownership pattern).
//!
//! A [`ChildFact`] is a fact whose identity includes the identity of its owner.
//! The parent must exist (and be identified) before the child is created, and
//! the relationship is permanent: the child captures an immutable copy of the
//! parent at construction and offers no way to re-parent.
//!
//! How the parent identity and the child's local identifying data combine is a
//! strategy parameter ([`IdentifierDerivation`]) rather than a subclass hook.

use chrono::{DateTime, Utc};

use crate::error::{DomainError, DomainResult};
use crate::fact::{Fact, IdentifiableFact, identified_equals};
use crate::identifier::Identifier;
use crate::immutable::Immutable;

/// Strategy combining a parent identity with child-local identifying data.
///
/// Implementations must be deterministic: the same parent identity and the same
/// local data always produce the same identifier.
pub trait IdentifierDerivation {
    /// Derive from at most one local identifier.
    fn derive_from_local(
        &self,
        parent: &dyn IdentifiableFact,
        local: Option<&Identifier>,
    ) -> DomainResult<Identifier>;

    /// Derive from a set of local identifiers (already deduplicated, order irrelevant).
    fn derive_from_locals(
        &self,
        parent: &dyn IdentifiableFact,
        locals: &[Identifier],
    ) -> DomainResult<Identifier>;
}

/// Default derivation: `"{parent}/{child_name}[/{locals}]"`.
///
/// The derived identifier is named `child_name`. In the set form, local values
/// are joined in ascending order with `,` so the result does not depend on the
/// order the caller supplied them in.
///
/// Every segment is percent-escaped (`%`, `/` and `,`) before joining, so the
/// separators only ever appear as separators and distinct inputs never derive
/// the same value. A nested child therefore sees its parent's derived value as
/// one opaque segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParentBasedDerivation {
    child_name: String,
}

impl ParentBasedDerivation {
    pub fn new(child_name: impl Into<String>) -> Self {
        Self {
            child_name: child_name.into(),
        }
    }

    pub fn child_name(&self) -> &str {
        &self.child_name
    }

    fn prefix(&self, parent: &dyn IdentifiableFact) -> DomainResult<String> {
        let parent = parent
            .identified()?
            .ok_or_else(|| DomainError::invalid_argument("parent identity is required"))?;
        Ok(format!(
            "{}/{}",
            escape_segment(parent.value()),
            escape_segment(&self.child_name)
        ))
    }
}

fn escape_segment(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '%' => escaped.push_str("%25"),
            '/' => escaped.push_str("%2F"),
            ',' => escaped.push_str("%2C"),
            c => escaped.push(c),
        }
    }
    escaped
}

impl IdentifierDerivation for ParentBasedDerivation {
    fn derive_from_local(
        &self,
        parent: &dyn IdentifiableFact,
        local: Option<&Identifier>,
    ) -> DomainResult<Identifier> {
        let mut value = self.prefix(parent)?;
        if let Some(local) = local {
            value.push('/');
            value.push_str(&escape_segment(local.value()));
        }
        Identifier::new(self.child_name.clone(), value)
    }

    fn derive_from_locals(
        &self,
        parent: &dyn IdentifiableFact,
        locals: &[Identifier],
    ) -> DomainResult<Identifier> {
        let mut value = self.prefix(parent)?;
        if !locals.is_empty() {
            let mut values: Vec<String> =
                locals.iter().map(|l| escape_segment(l.value())).collect();
            values.sort_unstable();
            values.dedup();
            value.push('/');
            value.push_str(&values.join(","));
        }
        Identifier::new(self.child_name.clone(), value)
    }
}

/// Derivation ignoring the parent: the child's identity is its own local identifier.
///
/// Suited to children whose identity must stay independent of the subject they
/// are attached to (e.g. a log entry about an event). The set form is not supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalOnlyDerivation;

impl IdentifierDerivation for LocalOnlyDerivation {
    fn derive_from_local(
        &self,
        _parent: &dyn IdentifiableFact,
        local: Option<&Identifier>,
    ) -> DomainResult<Identifier> {
        local
            .ok_or_else(|| DomainError::invalid_argument("a local identifier is required"))?
            .immutable()
    }

    fn derive_from_locals(
        &self,
        _parent: &dyn IdentifiableFact,
        _locals: &[Identifier],
    ) -> DomainResult<Identifier> {
        Err(DomainError::invalid_argument(
            "local-only identity cannot be derived from an identifier set",
        ))
    }
}

/// A fact permanently owned by a parent fact.
#[derive(Debug, Clone)]
pub struct ChildFact<P, D = ParentBasedDerivation> {
    parent: P,
    local: Vec<Identifier>,
    identifiers: Vec<Identifier>,
    derivation: D,
    occurred_at: DateTime<Utc>,
}

impl<P, D> ChildFact<P, D>
where
    P: IdentifiableFact + Immutable,
    D: IdentifierDerivation,
{
    /// Create a child from an optional single local identifier.
    pub fn new(parent: &P, local: Option<Identifier>, derivation: D) -> DomainResult<Self> {
        check_parent(parent)?;
        if let Some(id) = &local {
            check_local(id)?;
        }
        let parent = copy_parent(parent)?;
        let derived = derivation
            .derive_from_local(&parent, local.as_ref())
            .map_err(as_invalid_argument)?;
        let derived = check_derived(derived)?;
        let local = local.map(|id| id.immutable()).transpose()?;

        Ok(Self {
            parent,
            local: local.into_iter().collect(),
            identifiers: vec![derived],
            derivation,
            occurred_at: Utc::now(),
        })
    }

    /// Create a child from a set of local identifiers (duplicates are dropped).
    pub fn with_identifiers(
        parent: &P,
        locals: impl IntoIterator<Item = Identifier>,
        derivation: D,
    ) -> DomainResult<Self> {
        check_parent(parent)?;
        let mut origins: Vec<Identifier> = Vec::new();
        for id in locals {
            check_local(&id)?;
            if !origins.contains(&id) {
                origins.push(id.immutable()?);
            }
        }
        let parent = copy_parent(parent)?;
        let derived = derivation
            .derive_from_locals(&parent, &origins)
            .map_err(as_invalid_argument)?;
        let derived = check_derived(derived)?;

        Ok(Self {
            parent,
            local: origins,
            identifiers: vec![derived],
            derivation,
            occurred_at: Utc::now(),
        })
    }

    /// Independent copy of the parent captured at construction.
    pub fn parent(&self) -> DomainResult<P> {
        self.parent.immutable()
    }

    /// Local identifying data supplied at construction (frozen).
    pub fn local_identifiers(&self) -> &[Identifier] {
        &self.local
    }

    pub fn derivation(&self) -> &D {
        &self.derivation
    }
}

fn check_parent(parent: &dyn IdentifiableFact) -> DomainResult<()> {
    let identified = parent.identified().map_err(as_invalid_argument)?;
    if identified.is_none() || parent.identifiers().is_empty() {
        return Err(DomainError::invalid_argument(
            "the parent identifier(s) shall be existent",
        ));
    }
    Ok(())
}

fn check_local(id: &Identifier) -> DomainResult<()> {
    if id.is_well_formed() {
        Ok(())
    } else {
        Err(DomainError::invalid_argument(
            "child base identifier requires a name and a value",
        ))
    }
}

fn copy_parent<P: Immutable>(parent: &P) -> DomainResult<P> {
    parent.immutable().map_err(as_invalid_argument)
}

fn check_derived(derived: Identifier) -> DomainResult<Identifier> {
    if !derived.is_well_formed() {
        return Err(DomainError::invalid_argument(
            "child identifier based on parent shall include name and value",
        ));
    }
    derived.immutable().map_err(as_invalid_argument)
}

fn as_invalid_argument(err: DomainError) -> DomainError {
    match err {
        DomainError::InvalidArgument(_) => err,
        other => DomainError::invalid_argument(other.to_string()),
    }
}

impl<P, D> Fact for ChildFact<P, D> {
    fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }
}

impl<P, D> IdentifiableFact for ChildFact<P, D> {
    fn identifiers(&self) -> &[Identifier] {
        &self.identifiers
    }

    fn identified(&self) -> DomainResult<Option<Identifier>> {
        self.identifiers.first().map(Immutable::immutable).transpose()
    }
}

impl<P, D> Immutable for ChildFact<P, D>
where
    P: Immutable,
    D: Clone,
{
    fn immutable(&self) -> DomainResult<Self> {
        Ok(Self {
            parent: self.parent.immutable()?,
            local: self
                .local
                .iter()
                .map(Immutable::immutable)
                .collect::<DomainResult<_>>()?,
            identifiers: self
                .identifiers
                .iter()
                .map(Immutable::immutable)
                .collect::<DomainResult<_>>()?,
            derivation: self.derivation.clone(),
            occurred_at: self.occurred_at,
        })
    }
}

impl<P, D> PartialEq for ChildFact<P, D> {
    fn eq(&self, other: &Self) -> bool {
        identified_equals(self, other)
    }
}
