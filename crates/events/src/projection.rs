//! Handler contracts of a read-model projection.
//!
//! A projection owns a write path (transactions reacting to domain events) and
//! a read path (queries answering commands). Each handler declares the type
//! discriminator values it observes; routing on those values is done by the
//! infrastructure router, the handlers only compute one change or one read.

use thiserror::Error;

use factline_core::DomainError;

use crate::command::Command;
use crate::event::DomainEvent;
use crate::query::QueryResponse;

type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error)]
pub enum ProjectionError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A handler failed; the original cause is kept as the error source.
    #[error("unsupported operation: {message}")]
    Unsupported {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("projection store error: {0}")]
    Store(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl ProjectionError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn unsupported(msg: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Unsupported {
            message: msg.into(),
            source: Some(source.into()),
        }
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }
}

/// What a completed transaction reports to its observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionOutcome {
    /// Name of the transaction that ran.
    pub transaction: &'static str,
    /// Logical label of the view it changed.
    pub label: String,
    /// Version of the view after the change.
    pub version: u64,
}

/// Observer attached to a projection router.
pub trait TransactionStateObserver: Send + Sync {
    /// Notified after a transaction applied its change.
    fn commit(&self, _outcome: &TransactionOutcome) {}

    /// Custom name of the attribute carrying the query type; `None` keeps the
    /// router's configured name.
    fn query_name_based_on(&self) -> Option<&str> {
        None
    }
}

/// Observer that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TransactionStateObserver for NoopObserver {}

/// Write-path handler: applies one change to the read model.
pub trait ProjectionTransaction: Send + Sync {
    fn name(&self) -> &'static str;

    /// Event type values this transaction reacts to.
    fn observer_of(&self) -> &[&'static str];

    fn when(&self, event: &DomainEvent) -> Result<(), ProjectionError>;
}

/// Read-path handler: answers one kind of query.
pub trait ProjectionRead: Send + Sync {
    fn name(&self) -> &'static str;

    /// Query type values this read operation answers.
    fn observer_of(&self) -> &[&'static str];

    fn when(&self, query: &Command) -> Result<QueryResponse, ProjectionError>;
}
