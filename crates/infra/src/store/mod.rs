//! Versioned read-model storage behind projection transactions.

pub mod in_memory;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;
use uuid::Uuid;

use factline_events::ProjectionError;

pub use in_memory::InMemoryProjectionStore;

/// One version of a data view, addressed by its logical label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataView {
    /// Assigned on creation, kept across upgrades.
    pub view_id: Uuid,
    pub label: String,
    /// Starts at 1, incremented by every upgrade.
    pub version: u64,
    pub data: JsonValue,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("store lock poisoned")]
    Poisoned,

    #[error("view {label:?} already exists")]
    AlreadyExists { label: String },

    #[error("view {label:?} not found")]
    NotFound { label: String },

    #[error("version conflict on view {label:?} (expected={expected}, actual={actual})")]
    VersionConflict {
        label: String,
        expected: u64,
        actual: u64,
    },
}

impl From<StoreError> for ProjectionError {
    fn from(err: StoreError) -> Self {
        ProjectionError::store(err.to_string())
    }
}

/// Store adapter used by projection handlers.
///
/// Implementations own their concurrency and isolation; every call is
/// independent from the router's point of view.
pub trait ProjectionStore: Send + Sync {
    /// Create version 1 of a new view.
    fn create_view(&self, label: &str, data: JsonValue) -> Result<DataView, StoreError>;

    /// Replace the data of an existing view, guarded by its current version.
    fn upgrade_view(
        &self,
        label: &str,
        data: JsonValue,
        expected_version: u64,
    ) -> Result<DataView, StoreError>;

    fn find_by_label(&self, label: &str) -> Result<Option<DataView>, StoreError>;

    /// All views, ordered by label.
    fn list(&self) -> Result<Vec<DataView>, StoreError>;

    /// Drop every view (rebuild support).
    fn clear(&self) -> Result<(), StoreError>;
}

impl<S> ProjectionStore for Arc<S>
where
    S: ProjectionStore + ?Sized,
{
    fn create_view(&self, label: &str, data: JsonValue) -> Result<DataView, StoreError> {
        (**self).create_view(label, data)
    }

    fn upgrade_view(
        &self,
        label: &str,
        data: JsonValue,
        expected_version: u64,
    ) -> Result<DataView, StoreError> {
        (**self).upgrade_view(label, data, expected_version)
    }

    fn find_by_label(&self, label: &str) -> Result<Option<DataView>, StoreError> {
        (**self).find_by_label(label)
    }

    fn list(&self) -> Result<Vec<DataView>, StoreError> {
        (**self).list()
    }

    fn clear(&self) -> Result<(), StoreError> {
        (**self).clear()
    }
}
