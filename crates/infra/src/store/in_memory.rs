use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::RwLock;

use chrono::Utc;
use serde_json::Value as JsonValue;
use tracing::debug;
use uuid::Uuid;

use super::{DataView, ProjectionStore, StoreError};

/// In-memory projection store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProjectionStore {
    inner: RwLock<HashMap<String, DataView>>,
}

impl InMemoryProjectionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProjectionStore for InMemoryProjectionStore {
    fn create_view(&self, label: &str, data: JsonValue) -> Result<DataView, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        match map.entry(label.to_string()) {
            Entry::Occupied(_) => Err(StoreError::AlreadyExists {
                label: label.to_string(),
            }),
            Entry::Vacant(slot) => {
                let view = DataView {
                    view_id: Uuid::now_v7(),
                    label: label.to_string(),
                    version: 1,
                    data,
                    updated_at: Utc::now(),
                };
                debug!(label, "view created");
                Ok(slot.insert(view).clone())
            }
        }
    }

    fn upgrade_view(
        &self,
        label: &str,
        data: JsonValue,
        expected_version: u64,
    ) -> Result<DataView, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        let view = map.get_mut(label).ok_or_else(|| StoreError::NotFound {
            label: label.to_string(),
        })?;
        if view.version != expected_version {
            return Err(StoreError::VersionConflict {
                label: label.to_string(),
                expected: expected_version,
                actual: view.version,
            });
        }
        view.version += 1;
        view.data = data;
        view.updated_at = Utc::now();
        debug!(label, version = view.version, "view upgraded");
        Ok(view.clone())
    }

    fn find_by_label(&self, label: &str) -> Result<Option<DataView>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(map.get(label).cloned())
    }

    fn list(&self) -> Result<Vec<DataView>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        let mut views: Vec<DataView> = map.values().cloned().collect();
        views.sort_by(|a, b| a.label.cmp(&b.label));
        Ok(views)
    }

    fn clear(&self) -> Result<(), StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        map.clear();
        Ok(())
    }
}
