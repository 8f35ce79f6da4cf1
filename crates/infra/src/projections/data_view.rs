use std::sync::Arc;

use serde_json::Value as JsonValue;
use tracing::debug;

use factline_events::{
    Command, DomainEvent, ProjectionError, ProjectionRead, ProjectionTransaction, QueryResponse,
    TransactionOutcome, TransactionStateObserver,
};

use crate::router::{ProjectionContext, ProjectionDefinition, required_attribute};
use crate::store::{ProjectionStore, StoreError};

/// Attribute naming the view a message is about.
pub const LABEL_ATTRIBUTE: &str = "label";
/// Attribute carrying the view payload (JSON text; other text is kept as a JSON string).
pub const DATA_ATTRIBUTE: &str = "data";
/// Optional attribute pinning the version an upgrade applies to.
pub const VERSION_ATTRIBUTE: &str = "version";

pub const VIEW_CREATED: &str = "ViewCreated";
pub const VIEW_UPGRADED: &str = "ViewUpgraded";
pub const FIND_BY_LABEL: &str = "FindByLabel";

/// Versioned data views keyed by label.
///
/// - `ViewCreated` creates version 1 (replays of an existing label are no-ops)
/// - `ViewUpgraded` replaces the data and bumps the version
/// - `FindByLabel` returns the current view, or an empty response
#[derive(Debug, Default, Clone, Copy)]
pub struct DataViewProjection;

impl DataViewProjection {
    pub const LABEL: &'static str = "DataView";
}

impl ProjectionDefinition for DataViewProjection {
    fn transactions(&self, ctx: &ProjectionContext) -> Vec<Arc<dyn ProjectionTransaction>> {
        vec![
            Arc::new(CreateDataViewVersion::new(ctx)),
            Arc::new(UpgradeDataViewVersion::new(ctx)),
        ]
    }

    fn queries(&self, ctx: &ProjectionContext) -> Vec<Arc<dyn ProjectionRead>> {
        vec![Arc::new(FindDataViewVersionByEqualsLabel::new(ctx))]
    }
}

fn payload(event: &DomainEvent) -> JsonValue {
    match event.find_specification(DATA_ATTRIBUTE) {
        Some(data) => serde_json::from_str(data.value())
            .unwrap_or_else(|_| JsonValue::String(data.value().to_string())),
        None => JsonValue::Null,
    }
}

pub struct CreateDataViewVersion {
    store: Arc<dyn ProjectionStore>,
    observer: Arc<dyn TransactionStateObserver>,
}

impl CreateDataViewVersion {
    pub fn new(ctx: &ProjectionContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            observer: Arc::clone(&ctx.observer),
        }
    }
}

impl ProjectionTransaction for CreateDataViewVersion {
    fn name(&self) -> &'static str {
        "CreateDataViewVersion"
    }

    fn observer_of(&self) -> &[&'static str] {
        &[VIEW_CREATED]
    }

    fn when(&self, event: &DomainEvent) -> Result<(), ProjectionError> {
        let label = required_attribute(event.specification(), LABEL_ATTRIBUTE)?;
        let view = match self.store.create_view(label, payload(event)) {
            Ok(view) => view,
            Err(StoreError::AlreadyExists { .. }) => {
                // At-least-once delivery: a replayed creation changes nothing.
                debug!(label, "view already exists; creation skipped");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        self.observer.commit(&TransactionOutcome {
            transaction: self.name(),
            label: view.label,
            version: view.version,
        });
        Ok(())
    }
}

pub struct UpgradeDataViewVersion {
    store: Arc<dyn ProjectionStore>,
    observer: Arc<dyn TransactionStateObserver>,
}

impl UpgradeDataViewVersion {
    pub fn new(ctx: &ProjectionContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
            observer: Arc::clone(&ctx.observer),
        }
    }
}

impl ProjectionTransaction for UpgradeDataViewVersion {
    fn name(&self) -> &'static str {
        "UpgradeDataViewVersion"
    }

    fn observer_of(&self) -> &[&'static str] {
        &[VIEW_UPGRADED]
    }

    fn when(&self, event: &DomainEvent) -> Result<(), ProjectionError> {
        let label = required_attribute(event.specification(), LABEL_ATTRIBUTE)?;
        let expected = match event.find_specification(VERSION_ATTRIBUTE) {
            Some(raw) => raw.value().parse::<u64>().map_err(|_| {
                ProjectionError::invalid_argument(format!(
                    "attribute {VERSION_ATTRIBUTE:?} must be an unsigned integer"
                ))
            })?,
            None => {
                self.store
                    .find_by_label(label)?
                    .ok_or_else(|| StoreError::NotFound {
                        label: label.to_string(),
                    })?
                    .version
            }
        };

        let view = self.store.upgrade_view(label, payload(event), expected)?;
        self.observer.commit(&TransactionOutcome {
            transaction: self.name(),
            label: view.label,
            version: view.version,
        });
        Ok(())
    }
}

pub struct FindDataViewVersionByEqualsLabel {
    store: Arc<dyn ProjectionStore>,
}

impl FindDataViewVersionByEqualsLabel {
    pub fn new(ctx: &ProjectionContext) -> Self {
        Self {
            store: Arc::clone(&ctx.store),
        }
    }
}

impl ProjectionRead for FindDataViewVersionByEqualsLabel {
    fn name(&self) -> &'static str {
        "FindDataViewVersionByEqualsLabel"
    }

    fn observer_of(&self) -> &[&'static str] {
        &[FIND_BY_LABEL]
    }

    fn when(&self, query: &Command) -> Result<QueryResponse, ProjectionError> {
        let label = required_attribute(query.specification(), LABEL_ATTRIBUTE)?;
        match self.store.find_by_label(label)? {
            Some(view) => serde_json::to_value(&view)
                .map(QueryResponse::of)
                .map_err(|e| ProjectionError::store(e.to_string())),
            None => Ok(QueryResponse::empty()),
        }
    }
}
