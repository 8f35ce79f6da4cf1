//! Projection implementations (read model builders).
//!
//! Projections consume domain events and keep query-optimized views. All
//! projections are:
//! - **Rebuildable**: the store can be cleared and the events replayed
//! - **Idempotent**: safe for at-least-once delivery

pub mod data_view;

pub use data_view::{
    CreateDataViewVersion, DataViewProjection, FindDataViewVersionByEqualsLabel,
    UpgradeDataViewVersion,
};
