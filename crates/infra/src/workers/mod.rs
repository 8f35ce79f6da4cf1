//! Background workers feeding projections.

pub mod projection_worker;

pub use projection_worker::{ProjectionWorker, WorkerHandle};
