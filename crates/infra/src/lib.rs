//! Infrastructure layer: projection storage, routing and the workers that
//! feed routers from a message transport.

pub mod config;
pub mod projections;
pub mod router;
pub mod store;
pub mod workers;


pub use config::RouterConfig;
pub use router::{ProjectionContext, ProjectionDefinition, ProjectionRouter};
pub use store::{DataView, InMemoryProjectionStore, ProjectionStore, StoreError};
pub use workers::{ProjectionWorker, WorkerHandle};
