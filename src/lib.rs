pub mod collection;
pub mod config;
pub mod dispatch;
pub mod errors;
pub mod event;
pub mod handler;
pub mod logger;
pub mod metrics;
pub mod query;
pub mod shipment;
pub mod transport;

pub use collection::{Collection, DocumentStore};
pub use dispatch::Dispatcher;
pub use errors::{ErrorCode, QueryError, StoreError};
pub use event::{Event, EventResponse};
pub use shipment::Shipment;

/// Initializes logging for the service.
///
/// This should be called once before events are dispatched.
pub fn init(cfg: &config::ServiceConfig) -> Result<(), Box<dyn std::error::Error>> {
    logger::configure(cfg)
}
