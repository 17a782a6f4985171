use crate::collection::DocumentStore;
use crate::event::{Event, EventResponse, QUERY_ACTION};
use crate::handler;
use crate::metrics::Metrics;
use std::sync::Arc;

/// Routes inbound events for one aggregate to the query handler.
pub struct Dispatcher<S> {
    aggregate_id: i8,
    store: S,
    metrics: Arc<Metrics>,
}

impl<S: DocumentStore> Dispatcher<S> {
    pub fn new(aggregate_id: i8, store: S) -> Self {
        Self::with_metrics(aggregate_id, store, Arc::new(Metrics::default()))
    }

    pub fn with_metrics(aggregate_id: i8, store: S, metrics: Arc<Metrics>) -> Self {
        Self { aggregate_id, store, metrics }
    }

    #[must_use]
    pub fn aggregate_id(&self) -> i8 {
        self.aggregate_id
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Returns `None` for events addressed to another aggregate or action.
    pub fn dispatch(&self, event: &Event) -> Option<EventResponse> {
        if event.aggregate_id != self.aggregate_id || event.action != QUERY_ACTION {
            log::debug!(
                "skipping event {} (aggregate {}, action {:?})",
                event.time_uuid,
                event.aggregate_id,
                event.action
            );
            self.metrics.record_skipped();
            return None;
        }
        let response = handler::query(&self.store, event);
        self.metrics.record(&response);
        Some(response)
    }
}
