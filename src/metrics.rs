use crate::errors::ErrorCode;
use crate::event::EventResponse;
use std::sync::atomic::{AtomicU64, Ordering};

/// Log target for metric snapshots; routed to its own file by `logger`.
pub const METRICS_TARGET: &str = "shipment_query::metrics";

#[derive(Debug, Default)]
pub struct Metrics {
    pub events_skipped_total: AtomicU64,
    pub queries_total: AtomicU64,
    pub queries_succeeded_total: AtomicU64,
    pub queries_internal_error_total: AtomicU64,
    pub queries_database_error_total: AtomicU64,
}

impl Metrics {
    pub fn record_skipped(&self) {
        self.events_skipped_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, response: &EventResponse) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
        let counter = match response.error_code {
            ErrorCode::None => &self.queries_succeeded_total,
            ErrorCode::InternalError => &self.queries_internal_error_total,
            ErrorCode::DatabaseError => &self.queries_database_error_total,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn metrics_text(&self) -> String {
        // OpenMetrics/Prometheus exposition format (no types/HELP for brevity)
        format!(
            "shipment_query_events_skipped_total {}\n\
             shipment_query_queries_total {}\n\
             shipment_query_queries_succeeded_total {}\n\
             shipment_query_queries_internal_error_total {}\n\
             shipment_query_queries_database_error_total {}\n",
            self.events_skipped_total.load(Ordering::Relaxed),
            self.queries_total.load(Ordering::Relaxed),
            self.queries_succeeded_total.load(Ordering::Relaxed),
            self.queries_internal_error_total.load(Ordering::Relaxed),
            self.queries_database_error_total.load(Ordering::Relaxed),
        )
    }

    pub fn log_snapshot(&self) {
        for line in self.metrics_text().lines() {
            log::info!(target: METRICS_TARGET, "{line}");
        }
    }
}
