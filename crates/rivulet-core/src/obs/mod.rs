//! Observability: planning telemetry and sink abstractions.
//!
//! Planning code never touches counters directly; every decision worth
//! counting is reported as a `MetricsEvent` through `sink::record`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, IndexCounters};
pub use sink::{
    MetricsEvent, MetricsSink, RetrievalKind, metrics_report, metrics_reset_all,
    with_metrics_sink,
};
