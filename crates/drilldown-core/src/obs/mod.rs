//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Diagnostic logging goes through `tracing` at the call sites; this module
//! only carries counters.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, FieldCounters, FieldSummary};
pub use sink::{
    MetricsEvent, MetricsSink, PassKind, SkipReason, metrics_report, metrics_reset_all,
    with_metrics_sink,
};
