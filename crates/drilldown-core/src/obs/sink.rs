//! Metrics sink boundary.
//!
//! Pass logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::obs::metrics;
use derive_more::Display;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// PassKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum PassKind {
    #[display("aggregate")]
    Aggregate,
    #[display("select")]
    Select,
}

///
/// SkipReason
/// Why one document value was left out of a pass.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum SkipReason {
    #[display("malformed_encoding")]
    MalformedEncoding,
    #[display("ordinal_out_of_range")]
    OrdinalOutOfRange,
    #[display("source_read")]
    SourceRead,
    #[display("unknown_item")]
    UnknownItem,
    #[display("unresolved_event")]
    UnresolvedEvent,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent<'a> {
    PassStart {
        kind: PassKind,
        field: &'a str,
    },
    PassFinish {
        kind: PassKind,
        field: &'a str,
        docs_visited: u64,
        docs_matched: u64,
    },
    ValueSkipped {
        field: &'a str,
        reason: SkipReason,
    },
    EventCache {
        hit: bool,
    },
    LabelResolved,
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default process-local sink that writes into thread-local metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::PassStart { kind, field } => {
                metrics::with_state_mut(|m| {
                    let entry = m.fields.entry(field.to_string()).or_default();
                    match kind {
                        PassKind::Aggregate => {
                            m.ops.aggregate_calls = m.ops.aggregate_calls.saturating_add(1);
                            entry.aggregate_calls = entry.aggregate_calls.saturating_add(1);
                        }
                        PassKind::Select => {
                            m.ops.select_calls = m.ops.select_calls.saturating_add(1);
                            entry.select_calls = entry.select_calls.saturating_add(1);
                        }
                    }
                });
            }

            MetricsEvent::PassFinish {
                kind: _,
                field,
                docs_visited,
                docs_matched,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.docs_visited = m.ops.docs_visited.saturating_add(docs_visited);
                    m.ops.docs_matched = m.ops.docs_matched.saturating_add(docs_matched);

                    let entry = m.fields.entry(field.to_string()).or_default();
                    entry.docs_visited = entry.docs_visited.saturating_add(docs_visited);
                    entry.docs_matched = entry.docs_matched.saturating_add(docs_matched);
                });
            }

            MetricsEvent::ValueSkipped { field, reason } => {
                metrics::with_state_mut(|m| {
                    let counter = match reason {
                        SkipReason::MalformedEncoding => &mut m.ops.skipped_malformed,
                        SkipReason::OrdinalOutOfRange => &mut m.ops.skipped_ordinal_range,
                        SkipReason::SourceRead => &mut m.ops.skipped_source_read,
                        SkipReason::UnknownItem => &mut m.ops.skipped_unknown_item,
                        SkipReason::UnresolvedEvent => &mut m.ops.skipped_unresolved_event,
                    };
                    *counter = counter.saturating_add(1);

                    let entry = m.fields.entry(field.to_string()).or_default();
                    entry.values_skipped = entry.values_skipped.saturating_add(1);
                });
            }

            MetricsEvent::EventCache { hit } => {
                metrics::with_state_mut(|m| {
                    if hit {
                        m.ops.event_cache_hits = m.ops.event_cache_hits.saturating_add(1);
                    } else {
                        m.ops.event_cache_misses = m.ops.event_cache_misses.saturating_add(1);
                    }
                });
            }

            MetricsEvent::LabelResolved => {
                metrics::with_state_mut(|m| {
                    m.ops.labels_resolved = m.ops.labels_resolved.saturating_add(1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY: only `with_metrics_sink` installs a pointer, and it clears
        // the slot before the borrowed sink goes out of scope.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
///
/// `window_start_ms` filters by window start (`EventState::window_start_ms`),
/// not by per-event timestamps.
#[must_use]
pub fn metrics_report(window_start_ms: Option<u64>) -> metrics::EventReport {
    metrics::report_window_start(window_start_ms)
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Route every event recorded on this thread to `sink` while `f` runs.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    // Puts the previous override back, also when `f` unwinds.
    struct Restore(Option<*const dyn MetricsSink>);

    impl Drop for Restore {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| *cell.borrow_mut() = self.0);
        }
    }

    // SAFETY: the erased lifetime never escapes this call; `Restore` removes
    // the pointer before `sink` can be dropped.
    let ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let _restore = Restore(SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(ptr)));

    f()
}

/// PassSpan
/// RAII guard that emits start/finish events for one aggregate or select call.
/// Finish accounting happens even on unwind.

pub(crate) struct PassSpan<'a> {
    kind: PassKind,
    field: &'a str,
    visited: u64,
    matched: u64,
}

impl<'a> PassSpan<'a> {
    #[must_use]
    pub(crate) fn new(kind: PassKind, field: &'a str) -> Self {
        record(MetricsEvent::PassStart { kind, field });

        Self {
            kind,
            field,
            visited: 0,
            matched: 0,
        }
    }

    pub(crate) const fn visit_all(&mut self, items: usize) {
        self.visited = self.visited.saturating_add(items as u64);
    }

    pub(crate) const fn set_matched(&mut self, matched: u64) {
        self.matched = matched;
    }

    pub(crate) const fn visited(&self) -> u64 {
        self.visited
    }
}

impl Drop for PassSpan<'_> {
    fn drop(&mut self) {
        record(MetricsEvent::PassFinish {
            kind: self.kind,
            field: self.field,
            docs_visited: self.visited,
            docs_matched: self.matched,
        });
    }
}
