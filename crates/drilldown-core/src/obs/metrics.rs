//! Thread-local runtime counters folded from `MetricsEvent`s.
//!
//! Only `obs::sink` writes here.

use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for histogram passes.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub fields: BTreeMap<String, FieldCounters>,
    pub window_start_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            fields: BTreeMap::new(),
            window_start_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Pass entrypoints
    pub aggregate_calls: u64,
    pub select_calls: u64,

    // Documents
    pub docs_visited: u64,
    pub docs_matched: u64,

    // Skipped document values
    pub skipped_malformed: u64,
    pub skipped_source_read: u64,
    pub skipped_ordinal_range: u64,
    pub skipped_unresolved_event: u64,
    pub skipped_unknown_item: u64,

    // Lookups
    pub event_cache_hits: u64,
    pub event_cache_misses: u64,
    pub labels_resolved: u64,
}

///
/// FieldCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FieldCounters {
    pub aggregate_calls: u64,
    pub select_calls: u64,
    pub docs_visited: u64,
    pub docs_matched: u64,
    pub values_skipped: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters and restart the window.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

///
/// EventReport
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `window_start_ms`.
    pub counters: Option<EventState>,
    /// Per-field counters with averages.
    pub field_counters: Vec<FieldSummary>,
}

///
/// FieldSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct FieldSummary {
    pub field: String,
    pub aggregate_calls: u64,
    pub select_calls: u64,
    pub docs_visited: u64,
    pub docs_matched: u64,
    pub values_skipped: u64,
    pub avg_docs_per_pass: f64,
}

/// Build a report; windows starting before `window_start_ms` are omitted.
#[must_use]
pub(crate) fn report_window_start(window_start_ms: Option<u64>) -> EventReport {
    let snap = with_state(Clone::clone);
    if window_start_ms.is_some_and(|start| start > snap.window_start_ms) {
        return EventReport::default();
    }

    let field_counters = snap
        .fields
        .iter()
        .map(|(field, counters)| {
            let passes = counters.aggregate_calls + counters.select_calls;
            let avg_docs_per_pass = if passes > 0 {
                counters.docs_visited as f64 / passes as f64
            } else {
                0.0
            };

            FieldSummary {
                field: field.clone(),
                aggregate_calls: counters.aggregate_calls,
                select_calls: counters.select_calls,
                docs_visited: counters.docs_visited,
                docs_matched: counters.docs_matched,
                values_skipped: counters.values_skipped,
                avg_docs_per_pass,
            }
        })
        .collect();

    EventReport {
        counters: Some(snap),
        field_counters,
    }
}
