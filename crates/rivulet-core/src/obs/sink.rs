//! Metrics sink boundary.
//!
//! Planning logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
use crate::{model::StreamId, obs::metrics};
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// RetrievalKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RetrievalKind {
    FullScan,
    Index,
    Navigational,
    DbKey,
    Unique,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent<'a> {
    StatementPlanned {
        streams: u64,
    },
    Retrieval {
        stream: StreamId,
        kind: RetrievalKind,
    },
    Candidates {
        considered: u64,
        accepted: u64,
    },
    IndexChosen {
        index: &'a str,
        navigation: bool,
    },
    NavigationDeclined {
        index: &'a str,
    },
    JoinSearch {
        streams: u64,
        placements: u64,
    },
    RiverFormed {
        streams: u64,
    },
    ExplicitIndexUnused {
        index: &'a str,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent<'_>);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into the metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent<'_>) {
        match event {
            MetricsEvent::StatementPlanned { .. } => {
                metrics::with_state_mut(|m| metrics::bump(&mut m.ops.statements_planned, 1));
            }

            MetricsEvent::Retrieval { kind, .. } => {
                metrics::with_state_mut(|m| match kind {
                    RetrievalKind::FullScan => metrics::bump(&mut m.ops.retrieval_full_scan, 1),
                    RetrievalKind::Index => metrics::bump(&mut m.ops.retrieval_index, 1),
                    RetrievalKind::Navigational => {
                        metrics::bump(&mut m.ops.retrieval_navigational, 1);
                    }
                    RetrievalKind::DbKey => metrics::bump(&mut m.ops.retrieval_db_key, 1),
                    RetrievalKind::Unique => metrics::bump(&mut m.ops.retrieval_unique, 1),
                });
            }

            MetricsEvent::Candidates {
                considered,
                accepted,
            } => {
                metrics::with_state_mut(|m| {
                    metrics::bump(&mut m.ops.candidates_considered, considered);
                    metrics::bump(&mut m.ops.candidates_accepted, accepted);
                });
            }

            MetricsEvent::IndexChosen { index, navigation } => {
                metrics::with_state_mut(|m| {
                    let entry = m.indexes.entry(index.to_string()).or_default();
                    if navigation {
                        metrics::bump(&mut entry.navigation_uses, 1);
                    } else {
                        metrics::bump(&mut entry.retrieval_uses, 1);
                    }
                });
            }

            MetricsEvent::NavigationDeclined { index } => {
                metrics::with_state_mut(|m| {
                    metrics::bump(&mut m.ops.navigation_declined, 1);
                    let entry = m.indexes.entry(index.to_string()).or_default();
                    metrics::bump(&mut entry.navigation_declined, 1);
                });
            }

            MetricsEvent::JoinSearch {
                streams: _,
                placements,
            } => {
                metrics::with_state_mut(|m| {
                    metrics::bump(&mut m.ops.join_searches, 1);
                    metrics::bump(&mut m.ops.join_placements, placements);
                });
            }

            MetricsEvent::RiverFormed { .. } => {
                metrics::with_state_mut(|m| metrics::bump(&mut m.ops.rivers_formed, 1));
            }

            MetricsEvent::ExplicitIndexUnused { index } => {
                metrics::with_state_mut(|m| {
                    metrics::bump(&mut m.ops.explicit_index_unused, 1);
                    let entry = m.indexes.entry(index.to_string()).or_default();
                    metrics::bump(&mut entry.explicit_unused, 1);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent<'_>) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // Preconditions:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` always restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        //
        // Aliasing:
        // - Only a shared reference is materialized, matching the shared borrow
        //   used to install the override.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current thread's planning counters.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all planning counters on the current thread.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // Preconditions:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` always restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///
