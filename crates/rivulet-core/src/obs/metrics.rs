use serde::{Deserialize, Serialize};
use std::{cell::RefCell, collections::BTreeMap};

///
/// EventState
/// Ephemeral, in-memory planning counters for the current thread.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub indexes: BTreeMap<String, IndexCounters>,
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventOps {
    // Statement entrypoints
    pub statements_planned: u64,

    // Retrieval outcomes
    pub retrieval_full_scan: u64,
    pub retrieval_index: u64,
    pub retrieval_navigational: u64,
    pub retrieval_db_key: u64,
    pub retrieval_unique: u64,

    // Candidate selection
    pub candidates_considered: u64,
    pub candidates_accepted: u64,
    pub navigation_declined: u64,

    // Join ordering
    pub join_searches: u64,
    pub join_placements: u64,
    pub rivers_formed: u64,

    // Explicit plans
    pub explicit_index_unused: u64,
}

///
/// IndexCounters
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct IndexCounters {
    pub retrieval_uses: u64,
    pub navigation_uses: u64,
    pub navigation_declined: u64,
    pub explicit_unused: u64,
}

///
/// EventReport
/// Point-in-time snapshot of the planning counters.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct EventReport {
    pub ops: EventOps,
    pub indexes: BTreeMap<String, IndexCounters>,
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

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

/// Build a report from the current state.
pub(crate) fn report() -> EventReport {
    with_state(|m| EventReport {
        ops: m.ops.clone(),
        indexes: m.indexes.clone(),
    })
}

/// Saturating counter bump.
pub(crate) const fn bump(counter: &mut u64, by: u64) {
    *counter = counter.saturating_add(by);
}
