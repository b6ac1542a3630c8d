//! Cost-based retrieval and inner-join ordering for a relational query
//! compiler: index matching, candidate selection, sort navigation, and
//! river formation, with explain output and plan fingerprints.

// public exports are one module level down
pub mod config;
pub mod conjunct;
pub mod error;
pub mod explain;
pub mod expr;
pub mod fingerprint;
pub mod join;
pub mod model;
pub mod obs;
pub mod optimizer;
pub mod retrieval;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// CONSTANTS
///

/// Maximum number of streams one statement may plan.
///
/// Stream ids index a fixed-width bitset, so joins never grow past it.
pub const MAX_STREAMS: usize = model::StreamSet::CAPACITY;

///
/// Prelude
///
/// Prelude contains only planning vocabulary and the entry point.
/// No sinks, fingerprints, or retrieval internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        config::OptimizerConfig,
        conjunct::ConjunctList,
        expr::{CompareOp, Operand, PredicateArena, PredicateRef, Value, ValueType},
        join::{River, StreamAccess},
        model::{
            ExplicitPlan, IndexDescriptor, PlanAccess, PlanItem, SortItem, SortSpec,
            StreamCatalog, StreamDescriptor, StreamId, StreamSet,
        },
        optimizer::{JoinPlan, Optimizer},
    };
}
