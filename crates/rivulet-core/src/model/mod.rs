//! Catalog-side vocabulary: streams, indexes, pending sorts, and
//! user-written plans. Everything here is read-only during planning except
//! the advisory index hints.

mod explicit;
mod index;
mod sort;
mod stream;
mod stream_set;

#[cfg(test)]
mod tests;

pub use explicit::{ExplicitPlan, PlanAccess, PlanItem};
pub use index::{
    Collation, HintSnapshot, IndexDescriptor, IndexHints, IndexId, IndexSegment, SegmentKey,
};
pub use sort::{NullPlacement, SortDirection, SortItem, SortPurpose, SortSpec};
pub use stream::{StreamCatalog, StreamDescriptor};
pub use stream_set::{StreamId, StreamSet};
