use crate::{join::relationship::IndexRelationship, model::StreamId};
use std::cmp::Ordering;

///
/// StreamInfo
///
/// Per-stream summary the join search works from: standalone retrieval
/// estimates plus the relationships discovered against the other streams.
///

#[derive(Clone, Debug, PartialEq)]
pub struct StreamInfo {
    pub stream: StreamId,
    pub base_cost: f64,
    pub base_selectivity: f64,
    pub base_cardinality: f64,
    pub base_index_count: u32,
    pub base_unique: bool,
    pub base_navigated: bool,

    /// Placed by an earlier river.
    pub used: bool,

    /// Streams that gain an index when this one is active, cheapest first.
    pub indexed_relationships: Vec<IndexRelationship>,

    /// Number of streams whose activation gives this one an index.
    pub previous_expected_streams: u32,
}

impl StreamInfo {
    /// Neither enables nor needs another stream's index.
    #[must_use]
    pub fn is_independent(&self) -> bool {
        self.indexed_relationships.is_empty() && self.previous_expected_streams == 0
    }

    /// Search order: independent streams first, then fewer expected
    /// predecessors, then cheaper standalone access.
    #[must_use]
    pub fn search_order(&self, other: &Self) -> Ordering {
        other
            .is_independent()
            .cmp(&self.is_independent())
            .then_with(|| {
                self.previous_expected_streams
                    .cmp(&other.previous_expected_streams)
            })
            .then_with(|| {
                self.base_cost
                    .partial_cmp(&other.base_cost)
                    .unwrap_or(Ordering::Equal)
            })
    }
}
