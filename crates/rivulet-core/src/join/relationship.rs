use crate::{config::OptimizerConfig, model::StreamId};
use std::cmp::Ordering;

///
/// IndexRelationship
///
/// `other_stream` can use an index once the owning stream is active. Search
/// heuristic only; never part of the output plan.
///

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IndexRelationship {
    pub other_stream: StreamId,
    pub unique: bool,
    pub cost: f64,
    pub cardinality: f64,
}

impl IndexRelationship {
    /// Cheapest-first order. Zero cost wins outright; costs within tolerance
    /// prefer a unique match, then fewer rows.
    #[must_use]
    pub fn compare(&self, other: &Self, config: &OptimizerConfig) -> Ordering {
        match (self.cost == 0.0, other.cost == 0.0) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (true, true) => return Ordering::Equal,
            (false, false) => {}
        }

        match config.compare_costs(self.cost, other.cost) {
            Ordering::Equal => other.unique.cmp(&self.unique).then_with(|| {
                self.cardinality
                    .partial_cmp(&other.cardinality)
                    .unwrap_or(Ordering::Equal)
            }),
            ordering => ordering,
        }
    }

    #[must_use]
    pub fn is_cheaper_than(&self, other: &Self, config: &OptimizerConfig) -> bool {
        self.compare(other, config) == Ordering::Less
    }
}

/// Insert keeping cheapest-first order; equal entries keep insertion order.
pub(crate) fn insert_ordered(
    list: &mut Vec<IndexRelationship>,
    relationship: IndexRelationship,
    config: &OptimizerConfig,
) {
    let position = list
        .iter()
        .position(|existing| relationship.is_cheaper_than(existing, config))
        .unwrap_or(list.len());
    list.insert(position, relationship);
}

/// Merge `relationship` into a process list that holds at most one entry per
/// stream, replacing the existing entry only when strictly cheaper.
pub(crate) fn merge_cheapest(
    list: &mut Vec<IndexRelationship>,
    relationship: IndexRelationship,
    config: &OptimizerConfig,
) {
    if let Some(position) = list
        .iter()
        .position(|existing| existing.other_stream == relationship.other_stream)
    {
        if !relationship.is_cheaper_than(&list[position], config) {
            return;
        }
        list.remove(position);
    }

    insert_ordered(list, relationship, config);
}
