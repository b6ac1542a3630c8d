//! Navigation analysis: can an index walk deliver rows already in the order
//! a pending sort asks for?

use crate::{
    conjunct::ConjunctList,
    expr::{CompareOp, Operand, Predicate, PredicateArena},
    model::{
        IndexDescriptor, IndexSegment, NullPlacement, SortDirection, SortPurpose, SortSpec,
        StreamId,
    },
    retrieval::matching::segment_matches,
};

///
/// NavigationRejection
/// Why an index cannot satisfy the pending sort.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NavigationRejection {
    TooFewSegments { required: usize, available: usize },
    DirectionMismatch { position: usize },
    NullPlacementMismatch { position: usize },
    KeyMismatch { position: usize },
    UnorderedCollation { position: usize },
    CoarseCollation { position: usize },
}

impl NavigationRejection {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::TooFewSegments { .. } => "too_few_segments",
            Self::DirectionMismatch { .. } => "direction_mismatch",
            Self::NullPlacementMismatch { .. } => "null_placement_mismatch",
            Self::KeyMismatch { .. } => "key_mismatch",
            Self::UnorderedCollation { .. } => "unordered_collation",
            Self::CoarseCollation { .. } => "coarse_collation",
        }
    }
}

///
/// NavigationAnalyzer
///

pub(crate) struct NavigationAnalyzer<'a> {
    pub arena: &'a PredicateArena,
    pub conjuncts: &'a ConjunctList,
    pub target: StreamId,
}

impl NavigationAnalyzer<'_> {
    /// Check every navigation rule for `index` against `sort`.
    pub(crate) fn check(
        &self,
        index: &IndexDescriptor,
        sort: &SortSpec,
    ) -> Result<(), NavigationRejection> {
        let required = sort.items.len();
        if required == 0 || index.segment_count() < required {
            return Err(NavigationRejection::TooFewSegments {
                required,
                available: index.segment_count(),
            });
        }

        let index_direction = if index.is_descending() {
            SortDirection::Descending
        } else {
            SortDirection::Ascending
        };
        let index_nulls = NullPlacement::Default.resolve(index_direction);

        for (position, (item, segment)) in sort.items.iter().zip(index.segments()).enumerate() {
            if item.direction != index_direction {
                return Err(NavigationRejection::DirectionMismatch { position });
            }
            if item.nulls.resolve(item.direction) != index_nulls {
                return Err(NavigationRejection::NullPlacementMismatch { position });
            }

            if let Some(collation) = &segment.collation {
                if !collation.ordered {
                    return Err(NavigationRejection::UnorderedCollation { position });
                }
                if collation.coarse_equivalence
                    && sort.purpose != SortPurpose::OrderBy
                    && !index.is_unique()
                {
                    return Err(NavigationRejection::CoarseCollation { position });
                }
            }

            let direct = segment_matches(segment, &item.operand, self.target);
            if !direct && !self.proven_equal(segment, &item.operand) {
                return Err(NavigationRejection::KeyMismatch { position });
            }
        }

        Ok(())
    }

    /// Whether some unused equality conjunct ties `operand` to the segment's key.
    fn proven_equal(&self, segment: &IndexSegment, operand: &Operand) -> bool {
        self.conjuncts.iter().filter(|c| !c.used).any(|conjunct| {
            let Ok(Predicate::Compare {
                op: CompareOp::Eq,
                left,
                right,
            }) = self.arena.get(conjunct.predicate)
            else {
                return false;
            };

            (left == operand && segment_matches(segment, right, self.target))
                || (right == operand && segment_matches(segment, left, self.target))
        })
    }
}
