//! Greedy, bounded combination of retrieval candidates.
//!
//! Determinism contract: candidates are scanned in input order and a later
//! candidate replaces the current best only when strictly better, so full
//! ties keep the first one seen.

use crate::retrieval::{
    candidate::{CostModel, RetrievalCandidate, push_unique},
    scan::ScanPlan,
};
use std::cmp::Ordering;

///
/// Selection
///

#[derive(Debug, Default)]
pub(crate) struct Selection {
    pub best: Option<RetrievalCandidate>,
    pub considered: u64,
    pub accepted: u64,
}

/// Rank two candidates; `Less` means `left` is preferable.
pub(crate) fn rank(
    model: &CostModel<'_>,
    left: &RetrievalCandidate,
    right: &RetrievalCandidate,
) -> Ordering {
    // Join-driving candidates first.
    let left_driving = !left.dependencies.is_empty();
    let right_driving = !right.dependencies.is_empty();
    if left_driving != right_driving {
        return if left_driving {
            Ordering::Less
        } else {
            Ordering::Greater
        };
    }

    let by_cost = model.config.compare_costs(
        left.estimated_total(model.cardinality),
        right.estimated_total(model.cardinality),
    );
    if by_cost != Ordering::Equal {
        return by_cost;
    }

    left.indexes
        .cmp(&right.indexes)
        .then_with(|| right.matched_segments.cmp(&left.matched_segments))
        .then_with(|| {
            left.non_full_matched_segments
                .cmp(&right.non_full_matched_segments)
        })
}

fn combine(mut acc: RetrievalCandidate, next: RetrievalCandidate) -> RetrievalCandidate {
    acc.cost += next.cost;
    acc.selectivity = if next.unique {
        acc.selectivity.min(next.selectivity)
    } else {
        acc.selectivity * next.selectivity
    };
    acc.unique |= next.unique;
    acc.indexes += next.indexes;
    acc.matched_segments = acc.matched_segments.max(next.matched_segments);
    acc.non_full_matched_segments += next.non_full_matched_segments;
    acc.dependencies.extend(next.dependencies);
    push_unique(&mut acc.matched_predicates, &next.matched_predicates);
    acc.factors.extend(next.factors);
    if acc.residual_condition.is_none() {
        acc.residual_condition = next.residual_condition;
    }
    acc.plan = match (acc.plan.take(), next.plan) {
        (Some(left), Some(right)) => Some(ScanPlan::and(left, right)),
        (left, right) => left.or(right),
    };
    acc.source_probe = None;

    acc
}

/// Pick and combine candidates until no remaining one lowers the total.
///
/// `accept_all` is set for system and explicit plans; small tables behave the
/// same way.
pub(crate) fn select_best(
    model: &CostModel<'_>,
    candidates: Vec<RetrievalCandidate>,
    accept_all: bool,
) -> Selection {
    let mut pool: Vec<Option<RetrievalCandidate>> = candidates
        .into_iter()
        .map(|c| (!c.matched_predicates.is_empty()).then_some(c))
        .collect();
    let mut selection = Selection {
        considered: pool.iter().flatten().count() as u64,
        ..Selection::default()
    };

    loop {
        let mut best: Option<usize> = None;
        for (position, slot) in pool.iter().enumerate() {
            let Some(candidate) = slot else {
                continue;
            };
            let better = match best.and_then(|b| pool[b].as_ref()) {
                None => true,
                Some(current) => rank(model, candidate, current) == Ordering::Less,
            };
            if better {
                best = Some(position);
            }
        }

        let Some(position) = best else {
            break;
        };
        let Some(candidate) = pool[position].take() else {
            break;
        };

        let accept = match &selection.best {
            None => true,
            Some(acc) => {
                if acc.residual_condition.is_some() && candidate.residual_condition.is_some() {
                    continue;
                }
                accept_all || model.is_small_table() || lowers_total(model, acc, &candidate)
            }
        };
        if !accept {
            break;
        }

        let consumed = candidate.matched_predicates.clone();
        let unique = candidate.unique;
        selection.accepted += 1;
        selection.best = Some(match selection.best.take() {
            None => candidate,
            Some(acc) => combine(acc, candidate),
        });

        for slot in &mut pool {
            if let Some(other) = slot {
                other.strip(&consumed, model);
                if other.matched_predicates.is_empty() {
                    *slot = None;
                }
            }
        }

        if unique {
            break;
        }
    }

    selection
}

fn lowers_total(
    model: &CostModel<'_>,
    acc: &RetrievalCandidate,
    next: &RetrievalCandidate,
) -> bool {
    let card = model.cardinality;
    let current = acc.selectivity.mul_add(card, acc.cost);
    let combined_selectivity = if next.unique {
        acc.selectivity.min(next.selectivity)
    } else {
        acc.selectivity * next.selectivity
    };
    let combined = combined_selectivity.mul_add(card, acc.cost + next.cost);

    combined < current && acc.selectivity > 1.0 / card
}
