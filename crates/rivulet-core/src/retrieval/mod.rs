//! Stream retrieval: decide how one stream's rows are read given the streams
//! already active.
//!
//! A pass builds one probe per index, binds every available conjunct to
//! probe segments (resolving AND/OR structure recursively), prices the
//! resulting candidates, folds in an optional navigational index, and keeps
//! one winner. Nothing outside the returned outcome is mutated.

mod candidate;
mod matching;
mod navigation;
mod probe;
mod scan;
mod select;

#[cfg(test)]
mod tests;

pub use candidate::{RetrievalCandidate, SelectivityFactor};
pub use navigation::NavigationRejection;
pub use probe::{IndexProbe, Segment};
pub use scan::{IndexScan, KeyBound, ScanKind, ScanPlan};

use crate::{
    config::OptimizerConfig,
    conjunct::ConjunctList,
    error::OptimizerError,
    expr::{Predicate, PredicateArena, PredicateRef},
    model::{
        ExplicitPlan, PlanAccess, PlanItem, SortSpec, StreamCatalog, StreamDescriptor, StreamId,
        StreamSet,
    },
};
use candidate::{CostModel, push_unique};
use matching::MatchScope;
use navigation::NavigationAnalyzer;
use select::select_best;
use std::{cmp::Ordering, sync::Arc};

///
/// RetrievalContext
/// Statement-wide inputs shared by every retrieval pass.
///

#[derive(Clone, Copy, Debug)]
pub struct RetrievalContext<'a> {
    pub arena: &'a PredicateArena,
    pub conjuncts: &'a ConjunctList,
    pub catalog: &'a StreamCatalog,
    pub config: &'a OptimizerConfig,
    pub explicit: Option<&'a ExplicitPlan>,

    /// Internal statements accept every usable index.
    pub system: bool,
}

///
/// RetrievalOutcome
///

#[derive(Clone, Debug)]
pub struct RetrievalOutcome {
    pub stream: StreamId,
    pub cardinality: f64,
    pub candidate: RetrievalCandidate,
    pub navigation_declined: Option<String>,
    pub navigation_rejections: Vec<(String, NavigationRejection)>,
    pub unused_explicit_indexes: Vec<String>,
    pub considered: u64,
    pub accepted: u64,
}

impl RetrievalOutcome {
    /// Estimated cost of producing this stream's rows once.
    #[must_use]
    pub fn estimated_total(&self) -> f64 {
        self.candidate.estimated_total(self.cardinality)
    }

    /// Estimated rows produced, never below `minimum`.
    #[must_use]
    pub fn output_cardinality(&self, minimum: f64) -> f64 {
        (self.cardinality * self.candidate.selectivity).max(minimum)
    }
}

///
/// Retrieval
/// One retrieval pass for one stream under one active set.
///

pub struct Retrieval<'a> {
    ctx: RetrievalContext<'a>,
    stream: &'a StreamDescriptor,
    active: StreamSet,
    sort: Option<&'a SortSpec>,
    model: CostModel<'a>,
    scope: MatchScope,
    explicit: Option<&'a PlanItem>,
}

impl<'a> Retrieval<'a> {
    pub fn new(
        ctx: RetrievalContext<'a>,
        stream: StreamId,
        active: StreamSet,
        sort: Option<&'a SortSpec>,
    ) -> Result<Self, OptimizerError> {
        let descriptor = ctx.catalog.get(stream)?;
        let cardinality = ctx.config.effective_cardinality(descriptor.cardinality);

        Ok(Self {
            ctx,
            stream: descriptor,
            active: active.without(stream),
            sort,
            model: CostModel {
                config: ctx.config,
                cardinality,
            },
            scope: MatchScope {
                target: stream,
                available: active.without(stream),
            },
            explicit: ctx.explicit.and_then(|plan| plan.item(stream)),
        })
    }

    const fn target(&self) -> StreamId {
        self.stream.id
    }

    fn accept_all(&self) -> bool {
        self.ctx.system || self.explicit.is_some()
    }

    /// Run the pass and return the winning access path.
    pub fn plan(&self) -> Result<RetrievalOutcome, OptimizerError> {
        let mut outcome = RetrievalOutcome {
            stream: self.target(),
            cardinality: self.model.cardinality,
            candidate: RetrievalCandidate::full_scan(self.model.cardinality),
            navigation_declined: None,
            navigation_rejections: Vec::new(),
            unused_explicit_indexes: Vec::new(),
            considered: 0,
            accepted: 0,
        };

        if self
            .explicit
            .is_some_and(|item| item.access == PlanAccess::Natural)
        {
            return Ok(outcome);
        }

        // OR conjuncts resolve against probes every plain conjunct has bound.
        let mut probes = self.make_probes()?;
        let mut extra = Vec::new();
        let mut disjunctions = Vec::new();
        for conjunct in self.ctx.conjuncts.available_for(self.target(), self.active) {
            if self.is_disjunction(conjunct.predicate)? {
                disjunctions.push(conjunct.predicate);
            } else {
                self.match_on_indexes(&mut probes, conjunct.predicate, 1, &mut extra, 0)?;
            }
        }
        for predicate in disjunctions {
            self.match_on_indexes(&mut probes, predicate, 1, &mut extra, 0)?;
        }

        // A DB-key equality cannot be beaten.
        if let Some(position) = extra
            .iter()
            .position(|c| c.unique && matches!(c.plan, Some(ScanPlan::RowIdRange { .. })))
        {
            outcome.candidate = extra.swap_remove(position);
            outcome.considered = 1;
            outcome.accepted = 1;
            self.record_unused_explicit(&mut outcome);
            return Ok(outcome);
        }

        let mut candidates = Vec::new();
        for probe in &probes {
            if let Some(candidate) = self.model.probe_candidate(probe, self.target(), Some(1)) {
                if candidate.unique {
                    candidates = vec![candidate];
                    extra.clear();
                    break;
                }
                candidates.push(candidate);
            }
        }
        candidates.extend(extra);

        let navigation = self.best_navigation(&probes, &mut outcome);
        let filter = select_best(&self.model, candidates.clone(), self.accept_all());

        let chosen = match navigation {
            None => {
                outcome.considered = filter.considered;
                outcome.accepted = filter.accepted;
                filter.best
            }
            Some((nav, pinned)) => {
                let decline = !pinned
                    && filter.best.as_ref().is_some_and(|winner| {
                        winner.unique
                            || (winner.shares_matches_with(&nav)
                                && self.model.config.compare_costs(
                                    winner.estimated_total(self.model.cardinality),
                                    nav.estimated_total(self.model.cardinality),
                                ) == Ordering::Less)
                    });

                if decline {
                    outcome.navigation_declined =
                        nav.navigation.as_ref().map(|n| n.index_name.clone());
                    outcome.considered = filter.considered;
                    outcome.accepted = filter.accepted;
                    filter.best
                } else {
                    for candidate in &mut candidates {
                        candidate.strip(&nav.matched_predicates, &self.model);
                    }
                    let rest = select_best(&self.model, candidates, self.accept_all());
                    outcome.considered = rest.considered + 1;
                    outcome.accepted = rest.accepted + 1;
                    Some(fold_navigation(nav, rest.best))
                }
            }
        };

        if let Some(candidate) = chosen {
            outcome.candidate = candidate;
        }
        self.record_unused_explicit(&mut outcome);

        Ok(outcome)
    }

    fn make_probes(&self) -> Result<Vec<IndexProbe>, OptimizerError> {
        let allowed = self.explicit.map(|item| item.access.index_names());

        self.stream
            .indexes
            .iter()
            .filter(|index| {
                allowed
                    .as_ref()
                    .is_none_or(|names| names.contains(&index.name()))
            })
            .map(|index| {
                let probe = IndexProbe::new(Arc::clone(index));
                probe.check_shape()?;
                Ok(probe)
            })
            .collect()
    }

    fn is_disjunction(&self, id: PredicateRef) -> Result<bool, OptimizerError> {
        Ok(matches!(self.ctx.arena.get(id)?, Predicate::Or(..)))
    }

    /// Bind `id` (and, for connectives, its children) onto the probes.
    /// Composite candidates (OR unions, IN lists, DB-key ranges) go to `extra`.
    fn match_on_indexes(
        &self,
        probes: &mut [IndexProbe],
        id: PredicateRef,
        depth: u32,
        extra: &mut Vec<RetrievalCandidate>,
        nesting: usize,
    ) -> Result<(), OptimizerError> {
        if nesting > self.ctx.arena.len() {
            return Err(OptimizerError::dangling_predicate(id));
        }

        let predicate = self.ctx.arena.get(id)?;
        match predicate {
            Predicate::And(left, right) => {
                let (first, second) = if self.is_disjunction(*left)? {
                    (*right, *left)
                } else {
                    (*left, *right)
                };
                self.match_on_indexes(probes, first, depth, extra, nesting + 1)?;
                self.match_on_indexes(probes, second, depth, extra, nesting + 1)?;
            }
            Predicate::Or(left, right) => {
                if let Some(candidate) =
                    self.resolve_or(probes, id, *left, *right, depth, nesting + 1)?
                {
                    extra.push(candidate);
                }
            }
            Predicate::InList { value, list } => {
                for probe in probes.iter() {
                    if let Some(values) =
                        matching::match_in_list(probe, value, list, id, &self.scope)
                    {
                        extra.push(self.model.in_list_candidate(
                            probe.index(),
                            values,
                            id,
                            self.target(),
                        ));
                    }
                }
            }
            _ => {
                matching::match_leaf(probes, predicate, id, &self.scope, depth);
                if self.stream.db_key
                    && let Some(binding) = matching::match_db_key(predicate, id, &self.scope)
                {
                    extra.push(self.model.db_key_candidate(binding, id, self.target()));
                }
            }
        }

        Ok(())
    }

    /// Resolve `left OR right` against independent copies of the probes.
    fn resolve_or(
        &self,
        probes: &[IndexProbe],
        id: PredicateRef,
        left: PredicateRef,
        right: PredicateRef,
        depth: u32,
        nesting: usize,
    ) -> Result<Option<RetrievalCandidate>, OptimizerError> {
        let left_best = self.resolve_branch(probes, left, depth + 1, nesting)?;
        let right_best = self.resolve_branch(probes, right, depth + 1, nesting)?;
        let available = self.scope.available;

        let candidate = match (left_best, right_best) {
            (Some((l, l_exact)), Some((r, r_exact))) => {
                self.model.or_candidate(l, r, id, l_exact && r_exact)
            }
            (Some((indexed, _)), None) if self.ctx.arena.is_computable(right, available)? => {
                Some(conditional(indexed, right))
            }
            (None, Some((indexed, _))) if self.ctx.arena.is_computable(left, available)? => {
                Some(conditional(indexed, left))
            }
            _ => None,
        };

        Ok(candidate)
    }

    /// Best candidate for one OR branch, and whether it enforces every leaf.
    fn resolve_branch(
        &self,
        probes: &[IndexProbe],
        id: PredicateRef,
        depth: u32,
        nesting: usize,
    ) -> Result<Option<(RetrievalCandidate, bool)>, OptimizerError> {
        let mut branch_probes = probes.to_vec();
        let mut extra = Vec::new();
        self.match_on_indexes(&mut branch_probes, id, depth, &mut extra, nesting)?;

        let mut candidates: Vec<_> = branch_probes
            .iter()
            .filter_map(|probe| self.model.probe_candidate(probe, self.target(), Some(depth)))
            .collect();
        candidates.extend(extra);

        let Some(best) = select_best(&self.model, candidates, self.accept_all()).best else {
            return Ok(None);
        };
        if best.residual_condition.is_some() {
            return Ok(None);
        }

        let exact = self
            .ctx
            .arena
            .conjuncts(id)?
            .iter()
            .all(|leaf| best.matches(*leaf));

        Ok(Some((best, exact)))
    }

    /// Cheapest navigable index for the pending sort, and whether the
    /// explicit plan pins it.
    fn best_navigation(
        &self,
        probes: &[IndexProbe],
        outcome: &mut RetrievalOutcome,
    ) -> Option<(RetrievalCandidate, bool)> {
        let sort = self.sort?;
        let pinned = match self.explicit {
            Some(item) => Some(item.access.navigation()?),
            None => None,
        };
        let analyzer = NavigationAnalyzer {
            arena: self.ctx.arena,
            conjuncts: self.ctx.conjuncts,
            target: self.target(),
        };

        let mut best: Option<RetrievalCandidate> = None;
        for probe in probes {
            let index = probe.index();
            if pinned.is_some_and(|name| name != index.name()) {
                continue;
            }
            if let Err(reason) = analyzer.check(index, sort) {
                outcome
                    .navigation_rejections
                    .push((index.name().to_string(), reason));
                continue;
            }

            let candidate = self
                .model
                .probe_candidate(probe, self.target(), None)
                .unwrap_or_else(|| self.model.full_walk_candidate(index, self.target()));
            let better = best.as_ref().is_none_or(|current| {
                self.model.config.compare_costs(
                    candidate.estimated_total(self.model.cardinality),
                    current.estimated_total(self.model.cardinality),
                ) == Ordering::Less
            });
            if better {
                best = Some(candidate);
            }
        }

        let mut nav = best?;
        nav.navigation = match nav.plan.take() {
            Some(ScanPlan::Index(scan)) => Some(scan),
            _ => None,
        };

        Some((nav, pinned.is_some()))
    }

    fn record_unused_explicit(&self, outcome: &mut RetrievalOutcome) {
        let Some(item) = self.explicit else {
            return;
        };

        let mut used: Vec<&str> = outcome
            .candidate
            .plan
            .as_ref()
            .map(ScanPlan::index_names)
            .unwrap_or_default();
        if let Some(nav) = &outcome.candidate.navigation {
            used.push(&nav.index_name);
        }

        let unused: Vec<String> = item
            .access
            .index_names()
            .into_iter()
            .filter(|name| !used.contains(name))
            .map(str::to_string)
            .collect();
        outcome.unused_explicit_indexes = unused;
    }
}

/// Turn a one-sided OR match into a guarded candidate.
fn conditional(mut indexed: RetrievalCandidate, condition: PredicateRef) -> RetrievalCandidate {
    indexed.residual_condition = Some(condition);
    indexed
}

/// Merge a navigational walk with the best remaining filter candidate.
fn fold_navigation(
    mut nav: RetrievalCandidate,
    filter: Option<RetrievalCandidate>,
) -> RetrievalCandidate {
    let Some(filter) = filter else {
        return nav;
    };

    nav.cost += filter.cost;
    nav.selectivity *= filter.selectivity;
    nav.factors.extend(filter.factors);
    nav.unique |= filter.unique;
    nav.indexes += filter.indexes;
    nav.matched_segments = nav.matched_segments.max(filter.matched_segments);
    nav.non_full_matched_segments += filter.non_full_matched_segments;
    nav.dependencies.extend(filter.dependencies);
    push_unique(&mut nav.matched_predicates, &filter.matched_predicates);
    nav.residual_condition = filter.residual_condition;
    nav.plan = filter.plan;

    nav
}
