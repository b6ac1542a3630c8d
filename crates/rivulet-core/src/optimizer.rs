//! Per-statement planning entry points.
//!
//! Planning is atomic: conjunct flags, index hints, and metrics are written
//! only after every stream of the statement has been planned.

use crate::{
    MAX_STREAMS,
    config::OptimizerConfig,
    conjunct::ConjunctList,
    error::OptimizerError,
    expr::PredicateArena,
    join::{River, RiverFormation, StreamAccess, StreamInfo, form_rivers},
    model::{ExplicitPlan, IndexDescriptor, SortSpec, StreamCatalog, StreamId, StreamSet},
    obs::{MetricsEvent, RetrievalKind, sink::record},
    retrieval::{RetrievalContext, ScanPlan},
};
use std::sync::Arc;

///
/// JoinPlan
///
/// Rivers in execution order plus the search diagnostics that produced them.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct JoinPlan {
    pub rivers: Vec<River>,
    pub stream_infos: Vec<StreamInfo>,
    pub searches: u64,
    pub placements: u64,
}

impl JoinPlan {
    /// Every stream in execution order.
    #[must_use]
    pub fn order(&self) -> Vec<StreamId> {
        self.rivers.iter().flat_map(River::stream_ids).collect()
    }

    #[must_use]
    pub fn access(&self, stream: StreamId) -> Option<&StreamAccess> {
        self.accesses().find(|access| access.stream == stream)
    }

    pub fn accesses(&self) -> impl Iterator<Item = &StreamAccess> {
        self.rivers.iter().flat_map(|river| river.streams.iter())
    }

    #[must_use]
    pub fn cost(&self) -> f64 {
        self.rivers.iter().map(|river| river.cost).sum()
    }

    /// Whether the leading stream's index walk delivers the pending sort.
    #[must_use]
    pub fn sort_satisfied(&self) -> bool {
        self.accesses()
            .next()
            .is_some_and(|access| access.navigation.is_some())
    }
}

///
/// Optimizer
///

#[derive(Clone, Copy, Debug)]
pub struct Optimizer<'a> {
    arena: &'a PredicateArena,
    catalog: &'a StreamCatalog,
    config: &'a OptimizerConfig,
    explicit: Option<&'a ExplicitPlan>,
    system: bool,
}

impl<'a> Optimizer<'a> {
    #[must_use]
    pub const fn new(
        arena: &'a PredicateArena,
        catalog: &'a StreamCatalog,
        config: &'a OptimizerConfig,
    ) -> Self {
        Self {
            arena,
            catalog,
            config,
            explicit: None,
            system: false,
        }
    }

    /// Replay a user-written plan instead of searching.
    #[must_use]
    pub const fn with_explicit_plan(mut self, plan: &'a ExplicitPlan) -> Self {
        self.explicit = Some(plan);
        self
    }

    /// Internal statements accept every usable index.
    #[must_use]
    pub const fn system(mut self) -> Self {
        self.system = true;
        self
    }

    /// Plan a single stream's retrieval.
    pub fn plan_stream(
        &self,
        conjuncts: &mut ConjunctList,
        stream: StreamId,
        outer: StreamSet,
        sort: Option<&SortSpec>,
    ) -> Result<StreamAccess, OptimizerError> {
        let restricted = match self.explicit {
            Some(plan) => {
                let item = plan.item(stream).cloned().ok_or_else(|| {
                    OptimizerError::plan_invariant(format!(
                        "explicit plan has no entry for stream {stream}"
                    ))
                })?;
                Some(ExplicitPlan::new(vec![item]))
            }
            None => None,
        };
        let optimizer = Optimizer {
            arena: self.arena,
            catalog: self.catalog,
            config: self.config,
            explicit: restricted.as_ref(),
            system: self.system,
        };

        let plan = optimizer.plan_inner_join(conjuncts, &[stream], outer, sort)?;
        plan.rivers
            .into_iter()
            .flat_map(|river| river.streams)
            .next()
            .ok_or_else(|| OptimizerError::plan_invariant("single-stream plan produced no access"))
    }

    /// Order and plan the streams of one inner join.
    ///
    /// `outer` lists streams already bound by enclosing scopes. On success the
    /// caller's conjunct flags reflect the consumed predicates.
    pub fn plan_inner_join(
        &self,
        conjuncts: &mut ConjunctList,
        streams: &[StreamId],
        outer: StreamSet,
        sort: Option<&SortSpec>,
    ) -> Result<JoinPlan, OptimizerError> {
        if streams.len() > MAX_STREAMS {
            return Err(OptimizerError::plan_invariant(format!(
                "join lists {} streams; at most {MAX_STREAMS} are supported",
                streams.len()
            )));
        }

        let mut joined = StreamSet::EMPTY;
        for stream in streams {
            self.catalog.get(*stream)?;
            if joined.contains(*stream) || outer.contains(*stream) {
                return Err(OptimizerError::plan_invariant(format!(
                    "stream {stream} appears twice in one join"
                )));
            }
            joined.insert(*stream);
        }
        if streams.is_empty() {
            return Ok(JoinPlan::default());
        }

        if let Some(plan) = self.explicit {
            plan.validate(self.catalog)?;
            plan.validate_coverage(joined)?;
        }

        let ctx = RetrievalContext {
            arena: self.arena,
            conjuncts,
            catalog: self.catalog,
            config: self.config,
            explicit: self.explicit,
            system: self.system,
        };
        let formation = form_rivers(ctx, streams, outer, sort)?;
        let hints = self.resolve_hints(&formation.rivers)?;

        // Commit.
        let RiverFormation {
            rivers,
            conjuncts: planned,
            stream_infos,
            searches,
            placements,
        } = formation;
        *conjuncts = planned;
        for (index, navigation) in &hints {
            if *navigation {
                index.hints().mark_navigation();
            } else {
                index.hints().mark_retrieval();
            }
        }

        let plan = JoinPlan {
            rivers,
            stream_infos,
            searches,
            placements,
        };
        emit_metrics(&plan, streams.len());

        Ok(plan)
    }

    /// Index descriptors to flag, paired with whether the use is navigational.
    fn resolve_hints(
        &self,
        rivers: &[River],
    ) -> Result<Vec<(Arc<IndexDescriptor>, bool)>, OptimizerError> {
        let mut hints = Vec::new();

        for access in rivers.iter().flat_map(|river| river.streams.iter()) {
            let stream = self.catalog.get(access.stream)?;
            let navigation = access
                .navigation
                .iter()
                .map(|scan| (scan.index_name.as_str(), true));
            let inversion = access
                .inversion
                .iter()
                .flat_map(ScanPlan::index_names)
                .map(|name| (name, false));

            for (name, navigational) in navigation.chain(inversion) {
                let index = stream.index_named(name).ok_or_else(|| {
                    OptimizerError::unknown_plan_index(access.stream, name)
                })?;
                hints.push((Arc::clone(index), navigational));
            }
        }

        Ok(hints)
    }
}

fn retrieval_kind(access: &StreamAccess) -> RetrievalKind {
    if access.navigation.is_some() {
        return RetrievalKind::Navigational;
    }

    match &access.inversion {
        None => RetrievalKind::FullScan,
        Some(ScanPlan::RowIdRange { .. }) => RetrievalKind::DbKey,
        Some(_) if access.unique => RetrievalKind::Unique,
        Some(_) => RetrievalKind::Index,
    }
}

fn emit_metrics(plan: &JoinPlan, streams: usize) {
    record(MetricsEvent::StatementPlanned {
        streams: streams as u64,
    });

    for access in plan.accesses() {
        record(MetricsEvent::Retrieval {
            stream: access.stream,
            kind: retrieval_kind(access),
        });
        record(MetricsEvent::Candidates {
            considered: access.candidates_considered,
            accepted: access.candidates_accepted,
        });

        if let Some(scan) = &access.navigation {
            record(MetricsEvent::IndexChosen {
                index: &scan.index_name,
                navigation: true,
            });
        }
        if let Some(inversion) = &access.inversion {
            for index in inversion.index_names() {
                record(MetricsEvent::IndexChosen {
                    index,
                    navigation: false,
                });
            }
        }
        if let Some(index) = &access.navigation_declined {
            record(MetricsEvent::NavigationDeclined { index });
        }
        for index in &access.unused_explicit_indexes {
            record(MetricsEvent::ExplicitIndexUnused { index });
        }
    }

    if plan.searches > 0 {
        record(MetricsEvent::JoinSearch {
            streams: streams as u64,
            placements: plan.placements,
        });
    }
    for river in &plan.rivers {
        record(MetricsEvent::RiverFormed {
            streams: river.streams.len() as u64,
        });
    }
}

///
/// TESTS
///
