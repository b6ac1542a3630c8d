//! River formation and final per-stream access decisions.
//!
//! Streams are re-planned in their final order against a private copy of
//! the conjunct list, so flags set for one stream are visible to the next
//! without touching the caller's list until the whole join succeeds.

use crate::{
    conjunct::ConjunctList,
    error::OptimizerError,
    expr::PredicateRef,
    join::{
        search::{JoinOrder, JoinSearch},
        stream_info::StreamInfo,
    },
    model::{SortSpec, StreamId, StreamSet},
    retrieval::{
        IndexScan, NavigationRejection, Retrieval, RetrievalContext, RetrievalOutcome, ScanPlan,
    },
};

///
/// StreamAccess
///
/// Final access decision for one stream, handed to the execution layer.
///

#[derive(Clone, Debug, PartialEq)]
pub struct StreamAccess {
    pub stream: StreamId,
    pub alias: String,
    pub navigation: Option<IndexScan>,
    pub inversion: Option<ScanPlan>,

    /// When this evaluates true the inversion must be bypassed for a full scan.
    pub residual_condition: Option<PredicateRef>,

    /// Conjuncts fully enforced by the access path.
    pub consumed: Vec<PredicateRef>,

    /// Conjuncts that shaped the access path but still need evaluation.
    pub matched: Vec<PredicateRef>,
    pub unique: bool,
    pub cost: f64,
    pub selectivity: f64,
    pub cardinality: f64,
    pub navigation_declined: Option<String>,
    pub navigation_rejections: Vec<(String, NavigationRejection)>,
    pub unused_explicit_indexes: Vec<String>,
    pub candidates_considered: u64,
    pub candidates_accepted: u64,
}

impl StreamAccess {
    #[must_use]
    pub const fn is_full_scan(&self) -> bool {
        self.navigation.is_none() && self.inversion.is_none()
    }

    /// Index names in use, navigation first.
    #[must_use]
    pub fn index_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .navigation
            .iter()
            .map(|scan| scan.index_name.as_str())
            .collect();
        if let Some(inversion) = &self.inversion {
            names.extend(inversion.index_names());
        }

        names
    }

    fn from_outcome(
        outcome: RetrievalOutcome,
        alias: &str,
        minimum_cardinality: f64,
        working: &mut ConjunctList,
    ) -> Self {
        let cost = outcome.estimated_total();
        let cardinality = outcome.output_cardinality(minimum_cardinality);
        let candidate = outcome.candidate;

        // A guarded path may fall back to a full scan, so nothing it matched
        // is enforced.
        let guarded = candidate.residual_condition.is_some();
        let mut consumed = Vec::new();
        let mut matched = Vec::new();
        for predicate in &candidate.matched_predicates {
            if guarded {
                if working.mark_matched(*predicate) {
                    matched.push(*predicate);
                }
            } else if working.mark_used(*predicate) {
                consumed.push(*predicate);
            }
        }

        Self {
            stream: outcome.stream,
            alias: alias.to_string(),
            navigation: candidate.navigation,
            inversion: candidate.plan,
            residual_condition: candidate.residual_condition,
            consumed,
            matched,
            unique: candidate.unique,
            cost,
            selectivity: candidate.selectivity,
            cardinality,
            navigation_declined: outcome.navigation_declined,
            navigation_rejections: outcome.navigation_rejections,
            unused_explicit_indexes: outcome.unused_explicit_indexes,
            candidates_considered: outcome.considered,
            candidates_accepted: outcome.accepted,
        }
    }
}

///
/// River
/// Streams joined in sequence as one execution unit.
///

#[derive(Clone, Debug, PartialEq)]
pub struct River {
    pub streams: Vec<StreamAccess>,
    pub cost: f64,
    pub cardinality: f64,
}

impl River {
    #[must_use]
    pub fn stream_ids(&self) -> Vec<StreamId> {
        self.streams.iter().map(|access| access.stream).collect()
    }
}

///
/// RiverFormation
/// Rivers plus the conjunct flags they imply, not yet committed.
///

pub(crate) struct RiverFormation {
    pub rivers: Vec<River>,
    pub conjuncts: ConjunctList,
    pub stream_infos: Vec<StreamInfo>,
    pub searches: u64,
    pub placements: u64,
}

/// Order `streams` into rivers and plan each stream's final access.
pub(crate) fn form_rivers(
    ctx: RetrievalContext<'_>,
    streams: &[StreamId],
    outer: StreamSet,
    sort: Option<&SortSpec>,
) -> Result<RiverFormation, OptimizerError> {
    let mut orders: Vec<JoinOrder> = Vec::new();
    let mut stream_infos = Vec::new();
    let mut searches = 0;
    let mut placements = 0;

    if let Some(plan) = ctx.explicit {
        orders.push(JoinOrder {
            streams: plan.items.iter().map(|item| item.stream).collect(),
            cost: 0.0,
            cardinality: 0.0,
        });
    } else {
        let mut search = JoinSearch::new(ctx, streams, outer, sort)?;
        while let Some(order) = search.find_join_order()? {
            searches += 1;
            orders.push(order);
        }
        placements = search.placements();
        stream_infos = search.infos().to_vec();
    }

    let mut working = ctx.conjuncts.clone();
    let mut active = outer;
    let mut rivers = Vec::with_capacity(orders.len());

    for (river_position, order) in orders.iter().enumerate() {
        let mut accesses = Vec::with_capacity(order.streams.len());
        let mut cost = 0.0_f64;
        let mut cardinality = 1.0_f64;

        for (position, stream) in order.streams.iter().enumerate() {
            let offered = if river_position == 0 && position == 0 {
                sort
            } else {
                None
            };

            let outcome = {
                let ctx = RetrievalContext {
                    conjuncts: &working,
                    ..ctx
                };
                Retrieval::new(ctx, *stream, active, offered)?.plan()?
            };
            let alias = &ctx.catalog.get(*stream)?.alias;
            let access = StreamAccess::from_outcome(
                outcome,
                alias,
                ctx.config.minimum_cardinality,
                &mut working,
            );

            cost = cardinality.mul_add(access.cost + access.cardinality, cost);
            cardinality *= access.cardinality;
            active.insert(*stream);
            accesses.push(access);
        }

        rivers.push(River {
            streams: accesses,
            cost,
            cardinality,
        });
    }

    Ok(RiverFormation {
        rivers,
        conjuncts: working,
        stream_infos,
        searches,
        placements,
    })
}
