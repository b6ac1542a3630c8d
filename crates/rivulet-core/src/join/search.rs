//! Branch-and-bound join-order search.
//!
//! Each call to `find_join_order` yields the next river's stream order. The
//! search only extends a prefix through indexed relationships; streams it
//! cannot reach are left for later rivers.

use crate::{
    error::OptimizerError,
    join::{
        relationship::{IndexRelationship, insert_ordered, merge_cheapest},
        stream_info::StreamInfo,
    },
    model::{SortSpec, StreamId, StreamSet},
    retrieval::{Retrieval, RetrievalContext, RetrievalOutcome},
};
use std::collections::BTreeMap;

///
/// JoinOrder
/// Best stream order found by one search round.
///

#[derive(Clone, Debug, PartialEq)]
pub struct JoinOrder {
    pub streams: Vec<StreamId>,
    pub cost: f64,
    pub cardinality: f64,
}

///
/// JoinSearch
///

pub(crate) struct JoinSearch<'a> {
    ctx: RetrievalContext<'a>,
    infos: Vec<StreamInfo>,

    /// Outer streams plus every stream placed by an earlier round.
    active: StreamSet,
    remaining: usize,
    best: Option<JoinOrder>,
    placements: u64,
    position_costs: BTreeMap<(StreamId, StreamSet), (f64, f64)>,
}

impl<'a> JoinSearch<'a> {
    /// Cost every stream on its own and discover indexed relationships.
    pub(crate) fn new(
        ctx: RetrievalContext<'a>,
        streams: &[StreamId],
        outer: StreamSet,
        sort: Option<&SortSpec>,
    ) -> Result<Self, OptimizerError> {
        let mut infos = streams
            .iter()
            .map(|stream| {
                let outcome = Retrieval::new(ctx, *stream, outer, sort)?.plan()?;
                Ok(base_info(&outcome, ctx))
            })
            .collect::<Result<Vec<_>, OptimizerError>>()?;

        for base in 0..infos.len() {
            let base_stream = infos[base].stream;
            for test in 0..infos.len() {
                if test == base {
                    continue;
                }

                let test_stream = infos[test].stream;
                let outcome =
                    Retrieval::new(ctx, test_stream, outer.with(base_stream), None)?.plan()?;
                if !outcome.candidate.dependencies.contains(&base_stream) {
                    continue;
                }

                let relationship = IndexRelationship {
                    other_stream: test_stream,
                    unique: outcome.candidate.unique,
                    cost: outcome.estimated_total(),
                    cardinality: outcome.output_cardinality(ctx.config.minimum_cardinality),
                };
                insert_ordered(
                    &mut infos[base].indexed_relationships,
                    relationship,
                    ctx.config,
                );
                infos[test].previous_expected_streams += 1;
            }
        }

        infos.sort_by(StreamInfo::search_order);

        Ok(Self {
            ctx,
            infos,
            active: outer,
            remaining: 0,
            best: None,
            placements: 0,
            position_costs: BTreeMap::new(),
        })
    }

    pub(crate) fn infos(&self) -> &[StreamInfo] {
        &self.infos
    }

    pub(crate) const fn placements(&self) -> u64 {
        self.placements
    }

    /// Find the next river's order and mark its streams placed.
    pub(crate) fn find_join_order(&mut self) -> Result<Option<JoinOrder>, OptimizerError> {
        let unused: Vec<usize> = (0..self.infos.len())
            .filter(|position| !self.infos[*position].used)
            .collect();
        if unused.is_empty() {
            return Ok(None);
        }

        self.best = None;
        self.remaining = unused.len();

        // An independent stream needs no search; take the cheapest alone.
        let mut seed: Option<usize> = None;
        for position in &unused {
            let info = &self.infos[*position];
            if info.is_independent()
                && seed.is_none_or(|current| info.base_cost < self.infos[current].base_cost)
            {
                seed = Some(*position);
            }
        }

        if let Some(position) = seed {
            let (cost, cardinality) = self.position_cost(self.infos[position].stream, self.active)?;
            self.placements += 1;
            self.best = Some(JoinOrder {
                streams: vec![self.infos[position].stream],
                cost,
                cardinality,
            });
        } else {
            for position in unused {
                let mut path = Vec::with_capacity(self.remaining);
                self.find_best_order(&mut path, position, &[], self.active, 0.0, 1.0)?;
            }
        }

        let Some(order) = self.best.take() else {
            return Ok(None);
        };
        for stream in &order.streams {
            self.active.insert(*stream);
            if let Some(info) = self.infos.iter_mut().find(|info| info.stream == *stream) {
                info.used = true;
            }
        }

        Ok(Some(order))
    }

    fn find_best_order(
        &mut self,
        path: &mut Vec<usize>,
        position: usize,
        process: &[IndexRelationship],
        active: StreamSet,
        cost: f64,
        cardinality: f64,
    ) -> Result<(), OptimizerError> {
        if path.len() >= self.infos.len() {
            return Ok(());
        }

        let stream = self.infos[position].stream;
        let (position_cost, position_cardinality) = self.position_cost(stream, active)?;
        let new_cost = cardinality.mul_add(position_cost, cost);
        let new_cardinality = cardinality * position_cardinality;
        self.placements += 1;

        path.push(position);
        let placed = path.len();

        let improves = self.best.as_ref().is_none_or(|best| {
            placed > best.streams.len() || (placed == best.streams.len() && new_cost < best.cost)
        });
        if improves {
            self.best = Some(JoinOrder {
                streams: path.iter().map(|p| self.infos[*p].stream).collect(),
                cost: new_cost,
                cardinality: new_cardinality,
            });
        }

        let complete_is_cheaper = self.best.as_ref().is_some_and(|best| {
            best.streams.len() == self.remaining && best.cost < new_cost
        });
        let done = placed == self.remaining || complete_is_cheaper;

        if !done {
            let mut next = process.to_vec();
            for relationship in &self.infos[position].indexed_relationships {
                if !self.is_placed(relationship.other_stream, path) {
                    merge_cheapest(&mut next, *relationship, self.ctx.config);
                }
            }

            let active = active.with(stream);
            for relationship in &next {
                let Some(candidate) = self.position_of(relationship.other_stream) else {
                    continue;
                };
                if self.is_placed(relationship.other_stream, path) {
                    continue;
                }
                self.find_best_order(path, candidate, &next, active, new_cost, new_cardinality)?;
            }
        }

        path.pop();

        Ok(())
    }

    fn position_of(&self, stream: StreamId) -> Option<usize> {
        self.infos.iter().position(|info| info.stream == stream)
    }

    fn is_placed(&self, stream: StreamId, path: &[usize]) -> bool {
        self.active.contains(stream) || path.iter().any(|p| self.infos[*p].stream == stream)
    }

    /// Cost of fetching `stream` once per outer row, and the rows it adds.
    fn position_cost(
        &mut self,
        stream: StreamId,
        active: StreamSet,
    ) -> Result<(f64, f64), OptimizerError> {
        if let Some(cached) = self.position_costs.get(&(stream, active)) {
            return Ok(*cached);
        }

        let outcome = Retrieval::new(self.ctx, stream, active, None)?.plan()?;
        let cardinality = outcome.output_cardinality(self.ctx.config.minimum_cardinality);
        let entry = (outcome.estimated_total() + cardinality, cardinality);
        self.position_costs.insert((stream, active), entry);

        Ok(entry)
    }
}

fn base_info(outcome: &RetrievalOutcome, ctx: RetrievalContext<'_>) -> StreamInfo {
    let candidate = &outcome.candidate;

    StreamInfo {
        stream: outcome.stream,
        base_cost: outcome.estimated_total(),
        base_selectivity: candidate.selectivity,
        base_cardinality: outcome.output_cardinality(ctx.config.minimum_cardinality),
        base_index_count: candidate.indexes,
        base_unique: candidate.unique,
        base_navigated: candidate.navigation.is_some(),
        used: false,
        indexed_relationships: Vec::new(),
        previous_expected_streams: 0,
    }
}
