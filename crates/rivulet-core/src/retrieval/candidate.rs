//! Retrieval candidates and the cost model that prices them.

use crate::{
    config::OptimizerConfig,
    expr::PredicateRef,
    model::{IndexDescriptor, IndexId, StreamId},
    retrieval::{
        matching::RowIdBinding,
        probe::IndexProbe,
        scan::{IndexScan, KeyBound, ScanKind, ScanPlan},
    },
};
use std::collections::BTreeSet;

///
/// SelectivityFactor
/// Share of a candidate's selectivity owed to a group of predicates.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SelectivityFactor {
    pub predicates: Vec<PredicateRef>,
    pub selectivity: f64,
}

impl SelectivityFactor {
    #[must_use]
    pub const fn new(predicates: Vec<PredicateRef>, selectivity: f64) -> Self {
        Self {
            predicates,
            selectivity,
        }
    }

    /// Whether some predicate behind this factor is still unaccounted for.
    fn survives(&self, consumed: &[PredicateRef]) -> bool {
        self.predicates.is_empty() || self.predicates.iter().any(|p| !consumed.contains(p))
    }
}

///
/// RetrievalCandidate
///
/// One priced way to retrieve a stream's rows. Candidates are transient:
/// all but the winner are dropped once the stream's access is decided.
///

#[derive(Clone, Debug, PartialEq)]
pub struct RetrievalCandidate {
    pub cost: f64,
    pub selectivity: f64,
    pub unique: bool,
    pub indexes: u32,
    pub matched_segments: u32,
    pub non_full_matched_segments: u32,

    /// Streams other than the target whose values the bounds read.
    pub dependencies: BTreeSet<StreamId>,
    pub matched_predicates: Vec<PredicateRef>,

    /// `selectivity` broken down by the predicates that produced it.
    pub factors: Vec<SelectivityFactor>,

    /// Guard evaluated before the scan; when true the execution layer must
    /// fall back to reading every row.
    pub residual_condition: Option<PredicateRef>,
    pub plan: Option<ScanPlan>,
    pub navigation: Option<IndexScan>,
    pub source_probe: Option<IndexId>,
}

impl RetrievalCandidate {
    /// Sequential read of every row.
    #[must_use]
    pub const fn full_scan(cardinality: f64) -> Self {
        Self {
            cost: cardinality,
            selectivity: 1.0,
            unique: false,
            indexes: 0,
            matched_segments: 0,
            non_full_matched_segments: 0,
            dependencies: BTreeSet::new(),
            matched_predicates: Vec::new(),
            factors: Vec::new(),
            residual_condition: None,
            plan: None,
            navigation: None,
            source_probe: None,
        }
    }

    #[must_use]
    pub const fn is_full_scan(&self) -> bool {
        self.plan.is_none() && self.navigation.is_none()
    }

    /// Index cost plus the rows fetched through it; a full scan is its own total.
    #[must_use]
    pub fn estimated_total(&self, cardinality: f64) -> f64 {
        if self.is_full_scan() {
            self.cost
        } else {
            self.selectivity.mul_add(cardinality, self.cost)
        }
    }

    #[must_use]
    pub fn matches(&self, predicate: PredicateRef) -> bool {
        self.matched_predicates.contains(&predicate)
    }

    #[must_use]
    pub fn shares_matches_with(&self, other: &Self) -> bool {
        self.matched_predicates.iter().any(|p| other.matches(*p))
    }

    /// Drop predicates another accepted candidate already enforces, and the
    /// selectivity they contributed.
    pub(crate) fn strip(&mut self, consumed: &[PredicateRef], model: &CostModel<'_>) {
        self.matched_predicates.retain(|p| !consumed.contains(p));

        let before = self.factors.len();
        self.factors.retain(|factor| factor.survives(consumed));
        if self.factors.len() != before {
            let product: f64 = self.factors.iter().map(|f| f.selectivity).product();
            self.selectivity = model.clamp(product);
        }
    }
}

pub(crate) fn push_unique(target: &mut Vec<PredicateRef>, items: &[PredicateRef]) {
    for item in items {
        if !target.contains(item) {
            target.push(*item);
        }
    }
}

///
/// CostModel
/// Prices candidates for one stream.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct CostModel<'a> {
    pub config: &'a OptimizerConfig,
    pub cardinality: f64,
}

impl CostModel<'_> {
    pub(crate) fn clamp(&self, selectivity: f64) -> f64 {
        let floor = 1.0 / self.cardinality;
        if selectivity.is_finite() {
            selectivity.clamp(floor.min(1.0), 1.0)
        } else {
            1.0
        }
    }

    /// Stored selectivity of segment `position`, repaired when unusable.
    pub(crate) fn segment_selectivity(&self, index: &IndexDescriptor, position: usize) -> f64 {
        let stored = index
            .segments()
            .get(position)
            .map_or(0.0, |segment| segment.selectivity);

        if stored.is_finite() && stored > 0.0 {
            stored.min(1.0)
        } else if index.is_unique() {
            1.0 / self.cardinality
        } else {
            self.config.default_selectivity
        }
    }

    pub(crate) const fn reduction(&self, kind: ScanKind) -> f64 {
        match kind {
            ScanKind::Between => self.config.reduce_between,
            ScanKind::Less => self.config.reduce_less,
            ScanKind::Greater => self.config.reduce_greater,
            ScanKind::Starting => self.config.reduce_starting,
            ScanKind::None | ScanKind::Equal | ScanKind::Equivalent | ScanKind::Missing => 1.0,
        }
    }

    /// Selectivity of a range on the first imperfect segment.
    ///
    /// Lands between a full match of the segment and the running prefix,
    /// pulled toward the full match by the reduction factor.
    pub(crate) fn reduce(&self, running: f64, segment: f64, kind: ScanKind) -> f64 {
        let full = running * segment;
        (running - full).mul_add(self.reduction(kind), full)
    }

    pub(crate) fn is_small_table(&self) -> bool {
        self.cardinality <= self.config.small_table_threshold
    }

    /// Exact-match cost that ignores statistics entirely.
    fn unique_cost(&self, indexes: u32) -> f64 {
        self.config.index_base_cost.mul_add(f64::from(indexes), 1.0)
    }

    fn index_cost(&self, selectivity: f64) -> f64 {
        selectivity.mul_add(self.cardinality, self.config.index_base_cost)
    }

    /// Price a single-index probe. `scope` restricts to probes refined at that
    /// OR depth.
    pub(crate) fn probe_candidate(
        &self,
        probe: &IndexProbe,
        stream: StreamId,
        scope: Option<u32>,
    ) -> Option<RetrievalCandidate> {
        if !probe.is_candidate(scope) {
            return None;
        }

        let index = probe.index();
        let prefix = probe.effective_prefix();
        let mut selectivity = 1.0_f64;
        let mut perfect = 0_u32;
        let mut non_full = 0_u32;
        let mut equality_only = true;
        let mut matched = Vec::new();
        let mut factors = Vec::with_capacity(prefix.len());
        let mut dependencies = BTreeSet::new();

        for (position, segment) in prefix.iter().enumerate() {
            let running = selectivity;
            if segment.scan_kind.is_perfect() {
                selectivity *= self.segment_selectivity(index, position);
                perfect += 1;
                equality_only &= segment.scan_kind != ScanKind::Missing;
            } else {
                selectivity = self.reduce(
                    running,
                    self.segment_selectivity(index, position),
                    segment.scan_kind,
                );
                non_full += 1;
            }
            factors.push(SelectivityFactor::new(
                segment.matched_predicates.clone(),
                if running > 0.0 { selectivity / running } else { 1.0 },
            ));

            push_unique(&mut matched, &segment.matched_predicates);
            for bound in segment.lower.iter().chain(&segment.upper) {
                dependencies.extend(bound.value.streams().without(stream).iter());
            }
        }

        let unique = index.is_unique()
            && non_full == 0
            && equality_only
            && perfect as usize == index.segment_count();

        let (selectivity, cost) = if unique {
            let selectivity = self.clamp(1.0 / self.cardinality);
            factors = vec![SelectivityFactor::new(matched.clone(), selectivity)];
            (selectivity, self.unique_cost(1))
        } else {
            let selectivity = self.clamp(selectivity);
            (selectivity, self.index_cost(selectivity))
        };

        Some(RetrievalCandidate {
            cost,
            selectivity,
            unique,
            indexes: 1,
            matched_segments: perfect + non_full,
            non_full_matched_segments: non_full,
            dependencies,
            matched_predicates: matched,
            factors,
            residual_condition: None,
            plan: Some(ScanPlan::Index(probe.scan(stream))),
            navigation: None,
            source_probe: Some(index.id()),
        })
    }

    /// Price a full walk of `index` in key order with no bounds.
    pub(crate) fn full_walk_candidate(
        &self,
        index: &IndexDescriptor,
        stream: StreamId,
    ) -> RetrievalCandidate {
        RetrievalCandidate {
            cost: self.index_cost(1.0),
            selectivity: 1.0,
            unique: false,
            indexes: 1,
            matched_segments: 0,
            non_full_matched_segments: 0,
            dependencies: BTreeSet::new(),
            matched_predicates: Vec::new(),
            factors: Vec::new(),
            residual_condition: None,
            plan: Some(ScanPlan::Index(IndexScan::full_walk(stream, index))),
            navigation: None,
            source_probe: Some(index.id()),
        }
    }

    /// Price a DB-key range; equality is unique and ignores statistics.
    pub(crate) fn db_key_candidate(
        &self,
        binding: RowIdBinding,
        predicate: PredicateRef,
        stream: StreamId,
    ) -> RetrievalCandidate {
        let unique = binding.kind == ScanKind::Equal;
        let selectivity = if unique {
            self.clamp(1.0 / self.cardinality)
        } else {
            self.clamp(self.reduction(binding.kind))
        };

        let mut dependencies = BTreeSet::new();
        for bound in binding.lower.iter().chain(&binding.upper) {
            dependencies.extend(bound.value.streams().without(stream).iter());
        }

        RetrievalCandidate {
            cost: self.config.db_key_cost,
            selectivity,
            unique,
            indexes: 0,
            matched_segments: 1,
            non_full_matched_segments: u32::from(!unique),
            dependencies,
            matched_predicates: vec![predicate],
            factors: vec![SelectivityFactor::new(vec![predicate], selectivity)],
            residual_condition: None,
            plan: Some(ScanPlan::RowIdRange {
                stream,
                lower: binding.lower,
                upper: binding.upper,
                exclude_lower: binding.exclude_lower,
                exclude_upper: binding.exclude_upper,
            }),
            navigation: None,
            source_probe: None,
        }
    }

    /// Price an IN list walked as one point lookup per value.
    pub(crate) fn in_list_candidate(
        &self,
        index: &IndexDescriptor,
        values: Vec<KeyBound>,
        predicate: PredicateRef,
        stream: StreamId,
    ) -> RetrievalCandidate {
        let lookups = u32::try_from(values.len()).unwrap_or(u32::MAX);
        let per_value = if index.is_unique() && index.segment_count() == 1 {
            1.0 / self.cardinality
        } else {
            self.segment_selectivity(index, 0)
        };
        let selectivity = self.clamp(f64::from(lookups) * per_value);

        let mut dependencies = BTreeSet::new();
        for bound in &values {
            dependencies.extend(bound.value.streams().without(stream).iter());
        }

        RetrievalCandidate {
            cost: self
                .config
                .index_base_cost
                .mul_add(f64::from(lookups), selectivity * self.cardinality),
            selectivity,
            unique: false,
            indexes: 1,
            matched_segments: 1,
            non_full_matched_segments: 0,
            dependencies,
            matched_predicates: vec![predicate],
            factors: vec![SelectivityFactor::new(vec![predicate], selectivity)],
            residual_condition: None,
            plan: Some(ScanPlan::InList {
                stream,
                index: index.id(),
                index_name: index.name().to_string(),
                values,
            }),
            navigation: None,
            source_probe: Some(index.id()),
        }
    }

    /// Union two branch winners of an OR.
    ///
    /// Only predicates enforced by both branches stay matched; the OR node
    /// itself is matched when each branch consumed every one of its leaves.
    pub(crate) fn or_candidate(
        &self,
        left: RetrievalCandidate,
        right: RetrievalCandidate,
        or_predicate: PredicateRef,
        exact: bool,
    ) -> Option<RetrievalCandidate> {
        let (left_plan, right_plan) = (left.plan?, right.plan?);

        let mut matched: Vec<PredicateRef> = left
            .matched_predicates
            .iter()
            .copied()
            .filter(|p| right.matched_predicates.contains(p))
            .collect();
        if exact && !matched.contains(&or_predicate) {
            matched.push(or_predicate);
        }

        let selectivity = self.clamp(
            left.selectivity
                .mul_add(-right.selectivity, left.selectivity + right.selectivity),
        );

        Some(RetrievalCandidate {
            cost: left.cost + right.cost,
            selectivity,
            unique: false,
            indexes: left.indexes + right.indexes,
            matched_segments: left.matched_segments.min(right.matched_segments),
            non_full_matched_segments: left
                .non_full_matched_segments
                .max(right.non_full_matched_segments),
            dependencies: left.dependencies.union(&right.dependencies).copied().collect(),
            factors: vec![SelectivityFactor::new(matched.clone(), selectivity)],
            matched_predicates: matched,
            residual_condition: None,
            plan: Some(ScanPlan::or(left_plan, right_plan)),
            navigation: None,
            source_probe: None,
        })
    }
}
