//! Per-index scratch state for one retrieval pass.
//!
//! A probe records which predicates bound each key segment. Segments may be
//! bound in any order as predicates arrive, but only the prefix ending at the
//! first imperfect (or unbound) segment ever reaches a candidate.

use crate::{
    error::OptimizerError,
    expr::PredicateRef,
    model::{IndexDescriptor, StreamId},
    retrieval::scan::{IndexScan, KeyBound, ScanKind},
};
use std::sync::Arc;

///
/// Binding
/// Proposed binding of one predicate to one segment.
///

#[derive(Clone, Debug)]
pub(crate) struct Binding {
    pub kind: ScanKind,
    pub lower: Option<KeyBound>,
    pub upper: Option<KeyBound>,
    pub exclude_lower: bool,
    pub exclude_upper: bool,
    pub predicate: PredicateRef,
}

///
/// Segment
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Segment {
    pub lower: Option<KeyBound>,
    pub upper: Option<KeyBound>,
    pub exclude_lower: bool,
    pub exclude_upper: bool,
    pub scan_kind: ScanKind,

    /// Predicates represented by the current bounds, and only those.
    pub matched_predicates: Vec<PredicateRef>,

    /// OR-nesting depth of the most recent binding.
    pub scope: u32,
}

impl Segment {
    /// Apply a binding under the precedence rules. Returns whether it took effect.
    pub(crate) fn apply(&mut self, binding: Binding, scope: u32) -> bool {
        let current = self.scan_kind;

        match binding.kind {
            ScanKind::Greater if current == ScanKind::Less => {
                self.lower = binding.lower;
                self.exclude_lower = binding.exclude_lower;
                self.scan_kind = ScanKind::Between;
                self.matched_predicates.push(binding.predicate);
                self.scope = scope;
                true
            }
            ScanKind::Less if current == ScanKind::Greater => {
                self.upper = binding.upper;
                self.exclude_upper = binding.exclude_upper;
                self.scan_kind = ScanKind::Between;
                self.matched_predicates.push(binding.predicate);
                self.scope = scope;
                true
            }
            ScanKind::None => false,
            incoming if incoming.specificity() > current.specificity() => {
                *self = Self {
                    lower: binding.lower,
                    upper: binding.upper,
                    exclude_lower: binding.exclude_lower,
                    exclude_upper: binding.exclude_upper,
                    scan_kind: incoming,
                    matched_predicates: vec![binding.predicate],
                    scope,
                };
                true
            }
            _ => false,
        }
    }
}

///
/// IndexProbe
///

#[derive(Clone, Debug)]
pub struct IndexProbe {
    index: Arc<IndexDescriptor>,
    segments: Vec<Segment>,
}

impl IndexProbe {
    #[must_use]
    pub fn new(index: Arc<IndexDescriptor>) -> Self {
        let segments = vec![Segment::default(); index.segment_count()];

        Self { index, segments }
    }

    #[must_use]
    pub fn index(&self) -> &Arc<IndexDescriptor> {
        &self.index
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Fail if the probe no longer mirrors its descriptor.
    pub fn check_shape(&self) -> Result<(), OptimizerError> {
        let expected = self.index.segment_count();
        if self.segments.len() != expected {
            return Err(OptimizerError::segment_count_mismatch(
                self.index.name(),
                expected,
                self.segments.len(),
            ));
        }

        Ok(())
    }

    pub(crate) fn bind(&mut self, position: usize, binding: Binding, scope: u32) -> bool {
        self.segments
            .get_mut(position)
            .is_some_and(|segment| segment.apply(binding, scope))
    }

    /// Segments that contribute to a scan: every leading perfect segment plus
    /// the first imperfect one.
    #[must_use]
    pub fn effective_prefix(&self) -> &[Segment] {
        let mut len = 0;
        for segment in &self.segments {
            match segment.scan_kind {
                ScanKind::None => break,
                kind if kind.is_perfect() => len += 1,
                _ => {
                    len += 1;
                    break;
                }
            }
        }

        &self.segments[..len]
    }

    /// Whether the probe can produce a candidate at `scope`: segment 0 is
    /// bound and, when a scope is given, some contributing segment was bound
    /// at that scope.
    #[must_use]
    pub fn is_candidate(&self, scope: Option<u32>) -> bool {
        let prefix = self.effective_prefix();

        !prefix.is_empty()
            && scope.is_none_or(|scope| prefix.iter().any(|segment| segment.scope == scope))
    }

    /// Build the index scan covering the effective prefix.
    #[must_use]
    pub fn scan(&self, stream: StreamId) -> IndexScan {
        let prefix = self.effective_prefix();
        let mut scan = IndexScan::full_walk(stream, &self.index);

        for segment in prefix {
            if let Some(lower) = &segment.lower {
                scan.lower.push(lower.clone());
            }
            if let Some(upper) = &segment.upper {
                scan.upper.push(upper.clone());
            }
        }

        if let Some(last) = prefix.last() {
            scan.exclude_lower = last.exclude_lower;
            scan.exclude_upper = last.exclude_upper;
            scan.scan_kind = last.scan_kind;
        }

        scan
    }
}
