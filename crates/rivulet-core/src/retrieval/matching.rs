//! Predicate-to-segment matching.
//!
//! A comparison binds a segment when one side is the segment's key on the
//! stream being planned and the other side is computable from the active
//! streams alone. Field-on-the-right comparisons are mirrored first.

use crate::{
    expr::{CompareOp, Operand, Predicate, PredicateRef, Value, ValueType},
    model::{IndexSegment, SegmentKey, StreamId, StreamSet},
    retrieval::{
        probe::{Binding, IndexProbe},
        scan::{KeyBound, ScanKind},
    },
};

///
/// MatchScope
/// The stream being planned and the streams whose values are available.
///

#[derive(Clone, Copy, Debug)]
pub(crate) struct MatchScope {
    pub target: StreamId,

    /// Active streams excluding `target`.
    pub available: StreamSet,
}

impl MatchScope {
    pub(crate) fn computable(&self, operand: &Operand) -> bool {
        operand.is_computable(self.available)
    }
}

/// Whether `operand` is the key of `segment` on the target stream.
pub(crate) fn segment_matches(segment: &IndexSegment, operand: &Operand, target: StreamId) -> bool {
    match segment.key {
        SegmentKey::Field(field) => operand.field_of(target) == Some(field),
        SegmentKey::Expression(id) => operand.expression_of(target) == Some(id),
    }
}

fn bound(segment: &IndexSegment, value: &Operand, predicate: PredicateRef) -> KeyBound {
    KeyBound {
        value: value.clone(),
        predicate,
        widen: segment.value_type.widening_for(value.static_type()),
    }
}

/// Binding a comparison contributes to a segment, if any.
fn compare_binding(
    segment: &IndexSegment,
    op: CompareOp,
    value: &Operand,
    predicate: PredicateRef,
) -> Option<Binding> {
    let point = |kind| Binding {
        kind,
        lower: Some(bound(segment, value, predicate)),
        upper: Some(bound(segment, value, predicate)),
        exclude_lower: false,
        exclude_upper: false,
        predicate,
    };

    let binding = match op {
        CompareOp::Eq => point(ScanKind::Equal),
        CompareOp::NotDistinct => point(ScanKind::Equivalent),
        CompareOp::Gt | CompareOp::Ge => Binding {
            kind: ScanKind::Greater,
            lower: Some(bound(segment, value, predicate)),
            upper: None,
            exclude_lower: op == CompareOp::Gt,
            exclude_upper: false,
            predicate,
        },
        CompareOp::Lt | CompareOp::Le => Binding {
            kind: ScanKind::Less,
            lower: None,
            upper: Some(bound(segment, value, predicate)),
            exclude_lower: false,
            exclude_upper: op == CompareOp::Lt,
            predicate,
        },
        CompareOp::Ne => {
            // `<> TRUE` is `= FALSE` for a boolean key.
            if segment.value_type != ValueType::Boolean {
                return None;
            }
            let negated = Operand::boolean(!value.literal()?.as_bool()?);
            Binding {
                kind: ScanKind::Equal,
                lower: Some(bound(segment, &negated, predicate)),
                upper: Some(bound(segment, &negated, predicate)),
                exclude_lower: false,
                exclude_upper: false,
                predicate,
            }
        }
    };

    Some(binding)
}

/// Binding a leaf predicate contributes to one segment, if any.
fn leaf_bindings(
    segment: &IndexSegment,
    predicate: &Predicate,
    id: PredicateRef,
    scope: &MatchScope,
) -> Option<Binding> {
    match predicate {
        Predicate::Compare { op, left, right } => {
            for (key, op, value) in [(left, *op, right), (right, op.mirrored(), left)] {
                if segment_matches(segment, key, scope.target) && scope.computable(value) {
                    if let Some(binding) = compare_binding(segment, op, value, id) {
                        return Some(binding);
                    }
                }
            }
            None
        }

        Predicate::Between {
            value,
            lower,
            upper,
        } => {
            if !segment_matches(segment, value, scope.target)
                || !scope.computable(lower)
                || !scope.computable(upper)
            {
                return None;
            }

            Some(Binding {
                kind: ScanKind::Between,
                lower: Some(bound(segment, lower, id)),
                upper: Some(bound(segment, upper, id)),
                exclude_lower: false,
                exclude_upper: false,
                predicate: id,
            })
        }

        Predicate::StartingWith { value, prefix } => {
            if !segment_matches(segment, value, scope.target)
                || !scope.computable(prefix)
                || !segment.supports_prefix_scan()
                || prefix.literal().is_some_and(Value::is_empty_text)
            {
                return None;
            }

            Some(Binding {
                kind: ScanKind::Starting,
                lower: Some(bound(segment, prefix, id)),
                upper: Some(bound(segment, prefix, id)),
                exclude_lower: false,
                exclude_upper: false,
                predicate: id,
            })
        }

        Predicate::Missing(value) => {
            if !segment_matches(segment, value, scope.target) {
                return None;
            }
            let null = Operand::Literal(Value::Null);

            Some(Binding {
                kind: ScanKind::Missing,
                lower: Some(bound(segment, &null, id)),
                upper: Some(bound(segment, &null, id)),
                exclude_lower: false,
                exclude_upper: false,
                predicate: id,
            })
        }

        Predicate::And(..)
        | Predicate::Or(..)
        | Predicate::Not(_)
        | Predicate::InList { .. }
        | Predicate::Pattern { .. }
        | Predicate::Subquery { .. }
        | Predicate::Constant(_) => None,
    }
}

/// Bind a leaf predicate onto every probe segment it matches.
pub(crate) fn match_leaf(
    probes: &mut [IndexProbe],
    predicate: &Predicate,
    id: PredicateRef,
    scope: &MatchScope,
    depth: u32,
) -> bool {
    let mut matched = false;

    for probe in probes.iter_mut() {
        let index = std::sync::Arc::clone(probe.index());
        for (position, segment) in index.segments().iter().enumerate() {
            if let Some(binding) = leaf_bindings(segment, predicate, id, scope) {
                matched |= probe.bind(position, binding, depth);
            }
        }
    }

    matched
}

///
/// RowIdBinding
/// DB-key comparison resolved against the target stream.
///

#[derive(Clone, Debug)]
pub(crate) struct RowIdBinding {
    pub kind: ScanKind,
    pub lower: Option<KeyBound>,
    pub upper: Option<KeyBound>,
    pub exclude_lower: bool,
    pub exclude_upper: bool,
}

fn row_id_bound(value: &Operand, predicate: PredicateRef) -> KeyBound {
    KeyBound {
        value: value.clone(),
        predicate,
        widen: None,
    }
}

/// Match a DB-key comparison on the target stream.
pub(crate) fn match_db_key(
    predicate: &Predicate,
    id: PredicateRef,
    scope: &MatchScope,
) -> Option<RowIdBinding> {
    match predicate {
        Predicate::Compare { op, left, right } => {
            for (key, op, value) in [(left, *op, right), (right, op.mirrored(), left)] {
                if !key.is_db_key_of(scope.target) || !scope.computable(value) {
                    continue;
                }
                let b = Some(row_id_bound(value, id));
                return match op {
                    CompareOp::Eq | CompareOp::NotDistinct => Some(RowIdBinding {
                        kind: ScanKind::Equal,
                        lower: b.clone(),
                        upper: b,
                        exclude_lower: false,
                        exclude_upper: false,
                    }),
                    CompareOp::Gt | CompareOp::Ge => Some(RowIdBinding {
                        kind: ScanKind::Greater,
                        lower: b,
                        upper: None,
                        exclude_lower: op == CompareOp::Gt,
                        exclude_upper: false,
                    }),
                    CompareOp::Lt | CompareOp::Le => Some(RowIdBinding {
                        kind: ScanKind::Less,
                        lower: None,
                        upper: b,
                        exclude_lower: false,
                        exclude_upper: op == CompareOp::Lt,
                    }),
                    CompareOp::Ne => None,
                };
            }
            None
        }
        Predicate::Between {
            value,
            lower,
            upper,
        } if value.is_db_key_of(scope.target)
            && scope.computable(lower)
            && scope.computable(upper) =>
        {
            Some(RowIdBinding {
                kind: ScanKind::Between,
                lower: Some(row_id_bound(lower, id)),
                upper: Some(row_id_bound(upper, id)),
                exclude_lower: false,
                exclude_upper: false,
            })
        }
        _ => None,
    }
}

/// Key bounds for an IN list on the first segment of the probe's index.
pub(crate) fn match_in_list(
    probe: &IndexProbe,
    value: &Operand,
    list: &[Operand],
    id: PredicateRef,
    scope: &MatchScope,
) -> Option<Vec<KeyBound>> {
    let first = probe.index().segments().first()?;

    if list.is_empty()
        || !segment_matches(first, value, scope.target)
        || !list.iter().all(|item| scope.computable(item))
    {
        return None;
    }

    Some(list.iter().map(|item| bound(first, item, id)).collect())
}
