
use super::*;
use crate::{
    expr::{CompareOp, FieldId, Operand, Value, ValueType},
    model::{IndexDescriptor, IndexId, IndexSegment, PlanAccess, PlanItem},
    test_fixtures::{A, B, Fixture, field, int_index},
};

fn approx(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

fn index_scan(candidate: &RetrievalCandidate) -> &IndexScan {
    match &candidate.plan {
        Some(ScanPlan::Index(scan)) => scan,
        other => panic!("expected a single index scan, got {other:?}"),
    }
}

fn stream_a(cardinality: f64) -> StreamDescriptor {
    StreamDescriptor::new(A, "A", cardinality)
        .with_index(int_index(2, "A_X", &[1]))
        .with_index(int_index(3, "A_Y", &[2]))
        .with_index(int_index(1, "A_PK", &[0]).primary())
}

#[test]
fn unique_equality_short_circuits_with_fixed_cost() {
    for cardinality in [1_000.0, 1_000_000.0] {
        let mut fx = Fixture::new();
        fx.add_stream(stream_a(cardinality));
        let id_eq = fx.arena.eq(field(A, 0), Operand::int(5));
        let other = fx.arena.eq(field(A, 1), Operand::int(9));
        fx.filter([other, id_eq]);

        let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
        let candidate = &outcome.candidate;

        assert!(candidate.unique);
        assert!(approx(candidate.selectivity, 1.0 / cardinality));
        assert!(approx(candidate.cost, 4.0), "cost must ignore cardinality");
        assert_eq!(candidate.matched_predicates, vec![id_eq]);

        let scan = index_scan(candidate);
        let five = KeyBound {
            value: Operand::int(5),
            predicate: id_eq,
            widen: None,
        };
        assert_eq!(scan.index_name, "A_PK");
        assert_eq!(scan.scan_kind, ScanKind::Equal);
        assert_eq!(scan.lower, vec![five.clone()]);
        assert_eq!(scan.upper, vec![five]);
    }
}

#[test]
fn opposite_ranges_merge_into_between() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let above = fx
        .arena
        .compare(CompareOp::Gt, field(A, 1), Operand::int(10));
    let below = fx
        .arena
        .compare(CompareOp::Lt, field(A, 1), Operand::int(20));
    fx.filter([above, below]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let candidate = &outcome.candidate;
    let scan = index_scan(candidate);

    assert_eq!(scan.index_name, "A_X");
    assert_eq!(scan.scan_kind, ScanKind::Between);
    assert!(scan.exclude_lower && scan.exclude_upper);
    assert_eq!(scan.lower[0].predicate, above);
    assert_eq!(scan.upper[0].predicate, below);
    // Unanalyzed segment: 0.1 pulled toward 1.0 by the between factor.
    assert!(approx(candidate.selectivity, 0.9_f64.mul_add(0.0025, 0.1)));
    assert!(approx(candidate.cost, 105.25));
    assert_eq!(candidate.matched_predicates, vec![above, below]);
    assert_eq!(candidate.non_full_matched_segments, 1);
}

#[test]
fn mirrored_comparison_binds_field_on_the_right() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let mirrored = fx
        .arena
        .compare(CompareOp::Gt, Operand::int(10), field(A, 1));
    fx.filter([mirrored]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let scan = index_scan(&outcome.candidate);

    assert_eq!(scan.scan_kind, ScanKind::Less);
    assert!(scan.lower.is_empty());
    assert_eq!(scan.upper[0].value, Operand::int(10));
    assert!(scan.exclude_upper);
}

#[test]
fn equality_outranks_range_on_the_same_segment() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let range = fx
        .arena
        .compare(CompareOp::Ge, field(A, 1), Operand::int(3));
    let equal = fx.arena.eq(field(A, 1), Operand::int(7));
    fx.filter([range, equal]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let scan = index_scan(&outcome.candidate);

    assert_eq!(scan.scan_kind, ScanKind::Equal);
    assert_eq!(outcome.candidate.matched_predicates, vec![equal]);
}

#[test]
fn compound_prefix_stops_after_first_imperfect_segment() {
    let mut fx = Fixture::new();
    fx.add_stream(
        StreamDescriptor::new(A, "A", 1_000.0).with_index(int_index(1, "A_ABC", &[1, 2, 3])),
    );
    let first = fx.arena.eq(field(A, 1), Operand::int(1));
    let second = fx
        .arena
        .compare(CompareOp::Gt, field(A, 2), Operand::int(2));
    let third = fx.arena.eq(field(A, 3), Operand::int(3));
    fx.filter([first, second, third]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let candidate = &outcome.candidate;
    let scan = index_scan(candidate);

    assert_eq!(scan.lower.len(), 2);
    assert_eq!(scan.upper.len(), 1);
    assert_eq!(scan.scan_kind, ScanKind::Greater);
    assert_eq!(candidate.matched_predicates, vec![first, second]);
    assert!(approx(candidate.selectivity, (0.1 - 0.01_f64).mul_add(0.05, 0.01)));
}

#[test]
fn equality_index_beats_range_on_another_column() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let equal = fx.arena.eq(field(A, 1), Operand::int(7));
    let range = fx
        .arena
        .compare(CompareOp::Gt, field(A, 2), Operand::int(3));
    fx.filter([equal, range]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let candidate = &outcome.candidate;

    assert_eq!(index_scan(candidate).index_name, "A_X");
    assert_eq!(candidate.matched_predicates, vec![equal]);
    assert!(approx(candidate.selectivity, 0.1));
}

#[test]
fn shared_prefix_predicate_counts_once_when_combined() {
    let analyzed = |id: u32, name: &str, fields: &[u16]| {
        let segments = fields
            .iter()
            .map(|f| {
                IndexSegment::field(FieldId::new(*f), ValueType::Int64).with_selectivity(0.1)
            })
            .collect();
        IndexDescriptor::new(IndexId::new(id), name, segments)
    };
    let mut fx = Fixture::new();
    fx.add_stream(
        StreamDescriptor::new(A, "A", 1_000_000.0)
            .with_index(analyzed(1, "A_AB", &[1, 2]))
            .with_index(analyzed(2, "A_AC", &[1, 3])),
    );
    let a = fx.arena.eq(field(A, 1), Operand::int(1));
    let b = fx.arena.eq(field(A, 2), Operand::int(2));
    let c = fx.arena.eq(field(A, 3), Operand::int(3));
    fx.filter([a, b, c]);
    fx.explicit = Some(ExplicitPlan::new(vec![PlanItem {
        stream: A,
        access: PlanAccess::Indexes(vec!["A_AB".into(), "A_AC".into()]),
    }]));

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let candidate = &outcome.candidate;

    let names = candidate.plan.as_ref().map(ScanPlan::index_names);
    assert_eq!(names, Some(vec!["A_AB", "A_AC"]));
    assert_eq!(outcome.accepted, 2);
    assert!(approx(candidate.selectivity, 0.001));
    for predicate in [a, b, c] {
        assert!(candidate.matches(predicate));
    }
}

#[test]
fn or_resolution_ignores_conjunct_order() {
    let plan_for = |or_first: bool| {
        let mut fx = Fixture::new();
        fx.add_stream(
            StreamDescriptor::new(A, "A", 1_000.0).with_index(int_index(1, "A_AB", &[1, 2])),
        );
        let a = fx.arena.eq(field(A, 1), Operand::int(1));
        let b2 = fx.arena.eq(field(A, 2), Operand::int(2));
        let b3 = fx.arena.eq(field(A, 2), Operand::int(3));
        let either = fx.arena.or(b2, b3);
        if or_first {
            fx.filter([either, a]);
        } else {
            fx.filter([a, either]);
        }

        let candidate = fx.retrieve(A, StreamSet::EMPTY, None).candidate;
        assert!(candidate.matches(a));
        assert!(candidate.matches(either));
        candidate
    };

    let or_first = plan_for(true);
    let plain_first = plan_for(false);

    let Some(ScanPlan::Or(left, right)) = &or_first.plan else {
        panic!("expected an OR plan, got {:?}", or_first.plan);
    };
    for branch in [left, right] {
        let ScanPlan::Index(scan) = &**branch else {
            panic!("expected an index branch, got {branch:?}");
        };
        assert_eq!(scan.lower.len(), 2);
    }
    assert!(approx(or_first.selectivity, 0.01 + 0.01 - 0.01 * 0.01));
    assert_eq!(or_first.plan, plain_first.plan);
    assert!(approx(or_first.selectivity, plain_first.selectivity));
}

#[test]
fn or_of_two_indexed_branches_unions_selectivity() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let x = fx.arena.eq(field(A, 1), Operand::int(1));
    let y = fx.arena.eq(field(A, 2), Operand::int(2));
    let either = fx.arena.or(x, y);
    fx.filter([either]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let candidate = &outcome.candidate;

    let Some(ScanPlan::Or(left, right)) = &candidate.plan else {
        panic!("expected an OR plan, got {:?}", candidate.plan);
    };
    assert_eq!(left.index_names(), vec!["A_X"]);
    assert_eq!(right.index_names(), vec!["A_Y"]);
    assert!(approx(candidate.selectivity, 0.1 + 0.1 - 0.1 * 0.1));
    assert!(approx(candidate.cost, 206.0));
    assert!(candidate.matches(either));
    assert!(candidate.residual_condition.is_none());
}

#[test]
fn or_with_unindexed_stream_branch_stays_a_filter() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let x = fx.arena.eq(field(A, 1), Operand::int(1));
    let unindexed = fx.arena.eq(field(A, 9), Operand::int(7));
    let either = fx.arena.or(x, unindexed);
    fx.filter([either]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);

    assert!(outcome.candidate.is_full_scan());
    assert!(!outcome.candidate.matches(either));
}

#[test]
fn or_with_stream_independent_branch_becomes_guard() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let x = fx.arena.eq(field(A, 1), Operand::int(1));
    let flag = fx.arena.eq(Operand::Parameter(0), Operand::int(0));
    let either = fx.arena.or(x, flag);
    fx.filter([either]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let candidate = &outcome.candidate;

    assert_eq!(index_scan(candidate).index_name, "A_X");
    assert_eq!(candidate.residual_condition, Some(flag));
    assert!(!candidate.matches(either));
}

#[test]
fn db_key_equality_beats_unique_index() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let id_eq = fx.arena.eq(field(A, 0), Operand::int(5));
    let row = fx.arena.eq(Operand::DbKey(A), Operand::Parameter(1));
    fx.filter([id_eq, row]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let candidate = &outcome.candidate;

    assert!(candidate.unique);
    assert!(approx(candidate.cost, fx.config.db_key_cost));
    assert_eq!(candidate.matched_predicates, vec![row]);
    assert!(matches!(
        candidate.plan,
        Some(ScanPlan::RowIdRange { stream, .. }) if stream == A
    ));
}

#[test]
fn db_key_is_ignored_for_streams_without_one() {
    let mut fx = Fixture::new();
    fx.add_stream(StreamDescriptor::new(A, "A", 1_000.0).without_db_key());
    let row = fx.arena.eq(Operand::DbKey(A), Operand::Parameter(1));
    fx.filter([row]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);

    assert!(outcome.candidate.is_full_scan());
}

#[test]
fn in_list_walks_one_lookup_per_value() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let list = fx.arena.in_list(
        field(A, 0),
        vec![Operand::int(1), Operand::int(2), Operand::int(3)],
    );
    fx.filter([list]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let candidate = &outcome.candidate;

    let Some(ScanPlan::InList {
        index_name, values, ..
    }) = &candidate.plan
    else {
        panic!("expected an IN list plan, got {:?}", candidate.plan);
    };
    assert_eq!(index_name, "A_PK");
    assert_eq!(values.len(), 3);
    assert!(approx(candidate.selectivity, 0.003));
    assert!(approx(candidate.cost, 12.0));
}

#[test]
fn starting_with_requires_prefix_capable_segment() {
    let text = IndexDescriptor::new(
        IndexId::new(4),
        "A_NAME",
        vec![IndexSegment::field(FieldId::new(4), ValueType::Text)],
    );
    let mut fx = Fixture::new();
    fx.add_stream(StreamDescriptor::new(A, "A", 1_000.0).with_index(text));
    let prefix = fx.arena.starting_with(field(A, 4), Operand::text("ab"));
    let empty = fx.arena.starting_with(field(A, 4), Operand::text(""));
    fx.filter([empty, prefix]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let scan = index_scan(&outcome.candidate);

    assert_eq!(scan.scan_kind, ScanKind::Starting);
    assert_eq!(outcome.candidate.matched_predicates, vec![prefix]);
    assert!(approx(outcome.candidate.selectivity, 0.9_f64.mul_add(0.01, 0.1)));
}

#[test]
fn missing_binds_null_bounds() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let missing = fx.arena.missing(field(A, 2));
    fx.filter([missing]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let scan = index_scan(&outcome.candidate);

    assert_eq!(scan.scan_kind, ScanKind::Missing);
    assert_eq!(scan.lower[0].value, Operand::Literal(Value::Null));
}

#[test]
fn boolean_not_equal_becomes_negated_equality() {
    let flag = IndexDescriptor::new(
        IndexId::new(5),
        "A_FLAG",
        vec![IndexSegment::field(FieldId::new(6), ValueType::Boolean)],
    );
    let mut fx = Fixture::new();
    fx.add_stream(StreamDescriptor::new(A, "A", 1_000.0).with_index(flag));
    let not_true = fx
        .arena
        .compare(CompareOp::Ne, field(A, 6), Operand::boolean(true));
    fx.filter([not_true]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);
    let scan = index_scan(&outcome.candidate);

    assert_eq!(scan.scan_kind, ScanKind::Equal);
    assert_eq!(scan.lower[0].value, Operand::boolean(false));
}

#[test]
fn not_equal_boolean_literal_skips_non_boolean_keys() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let not_true = fx
        .arena
        .compare(CompareOp::Ne, field(A, 1), Operand::boolean(true));
    fx.filter([not_true]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);

    assert!(outcome.candidate.is_full_scan());
    assert_eq!(outcome.considered, 0);
}

#[test]
fn join_predicate_needs_the_other_stream_active() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    fx.add_stream(StreamDescriptor::new(B, "B", 10.0));
    let join = fx.arena.eq(field(A, 1), field(B, 0));
    fx.filter([join]);

    let alone = fx.retrieve(A, StreamSet::EMPTY, None);
    assert!(alone.candidate.is_full_scan());

    let joined = fx.retrieve(A, StreamSet::single(B), None);
    assert_eq!(index_scan(&joined.candidate).index_name, "A_X");
    assert!(joined.candidate.dependencies.contains(&B));
}

#[test]
fn wider_integer_bounds_are_marked_for_widening() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    fx.add_stream(StreamDescriptor::new(B, "B", 10.0));
    let cast = Operand::Cast {
        inner: Box::new(field(B, 0)),
        target: ValueType::Float64,
    };
    let join = fx.arena.eq(field(A, 1), cast);
    fx.filter([join]);

    let outcome = fx.retrieve(A, StreamSet::single(B), None);
    let scan = index_scan(&outcome.candidate);

    assert_eq!(scan.lower[0].widen, Some(ValueType::Int128));
}

#[test]
fn small_tables_accept_every_candidate() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(5.0));
    let x = fx.arena.eq(field(A, 1), Operand::int(1));
    let y = fx.arena.eq(field(A, 2), Operand::int(2));
    fx.filter([x, y]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);

    assert!(matches!(outcome.candidate.plan, Some(ScanPlan::And(..))));
    assert_eq!(outcome.candidate.indexes, 2);
    assert_eq!(outcome.accepted, 2);
}

#[test]
fn large_tables_keep_only_cost_lowering_candidates() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let x = fx.arena.eq(field(A, 1), Operand::int(1));
    let y = fx.arena.eq(field(A, 2), Operand::int(2));
    fx.filter([x, y]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);

    assert_eq!(outcome.candidate.indexes, 1);
    assert_eq!(outcome.considered, 2);
    assert_eq!(outcome.accepted, 1);
    assert_eq!(index_scan(&outcome.candidate).index_name, "A_X");
}

#[test]
fn explicit_natural_forces_full_scan() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let id_eq = fx.arena.eq(field(A, 0), Operand::int(5));
    fx.filter([id_eq]);
    fx.explicit = Some(ExplicitPlan::new(vec![PlanItem {
        stream: A,
        access: PlanAccess::Natural,
    }]));

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);

    assert!(outcome.candidate.is_full_scan());
}

#[test]
fn explicit_indexes_restrict_probes_and_report_unused() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let id_eq = fx.arena.eq(field(A, 0), Operand::int(5));
    let x = fx.arena.eq(field(A, 1), Operand::int(1));
    fx.filter([id_eq, x]);
    fx.explicit = Some(ExplicitPlan::new(vec![PlanItem {
        stream: A,
        access: PlanAccess::Indexes(vec!["A_X".into(), "A_Y".into()]),
    }]));

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);

    assert_eq!(index_scan(&outcome.candidate).index_name, "A_X");
    assert_eq!(outcome.unused_explicit_indexes, vec!["A_Y".to_string()]);
}

#[test]
fn opaque_predicates_never_bind() {
    let mut fx = Fixture::new();
    fx.add_stream(stream_a(1_000.0));
    let pattern = fx.arena.push(crate::expr::Predicate::Pattern {
        kind: crate::expr::PatternKind::Like,
        value: field(A, 1),
        pattern: Operand::text("a%"),
    });
    let negated_inner = fx.arena.eq(field(A, 2), Operand::int(1));
    let negated = fx.arena.not(negated_inner);
    fx.filter([pattern, negated]);

    let outcome = fx.retrieve(A, StreamSet::EMPTY, None);

    assert!(outcome.candidate.is_full_scan());
    assert_eq!(outcome.considered, 0);
}

#[test]
fn unknown_stream_is_reported() {
    let fx = Fixture::new();

    let err = Retrieval::new(fx.context(), A, StreamSet::EMPTY, None)
        .err()
        .expect("empty catalog should reject the stream");

    assert_eq!(err.class, crate::error::ErrorClass::NotFound);
}
