//! End-to-end planning through the public entry point.

use rivulet_core::{
    expr::FieldId,
    model::{IndexId, IndexSegment},
    prelude::*,
    retrieval::{ScanKind, ScanPlan},
};

const A: StreamId = StreamId::new(0);
const B: StreamId = StreamId::new(1);
const C: StreamId = StreamId::new(2);

fn field(stream: StreamId, id: u16) -> Operand {
    Operand::field(stream, FieldId::new(id))
}

fn index(id: u32, name: &str, fields: &[u16]) -> IndexDescriptor {
    let segments = fields
        .iter()
        .map(|field| IndexSegment::field(FieldId::new(*field), ValueType::Int64))
        .collect();

    IndexDescriptor::new(IndexId::new(id), name, segments)
}

fn approx(left: f64, right: f64) -> bool {
    (left - right).abs() < 1e-9
}

///
/// Statement
/// One statement's catalog, predicates, and conjuncts.
///

#[derive(Default)]
struct Statement {
    arena: PredicateArena,
    catalog: StreamCatalog,
    config: OptimizerConfig,
}

impl Statement {
    fn with_stream(mut self, stream: StreamDescriptor) -> Self {
        self.catalog.insert(stream).expect("stream should register");
        self
    }

    fn plan(
        &self,
        filter: &[PredicateRef],
        streams: &[StreamId],
        sort: Option<&SortSpec>,
    ) -> (JoinPlan, ConjunctList) {
        let mut conjuncts = ConjunctList::from_predicates(&self.arena, filter.iter().copied())
            .expect("filter should resolve");
        let plan = Optimizer::new(&self.arena, &self.catalog, &self.config)
            .plan_inner_join(&mut conjuncts, streams, StreamSet::EMPTY, sort)
            .expect("statement should plan");

        (plan, conjuncts)
    }
}

#[test]
fn unique_equality_is_a_point_lookup() {
    let mut stmt = Statement::default().with_stream(
        StreamDescriptor::new(A, "T", 1_000.0).with_index(index(1, "T_ID", &[0]).unique()),
    );
    let id = stmt.arena.eq(field(A, 0), Operand::int(5));

    let (plan, conjuncts) = stmt.plan(&[id], &[A], None);
    let access = plan.access(A).expect("T should be planned");

    assert!(access.unique);
    assert!(approx(access.selectivity, 1.0 / 1_000.0));
    let Some(ScanPlan::Index(scan)) = &access.inversion else {
        panic!("expected an index scan, got {:?}", access.inversion);
    };
    assert_eq!(scan.scan_kind, ScanKind::Equal);
    assert_eq!(scan.lower.len(), 1);
    assert_eq!(scan.lower[0].value.literal(), Some(&Value::Int(5)));
    assert_eq!(scan.lower, scan.upper);
    assert!(conjuncts.get(id).is_some_and(|c| c.used));
    assert_eq!(plan.explain().to_string(), "PLAN (T INDEX (T_ID))");
}

#[test]
fn opposite_bounds_become_one_between_scan() {
    let mut stmt = Statement::default()
        .with_stream(StreamDescriptor::new(A, "T", 1_000.0).with_index(index(2, "T_A", &[1])));
    let above = stmt
        .arena
        .compare(CompareOp::Gt, field(A, 1), Operand::int(10));
    let below = stmt
        .arena
        .compare(CompareOp::Lt, field(A, 1), Operand::int(20));

    let (plan, _) = stmt.plan(&[above, below], &[A], None);
    let access = plan.access(A).expect("T should be planned");

    let Some(ScanPlan::Index(scan)) = &access.inversion else {
        panic!("expected an index scan, got {:?}", access.inversion);
    };
    assert_eq!(scan.scan_kind, ScanKind::Between);
    assert!(scan.exclude_lower && scan.exclude_upper);
    let s = stmt.config.default_selectivity;
    assert!(approx(
        access.selectivity,
        (1.0 - s).mul_add(stmt.config.reduce_between, s)
    ));
    assert_eq!(access.consumed.len(), 2);
}

#[test]
fn disjunction_over_two_indexes_unions_selectivity() {
    let mut stmt = Statement::default().with_stream(
        StreamDescriptor::new(A, "T", 1_000.0)
            .with_index(index(2, "T_X", &[1]))
            .with_index(index(3, "T_Y", &[2])),
    );
    let x = stmt.arena.eq(field(A, 1), Operand::int(1));
    let y = stmt.arena.eq(field(A, 2), Operand::int(2));
    let either = stmt.arena.or(x, y);

    let (plan, conjuncts) = stmt.plan(&[either], &[A], None);
    let access = plan.access(A).expect("T should be planned");

    assert!(matches!(access.inversion, Some(ScanPlan::Or(..))));
    let s = stmt.config.default_selectivity;
    assert!(approx(access.selectivity, s + s - s * s));
    assert!(conjuncts.get(either).is_some_and(|c| c.used));
    assert_eq!(plan.explain().to_string(), "PLAN (T INDEX (T_X, T_Y))");
}

#[test]
fn dependent_stream_follows_its_driver() {
    let mut stmt = Statement::default()
        .with_stream(StreamDescriptor::new(A, "A", 100.0))
        .with_stream(StreamDescriptor::new(B, "B", 1_000.0).with_index(index(2, "B_X", &[1])))
        .with_stream(StreamDescriptor::new(C, "C", 50.0));
    let join = stmt.arena.eq(field(B, 1), field(A, 0));

    let (plan, conjuncts) = stmt.plan(&[join], &[A, B, C], None);
    let order = plan.order();

    let a = order.iter().position(|s| *s == A).expect("A should be placed");
    let b = order.iter().position(|s| *s == B).expect("B should be placed");
    assert!(a < b);
    assert!(matches!(order.first(), Some(&A | &C)));
    assert_eq!(
        plan.access(B).map(StreamAccess::index_names),
        Some(vec!["B_X"])
    );
    assert!(conjuncts.get(join).is_some_and(|c| c.used));

    let driver = plan
        .stream_infos
        .iter()
        .find(|info| info.stream == A)
        .expect("A should have search info");
    assert_eq!(driver.indexed_relationships.len(), 1);
    assert_eq!(driver.indexed_relationships[0].other_stream, B);
}

#[test]
fn order_by_walks_a_matching_index() {
    let stmt = Statement::default()
        .with_stream(StreamDescriptor::new(A, "T", 1_000.0).with_index(index(4, "T_K", &[3])));
    let sort = SortSpec::order_by(vec![SortItem::ascending(field(A, 3))]);

    let (plan, _) = stmt.plan(&[], &[A], Some(&sort));
    let access = plan.access(A).expect("T should be planned");

    assert!(plan.sort_satisfied());
    assert!(access.inversion.is_none());
    assert!(access.navigation.as_ref().is_some_and(|nav| nav.is_full_walk()));
    assert_eq!(plan.explain().to_string(), "PLAN (T ORDER T_K)");
}

#[test]
fn configuration_loads_from_toml() {
    let config = OptimizerConfig::from_toml_str(
        r"
        index_base_cost = 5.0
        small_table_threshold = 0.0
        ",
    )
    .expect("config should parse");

    assert!(approx(config.index_base_cost, 5.0));
    assert!(approx(
        config.reduce_between,
        OptimizerConfig::default().reduce_between
    ));
    assert!(OptimizerConfig::from_toml_str("unknown_knob = 1").is_err());
}

#[test]
fn identical_statements_share_a_fingerprint() {
    let mut stmt = Statement::default().with_stream(
        StreamDescriptor::new(A, "T", 1_000.0).with_index(index(2, "T_X", &[1])),
    );
    let x = stmt.arena.eq(field(A, 1), Operand::int(1));

    let (first, _) = stmt.plan(&[x], &[A], None);
    let (second, _) = stmt.plan(&[x], &[A], None);

    assert_eq!(first.fingerprint(), second.fingerprint());
}
