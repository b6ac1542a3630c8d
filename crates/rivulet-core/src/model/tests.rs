use super::*;
use crate::expr::{FieldId, ValueType};
use std::sync::Arc;

const A: StreamId = StreamId::new(0);
const B: StreamId = StreamId::new(1);
const HIGH: StreamId = StreamId::new(200);

fn index(name: &str) -> IndexDescriptor {
    IndexDescriptor::new(
        IndexId::new(1),
        name,
        vec![IndexSegment::field(FieldId::new(0), ValueType::Int64)],
    )
}

#[test]
fn stream_set_operations_cover_every_word() {
    let set = StreamSet::single(A).with(HIGH);

    assert!(set.contains(A));
    assert!(set.contains(HIGH));
    assert!(!set.contains(B));
    assert_eq!(set.len(), 2);
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![A, HIGH]);
    assert!(StreamSet::single(HIGH).is_subset(set));
    assert_eq!(set.without(A), StreamSet::single(HIGH));
    assert_eq!(set.difference(StreamSet::single(A)).len(), 1);
    assert!(set.intersection(StreamSet::single(B)).is_empty());
}

#[test]
fn null_placement_defaults_follow_direction() {
    assert_eq!(
        NullPlacement::Default.resolve(SortDirection::Ascending),
        NullPlacement::First
    );
    assert_eq!(
        NullPlacement::Default.resolve(SortDirection::Descending),
        NullPlacement::Last
    );
    assert_eq!(
        NullPlacement::Last.resolve(SortDirection::Ascending),
        NullPlacement::Last
    );
}

#[test]
fn index_hints_accumulate_without_reads_affecting_planning() {
    let index = Arc::new(index("IDX_A"));
    let shared = Arc::clone(&index);

    index.hints().mark_navigation();
    shared.hints().mark_retrieval();

    assert_eq!(
        index.hints().snapshot(),
        HintSnapshot {
            navigation: true,
            retrieval: true,
        }
    );

    index.hints().clear();
    assert_eq!(shared.hints().snapshot(), HintSnapshot::default());
}

#[test]
fn primary_index_implies_unique() {
    let pk = index("PK_A").primary();

    assert!(pk.is_unique());
    assert!(pk.is_primary());
    assert!(!pk.is_expression());
}

#[test]
fn catalog_rejects_empty_index() {
    let mut catalog = StreamCatalog::new();
    let stream = StreamDescriptor::new(A, "A", 10.0).with_index(IndexDescriptor::new(
        IndexId::new(9),
        "IDX_EMPTY",
        Vec::new(),
    ));

    let err = catalog.insert(stream).expect_err("empty index should be rejected");

    assert!(err.is_corruption());
}

#[test]
fn explicit_plan_validation_reports_unknown_index_and_duplicates() {
    let mut catalog = StreamCatalog::new();
    catalog
        .insert(StreamDescriptor::new(A, "A", 10.0).with_index(index("IDX_A")))
        .expect("stream should register");

    let unknown = ExplicitPlan::new(vec![PlanItem {
        stream: A,
        access: PlanAccess::Indexes(vec!["IDX_NOPE".to_string()]),
    }]);
    let err = unknown
        .validate(&catalog)
        .expect_err("unknown index should be rejected");
    assert!(err.message.contains("IDX_NOPE"));

    let duplicate = ExplicitPlan::new(vec![
        PlanItem {
            stream: A,
            access: PlanAccess::Natural,
        },
        PlanItem {
            stream: A,
            access: PlanAccess::Natural,
        },
    ]);
    assert!(duplicate.validate(&catalog).is_err());

    let ok = ExplicitPlan::new(vec![PlanItem {
        stream: A,
        access: PlanAccess::Order {
            navigation: "IDX_A".to_string(),
            indexes: Vec::new(),
        },
    }]);
    ok.validate(&catalog).expect("valid plan should pass");
    assert_eq!(ok.item(A).and_then(|item| item.access.navigation()), Some("IDX_A"));
}
