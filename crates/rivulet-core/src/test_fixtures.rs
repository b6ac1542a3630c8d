use crate::{
    config::OptimizerConfig,
    conjunct::ConjunctList,
    expr::{FieldId, Operand, PredicateArena, PredicateRef, ValueType},
    model::{
        ExplicitPlan, IndexDescriptor, IndexId, IndexSegment, SortSpec, StreamCatalog,
        StreamDescriptor, StreamId, StreamSet,
    },
    retrieval::{Retrieval, RetrievalContext, RetrievalOutcome},
};

pub const A: StreamId = StreamId::new(0);
pub const B: StreamId = StreamId::new(1);
pub const C: StreamId = StreamId::new(2);

/// Field `id` of `stream` as an operand.
pub const fn field(stream: StreamId, id: u16) -> Operand {
    Operand::field(stream, FieldId::new(id))
}

///
/// int_index
///
/// Unanalyzed index over 64-bit integer fields, in the order given.
///
pub fn int_index(id: u32, name: &str, fields: &[u16]) -> IndexDescriptor {
    let segments = fields
        .iter()
        .map(|field| IndexSegment::field(FieldId::new(*field), ValueType::Int64))
        .collect();

    IndexDescriptor::new(IndexId::new(id), name, segments)
}

///
/// Fixture
///
/// One statement's worth of planning inputs. Tests build the arena first,
/// then register the filter as top-level conjuncts.
///

#[derive(Debug, Default)]
pub struct Fixture {
    pub arena: PredicateArena,
    pub catalog: StreamCatalog,
    pub config: OptimizerConfig,
    pub conjuncts: ConjunctList,
    pub explicit: Option<ExplicitPlan>,
}

impl Fixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_stream(&mut self, stream: StreamDescriptor) {
        self.catalog.insert(stream).expect("fixture stream should register");
    }

    pub fn filter(&mut self, predicates: impl IntoIterator<Item = PredicateRef>) {
        self.conjuncts = ConjunctList::from_predicates(&self.arena, predicates)
            .expect("fixture predicates should resolve");
    }

    pub fn context(&self) -> RetrievalContext<'_> {
        RetrievalContext {
            arena: &self.arena,
            conjuncts: &self.conjuncts,
            catalog: &self.catalog,
            config: &self.config,
            explicit: self.explicit.as_ref(),
            system: false,
        }
    }

    pub fn retrieve(
        &self,
        stream: StreamId,
        active: StreamSet,
        sort: Option<&SortSpec>,
    ) -> RetrievalOutcome {
        Retrieval::new(self.context(), stream, active, sort)
            .expect("fixture stream should exist")
            .plan()
            .expect("retrieval should succeed")
    }
}
