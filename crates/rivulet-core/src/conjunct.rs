//! Top-level conjuncts of one statement and their planning flags.
//!
//! The list never creates predicates; it only tags the ones compilation
//! handed in. Flags are observable by the caller after planning commits.

use crate::{
    error::OptimizerError,
    expr::{PredicateArena, PredicateRef},
    model::{StreamId, StreamSet},
};

///
/// Conjunct
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Conjunct {
    pub predicate: PredicateRef,

    /// Fully enforced by a chosen index; no residual evaluation needed.
    pub used: bool,

    /// Contributed to a chosen index's bounds.
    pub matched: bool,

    /// Streams the predicate reads, cached at construction.
    pub streams: StreamSet,
}

///
/// ConjunctList
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ConjunctList {
    items: Vec<Conjunct>,
}

impl ConjunctList {
    /// Build from already-separated top-level predicates, preserving order.
    pub fn from_predicates(
        arena: &PredicateArena,
        predicates: impl IntoIterator<Item = PredicateRef>,
    ) -> Result<Self, OptimizerError> {
        let items = predicates
            .into_iter()
            .map(|predicate| {
                Ok(Conjunct {
                    predicate,
                    used: false,
                    matched: false,
                    streams: arena.streams(predicate)?,
                })
            })
            .collect::<Result<Vec<_>, OptimizerError>>()?;

        Ok(Self { items })
    }

    /// Build by flattening the top-level AND chain of a filter.
    pub fn from_root(arena: &PredicateArena, root: PredicateRef) -> Result<Self, OptimizerError> {
        Self::from_predicates(arena, arena.conjuncts(root)?)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Conjunct> {
        self.items.iter()
    }

    #[must_use]
    pub fn get(&self, predicate: PredicateRef) -> Option<&Conjunct> {
        self.items.iter().find(|c| c.predicate == predicate)
    }

    #[must_use]
    pub fn contains(&self, predicate: PredicateRef) -> bool {
        self.get(predicate).is_some()
    }

    /// Unused conjuncts that read `stream` and nothing outside `active ∪ {stream}`.
    pub fn available_for(
        &self,
        stream: StreamId,
        active: StreamSet,
    ) -> impl Iterator<Item = &Conjunct> {
        let allowed = active.with(stream);
        self.items.iter().filter(move |c| {
            !c.used && c.streams.contains(stream) && c.streams.is_subset(allowed)
        })
    }

    /// Tag a predicate as consumed. Returns false when it is not a conjunct.
    pub fn mark_used(&mut self, predicate: PredicateRef) -> bool {
        self.update(predicate, |c| {
            c.used = true;
            c.matched = true;
        })
    }

    /// Tag a predicate as contributing to an index without being consumed.
    pub fn mark_matched(&mut self, predicate: PredicateRef) -> bool {
        self.update(predicate, |c| c.matched = true)
    }

    fn update(&mut self, predicate: PredicateRef, f: impl FnOnce(&mut Conjunct)) -> bool {
        match self.items.iter_mut().find(|c| c.predicate == predicate) {
            Some(conjunct) => {
                f(conjunct);
                true
            }
            None => false,
        }
    }

    /// Predicates still needing residual evaluation.
    pub fn residual(&self) -> impl Iterator<Item = PredicateRef> + '_ {
        self.items.iter().filter(|c| !c.used).map(|c| c.predicate)
    }
}

///
/// TESTS
///
