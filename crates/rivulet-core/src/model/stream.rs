use crate::{
    error::{ErrorClass, ErrorOrigin, OptimizerError},
    model::{IndexDescriptor, StreamId},
};
use std::{collections::BTreeMap, sync::Arc};

///
/// StreamDescriptor
///
/// One relation instance of a statement: its alias, the statistics snapshot,
/// and the indexes available on the underlying table.
///

#[derive(Clone, Debug)]
pub struct StreamDescriptor {
    pub id: StreamId,
    pub alias: String,
    pub cardinality: f64,
    pub indexes: Vec<Arc<IndexDescriptor>>,

    /// Whether rows expose a physical DB-key (false for views and derived tables).
    pub db_key: bool,
}

impl StreamDescriptor {
    #[must_use]
    pub fn new(id: StreamId, alias: impl Into<String>, cardinality: f64) -> Self {
        Self {
            id,
            alias: alias.into(),
            cardinality,
            indexes: Vec::new(),
            db_key: true,
        }
    }

    #[must_use]
    pub fn with_index(mut self, index: impl Into<Arc<IndexDescriptor>>) -> Self {
        self.indexes.push(index.into());
        self
    }

    #[must_use]
    pub const fn without_db_key(mut self) -> Self {
        self.db_key = false;
        self
    }

    #[must_use]
    pub fn index_named(&self, name: &str) -> Option<&Arc<IndexDescriptor>> {
        self.indexes.iter().find(|index| index.name() == name)
    }
}

///
/// StreamCatalog
/// Streams of one statement, keyed by id.
///

#[derive(Clone, Debug, Default)]
pub struct StreamCatalog {
    streams: BTreeMap<StreamId, StreamDescriptor>,
}

impl StreamCatalog {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            streams: BTreeMap::new(),
        }
    }

    /// Register a stream after checking its index metadata is well-formed.
    pub fn insert(&mut self, stream: StreamDescriptor) -> Result<(), OptimizerError> {
        if let Some(index) = stream.indexes.iter().find(|i| i.segment_count() == 0) {
            return Err(OptimizerError::empty_index(index.name()));
        }
        if self.streams.contains_key(&stream.id) {
            return Err(OptimizerError::new(
                ErrorClass::InvariantViolation,
                ErrorOrigin::Stream,
                format!("stream {} registered twice", stream.id),
            ));
        }

        self.streams.insert(stream.id, stream);
        Ok(())
    }

    pub fn get(&self, id: StreamId) -> Result<&StreamDescriptor, OptimizerError> {
        self.streams
            .get(&id)
            .ok_or_else(|| OptimizerError::unknown_stream(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.values()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
