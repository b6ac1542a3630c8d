use crate::expr::{ExpressionId, FieldId, ValueType};
use derive_more::Display;
use std::sync::atomic::{AtomicU8, Ordering};

///
/// IndexId
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct IndexId(u32);

impl IndexId {
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

///
/// SegmentKey
/// What one key segment indexes.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SegmentKey {
    Field(FieldId),
    Expression(ExpressionId),
}

///
/// Collation
///
/// Text ordering attached to a key segment. `ordered == false` marks an
/// unsorted-unique collation: equality lookups only, key order meaningless.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Collation {
    pub name: String,
    pub prefix_scan: bool,
    pub ordered: bool,
    pub coarse_equivalence: bool,
}

impl Collation {
    /// Binary collation: ordered, prefix-capable, exact equality.
    #[must_use]
    pub fn binary(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix_scan: true,
            ordered: true,
            coarse_equivalence: false,
        }
    }

    /// Case/accent-insensitive collation.
    #[must_use]
    pub fn insensitive(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix_scan: true,
            ordered: true,
            coarse_equivalence: true,
        }
    }

    /// Collation whose keys only support equality lookups.
    #[must_use]
    pub fn unsorted_unique(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix_scan: false,
            ordered: false,
            coarse_equivalence: false,
        }
    }
}

///
/// IndexSegment
///

#[derive(Clone, Debug, PartialEq)]
pub struct IndexSegment {
    pub key: SegmentKey,
    pub value_type: ValueType,

    /// Fraction of rows sharing one key prefix ending at this segment.
    /// Zero means "not analyzed".
    pub selectivity: f64,
    pub collation: Option<Collation>,
}

impl IndexSegment {
    #[must_use]
    pub const fn field(field: FieldId, value_type: ValueType) -> Self {
        Self {
            key: SegmentKey::Field(field),
            value_type,
            selectivity: 0.0,
            collation: None,
        }
    }

    #[must_use]
    pub const fn expression(id: ExpressionId, value_type: ValueType) -> Self {
        Self {
            key: SegmentKey::Expression(id),
            value_type,
            selectivity: 0.0,
            collation: None,
        }
    }

    #[must_use]
    pub const fn with_selectivity(mut self, selectivity: f64) -> Self {
        self.selectivity = selectivity;
        self
    }

    #[must_use]
    pub fn with_collation(mut self, collation: Collation) -> Self {
        self.collation = Some(collation);
        self
    }

    /// Whether `STARTING WITH` may bind this segment.
    #[must_use]
    pub fn supports_prefix_scan(&self) -> bool {
        match &self.collation {
            Some(collation) => collation.prefix_scan,
            None => self.value_type == ValueType::Text,
        }
    }
}

///
/// IndexHints
///
/// Advisory runtime flags shared by every compilation against the index.
/// Writes are best-effort and racy by nature; nothing in planning reads them.
///

#[derive(Debug, Default)]
pub struct IndexHints(AtomicU8);

impl IndexHints {
    const NAVIGATION: u8 = 0b01;
    const RETRIEVAL: u8 = 0b10;

    pub fn mark_navigation(&self) {
        self.0.fetch_or(Self::NAVIGATION, Ordering::Relaxed);
    }

    pub fn mark_retrieval(&self) {
        self.0.fetch_or(Self::RETRIEVAL, Ordering::Relaxed);
    }

    pub fn clear(&self) {
        self.0.store(0, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> HintSnapshot {
        let bits = self.0.load(Ordering::Relaxed);

        HintSnapshot {
            navigation: bits & Self::NAVIGATION != 0,
            retrieval: bits & Self::RETRIEVAL != 0,
        }
    }
}

///
/// HintSnapshot
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct HintSnapshot {
    pub navigation: bool,
    pub retrieval: bool,
}

///
/// IndexDescriptor
///
/// Read-only index metadata. Shared across compilations behind an `Arc`;
/// only `hints` is ever written during planning.
///

#[derive(Debug)]
pub struct IndexDescriptor {
    id: IndexId,
    name: String,
    segments: Vec<IndexSegment>,
    unique: bool,
    primary: bool,
    descending: bool,
    hints: IndexHints,
}

impl IndexDescriptor {
    #[must_use]
    pub fn new(id: IndexId, name: impl Into<String>, segments: Vec<IndexSegment>) -> Self {
        Self {
            id,
            name: name.into(),
            segments,
            unique: false,
            primary: false,
            descending: false,
            hints: IndexHints::default(),
        }
    }

    #[must_use]
    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Primary keys are unique by definition.
    #[must_use]
    pub const fn primary(mut self) -> Self {
        self.primary = true;
        self.unique = true;
        self
    }

    #[must_use]
    pub const fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    #[must_use]
    pub const fn id(&self) -> IndexId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn segments(&self) -> &[IndexSegment] {
        &self.segments
    }

    #[must_use]
    pub const fn segment_count(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub const fn is_unique(&self) -> bool {
        self.unique || self.primary
    }

    #[must_use]
    pub const fn is_primary(&self) -> bool {
        self.primary
    }

    #[must_use]
    pub const fn is_descending(&self) -> bool {
        self.descending
    }

    #[must_use]
    pub fn is_expression(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment.key, SegmentKey::Expression(_)))
    }

    #[must_use]
    pub const fn hints(&self) -> &IndexHints {
        &self.hints
    }
}
