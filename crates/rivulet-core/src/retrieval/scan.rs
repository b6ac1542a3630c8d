use crate::{
    expr::{Operand, PredicateRef, ValueType},
    model::{IndexDescriptor, IndexId, StreamId},
};

///
/// ScanKind
/// How one key segment is bound.
///

#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
pub enum ScanKind {
    #[default]
    None,
    Equal,
    Equivalent,
    Missing,
    Starting,
    Less,
    Greater,
    Between,
}

impl ScanKind {
    /// Equality-class bindings let the next segment be refined.
    #[must_use]
    pub const fn is_perfect(self) -> bool {
        matches!(self, Self::Equal | Self::Equivalent | Self::Missing)
    }

    /// Relative strength of a binding; a weaker binding never replaces a stronger one.
    #[must_use]
    pub const fn specificity(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Less | Self::Greater => 1,
            Self::Starting => 2,
            Self::Between => 3,
            Self::Equal | Self::Equivalent | Self::Missing => 4,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Equal => "equal",
            Self::Equivalent => "equivalent",
            Self::Missing => "missing",
            Self::Starting => "starting",
            Self::Less => "less",
            Self::Greater => "greater",
            Self::Between => "between",
        }
    }
}

///
/// KeyBound
///
/// One key-segment value taken from a binding predicate. The value operand
/// is copied from that predicate; `widen` names the domain the execution
/// layer must convert it into before building the key.
///

#[derive(Clone, Debug, PartialEq)]
pub struct KeyBound {
    pub value: Operand,
    pub predicate: PredicateRef,
    pub widen: Option<ValueType>,
}

///
/// IndexScan
///
/// Bounded walk over one index. Empty bound vectors mean an open end; both
/// empty with `ScanKind::None` is a full index walk.
///

#[derive(Clone, Debug, PartialEq)]
pub struct IndexScan {
    pub stream: StreamId,
    pub index: IndexId,
    pub index_name: String,
    pub lower: Vec<KeyBound>,
    pub upper: Vec<KeyBound>,
    pub exclude_lower: bool,
    pub exclude_upper: bool,
    pub scan_kind: ScanKind,
    pub descending: bool,
}

impl IndexScan {
    #[must_use]
    pub fn full_walk(stream: StreamId, index: &IndexDescriptor) -> Self {
        Self {
            stream,
            index: index.id(),
            index_name: index.name().to_string(),
            lower: Vec::new(),
            upper: Vec::new(),
            exclude_lower: false,
            exclude_upper: false,
            scan_kind: ScanKind::None,
            descending: index.is_descending(),
        }
    }

    #[must_use]
    pub fn is_full_walk(&self) -> bool {
        self.lower.is_empty() && self.upper.is_empty()
    }

    /// Predicates whose values appear in the bounds, in bound order.
    pub fn bound_predicates(&self) -> impl Iterator<Item = PredicateRef> + '_ {
        self.lower
            .iter()
            .chain(&self.upper)
            .map(|bound| bound.predicate)
    }
}

///
/// ScanPlan
///
/// Boolean combination of index retrievals ("inversion") for one stream.
///

#[derive(Clone, Debug, PartialEq)]
pub enum ScanPlan {
    Index(IndexScan),
    And(Box<Self>, Box<Self>),
    Or(Box<Self>, Box<Self>),
    InList {
        stream: StreamId,
        index: IndexId,
        index_name: String,
        values: Vec<KeyBound>,
    },
    RowIdRange {
        stream: StreamId,
        lower: Option<KeyBound>,
        upper: Option<KeyBound>,
        exclude_lower: bool,
        exclude_upper: bool,
    },
}

impl ScanPlan {
    #[must_use]
    pub fn and(left: Self, right: Self) -> Self {
        Self::And(Box::new(left), Box::new(right))
    }

    #[must_use]
    pub fn or(left: Self, right: Self) -> Self {
        Self::Or(Box::new(left), Box::new(right))
    }

    /// Every predicate whose value appears in some bound of the tree.
    #[must_use]
    pub fn bound_predicates(&self) -> Vec<PredicateRef> {
        let mut out = Vec::new();
        self.collect_bound_predicates(&mut out);
        out
    }

    fn collect_bound_predicates(&self, out: &mut Vec<PredicateRef>) {
        fn push(out: &mut Vec<PredicateRef>, predicate: PredicateRef) {
            if !out.contains(&predicate) {
                out.push(predicate);
            }
        }

        match self {
            Self::Index(scan) => scan.bound_predicates().for_each(|p| push(out, p)),
            Self::And(l, r) | Self::Or(l, r) => {
                l.collect_bound_predicates(out);
                r.collect_bound_predicates(out);
            }
            Self::InList { values, .. } => values.iter().for_each(|v| push(out, v.predicate)),
            Self::RowIdRange { lower, upper, .. } => {
                lower.iter().chain(upper).for_each(|v| push(out, v.predicate));
            }
        }
    }

    /// Index names in traversal order, duplicates kept.
    #[must_use]
    pub fn index_names(&self) -> Vec<&str> {
        match self {
            Self::Index(scan) => vec![scan.index_name.as_str()],
            Self::And(l, r) | Self::Or(l, r) => {
                let mut names = l.index_names();
                names.extend(r.index_names());
                names
            }
            Self::InList { index_name, .. } => vec![index_name.as_str()],
            Self::RowIdRange { .. } => Vec::new(),
        }
    }
}
