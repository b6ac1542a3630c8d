use crate::{
    expr::{Value, ValueType},
    model::{StreamId, StreamSet},
};
use derive_more::Display;

///
/// FieldId
/// Column position within a relation.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct FieldId(u16);

impl FieldId {
    #[must_use]
    pub const fn new(id: u16) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u16 {
        self.0
    }
}

///
/// ExpressionId
/// Identity of a compiled scalar expression (e.g. `UPPER(name)`).
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct ExpressionId(u32);

impl ExpressionId {
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
/// FieldRef
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct FieldRef {
    pub stream: StreamId,
    pub field: FieldId,
}

impl FieldRef {
    #[must_use]
    pub const fn new(stream: StreamId, field: FieldId) -> Self {
        Self { stream, field }
    }
}

///
/// Operand
/// Value side of a predicate. Operands are inspected, never evaluated.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Field(FieldRef),
    DbKey(StreamId),
    Literal(Value),
    Parameter(u16),
    Cast {
        inner: Box<Self>,
        target: ValueType,
    },

    /// Column of a derived table or view, resolved to its source operand.
    Derived(Box<Self>),

    Expression {
        id: ExpressionId,
        args: Vec<Self>,
    },

    /// Scalar subquery correlated to the listed outer streams.
    Subquery {
        correlated: StreamSet,
    },
}

impl Operand {
    #[must_use]
    pub const fn field(stream: StreamId, field: FieldId) -> Self {
        Self::Field(FieldRef::new(stream, field))
    }

    #[must_use]
    pub const fn int(value: i64) -> Self {
        Self::Literal(Value::Int(value))
    }

    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Literal(Value::Text(value.into()))
    }

    #[must_use]
    pub const fn boolean(value: bool) -> Self {
        Self::Literal(Value::Bool(value))
    }

    /// Streams whose rows this operand reads.
    #[must_use]
    pub fn streams(&self) -> StreamSet {
        let mut set = StreamSet::EMPTY;
        self.collect_streams(&mut set);
        set
    }

    fn collect_streams(&self, set: &mut StreamSet) {
        match self {
            Self::Field(field) => set.insert(field.stream),
            Self::DbKey(stream) => set.insert(*stream),
            Self::Literal(_) | Self::Parameter(_) => {}
            Self::Cast { inner, .. } | Self::Derived(inner) => inner.collect_streams(set),
            Self::Expression { args, .. } => {
                for arg in args {
                    arg.collect_streams(set);
                }
            }
            Self::Subquery { correlated } => *set = set.union(*correlated),
        }
    }

    /// True when every stream this operand reads is in `available`.
    #[must_use]
    pub fn is_computable(&self, available: StreamSet) -> bool {
        self.streams().is_subset(available)
    }

    /// Strip derived-table indirection.
    #[must_use]
    pub fn unwrap_derived(&self) -> &Self {
        let mut current = self;
        while let Self::Derived(inner) = current {
            current = inner;
        }
        current
    }

    /// Strip derived-table indirection and casts, as expression-index matching does.
    #[must_use]
    pub fn unwrap_for_expression(&self) -> &Self {
        let mut current = self;
        loop {
            match current {
                Self::Derived(inner) | Self::Cast { inner, .. } => current = inner,
                _ => return current,
            }
        }
    }

    /// The field this operand resolves to, if it is a plain column of `stream`.
    #[must_use]
    pub fn field_of(&self, stream: StreamId) -> Option<FieldId> {
        match self.unwrap_derived() {
            Self::Field(field) if field.stream == stream => Some(field.field),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_db_key_of(&self, stream: StreamId) -> bool {
        matches!(self.unwrap_derived(), Self::DbKey(s) if *s == stream)
    }

    /// The expression id this operand resolves to when it is an expression
    /// over `stream` alone.
    #[must_use]
    pub fn expression_of(&self, stream: StreamId) -> Option<ExpressionId> {
        match self.unwrap_for_expression() {
            Self::Expression { id, args } => {
                let mut streams = StreamSet::EMPTY;
                for arg in args {
                    arg.collect_streams(&mut streams);
                }
                (streams == StreamSet::single(stream)).then_some(*id)
            }
            _ => None,
        }
    }

    #[must_use]
    pub const fn literal(&self) -> Option<&Value> {
        match self {
            Self::Literal(value) => Some(value),
            _ => None,
        }
    }

    /// Statically known comparison domain.
    #[must_use]
    pub fn static_type(&self) -> Option<ValueType> {
        match self {
            Self::Literal(value) => value.value_type(),
            Self::Cast { target, .. } => Some(*target),
            Self::Derived(inner) => inner.static_type(),
            _ => None,
        }
    }
}

impl std::fmt::Display for Operand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Field(field) => write!(f, "s{}.f{}", field.stream, field.field),
            Self::DbKey(stream) => write!(f, "s{stream}.DB_KEY"),
            Self::Literal(value) => write!(f, "{value}"),
            Self::Parameter(slot) => write!(f, "?{slot}"),
            Self::Cast { inner, target } => write!(f, "CAST({inner} AS {target})"),
            Self::Derived(inner) => write!(f, "{inner}"),
            Self::Expression { id, args } => {
                write!(f, "expr{id}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
            Self::Subquery { correlated } => write!(f, "(SELECT ... {correlated:?})"),
        }
    }
}
