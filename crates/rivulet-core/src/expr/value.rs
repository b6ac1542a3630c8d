use derive_more::Display;

///
/// ValueType
/// Static comparison domain of a field, segment, or cast target.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ValueType {
    Boolean,
    Int32,
    Int64,
    Int128,
    Float64,
    Text,
}

impl ValueType {
    /// Domain a bound must be widened into before key construction, if any.
    ///
    /// 64-bit integer keys compare in the 128-bit domain unless the bound is
    /// already known to be a 64-bit integer.
    #[must_use]
    pub fn widening_for(self, bound: Option<Self>) -> Option<Self> {
        match self {
            Self::Int64 if bound != Some(Self::Int64) => Some(Self::Int128),
            _ => None,
        }
    }
}

///
/// Value
/// Literal carried by a predicate operand.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Int128(i128),
    Float(f64),
    Text(String),
}

impl Value {
    #[must_use]
    pub const fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueType::Boolean),
            Self::Int(_) => Some(ValueType::Int64),
            Self::Int128(_) => Some(ValueType::Int128),
            Self::Float(_) => Some(ValueType::Float64),
            Self::Text(_) => Some(ValueType::Text),
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True for the empty text literal.
    #[must_use]
    pub const fn is_empty_text(&self) -> bool {
        matches!(self, Self::Text(text) if text.is_empty())
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Self::Int(v) => write!(f, "{v}"),
            Self::Int128(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "'{v}'"),
        }
    }
}
