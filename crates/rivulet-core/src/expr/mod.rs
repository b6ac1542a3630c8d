//! Predicate vocabulary: an append-only arena of boolean nodes and the
//! operands they compare. Planning inspects these nodes and never rewrites them.

mod operand;
mod predicate;
mod value;


pub use operand::{ExpressionId, FieldId, FieldRef, Operand};
pub use predicate::{
    CompareOp, PatternKind, Predicate, PredicateArena, PredicateRef, SubqueryKind,
};
pub use value::{Value, ValueType};
