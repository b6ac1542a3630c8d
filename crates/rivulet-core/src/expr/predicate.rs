use crate::{
    error::OptimizerError,
    expr::Operand,
    model::StreamSet,
};
use derive_more::Display;

///
/// PredicateRef
/// Arena id of an immutable predicate node. Identity is the id.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("#{_0}")]
pub struct PredicateRef(u32);

impl PredicateRef {
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    const fn index(self) -> usize {
        self.0 as usize
    }
}

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum CompareOp {
    #[display("=")]
    Eq,
    #[display("<>")]
    Ne,
    #[display("IS NOT DISTINCT FROM")]
    NotDistinct,
    #[display(">")]
    Gt,
    #[display(">=")]
    Ge,
    #[display("<")]
    Lt,
    #[display("<=")]
    Le,
}

impl CompareOp {
    /// Operator with its operands swapped.
    #[must_use]
    pub const fn mirrored(self) -> Self {
        match self {
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            other => other,
        }
    }
}

///
/// PatternKind
/// Pattern operators; all are opaque filters to the optimizer.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum PatternKind {
    #[display("LIKE")]
    Like,
    #[display("SIMILAR TO")]
    Similar,
    #[display("CONTAINING")]
    Containing,
    #[display("MATCHES")]
    Matches,
}

///
/// SubqueryKind
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum SubqueryKind {
    Exists,
    Any,
    All,
    Singular,
}

///
/// Predicate
///
/// Boolean node of a compiled filter. Children are arena ids so nodes can be
/// shared between conjuncts, probes, and candidates without ownership.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    And(PredicateRef, PredicateRef),
    Or(PredicateRef, PredicateRef),
    Not(PredicateRef),
    Compare {
        op: CompareOp,
        left: Operand,
        right: Operand,
    },
    Between {
        value: Operand,
        lower: Operand,
        upper: Operand,
    },
    StartingWith {
        value: Operand,
        prefix: Operand,
    },
    Missing(Operand),
    InList {
        value: Operand,
        list: Vec<Operand>,
    },
    Pattern {
        kind: PatternKind,
        value: Operand,
        pattern: Operand,
    },
    Subquery {
        kind: SubqueryKind,
        correlated: StreamSet,
    },
    Constant(bool),
}

impl Predicate {
    #[must_use]
    pub const fn is_boolean_connective(&self) -> bool {
        matches!(self, Self::And(..) | Self::Or(..))
    }
}

///
/// PredicateArena
///
/// Append-only store of predicate nodes for one compiled statement.
///

#[derive(Clone, Debug, Default)]
pub struct PredicateArena {
    nodes: Vec<Predicate>,
}

impl PredicateArena {
    #[must_use]
    pub const fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn push(&mut self, predicate: Predicate) -> PredicateRef {
        let id = u32::try_from(self.nodes.len()).unwrap_or(u32::MAX);
        self.nodes.push(predicate);
        PredicateRef(id)
    }

    pub fn get(&self, id: PredicateRef) -> Result<&Predicate, OptimizerError> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| OptimizerError::dangling_predicate(id))
    }

    #[must_use]
    pub fn contains(&self, id: PredicateRef) -> bool {
        id.index() < self.nodes.len()
    }

    // ------------------------------------------------------------------
    // Builders
    // ------------------------------------------------------------------

    pub fn and(&mut self, left: PredicateRef, right: PredicateRef) -> PredicateRef {
        self.push(Predicate::And(left, right))
    }

    pub fn or(&mut self, left: PredicateRef, right: PredicateRef) -> PredicateRef {
        self.push(Predicate::Or(left, right))
    }

    pub fn not(&mut self, inner: PredicateRef) -> PredicateRef {
        self.push(Predicate::Not(inner))
    }

    pub fn compare(&mut self, op: CompareOp, left: Operand, right: Operand) -> PredicateRef {
        self.push(Predicate::Compare { op, left, right })
    }

    pub fn eq(&mut self, left: Operand, right: Operand) -> PredicateRef {
        self.compare(CompareOp::Eq, left, right)
    }

    pub fn between(&mut self, value: Operand, lower: Operand, upper: Operand) -> PredicateRef {
        self.push(Predicate::Between {
            value,
            lower,
            upper,
        })
    }

    pub fn starting_with(&mut self, value: Operand, prefix: Operand) -> PredicateRef {
        self.push(Predicate::StartingWith { value, prefix })
    }

    pub fn missing(&mut self, value: Operand) -> PredicateRef {
        self.push(Predicate::Missing(value))
    }

    pub fn in_list(&mut self, value: Operand, list: Vec<Operand>) -> PredicateRef {
        self.push(Predicate::InList { value, list })
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Streams referenced anywhere beneath `id`.
    pub fn streams(&self, id: PredicateRef) -> Result<StreamSet, OptimizerError> {
        let mut set = StreamSet::EMPTY;
        self.collect_streams(id, &mut set, 0)?;
        Ok(set)
    }

    fn collect_streams(
        &self,
        id: PredicateRef,
        set: &mut StreamSet,
        depth: usize,
    ) -> Result<(), OptimizerError> {
        // Children are always pushed before their parent, so a well-formed
        // tree is never deeper than the arena.
        if depth > self.nodes.len() {
            return Err(OptimizerError::dangling_predicate(id));
        }

        let operands: Vec<&Operand> = match self.get(id)? {
            Predicate::And(l, r) | Predicate::Or(l, r) => {
                self.collect_streams(*l, set, depth + 1)?;
                return self.collect_streams(*r, set, depth + 1);
            }
            Predicate::Not(inner) => return self.collect_streams(*inner, set, depth + 1),
            Predicate::Compare { left, right, .. } => vec![left, right],
            Predicate::Between {
                value,
                lower,
                upper,
            } => vec![value, lower, upper],
            Predicate::StartingWith { value, prefix } => vec![value, prefix],
            Predicate::Missing(value) => vec![value],
            Predicate::InList { value, list } => std::iter::once(value).chain(list).collect(),
            Predicate::Pattern { value, pattern, .. } => vec![value, pattern],
            Predicate::Subquery { correlated, .. } => {
                *set = set.union(*correlated);
                return Ok(());
            }
            Predicate::Constant(_) => return Ok(()),
        };

        for operand in operands {
            *set = set.union(operand.streams());
        }

        Ok(())
    }

    /// True when every stream referenced beneath `id` is in `available`.
    pub fn is_computable(
        &self,
        id: PredicateRef,
        available: StreamSet,
    ) -> Result<bool, OptimizerError> {
        Ok(self.streams(id)?.is_subset(available))
    }

    /// Flatten the top-level AND chain beneath `root`, left to right.
    pub fn conjuncts(&self, root: PredicateRef) -> Result<Vec<PredicateRef>, OptimizerError> {
        let mut out = Vec::new();
        let mut stack = vec![root];

        while let Some(id) = stack.pop() {
            if out.len() + stack.len() > self.nodes.len() {
                return Err(OptimizerError::dangling_predicate(id));
            }
            match self.get(id)? {
                Predicate::And(left, right) => {
                    stack.push(*right);
                    stack.push(*left);
                }
                _ => out.push(id),
            }
        }

        Ok(out)
    }
}
