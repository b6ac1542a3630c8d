use crate::expr::Operand;

///
/// SortDirection
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

///
/// NullPlacement
///
/// `Default` resolves to the engine's natural placement: first for
/// ascending order, last for descending order.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NullPlacement {
    Default,
    First,
    Last,
}

impl NullPlacement {
    #[must_use]
    pub const fn resolve(self, direction: SortDirection) -> Self {
        match (self, direction) {
            (Self::Default, SortDirection::Ascending) => Self::First,
            (Self::Default, SortDirection::Descending) => Self::Last,
            (other, _) => other,
        }
    }
}

///
/// SortPurpose
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortPurpose {
    OrderBy,
    GroupBy,
    Distinct,
}

///
/// SortItem
///

#[derive(Clone, Debug, PartialEq)]
pub struct SortItem {
    pub operand: Operand,
    pub direction: SortDirection,
    pub nulls: NullPlacement,
}

impl SortItem {
    #[must_use]
    pub const fn ascending(operand: Operand) -> Self {
        Self {
            operand,
            direction: SortDirection::Ascending,
            nulls: NullPlacement::Default,
        }
    }

    #[must_use]
    pub const fn descending(operand: Operand) -> Self {
        Self {
            operand,
            direction: SortDirection::Descending,
            nulls: NullPlacement::Default,
        }
    }
}

///
/// SortSpec
/// Pending sort that an index walk may satisfy.
///

#[derive(Clone, Debug, PartialEq)]
pub struct SortSpec {
    pub purpose: SortPurpose,
    pub items: Vec<SortItem>,
}

impl SortSpec {
    #[must_use]
    pub const fn order_by(items: Vec<SortItem>) -> Self {
        Self {
            purpose: SortPurpose::OrderBy,
            items,
        }
    }

    #[must_use]
    pub const fn group_by(items: Vec<SortItem>) -> Self {
        Self {
            purpose: SortPurpose::GroupBy,
            items,
        }
    }
}
