use crate::{expr::PredicateRef, model::StreamId};
use std::fmt;
use thiserror::Error as ThisError;

///
/// OptimizerError
///
/// Structured planning error with a stable classification.
/// Raised only for corrupted inputs; an unusable index or stale statistic
/// never produces one.
///

#[derive(Debug, ThisError)]
#[error("{message}")]
pub struct OptimizerError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    /// The variant (if present) must correspond to `origin`.
    pub detail: Option<ErrorDetail>,
}

impl OptimizerError {
    /// Construct an OptimizerError without a structured detail payload.
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    fn with_detail(class: ErrorClass, origin: ErrorOrigin, detail: ErrorDetail) -> Self {
        Self {
            class,
            origin,
            message: format!("{origin} {class}: {detail}"),
            detail: Some(detail),
        }
    }

    /// Construct a predicate-origin corruption error for an arena id with no node.
    pub(crate) fn dangling_predicate(predicate: PredicateRef) -> Self {
        Self::with_detail(
            ErrorClass::Corruption,
            ErrorOrigin::Predicate,
            ErrorDetail::DanglingPredicate { predicate },
        )
    }

    /// Construct a stream-origin not-found error.
    pub(crate) fn unknown_stream(stream: StreamId) -> Self {
        Self::with_detail(
            ErrorClass::NotFound,
            ErrorOrigin::Stream,
            ErrorDetail::UnknownStream { stream },
        )
    }

    /// Construct an index-origin corruption error for a probe/descriptor mismatch.
    pub(crate) fn segment_count_mismatch(
        index: impl Into<String>,
        expected: usize,
        found: usize,
    ) -> Self {
        Self::with_detail(
            ErrorClass::Corruption,
            ErrorOrigin::Index,
            ErrorDetail::SegmentCountMismatch {
                index: index.into(),
                expected,
                found,
            },
        )
    }

    /// Construct an index-origin corruption error for an index with no key segments.
    pub(crate) fn empty_index(index: impl Into<String>) -> Self {
        Self::with_detail(
            ErrorClass::Corruption,
            ErrorOrigin::Index,
            ErrorDetail::EmptyIndex {
                index: index.into(),
            },
        )
    }

    /// Construct a plan-origin not-found error for an explicit plan naming a missing index.
    pub(crate) fn unknown_plan_index(stream: StreamId, name: impl Into<String>) -> Self {
        Self::with_detail(
            ErrorClass::NotFound,
            ErrorOrigin::Plan,
            ErrorDetail::UnknownPlanIndex {
                stream,
                name: name.into(),
            },
        )
    }

    /// Construct a plan-origin invariant violation for a malformed explicit plan.
    pub(crate) fn plan_invariant(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, ErrorOrigin::Plan, message)
    }

    /// Construct a plan-origin invariant violation for a stream listed twice.
    pub(crate) fn duplicate_plan_stream(stream: StreamId) -> Self {
        Self::with_detail(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Plan,
            ErrorDetail::DuplicatePlanStream { stream },
        )
    }

    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self.class, ErrorClass::Corruption)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured, origin-specific error detail carried by [`OptimizerError`].
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ErrorDetail {
    #[error("predicate {predicate} is not present in the arena")]
    DanglingPredicate { predicate: PredicateRef },

    #[error("stream {stream} is not present in the catalog")]
    UnknownStream { stream: StreamId },

    #[error("index '{index}' has {expected} segments but its probe has {found}")]
    SegmentCountMismatch {
        index: String,
        expected: usize,
        found: usize,
    },

    #[error("index '{index}' declares no key segments")]
    EmptyIndex { index: String },

    #[error("explicit plan names index '{name}' which does not exist on stream {stream}")]
    UnknownPlanIndex { stream: StreamId, name: String },

    #[error("explicit plan lists stream {stream} more than once")]
    DuplicatePlanStream { stream: StreamId },
}

///
/// ErrorClass
/// Error taxonomy for planning failures.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Corruption,
    NotFound,
    Unsupported,
    InvariantViolation,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Corruption => "corruption",
            Self::NotFound => "not_found",
            Self::Unsupported => "unsupported",
            Self::InvariantViolation => "invariant_violation",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Subsystem that detected the failure.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Predicate,
    Index,
    Stream,
    Plan,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Predicate => "predicate",
            Self::Index => "index",
            Self::Stream => "stream",
            Self::Plan => "plan",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_message_carries_origin_and_class() {
        let err = OptimizerError::unknown_plan_index(StreamId::new(2), "IDX_MISSING");

        assert_eq!(err.class, ErrorClass::NotFound);
        assert_eq!(err.origin, ErrorOrigin::Plan);
        assert!(err.message.contains("IDX_MISSING"));
        assert!(err.message.starts_with("plan not_found"));
        assert_eq!(
            err.detail,
            Some(ErrorDetail::UnknownPlanIndex {
                stream: StreamId::new(2),
                name: "IDX_MISSING".to_string(),
            })
        );
    }

    #[test]
    fn segment_mismatch_is_corruption() {
        let err = OptimizerError::segment_count_mismatch("IDX_A", 2, 3);

        assert!(err.is_corruption());
        assert_eq!(
            err.display_with_class(),
            format!("index:corruption: {}", err.message)
        );
    }
}
