//! Deterministic, read-only explanation of join plans; must not re-plan or validate.

use crate::{
    model::StreamId,
    optimizer::JoinPlan,
    retrieval::{ScanKind, ScanPlan},
};
use std::fmt;

/// Name printed for a row-id range in place of an index name.
pub const DB_KEY_LABEL: &str = "DB_KEY";

///
/// ExplainPlan
///
/// Stable, deterministic representation of a `JoinPlan` for observability.
/// Costs are left out so equal shapes explain identically.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExplainPlan {
    pub rivers: Vec<ExplainRiver>,
}

///
/// ExplainRiver
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExplainRiver {
    pub streams: Vec<ExplainStream>,
}

///
/// ExplainStream
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExplainStream {
    pub stream: StreamId,
    pub alias: String,
    pub access: ExplainAccess,

    /// The inversion is bypassed at run time when its guard holds.
    pub guarded: bool,
}

///
/// ExplainAccess
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExplainAccess {
    Natural,
    Index(ExplainInversion),
    Order {
        navigation: String,
        inversion: Option<ExplainInversion>,
    },
}

///
/// ExplainInversion
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ExplainInversion {
    Index {
        name: String,
        scan_kind: ScanKind,
        lower: usize,
        upper: usize,
    },
    InList {
        name: String,
        values: usize,
    },
    DbKey {
        lower: bool,
        upper: bool,
    },
    And(Vec<Self>),
    Or(Vec<Self>),
}

impl JoinPlan {
    /// Produce a stable, deterministic explanation of this join plan.
    #[must_use]
    pub fn explain(&self) -> ExplainPlan {
        let rivers = self
            .rivers
            .iter()
            .map(|river| ExplainRiver {
                streams: river
                    .streams
                    .iter()
                    .map(|access| {
                        let inversion = access.inversion.as_ref().map(ExplainInversion::from_scan);
                        let access_kind = match (&access.navigation, inversion) {
                            (Some(scan), inversion) => ExplainAccess::Order {
                                navigation: scan.index_name.clone(),
                                inversion,
                            },
                            (None, Some(inversion)) => ExplainAccess::Index(inversion),
                            (None, None) => ExplainAccess::Natural,
                        };

                        ExplainStream {
                            stream: access.stream,
                            alias: access.alias.clone(),
                            access: access_kind,
                            guarded: access.residual_condition.is_some(),
                        }
                    })
                    .collect(),
            })
            .collect();

        ExplainPlan { rivers }
    }
}

impl ExplainInversion {
    fn from_scan(plan: &ScanPlan) -> Self {
        match plan {
            ScanPlan::Index(scan) => Self::Index {
                name: scan.index_name.clone(),
                scan_kind: scan.scan_kind,
                lower: scan.lower.len(),
                upper: scan.upper.len(),
            },
            ScanPlan::InList {
                index_name, values, ..
            } => Self::InList {
                name: index_name.clone(),
                values: values.len(),
            },
            ScanPlan::RowIdRange { lower, upper, .. } => Self::DbKey {
                lower: lower.is_some(),
                upper: upper.is_some(),
            },
            ScanPlan::And(left, right) => Self::And(flatten(left, right, true)),
            ScanPlan::Or(left, right) => Self::Or(flatten(left, right, false)),
        }
    }

    /// Index names in traversal order, one per leaf.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        match self {
            Self::Index { name, .. } | Self::InList { name, .. } => vec![name.as_str()],
            Self::DbKey { .. } => vec![DB_KEY_LABEL],
            Self::And(children) | Self::Or(children) => {
                children.iter().flat_map(Self::names).collect()
            }
        }
    }
}

// Nested connectives of the same kind collapse into one list.
fn flatten(left: &ScanPlan, right: &ScanPlan, and: bool) -> Vec<ExplainInversion> {
    let mut out = Vec::new();
    for side in [left, right] {
        match (ExplainInversion::from_scan(side), and) {
            (ExplainInversion::And(children), true) | (ExplainInversion::Or(children), false) => {
                out.extend(children);
            }
            (child, _) => out.push(child),
        }
    }

    out
}

impl ExplainPlan {
    #[must_use]
    pub fn stream_count(&self) -> usize {
        self.rivers.iter().map(|river| river.streams.len()).sum()
    }
}

///
/// Plan text
///
/// `PLAN (A NATURAL)` for one stream, `PLAN JOIN (..)` otherwise. A river of
/// several streams nested among other rivers prints as its own `JOIN (..)`.
///

impl fmt::Display for ExplainPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PLAN ")?;

        match self.rivers.as_slice() {
            [] => f.write_str("()"),
            [river] if river.streams.len() == 1 => write!(f, "({})", river.streams[0]),
            [river] => write!(f, "{river}"),
            rivers => {
                f.write_str("JOIN (")?;
                for (position, river) in rivers.iter().enumerate() {
                    if position > 0 {
                        f.write_str(", ")?;
                    }
                    match river.streams.as_slice() {
                        [stream] => write!(f, "{stream}")?,
                        _ => write!(f, "{river}")?,
                    }
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for ExplainRiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("JOIN (")?;
        for (position, stream) in self.streams.iter().enumerate() {
            if position > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{stream}")?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for ExplainStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ", self.alias)?;

        match &self.access {
            ExplainAccess::Natural => f.write_str("NATURAL"),
            ExplainAccess::Index(inversion) => write_index_list(f, inversion),
            ExplainAccess::Order {
                navigation,
                inversion,
            } => {
                write!(f, "ORDER {navigation}")?;
                if let Some(inversion) = inversion {
                    f.write_str(" ")?;
                    write_index_list(f, inversion)?;
                }
                Ok(())
            }
        }
    }
}

fn write_index_list(f: &mut fmt::Formatter<'_>, inversion: &ExplainInversion) -> fmt::Result {
    write!(f, "INDEX ({})", inversion.names().join(", "))
}

///
/// TESTS
///
