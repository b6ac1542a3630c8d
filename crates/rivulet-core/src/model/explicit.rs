use crate::{
    error::OptimizerError,
    model::{StreamCatalog, StreamId, StreamSet},
};

///
/// PlanAccess
/// Access method a user-written plan pins for one stream.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PlanAccess {
    Natural,
    Indexes(Vec<String>),
    Order {
        navigation: String,
        indexes: Vec<String>,
    },
}

impl PlanAccess {
    /// Every index name the item refers to, navigation first.
    #[must_use]
    pub fn index_names(&self) -> Vec<&str> {
        match self {
            Self::Natural => Vec::new(),
            Self::Indexes(names) => names.iter().map(String::as_str).collect(),
            Self::Order {
                navigation,
                indexes,
            } => std::iter::once(navigation.as_str())
                .chain(indexes.iter().map(String::as_str))
                .collect(),
        }
    }

    #[must_use]
    pub fn navigation(&self) -> Option<&str> {
        match self {
            Self::Order { navigation, .. } => Some(navigation.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn filter_indexes(&self) -> &[String] {
        match self {
            Self::Natural => &[],
            Self::Indexes(names) | Self::Order { indexes: names, .. } => names,
        }
    }
}

///
/// PlanItem
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PlanItem {
    pub stream: StreamId,
    pub access: PlanAccess,
}

///
/// ExplicitPlan
///
/// User-specified join order and access methods. When present the cost-based
/// search is skipped and the plan is validated and replayed as written.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ExplicitPlan {
    pub items: Vec<PlanItem>,
}

impl ExplicitPlan {
    #[must_use]
    pub const fn new(items: Vec<PlanItem>) -> Self {
        Self { items }
    }

    #[must_use]
    pub fn item(&self, stream: StreamId) -> Option<&PlanItem> {
        self.items.iter().find(|item| item.stream == stream)
    }

    /// Check every named stream and index exists and no stream repeats.
    pub fn validate(&self, catalog: &StreamCatalog) -> Result<(), OptimizerError> {
        let mut seen = StreamSet::EMPTY;

        for item in &self.items {
            if seen.contains(item.stream) {
                return Err(OptimizerError::duplicate_plan_stream(item.stream));
            }
            seen.insert(item.stream);

            let stream = catalog.get(item.stream)?;
            for name in item.access.index_names() {
                if stream.index_named(name).is_none() {
                    return Err(OptimizerError::unknown_plan_index(item.stream, name));
                }
            }
        }

        Ok(())
    }

    /// Check the plan covers exactly the given streams.
    pub fn validate_coverage(&self, streams: StreamSet) -> Result<(), OptimizerError> {
        let listed: StreamSet = self.items.iter().map(|item| item.stream).collect();
        if listed != streams {
            return Err(OptimizerError::plan_invariant(format!(
                "explicit plan lists streams {listed:?} but the join contains {streams:?}"
            )));
        }

        Ok(())
    }
}
