//! Cost-model tuning knobs.
//!
//! Every constant the cost model reads lives here so one statement's planning
//! sees a single immutable snapshot. Values load from TOML; unknown keys are
//! rejected and omitted keys fall back to the built-in defaults.

use serde::Deserialize;
use thiserror::Error as ThisError;

///
/// ConfigError
///

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to parse optimizer config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid optimizer config: {field} {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

///
/// OptimizerConfig
///

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Fixed cost charged per index walked.
    pub index_base_cost: f64,

    /// Fixed cost of a DB-key (row id) lookup.
    pub db_key_cost: f64,

    /// Selectivity assumed for a segment with no usable statistic.
    pub default_selectivity: f64,

    pub reduce_between: f64,
    pub reduce_less: f64,
    pub reduce_greater: f64,
    pub reduce_starting: f64,

    /// Tables at or below this cardinality accept every candidate.
    pub small_table_threshold: f64,

    /// Relative difference under which two costs compare equal.
    pub cost_tolerance: f64,

    /// Lower bound applied to every cardinality estimate.
    pub minimum_cardinality: f64,

    /// Cardinality assumed when the catalog reports a non-finite estimate.
    pub default_cardinality: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        Self {
            index_base_cost: 3.0,
            db_key_cost: 1.0,
            default_selectivity: 0.1,
            reduce_between: 0.0025,
            reduce_less: 0.05,
            reduce_greater: 0.05,
            reduce_starting: 0.01,
            small_table_threshold: 5.0,
            cost_tolerance: 0.02,
            minimum_cardinality: 1.0,
            default_cardinality: 1000.0,
        }
    }
}

impl OptimizerConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;

        Ok(config)
    }

    /// Reject settings that would break the cost model's ordering guarantees.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("index_base_cost", self.index_base_cost)?;
        positive("db_key_cost", self.db_key_cost)?;
        positive("minimum_cardinality", self.minimum_cardinality)?;
        positive("default_cardinality", self.default_cardinality)?;
        non_negative("small_table_threshold", self.small_table_threshold)?;

        fraction("default_selectivity", self.default_selectivity)?;
        fraction("reduce_between", self.reduce_between)?;
        fraction("reduce_less", self.reduce_less)?;
        fraction("reduce_greater", self.reduce_greater)?;
        fraction("reduce_starting", self.reduce_starting)?;

        if !(0.0..0.5).contains(&self.cost_tolerance) {
            return Err(ConfigError::Invalid {
                field: "cost_tolerance",
                reason: "must be within [0, 0.5)",
            });
        }

        Ok(())
    }

    /// Clamp a catalog cardinality into the range the cost model accepts.
    #[must_use]
    pub fn effective_cardinality(&self, raw: f64) -> f64 {
        if raw.is_finite() {
            raw.max(self.minimum_cardinality)
        } else {
            self.default_cardinality.max(self.minimum_cardinality)
        }
    }

    /// Compare two costs, treating values within the configured tolerance as equal.
    #[must_use]
    pub fn compare_costs(&self, left: f64, right: f64) -> std::cmp::Ordering {
        use std::cmp::Ordering;

        if left == right {
            return Ordering::Equal;
        }
        if left > right * (1.0 + self.cost_tolerance) {
            return Ordering::Greater;
        }
        if left < right * (1.0 - self.cost_tolerance) {
            return Ordering::Less;
        }

        Ordering::Equal
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be a positive finite number",
        })
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be a non-negative finite number",
        })
    }
}

fn fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: "must be within (0, 1]",
        })
    }
}

///
/// TESTS
///
