//! tk-schemas
//!
//! Shared data model for tier reconciliation: retention policies, introspected
//! measurements, continuous queries, the actual-state snapshot, the aggregate
//! override table and bookkeeping points. No IO.

pub mod duration;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

pub use duration::{normalize, DurationError, TierDuration, INFINITE_TICKS};

/// Aggregate applied when no override matches.
pub const FALLBACK_AGGREGATE: &str = "mean";

// ---------------------------------------------------------------------------
// Desired entities
// ---------------------------------------------------------------------------

/// A configured storage tier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RetentionPolicy {
    pub name: String,
    pub duration: TierDuration,
    /// Downsampling bucket. `None` means the tier is not a downsampling target.
    pub resolution: Option<TierDuration>,
    pub is_default: bool,
}

impl RetentionPolicy {
    pub fn new(
        name: impl Into<String>,
        duration: TierDuration,
        resolution: Option<TierDuration>,
        is_default: bool,
    ) -> Self {
        Self {
            name: name.into(),
            duration,
            resolution,
            is_default,
        }
    }
}

/// A measurement and its field keys, as discovered by introspection.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Measurement {
    pub name: String,
    pub fields: BTreeSet<String>,
}

/// Live measurement -> field-set snapshot captured once per run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SchemaSnapshot {
    measurements: BTreeMap<String, BTreeSet<String>>,
}

impl SchemaSnapshot {
    pub fn new(measurements: BTreeMap<String, BTreeSet<String>>) -> Self {
        Self { measurements }
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    /// Measurements in name order. Measurements without fields are skipped:
    /// they cannot produce a SELECT list.
    pub fn measurements(&self) -> impl Iterator<Item = Measurement> + '_ {
        self.measurements
            .iter()
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(name, fields)| Measurement {
                name: name.clone(),
                fields: fields.clone(),
            })
    }

    /// Copy without the named measurement.
    pub fn without(&self, measurement: &str) -> Self {
        let mut measurements = self.measurements.clone();
        measurements.remove(measurement);
        Self { measurements }
    }
}

/// A downsampling job, identified by its derived name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ContinuousQuery {
    /// `cq_<measurement>_<resolution>`.
    pub name: String,
    pub source_policy: String,
    pub target_policy: String,
    pub measurement: String,
    pub text: String,
}

/// Derived identity key of a continuous query.
pub fn continuous_query_name(measurement: &str, resolution: &TierDuration) -> String {
    format!("cq_{}_{}", measurement, resolution.literal())
}

// ---------------------------------------------------------------------------
// Actual entities (read-only snapshot of the backend)
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActualRetentionPolicy {
    pub name: String,
    pub duration: TierDuration,
    pub is_default: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ActualContinuousQuery {
    pub name: String,
    pub text: String,
}

/// Backend configuration as introspected at the start of a run.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActualState {
    pub retention_policies: Vec<ActualRetentionPolicy>,
    pub continuous_queries: Vec<ActualContinuousQuery>,
}

impl ActualState {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn policy(&self, name: &str) -> Option<&ActualRetentionPolicy> {
        self.retention_policies.iter().find(|p| p.name == name)
    }

    pub fn has_policy(&self, name: &str) -> bool {
        self.policy(name).is_some()
    }

    /// A tiering scheme is in place once any policy besides the current
    /// default exists.
    pub fn is_initialized(&self) -> bool {
        self.retention_policies.iter().any(|p| !p.is_default)
    }
}

// ---------------------------------------------------------------------------
// Aggregate override table
// ---------------------------------------------------------------------------

/// Layered aggregate overrides.
///
/// ```yaml
/// DEFAULT: mean
/// diskio: max
/// kernel: { DEFAULT: max, entropy_avail: mean }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateOverrides {
    #[serde(rename = "DEFAULT", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(flatten)]
    pub measurements: BTreeMap<String, MeasurementAggregate>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementAggregate {
    /// One aggregate for every field of the measurement.
    Uniform(String),
    PerField(FieldAggregates),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAggregates {
    #[serde(rename = "DEFAULT", default, skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

// ---------------------------------------------------------------------------
// Bookkeeping
// ---------------------------------------------------------------------------

/// A point written for external dashboards; never read back by reconciliation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BookkeepingPoint {
    pub measurement: String,
    pub fields: BTreeMap<String, String>,
    pub timestamp_ns: i64,
}
