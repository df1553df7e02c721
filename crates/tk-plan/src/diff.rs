//! State differ.
//!
//! Continuous queries are matched by derived name and compared by fuzzy text
//! equivalence; every pair is judged on its own. Retention policies are only
//! compared for drift: the differ never creates, alters or drops a policy, it
//! reports advisories instead.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use tk_schemas::{ActualContinuousQuery, ActualState, TierDuration};

use crate::desired::DesiredState;
use crate::equivalence::equivalent;
use crate::plan::{Operation, Plan};

/// Retention-policy drift. Never auto-applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum PolicyAdvisory {
    /// A configured tier does not exist on the backend.
    Missing { name: String },
    DurationDrift {
        name: String,
        desired: TierDuration,
        actual: TierDuration,
    },
    DefaultDrift {
        name: String,
        desired_default: bool,
        actual_default: bool,
    },
    /// A backend policy that is neither configured nor the legacy tier.
    Unmanaged { name: String },
}

impl PolicyAdvisory {
    pub fn policy(&self) -> &str {
        match self {
            Self::Missing { name }
            | Self::DurationDrift { name, .. }
            | Self::DefaultDrift { name, .. }
            | Self::Unmanaged { name } => name,
        }
    }
}

impl fmt::Display for PolicyAdvisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing { name } => {
                write!(f, "retention policy '{name}' is configured but does not exist")
            }
            Self::DurationDrift {
                name,
                desired,
                actual,
            } => write!(
                f,
                "retention policy '{name}' has duration {actual}, configured {desired}; \
                 not altered (shrinking a tier deletes history)"
            ),
            Self::DefaultDrift {
                name,
                desired_default,
                actual_default,
            } => write!(
                f,
                "retention policy '{name}' default flag is {actual_default}, configured {desired_default}; not altered"
            ),
            Self::Unmanaged { name } => {
                write!(f, "retention policy '{name}' exists but is not configured; left in place")
            }
        }
    }
}

/// Output of one diff.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Diff {
    pub plan: Plan,
    pub advisories: Vec<PolicyAdvisory>,
}

impl Diff {
    pub fn missing_policies(&self) -> Vec<String> {
        self.advisories
            .iter()
            .filter(|a| matches!(a, PolicyAdvisory::Missing { .. }))
            .map(|a| a.policy().to_string())
            .collect()
    }
}

/// Steady-state diff: a plan of continuous-query operations plus policy
/// advisories. `legacy_policy` is excluded from the unmanaged report.
pub fn diff(desired: &DesiredState, actual: &ActualState, legacy_policy: &str) -> Diff {
    Diff {
        plan: Plan::new(continuous_query_operations(desired, actual)),
        advisories: policy_advisories(desired, actual, legacy_policy),
    }
}

/// Drops for names only in actual, creates for names only in desired, and
/// drop-then-create for names whose texts are not equivalent.
pub fn continuous_query_operations(desired: &DesiredState, actual: &ActualState) -> Vec<Operation> {
    let db = desired.database.as_str();
    let mut ops: Vec<Operation> = Vec::new();

    let mut actual_names: BTreeSet<&str> = BTreeSet::new();
    let mut seen: Vec<&ActualContinuousQuery> = actual.continuous_queries.iter().collect();
    seen.sort_by(|a, b| a.name.cmp(&b.name));

    for live in seen {
        if !actual_names.insert(live.name.as_str()) {
            continue;
        }
        match desired.continuous_query(&live.name) {
            None => ops.push(Operation::drop_continuous_query(db, &live.name)),
            Some(want) if equivalent(&want.text, &live.text) => {}
            Some(want) => {
                ops.push(Operation::drop_continuous_query(db, &live.name));
                ops.push(Operation::create_continuous_query(want));
            }
        }
    }

    for want in &desired.continuous_queries {
        if !actual_names.contains(want.name.as_str()) {
            ops.push(Operation::create_continuous_query(want));
        }
    }
    ops
}

pub fn policy_advisories(
    desired: &DesiredState,
    actual: &ActualState,
    legacy_policy: &str,
) -> Vec<PolicyAdvisory> {
    let mut out: Vec<PolicyAdvisory> = Vec::new();
    for want in &desired.retention_policies {
        match actual.policy(&want.name) {
            None => out.push(PolicyAdvisory::Missing {
                name: want.name.clone(),
            }),
            Some(live) => {
                if live.duration != want.duration {
                    out.push(PolicyAdvisory::DurationDrift {
                        name: want.name.clone(),
                        desired: want.duration.clone(),
                        actual: live.duration.clone(),
                    });
                }
                if live.is_default != want.is_default {
                    out.push(PolicyAdvisory::DefaultDrift {
                        name: want.name.clone(),
                        desired_default: want.is_default,
                        actual_default: live.is_default,
                    });
                }
            }
        }
    }
    for live in &actual.retention_policies {
        if live.name != legacy_policy && desired.policy(&live.name).is_none() {
            out.push(PolicyAdvisory::Unmanaged {
                name: live.name.clone(),
            });
        }
    }
    out
}
