//! Operations and their ordering.
//!
//! Every operation carries the rendered statement it will run. A [`Plan`] is
//! ordered by [`Stage`]; within a stage the order operations were pushed is
//! kept.

use std::fmt;

use serde::Serialize;
use tk_schemas::{AggregateOverrides, ContinuousQuery, Measurement, RetentionPolicy, TierDuration};

use crate::synth;
use crate::watermark::Watermark;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stage {
    CreatePolicies,
    DropQueries,
    MoveData,
    CreateQueries,
    SwitchDefault,
    DropPolicies,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum OperationKind {
    CreateRetentionPolicy,
    DropRetentionPolicy,
    SetDefaultRetentionPolicy,
    TransferData,
    DownsampleHistory,
    CreateContinuousQuery,
    DropContinuousQuery,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateRetentionPolicy => "CreateRetentionPolicy",
            Self::DropRetentionPolicy => "DropRetentionPolicy",
            Self::SetDefaultRetentionPolicy => "SetDefaultRetentionPolicy",
            Self::TransferData => "TransferData",
            Self::DownsampleHistory => "DownsampleHistory",
            Self::CreateContinuousQuery => "CreateContinuousQuery",
            Self::DropContinuousQuery => "DropContinuousQuery",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::CreateRetentionPolicy => Stage::CreatePolicies,
            Self::DropContinuousQuery => Stage::DropQueries,
            Self::TransferData | Self::DownsampleHistory => Stage::MoveData,
            Self::CreateContinuousQuery => Stage::CreateQueries,
            Self::SetDefaultRetentionPolicy => Stage::SwitchDefault,
            Self::DropRetentionPolicy => Stage::DropPolicies,
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind")]
pub enum Operation {
    CreateRetentionPolicy {
        policy: RetentionPolicy,
        statement: String,
    },
    DropRetentionPolicy {
        name: String,
        statement: String,
    },
    SetDefaultRetentionPolicy {
        name: String,
        statement: String,
    },
    TransferData {
        from: String,
        to: String,
        bound: Watermark,
        statement: String,
    },
    DownsampleHistory {
        from: String,
        to: String,
        measurement: String,
        statement: String,
    },
    CreateContinuousQuery {
        query: ContinuousQuery,
    },
    DropContinuousQuery {
        name: String,
        statement: String,
    },
}

impl Operation {
    pub fn create_retention_policy(database: &str, policy: &RetentionPolicy) -> Self {
        Self::CreateRetentionPolicy {
            statement: synth::create_retention_policy(database, policy),
            policy: policy.clone(),
        }
    }

    pub fn drop_retention_policy(database: &str, name: &str) -> Self {
        Self::DropRetentionPolicy {
            name: name.to_string(),
            statement: synth::drop_retention_policy(database, name),
        }
    }

    pub fn set_default_retention_policy(database: &str, name: &str) -> Self {
        Self::SetDefaultRetentionPolicy {
            name: name.to_string(),
            statement: synth::set_default_retention_policy(database, name),
        }
    }

    pub fn transfer_data(
        database: &str,
        from: &str,
        to: &str,
        bound: Watermark,
        window: Option<&TierDuration>,
    ) -> Self {
        Self::TransferData {
            from: from.to_string(),
            to: to.to_string(),
            bound,
            statement: synth::transfer(database, from, to, bound, window),
        }
    }

    /// `None` when `target` has no resolution.
    pub fn downsample_history(
        database: &str,
        from: &str,
        target: &RetentionPolicy,
        measurement: &Measurement,
        overrides: &AggregateOverrides,
    ) -> Option<Self> {
        let statement = synth::downsample_history(database, from, target, measurement, overrides)?;
        Some(Self::DownsampleHistory {
            from: from.to_string(),
            to: target.name.clone(),
            measurement: measurement.name.clone(),
            statement,
        })
    }

    pub fn create_continuous_query(query: &ContinuousQuery) -> Self {
        Self::CreateContinuousQuery {
            query: query.clone(),
        }
    }

    pub fn drop_continuous_query(database: &str, name: &str) -> Self {
        Self::DropContinuousQuery {
            name: name.to_string(),
            statement: synth::drop_continuous_query(database, name),
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Self::CreateRetentionPolicy { .. } => OperationKind::CreateRetentionPolicy,
            Self::DropRetentionPolicy { .. } => OperationKind::DropRetentionPolicy,
            Self::SetDefaultRetentionPolicy { .. } => OperationKind::SetDefaultRetentionPolicy,
            Self::TransferData { .. } => OperationKind::TransferData,
            Self::DownsampleHistory { .. } => OperationKind::DownsampleHistory,
            Self::CreateContinuousQuery { .. } => OperationKind::CreateContinuousQuery,
            Self::DropContinuousQuery { .. } => OperationKind::DropContinuousQuery,
        }
    }

    pub fn stage(&self) -> Stage {
        self.kind().stage()
    }

    pub fn statement(&self) -> &str {
        match self {
            Self::CreateContinuousQuery { query } => &query.text,
            Self::CreateRetentionPolicy { statement, .. }
            | Self::DropRetentionPolicy { statement, .. }
            | Self::SetDefaultRetentionPolicy { statement, .. }
            | Self::TransferData { statement, .. }
            | Self::DownsampleHistory { statement, .. }
            | Self::DropContinuousQuery { statement, .. } => statement,
        }
    }

    /// Name of the policy or query this operation acts on (destination tier
    /// for data movement).
    pub fn subject(&self) -> &str {
        match self {
            Self::CreateRetentionPolicy { policy, .. } => &policy.name,
            Self::CreateContinuousQuery { query } => &query.name,
            Self::TransferData { to, .. } | Self::DownsampleHistory { to, .. } => to,
            Self::DropRetentionPolicy { name, .. }
            | Self::SetDefaultRetentionPolicy { name, .. }
            | Self::DropContinuousQuery { name, .. } => name,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind(), self.subject())
    }
}

/// An ordered, stage-sorted operation sequence.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Plan {
    operations: Vec<Operation>,
}

impl Plan {
    pub fn new(mut operations: Vec<Operation>) -> Self {
        // sort_by_key is stable
        operations.sort_by_key(|op| op.stage());
        Self { operations }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.operations.iter()
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.operations.iter().filter(|op| op.kind() == kind).count()
    }

    pub fn statements(&self) -> Vec<&str> {
        self.operations.iter().map(Operation::statement).collect()
    }

    pub fn into_operations(self) -> Vec<Operation> {
        self.operations
    }
}

impl<'a> IntoIterator for &'a Plan {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> TierDuration {
        TierDuration::parse(s).unwrap()
    }

    #[test]
    fn stages_sort_and_keep_push_order_within_stage() {
        let rp = RetentionPolicy::new("a_week", d("7d"), Some(d("1m")), false);
        let cq = ContinuousQuery {
            name: "cq_cpu_1m".to_string(),
            source_policy: "two_days".to_string(),
            target_policy: "a_week".to_string(),
            measurement: "cpu".to_string(),
            text: "CREATE CONTINUOUS QUERY ..".to_string(),
        };
        let plan = Plan::new(vec![
            Operation::drop_retention_policy("db", "autogen"),
            Operation::create_continuous_query(&cq),
            Operation::set_default_retention_policy("db", "two_days"),
            Operation::drop_continuous_query("db", "cq_b"),
            Operation::transfer_data("db", "autogen", "two_days", Watermark::Unbounded, None),
            Operation::drop_continuous_query("db", "cq_a"),
            Operation::create_retention_policy("db", &rp),
        ]);
        let order: Vec<String> = plan.iter().map(|op| op.to_string()).collect();
        assert_eq!(
            order,
            vec![
                "CreateRetentionPolicy(a_week)",
                "DropContinuousQuery(cq_b)",
                "DropContinuousQuery(cq_a)",
                "TransferData(two_days)",
                "CreateContinuousQuery(cq_cpu_1m)",
                "SetDefaultRetentionPolicy(two_days)",
                "DropRetentionPolicy(autogen)",
            ]
        );
    }

    #[test]
    fn statement_of_cq_create_is_its_text() {
        let cq = ContinuousQuery {
            name: "cq_cpu_1m".to_string(),
            source_policy: "two_days".to_string(),
            target_policy: "a_week".to_string(),
            measurement: "cpu".to_string(),
            text: "CREATE CONTINUOUS QUERY x".to_string(),
        };
        assert_eq!(
            Operation::create_continuous_query(&cq).statement(),
            "CREATE CONTINUOUS QUERY x"
        );
    }
}
