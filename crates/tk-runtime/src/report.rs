use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tk_plan::{Plan, PolicyAdvisory};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    Bootstrap,
    Converge,
    Teardown,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Bootstrap => "bootstrap",
            RunMode::Converge => "converge",
            RunMode::Teardown => "teardown",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one successful pass.
#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub mode: RunMode,
    /// Gateway the plan was applied through (`"dry-run"` for previews).
    pub gateway: &'static str,
    pub config_hash: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Every operation, in the order it was submitted.
    pub plan: Plan,
    pub advisories: Vec<PolicyAdvisory>,
    /// Bookkeeping points handed to the gateway (0 when skipped or failed).
    pub bookkeeping_points: usize,
}

impl RunReport {
    pub fn statements(&self) -> Vec<&str> {
        self.plan.statements()
    }

    pub fn is_noop(&self) -> bool {
        self.plan.is_empty()
    }
}
