use std::fmt;

use tk_influx::GatewayError;
use tk_plan::WatermarkUnavailable;

/// Why a pass did not complete. Nothing is retried or rolled back: steps that
/// ran before the failure stay applied. Configuration is validated before a
/// `Reconciler` exists, so config errors are `tk_config::ConfigError`.
#[derive(Debug)]
pub enum RunError {
    /// Introspection or transport failure before any statement ran.
    Gateway(GatewayError),
    /// A transfer could not be safely bounded; nothing was executed.
    WatermarkUnavailable { tier: String },
    /// Step `step` (1-based) failed; steps after it were not attempted.
    StatementExecution {
        step: usize,
        operation: String,
        statement: String,
        source: GatewayError,
    },
    LegacyPolicyMissing { name: String },
    /// Configured tiers absent on an initialized backend. Tiers are only
    /// created by bootstrap.
    MissingTiers { names: Vec<String> },
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Gateway(e) => write!(f, "{e}"),
            RunError::WatermarkUnavailable { tier } => write!(
                f,
                "WATERMARK_UNAVAILABLE: cannot bound transfer into '{tier}': no latest timestamp found"
            ),
            RunError::StatementExecution {
                step,
                operation,
                statement,
                source,
            } => write!(
                f,
                "STATEMENT_FAILED at step {step} {operation}: {source}\n  statement: {statement}"
            ),
            RunError::LegacyPolicyMissing { name } => {
                write!(f, "LEGACY_POLICY_MISSING: retention policy '{name}' does not exist")
            }
            RunError::MissingTiers { names } => write!(
                f,
                "MISSING_TIERS: {names:?} are configured but absent on an initialized database; \
                 create them manually or tear down and bootstrap again"
            ),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Gateway(e) => Some(e),
            RunError::StatementExecution { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<GatewayError> for RunError {
    fn from(e: GatewayError) -> Self {
        RunError::Gateway(e)
    }
}

impl From<WatermarkUnavailable> for RunError {
    fn from(e: WatermarkUnavailable) -> Self {
        RunError::WatermarkUnavailable { tier: e.tier }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn statement_failure_exposes_the_gateway_error_as_source() {
        let err = RunError::StatementExecution {
            step: 2,
            operation: "CreateRetentionPolicy(a_week)".to_string(),
            statement: "CREATE RETENTION POLICY ..".to_string(),
            source: GatewayError::Connection("refused".to_string()),
        };
        assert!(err.to_string().starts_with("STATEMENT_FAILED at step 2"));
        let source = err.source().unwrap().to_string();
        assert_eq!(source, "BACKEND_CONNECTION: refused");
    }
}
