//! Dry-run gateway: reads pass through, writes are recorded and echoed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;

use tk_schemas::{ActualContinuousQuery, ActualRetentionPolicy, BookkeepingPoint};
use tracing::info;

use crate::gateway::{Gateway, GatewayResult};
use crate::line;

/// Something a dry run would have done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recorded {
    Statement(String),
    Points { tier: String, lines: Vec<String> },
}

/// Wraps a gateway so that nothing is ever executed or written.
///
/// Introspection still reaches `inner`, so the plan is computed against the
/// real backend state.
#[derive(Debug)]
pub struct DryRunGateway<G> {
    inner: G,
    recorded: Mutex<Vec<Recorded>>,
}

impl<G: Gateway> DryRunGateway<G> {
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            recorded: Mutex::new(Vec::new()),
        }
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.lock().clone()
    }

    /// Recorded statements only, in submission order.
    pub fn statements(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|r| match r {
                Recorded::Statement(s) => Some(s.clone()),
                Recorded::Points { .. } => None,
            })
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Recorded>> {
        // A poisoned recorder still holds every entry pushed before the panic.
        self.recorded.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait::async_trait]
impl<G: Gateway> Gateway for DryRunGateway<G> {
    fn name(&self) -> &'static str {
        "dry-run"
    }

    async fn list_retention_policies(&self) -> GatewayResult<Vec<ActualRetentionPolicy>> {
        self.inner.list_retention_policies().await
    }

    async fn list_continuous_queries(&self) -> GatewayResult<Vec<ActualContinuousQuery>> {
        self.inner.list_continuous_queries().await
    }

    async fn list_measurement_fields(&self) -> GatewayResult<BTreeMap<String, BTreeSet<String>>> {
        self.inner.list_measurement_fields().await
    }

    async fn execute(&self, statement: &str) -> GatewayResult<()> {
        info!(target: "tierkeep::dry_run", statement, "would execute");
        self.lock().push(Recorded::Statement(statement.to_string()));
        Ok(())
    }

    async fn latest_timestamp(&self, tier: &str, measurement: &str) -> GatewayResult<Option<i64>> {
        self.inner.latest_timestamp(tier, measurement).await
    }

    async fn write_points(&self, tier: &str, points: &[BookkeepingPoint]) -> GatewayResult<()> {
        let lines: Vec<String> = points.iter().map(line::encode_point).collect();
        for l in &lines {
            info!(target: "tierkeep::dry_run", tier, point = %l, "would write");
        }
        self.lock().push(Recorded::Points {
            tier: tier.to_string(),
            lines,
        });
        Ok(())
    }
}
