//! Schema and state introspection through a [`Gateway`].

use tk_schemas::{ActualState, SchemaSnapshot};
use tracing::debug;

use crate::gateway::{Gateway, GatewayResult};

/// Retention policies and continuous queries, fetched fresh.
pub async fn actual_state(gateway: &dyn Gateway) -> GatewayResult<ActualState> {
    let retention_policies = gateway.list_retention_policies().await?;
    let continuous_queries = gateway.list_continuous_queries().await?;
    debug!(
        policies = retention_policies.len(),
        queries = continuous_queries.len(),
        "introspected actual state"
    );
    Ok(ActualState {
        retention_policies,
        continuous_queries,
    })
}

/// Measurement -> field set, captured once per run.
pub async fn schema_snapshot(gateway: &dyn Gateway) -> GatewayResult<SchemaSnapshot> {
    let measurements = gateway.list_measurement_fields().await?;
    debug!(measurements = measurements.len(), "introspected schema");
    Ok(SchemaSnapshot::new(measurements))
}

/// Latest timestamp of each measurement in `tier`, in the given order.
pub async fn latest_per_measurement<'a, I>(
    gateway: &dyn Gateway,
    tier: &str,
    measurements: I,
) -> GatewayResult<Vec<Option<i64>>>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = Vec::new();
    for m in measurements {
        out.push(gateway.latest_timestamp(tier, m).await?);
    }
    Ok(out)
}
