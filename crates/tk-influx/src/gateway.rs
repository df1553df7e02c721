//! Execution gateway boundary.
//!
//! The reconciliation driver talks to the backend only through [`Gateway`].
//! Three implementations exist: the live HTTP gateway, the dry-run recorder
//! wrapping any other gateway, and the in-memory fake in `tk-testkit`.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tk_schemas::{ActualContinuousQuery, ActualRetentionPolicy, BookkeepingPoint};

use crate::error::GatewayError;

pub type GatewayResult<T> = Result<T, GatewayError>;

/// Backend contract, scoped to one database.
///
/// Object-safe and `Send + Sync` so the driver can hold a `&dyn Gateway`.
#[async_trait::async_trait]
pub trait Gateway: Send + Sync {
    /// Short name for logs (e.g. `"influx-http"`).
    fn name(&self) -> &'static str;

    async fn list_retention_policies(&self) -> GatewayResult<Vec<ActualRetentionPolicy>>;

    /// Continuous queries defined on this gateway's database only.
    async fn list_continuous_queries(&self) -> GatewayResult<Vec<ActualContinuousQuery>>;

    async fn list_measurement_fields(&self) -> GatewayResult<BTreeMap<String, BTreeSet<String>>>;

    /// Run one DDL or data-movement statement.
    async fn execute(&self, statement: &str) -> GatewayResult<()>;

    /// Latest timestamp (ns) of `measurement` in `tier`; `None` when empty.
    async fn latest_timestamp(&self, tier: &str, measurement: &str) -> GatewayResult<Option<i64>>;

    async fn write_points(&self, tier: &str, points: &[BookkeepingPoint]) -> GatewayResult<()>;
}

#[async_trait::async_trait]
impl<G: Gateway + ?Sized> Gateway for Arc<G> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn list_retention_policies(&self) -> GatewayResult<Vec<ActualRetentionPolicy>> {
        (**self).list_retention_policies().await
    }

    async fn list_continuous_queries(&self) -> GatewayResult<Vec<ActualContinuousQuery>> {
        (**self).list_continuous_queries().await
    }

    async fn list_measurement_fields(&self) -> GatewayResult<BTreeMap<String, BTreeSet<String>>> {
        (**self).list_measurement_fields().await
    }

    async fn execute(&self, statement: &str) -> GatewayResult<()> {
        (**self).execute(statement).await
    }

    async fn latest_timestamp(&self, tier: &str, measurement: &str) -> GatewayResult<Option<i64>> {
        (**self).latest_timestamp(tier, measurement).await
    }

    async fn write_points(&self, tier: &str, points: &[BookkeepingPoint]) -> GatewayResult<()> {
        (**self).write_points(tier, points).await
    }
}
