//! Reconciliation driver.
//!
//! One invocation is one pass:
//! - introspect actual state and schema (fresh, never cached)
//! - pick `Bootstrap` when no non-default policy exists, else `Converge`
//! - plan, then submit every statement in order, awaiting each one
//! - write bookkeeping points into the infinite tier
//!
//! The first failing statement aborts the pass; earlier steps stay applied and
//! the next run recomputes everything from the backend.

use chrono::Utc;
use tk_config::TierConfig;
use tk_influx::{introspect, Gateway};
use tk_plan::{
    diff, plan_bootstrap, plan_teardown, resolve_watermark, DesiredState, DestinationExpectation,
    Plan, PolicyAdvisory, Watermark,
};
use tk_schemas::{ActualState, BookkeepingPoint};
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::error::RunError;
use crate::report::{RunMode, RunReport};

pub struct Reconciler<'a> {
    config: &'a TierConfig,
    gateway: &'a dyn Gateway,
    config_hash: Option<String>,
}

struct Planned {
    mode: RunMode,
    plan: Plan,
    advisories: Vec<PolicyAdvisory>,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a TierConfig, gateway: &'a dyn Gateway) -> Self {
        Self {
            config,
            gateway,
            config_hash: None,
        }
    }

    /// Hash of the layered config, logged and carried in the report.
    pub fn with_config_hash(mut self, config_hash: impl Into<String>) -> Self {
        self.config_hash = Some(config_hash.into());
        self
    }

    /// Bootstrap or converge, whichever the backend state calls for.
    pub async fn run(&self) -> Result<RunReport, RunError> {
        self.pass(None).await
    }

    /// Return the database to the single legacy tier.
    pub async fn teardown(&self) -> Result<RunReport, RunError> {
        self.pass(Some(RunMode::Teardown)).await
    }

    async fn pass(&self, forced: Option<RunMode>) -> Result<RunReport, RunError> {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!(
            "reconcile",
            run_id = %run_id,
            mode = tracing::field::Empty,
            gateway = self.gateway.name()
        );
        let started_at = Utc::now();

        async move {
            info!(
                database = self.config.database(),
                config_hash = self.config_hash.as_deref().unwrap_or("-"),
                "run start"
            );

            let actual = introspect::actual_state(self.gateway).await?;
            let planned = match forced {
                Some(RunMode::Teardown) => self.plan_teardown(&actual).await?,
                _ => self.plan_sync(&actual).await?,
            };
            tracing::Span::current().record("mode", planned.mode.as_str());

            for a in &planned.advisories {
                warn!(policy = a.policy(), "{a}");
            }
            info!(operations = planned.plan.len(), "plan ready");

            self.apply(&planned.plan).await?;

            let bookkeeping_points = match planned.mode {
                RunMode::Teardown => 0,
                RunMode::Bootstrap | RunMode::Converge => self.write_bookkeeping().await,
            };

            info!(applied = planned.plan.len(), "run complete");
            Ok(RunReport {
                run_id,
                mode: planned.mode,
                gateway: self.gateway.name(),
                config_hash: self.config_hash.clone(),
                started_at,
                finished_at: Utc::now(),
                plan: planned.plan,
                advisories: planned.advisories,
                bookkeeping_points,
            })
        }
        .instrument(span)
        .await
    }

    async fn plan_sync(&self, actual: &ActualState) -> Result<Planned, RunError> {
        let schema = introspect::schema_snapshot(self.gateway).await?;
        let desired = DesiredState::derive(self.config, &schema);

        if !actual.is_initialized() {
            let default = self.config.default_policy();
            let bound = self
                .watermark(
                    actual,
                    &default.name,
                    &desired,
                    DestinationExpectation::MayBeEmpty,
                )
                .await?;
            info!(tier = %default.name, ?bound, "bootstrap transfer bound");
            let plan = plan_bootstrap(
                &desired,
                actual,
                &self.config.legacy_policy,
                &self.config.aggregates,
                bound,
            );
            return Ok(Planned {
                mode: RunMode::Bootstrap,
                plan,
                advisories: Vec::new(),
            });
        }

        let d = diff(&desired, actual, &self.config.legacy_policy);
        let missing = d.missing_policies();
        if !missing.is_empty() {
            return Err(RunError::MissingTiers { names: missing });
        }
        Ok(Planned {
            mode: RunMode::Converge,
            plan: d.plan,
            advisories: d.advisories,
        })
    }

    async fn plan_teardown(&self, actual: &ActualState) -> Result<Planned, RunError> {
        let legacy = self.config.legacy_policy.as_str();
        if !actual.has_policy(legacy) {
            return Err(RunError::LegacyPolicyMissing {
                name: legacy.to_string(),
            });
        }
        let from = self.config.default_policy().name.as_str();

        let bound = if actual.has_policy(from) {
            let schema = introspect::schema_snapshot(self.gateway).await?;
            let desired = DesiredState::derive(self.config, &schema);
            self.watermark(actual, legacy, &desired, DestinationExpectation::NonEmpty)
                .await?
        } else {
            Watermark::Unbounded
        };
        info!(tier = legacy, ?bound, "teardown transfer bound");

        Ok(Planned {
            mode: RunMode::Teardown,
            plan: plan_teardown(self.config.database(), actual, from, legacy, bound),
            advisories: Vec::new(),
        })
    }

    async fn watermark(
        &self,
        actual: &ActualState,
        destination: &str,
        desired: &DesiredState,
        expectation: DestinationExpectation,
    ) -> Result<Watermark, RunError> {
        let exists = actual.has_policy(destination);
        let samples = if exists {
            introspect::latest_per_measurement(
                self.gateway,
                destination,
                desired.measurements.iter().map(|m| m.name.as_str()),
            )
            .await?
        } else {
            Vec::new()
        };
        Ok(resolve_watermark(destination, exists, samples, expectation)?)
    }

    async fn apply(&self, plan: &Plan) -> Result<(), RunError> {
        for (i, op) in plan.iter().enumerate() {
            let step = i + 1;
            info!(step, operation = %op, statement = op.statement(), "apply");
            if let Err(source) = self.gateway.execute(op.statement()).await {
                tracing::error!(
                    step,
                    operation = %op,
                    error = %source,
                    "statement failed; aborting"
                );
                return Err(RunError::StatementExecution {
                    step,
                    operation: op.to_string(),
                    statement: op.statement().to_string(),
                    source,
                });
            }
        }
        Ok(())
    }

    /// One point per configured tier. Failure is logged, never fatal: the
    /// points only feed dashboards.
    async fn write_bookkeeping(&self) -> usize {
        if !self.config.bookkeeping.enabled {
            return 0;
        }
        let Some(target) = self.config.infinite_policy() else {
            info!("no infinite tier; bookkeeping skipped");
            return 0;
        };
        let points = bookkeeping_points(self.config);
        match self.gateway.write_points(&target.name, &points).await {
            Ok(()) => points.len(),
            Err(e) => {
                warn!(tier = %target.name, error = %e, "bookkeeping write failed");
                0
            }
        }
    }
}

/// `<measurement> rp="<tier>" <tier duration ns>` for every configured tier.
pub fn bookkeeping_points(config: &TierConfig) -> Vec<BookkeepingPoint> {
    config
        .policies()
        .iter()
        .map(|p| BookkeepingPoint {
            measurement: config.bookkeeping.measurement.clone(),
            fields: [("rp".to_string(), p.name.clone())].into_iter().collect(),
            timestamp_ns: p.duration.ticks(),
        })
        .collect()
}
