//! Explicit tier lifecycle passes: bootstrap and teardown.
//!
//! These are the only planners that create or drop retention policies. The
//! caller decides which one applies (see `ActualState::is_initialized`) and
//! resolves the transfer watermark before planning.

use tk_schemas::{ActualState, AggregateOverrides};

use crate::desired::DesiredState;
use crate::diff::continuous_query_operations;
use crate::plan::{Operation, Plan};
use crate::watermark::Watermark;

/// First-time tier creation.
///
/// - creates every configured tier that does not exist yet (the default tier
///   carries `DEFAULT`);
/// - moves the legacy tier's raw data into the default tier, bounded by `bound`;
/// - aggregates legacy history into every resolution tier;
/// - creates every desired continuous query (and drops stray ones).
///
/// The legacy policy is left in place.
pub fn plan_bootstrap(
    desired: &DesiredState,
    actual: &ActualState,
    legacy_policy: &str,
    overrides: &AggregateOverrides,
    bound: Watermark,
) -> Plan {
    let db = desired.database.as_str();
    let mut ops: Vec<Operation> = Vec::new();

    for rp in &desired.retention_policies {
        match actual.policy(&rp.name) {
            None => ops.push(Operation::create_retention_policy(db, rp)),
            Some(live) if rp.is_default && !live.is_default => {
                ops.push(Operation::set_default_retention_policy(db, &rp.name))
            }
            Some(_) => {}
        }
    }

    if let Some(default) = desired.default_tier() {
        ops.push(Operation::transfer_data(
            db,
            legacy_policy,
            &default.name,
            bound,
            Some(&default.duration),
        ));
    }

    for target in desired.downsampling_policies() {
        for m in &desired.measurements {
            if let Some(op) =
                Operation::downsample_history(db, legacy_policy, target, m, overrides)
            {
                ops.push(op);
            }
        }
    }

    ops.extend(continuous_query_operations(desired, actual));
    Plan::new(ops)
}

/// Return to a single legacy tier.
///
/// Drops every continuous query, moves the default tier's data back into the
/// legacy tier above `bound`, makes the legacy tier default and drops every
/// other policy. `from` is skipped as a transfer source when it does not
/// exist.
pub fn plan_teardown(
    database: &str,
    actual: &ActualState,
    from: &str,
    legacy_policy: &str,
    bound: Watermark,
) -> Plan {
    let mut ops: Vec<Operation> = Vec::new();

    let mut names: Vec<&str> = actual
        .continuous_queries
        .iter()
        .map(|cq| cq.name.as_str())
        .collect();
    names.sort_unstable();
    names.dedup();
    for name in names {
        ops.push(Operation::drop_continuous_query(database, name));
    }

    let legacy = actual.policy(legacy_policy);
    if actual.has_policy(from) && from != legacy_policy {
        ops.push(Operation::transfer_data(
            database,
            from,
            legacy_policy,
            bound,
            legacy.map(|p| &p.duration),
        ));
    }

    if !legacy.map(|p| p.is_default).unwrap_or(false) {
        ops.push(Operation::set_default_retention_policy(database, legacy_policy));
    }

    for rp in &actual.retention_policies {
        if rp.name != legacy_policy {
            ops.push(Operation::drop_retention_policy(database, &rp.name));
        }
    }
    Plan::new(ops)
}
