//! Steady-state convergence properties.
//!
//! GREEN when:
//! - identical CQ sets (modulo quoting/whitespace) give an empty plan
//! - a resolution change 1m -> 5m gives exactly one drop + one create per
//!   affected measurement and nothing for unaffected tiers
//! - applying a plan and re-diffing gives an empty plan (idempotence)

use std::collections::{BTreeMap, BTreeSet};

use tk_config::TierConfig;
use tk_plan::{diff, DesiredState, Operation, OperationKind};
use tk_schemas::{ActualContinuousQuery, ActualRetentionPolicy, ActualState, SchemaSnapshot};

fn config(week_resolution: &str) -> TierConfig {
    TierConfig::from_json(&serde_json::json!({
        "connection": { "database": "telegraf" },
        "retention_policies": [
            { "name": "two_days", "duration": "2d", "default": true },
            { "name": "a_week", "duration": "7d", "resolution": week_resolution },
            { "name": "forever", "duration": "INF", "resolution": "4h" },
        ],
    }))
    .unwrap()
}

fn schema() -> SchemaSnapshot {
    let mut m = BTreeMap::new();
    m.insert("cpu".to_string(), BTreeSet::from(["usage_idle".to_string()]));
    m.insert("disk".to_string(), BTreeSet::from(["free".to_string(), "used".to_string()]));
    SchemaSnapshot::new(m)
}

/// How InfluxDB echoes a stored definition: identifiers unquoted.
fn echo(text: &str) -> String {
    text.replace('"', "")
}

fn actual_from(desired: &DesiredState) -> ActualState {
    ActualState {
        retention_policies: desired
            .retention_policies
            .iter()
            .map(|p| ActualRetentionPolicy {
                name: p.name.clone(),
                duration: p.duration.clone(),
                is_default: p.is_default,
            })
            .collect(),
        continuous_queries: desired
            .continuous_queries
            .iter()
            .map(|cq| ActualContinuousQuery {
                name: cq.name.clone(),
                text: echo(&cq.text),
            })
            .collect(),
    }
}

/// Apply CQ operations to a snapshot the way the backend would.
fn apply(actual: &mut ActualState, ops: &[Operation]) {
    for op in ops {
        match op {
            Operation::DropContinuousQuery { name, .. } => {
                actual.continuous_queries.retain(|cq| &cq.name != name)
            }
            Operation::CreateContinuousQuery { query } => {
                actual.continuous_queries.push(ActualContinuousQuery {
                    name: query.name.clone(),
                    text: echo(&query.text),
                })
            }
            other => panic!("converge must not plan {other}"),
        }
    }
}

#[test]
fn scenario_steady_state_has_empty_plan() {
    let cfg = config("1m");
    let desired = DesiredState::derive(&cfg, &schema());
    let actual = actual_from(&desired);
    let d = diff(&desired, &actual, &cfg.legacy_policy);
    assert!(d.plan.is_empty(), "unexpected plan: {:?}", d.plan);
    assert!(d.advisories.is_empty(), "unexpected advisories: {:?}", d.advisories);
}

#[test]
fn scenario_resolution_change_replaces_only_affected_queries() {
    let before = DesiredState::derive(&config("1m"), &schema());
    let actual = actual_from(&before);

    let cfg = config("5m");
    let after = DesiredState::derive(&cfg, &schema());
    let d = diff(&after, &actual, &cfg.legacy_policy);

    // cq_*_1m are no longer desired; cq_*_5m are new. The 4h tier is untouched.
    assert_eq!(d.plan.count(OperationKind::DropContinuousQuery), 2);
    assert_eq!(d.plan.count(OperationKind::CreateContinuousQuery), 2);
    assert_eq!(d.plan.len(), 4);
    for op in &d.plan {
        assert!(
            !op.subject().ends_with("_4h"),
            "unaffected tier touched: {op}"
        );
    }
    let drops: Vec<&str> = d
        .plan
        .iter()
        .filter(|op| op.kind() == OperationKind::DropContinuousQuery)
        .map(|op| op.subject())
        .collect();
    assert_eq!(drops, vec!["cq_cpu_1m", "cq_disk_1m"]);
}

#[test]
fn scenario_changed_aggregate_is_drop_then_create_of_same_name() {
    let before = DesiredState::derive(&config("1m"), &schema());
    let actual = actual_from(&before);

    let cfg = TierConfig::from_json(&serde_json::json!({
        "connection": { "database": "telegraf" },
        "retention_policies": [
            { "name": "two_days", "duration": "2d", "default": true },
            { "name": "a_week", "duration": "7d", "resolution": "1m" },
            { "name": "forever", "duration": "INF", "resolution": "4h" },
        ],
        "aggregates": { "cpu": "max" },
    }))
    .unwrap();
    let after = DesiredState::derive(&cfg, &schema());
    let d = diff(&after, &actual, &cfg.legacy_policy);

    let order: Vec<String> = d.plan.iter().map(|op| op.to_string()).collect();
    assert_eq!(
        order,
        vec![
            "DropContinuousQuery(cq_cpu_1m)",
            "DropContinuousQuery(cq_cpu_4h)",
            "CreateContinuousQuery(cq_cpu_1m)",
            "CreateContinuousQuery(cq_cpu_4h)",
        ]
    );
}

#[test]
fn scenario_applied_plan_rediffs_to_empty() {
    let before = DesiredState::derive(&config("1m"), &schema());
    let mut actual = actual_from(&before);
    // A stray query the operator added by hand.
    actual.continuous_queries.push(ActualContinuousQuery {
        name: "cq_manual".to_string(),
        text: "CREATE CONTINUOUS QUERY cq_manual ON telegraf BEGIN SELECT 1 END".to_string(),
    });

    let cfg = config("5m");
    let desired = DesiredState::derive(&cfg, &schema());
    let first = diff(&desired, &actual, &cfg.legacy_policy);
    assert!(!first.plan.is_empty());
    apply(&mut actual, first.plan.operations());

    let second = diff(&desired, &actual, &cfg.legacy_policy);
    assert!(second.plan.is_empty(), "not idempotent: {:?}", second.plan);
}
