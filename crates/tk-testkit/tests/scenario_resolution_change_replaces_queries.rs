//! After bootstrap, changing `a_week` from 1m to 2m replaces exactly the
//! `cq_*_1m` queries; the 5m and 4h tiers are untouched.

use serde_json::json;
use tk_plan::OperationKind;
use tk_runtime::{Reconciler, RunMode};
use tk_testkit::fixtures::{four_tier_config, four_tier_config_with, telegraf_backend};

#[tokio::test]
async fn scenario_resolution_change_replaces_queries() {
    let backend = telegraf_backend();
    Reconciler::new(&four_tier_config(), &backend)
        .run()
        .await
        .unwrap();
    let executed_before = backend.executed().len();

    let changed = four_tier_config_with("/retention_policies/1/resolution", json!("2m"));
    let report = Reconciler::new(&changed, &backend).run().await.unwrap();

    assert_eq!(report.mode, RunMode::Converge);
    assert_eq!(report.plan.count(OperationKind::DropContinuousQuery), 3);
    assert_eq!(report.plan.count(OperationKind::CreateContinuousQuery), 3);
    assert_eq!(report.plan.len(), 6);

    // Drops are submitted before creates.
    let kinds: Vec<OperationKind> = report.plan.iter().map(|op| op.kind()).collect();
    assert!(kinds[..3]
        .iter()
        .all(|k| *k == OperationKind::DropContinuousQuery));

    assert_eq!(backend.executed().len(), executed_before + 6);
    let names = backend.query_names();
    assert!(names.iter().all(|n| !n.ends_with("_1m")), "{names:?}");
    assert_eq!(names.iter().filter(|n| n.ends_with("_2m")).count(), 3);
    assert_eq!(names.iter().filter(|n| n.ends_with("_5m")).count(), 3);
    assert_eq!(names.iter().filter(|n| n.ends_with("_4h")).count(), 3);

    let again = Reconciler::new(&changed, &backend).run().await.unwrap();
    assert!(again.is_noop());
}

#[tokio::test]
async fn scenario_aggregate_change_is_drop_then_create_of_same_name() {
    let backend = telegraf_backend();
    Reconciler::new(&four_tier_config(), &backend)
        .run()
        .await
        .unwrap();

    let changed = four_tier_config_with("/aggregates/diskio", json!("sum"));
    let report = Reconciler::new(&changed, &backend).run().await.unwrap();

    let subjects: Vec<String> = report.plan.iter().map(|op| op.to_string()).collect();
    assert_eq!(
        subjects,
        vec![
            "DropContinuousQuery(cq_diskio_1m)",
            "DropContinuousQuery(cq_diskio_4h)",
            "DropContinuousQuery(cq_diskio_5m)",
            "CreateContinuousQuery(cq_diskio_1m)",
            "CreateContinuousQuery(cq_diskio_4h)",
            "CreateContinuousQuery(cq_diskio_5m)",
        ]
    );
    let created = report
        .plan
        .iter()
        .find(|op| op.kind() == OperationKind::CreateContinuousQuery)
        .unwrap();
    assert!(created.statement().contains(r#"sum("reads") AS "reads""#));
}
