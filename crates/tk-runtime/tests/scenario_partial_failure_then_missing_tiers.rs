//! A statement failure aborts the pass. Earlier steps stay applied and the
//! next run refuses to converge until the missing tiers exist.

use tk_influx::GatewayError;
use tk_runtime::{Reconciler, RunError};
use tk_testkit::fixtures::{four_tier_config, telegraf_backend};

#[tokio::test]
async fn scenario_partial_failure_then_missing_tiers() {
    let config = four_tier_config();
    let backend = telegraf_backend().fail_statement_containing("\"a_month\" ON", "disk full");

    let err = Reconciler::new(&config, &backend).run().await.unwrap_err();
    match &err {
        RunError::StatementExecution {
            step,
            operation,
            statement,
            source,
        } => {
            assert_eq!(*step, 3);
            assert_eq!(operation, "CreateRetentionPolicy(a_month)");
            assert!(statement.starts_with("CREATE RETENTION POLICY \"a_month\""));
            assert!(matches!(source, GatewayError::Statement { .. }), "{source:?}");
        }
        other => panic!("expected StatementExecution, got {other:?}"),
    }

    assert_eq!(backend.executed().len(), 2);
    assert!(backend.data_movements().is_empty());
    assert!(backend.written_points().is_empty());
    assert_eq!(backend.default_policy().as_deref(), Some("two_days"));

    let err = Reconciler::new(&config, &backend).run().await.unwrap_err();
    match err {
        RunError::MissingTiers { names } => {
            assert_eq!(names, vec!["a_month".to_string(), "forever".to_string()]);
        }
        other => panic!("expected MissingTiers, got {other:?}"),
    }
    assert_eq!(backend.executed().len(), 2, "refusal executes nothing");
}

#[tokio::test]
async fn scenario_offline_backend_is_a_gateway_error() {
    let config = four_tier_config();
    let backend = telegraf_backend().offline();

    let err = Reconciler::new(&config, &backend).run().await.unwrap_err();
    assert!(
        matches!(&err, RunError::Gateway(e) if e.is_connection()),
        "{err:?}"
    );
}
