use tk_config::{load_layered_yaml_from_strings, report_unused_keys, UnusedKeyPolicy};

/// Unused keys are reported in WARN mode, rejected in FAIL mode, and keys
/// under consumed prefixes (aggregate overrides) are never flagged.

const YAML: &str = r#"
connection:
  host: "influx.local"
  database: "telegraf"
  databse: "typo"
retention_policies:
  - name: "two_days"
    duration: "2d"
    default: true
    resolutoin: "1m"
aggregates:
  DEFAULT: "mean"
  kernel:
    DEFAULT: "max"
    entropy_avail: "mean"
"#;

#[test]
fn warn_mode_reports_unused_keys_without_error() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).expect("config load must succeed");
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)
        .expect("warn mode must not error");

    assert_eq!(
        report.unused_leaf_pointers,
        vec![
            "/connection/databse".to_string(),
            "/retention_policies/0/resolutoin".to_string(),
        ]
    );
}

#[test]
fn fail_mode_errors_on_unused_keys() {
    let loaded = load_layered_yaml_from_strings(&[YAML]).unwrap();
    let err = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap_err();
    assert!(format!("{err:?}").contains("CONFIG_UNUSED_KEYS"));
}

#[test]
fn clean_config_is_clean_in_fail_mode() {
    let yaml = r#"
connection:
  database: "telegraf"
  username: "grafana"
  password_env: "INFLUX_PASSWORD"
retention_policies:
  - name: "two_days"
    duration: "2d"
    default: true
bookkeeping:
  enabled: false
"#;
    let loaded = load_layered_yaml_from_strings(&[yaml]).unwrap();
    let report = report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Fail).unwrap();
    assert!(report.is_clean());
}
