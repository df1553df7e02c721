use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::io::Write;
use std::process::Command;

fn write_config(dir: &tempfile::TempDir, name: &str, yaml: &str) -> String {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).unwrap();
    f.write_all(yaml.as_bytes()).unwrap();
    path.to_string_lossy().to_string()
}

// Port 9 (discard) is never an InfluxDB; the guardrail must trip before any
// connection is attempted.
const TIERS: &str = r#"
connection:
  host: 127.0.0.1
  port: 9
  database: telegraf
retention_policies:
  - { name: two_days, duration: 2d, default: true }
  - { name: a_week, duration: 7d, resolution: 1m }
"#;

#[test]
fn teardown_without_yes_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(&dir, "tiers.yaml", TIERS);

    Command::cargo_bin("tierkeep")
        .unwrap()
        .args(["teardown", "--config", &cfg])
        .assert()
        .failure()
        .stderr(predicate::str::contains("REFUSING TEARDOWN"))
        .stderr(predicate::str::contains("BACKEND_CONNECTION").not());
}

#[test]
fn sync_reports_unreachable_backend() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(&dir, "tiers.yaml", TIERS);

    Command::cargo_bin("tierkeep")
        .unwrap()
        .args(["sync", "--config", &cfg])
        .assert()
        .failure()
        .stderr(predicate::str::contains("BACKEND_CONNECTION"));
}
