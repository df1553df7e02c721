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

#[test]
fn config_hash_prints_sha256_and_canonical_json() {
    let dir = tempfile::tempdir().unwrap();
    let base = write_config(
        &dir,
        "base.yaml",
        "connection:\n  database: telegraf\n  host: a\n",
    );
    let site = write_config(&dir, "site.yaml", "connection:\n  host: b\n");

    Command::cargo_bin("tierkeep")
        .unwrap()
        .args(["config-hash", &base, &site])
        .assert()
        .success()
        .stdout(predicate::str::is_match(r"config_hash=[0-9a-f]{64}\n").unwrap())
        .stdout(predicate::str::contains(r#""host":"b""#));
}

#[test]
fn sync_without_default_tier_fails_before_connecting() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        &dir,
        "tiers.yaml",
        r#"
connection: { host: 127.0.0.1, port: 9, database: telegraf }
retention_policies:
  - { name: a_week, duration: 7d, resolution: 1m }
"#,
    );

    Command::cargo_bin("tierkeep")
        .unwrap()
        .args(["sync", "--config", &cfg, "--dry-run"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_NO_DEFAULT_POLICY"))
        .stderr(predicate::str::contains("BACKEND_CONNECTION").not());
}

#[test]
fn strict_sync_rejects_misspelled_keys() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        &dir,
        "tiers.yaml",
        r#"
connection: { host: 127.0.0.1, port: 9, database: telegraf }
retention_policies:
  - { name: two_days, duration: 2d, default: true }
  - { name: a_week, duration: 7d, resolutoin: 1m }
"#,
    );

    Command::cargo_bin("tierkeep")
        .unwrap()
        .args(["sync", "--config", &cfg, "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_UNUSED_KEYS"))
        .stderr(predicate::str::contains("/retention_policies/1/resolutoin"));
}

#[test]
fn literal_password_is_refused() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = write_config(
        &dir,
        "tiers.yaml",
        "connection:\n  database: telegraf\n  username: admin\n  password: hunter2hunter2\n",
    );

    Command::cargo_bin("tierkeep")
        .unwrap()
        .args(["config-hash", &cfg])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CONFIG_SECRET_DETECTED"))
        .stderr(predicate::str::contains("hunter2").not());
}
