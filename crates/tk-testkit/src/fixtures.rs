//! Canonical tier configurations used across scenario tests.

use serde_json::{json, Value};
use tk_config::TierConfig;

/// Four tiers: `two_days` (default, raw), `a_week` (1m), `a_month` (5m),
/// `forever` (INF, 4h).
pub fn four_tier_json() -> Value {
    json!({
        "connection": { "host": "localhost", "port": 8086, "database": "telegraf" },
        "legacy_retention_policy": "autogen",
        "retention_policies": [
            { "name": "two_days", "duration": "2d", "resolution": "", "default": true },
            { "name": "a_week", "duration": "7d", "resolution": "1m" },
            { "name": "a_month", "duration": "30d", "resolution": "5m" },
            { "name": "forever", "duration": "INF", "resolution": "4h" },
        ],
        "aggregates": {
            "DEFAULT": "mean",
            "diskio": "max",
            "kernel": { "DEFAULT": "max", "entropy_avail": "mean" },
        },
    })
}

/// Panics if the fixture stops validating.
pub fn four_tier_config() -> TierConfig {
    TierConfig::from_json(&four_tier_json()).expect("four-tier fixture validates")
}

/// Same tiers with one JSON pointer replaced.
pub fn four_tier_config_with(pointer: &str, value: Value) -> TierConfig {
    let mut v = four_tier_json();
    if let Some(slot) = v.pointer_mut(pointer) {
        *slot = value;
    }
    TierConfig::from_json(&v).expect("patched fixture validates")
}

/// `autogen` default plus `cpu`, `diskio`, `kernel` and an existing
/// bookkeeping measurement.
pub fn telegraf_backend() -> crate::FakeInflux {
    crate::FakeInflux::fresh("telegraf")
        .with_measurement("cpu", &["usage_idle", "usage_user"])
        .with_measurement("diskio", &["reads", "writes"])
        .with_measurement("kernel", &["boot_time", "entropy_avail"])
        .with_measurement("grafana_rp", &["rp"])
}
