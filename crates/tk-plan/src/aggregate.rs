use tk_schemas::{AggregateOverrides, MeasurementAggregate, FALLBACK_AGGREGATE};

/// Aggregate function for `measurement.field`.
///
/// Most specific wins: field override, then the measurement's default (or its
/// uniform aggregate), then the global `DEFAULT`, then `mean`. Blank entries
/// count as absent. Never fails.
pub fn resolve<'a>(overrides: &'a AggregateOverrides, measurement: &str, field: &str) -> &'a str {
    let per_measurement = match overrides.measurements.get(measurement) {
        Some(MeasurementAggregate::Uniform(agg)) => non_blank(Some(agg)),
        Some(MeasurementAggregate::PerField(table)) => {
            non_blank(table.fields.get(field)).or_else(|| non_blank(table.default.as_ref()))
        }
        None => None,
    };
    per_measurement
        .or_else(|| non_blank(overrides.default.as_ref()))
        .unwrap_or(FALLBACK_AGGREGATE)
}

fn non_blank(s: Option<&String>) -> Option<&str> {
    s.map(|s| s.trim()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(json: serde_json::Value) -> AggregateOverrides {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn precedence_field_then_measurement_then_global_then_mean() {
        let all = overrides(serde_json::json!({
            "DEFAULT": "median",
            "kernel": { "DEFAULT": "max", "entropy_avail": "min" }
        }));
        assert_eq!(resolve(&all, "kernel", "entropy_avail"), "min");
        assert_eq!(resolve(&all, "kernel", "boot_time"), "max");
        assert_eq!(resolve(&all, "cpu", "usage_idle"), "median");

        let none = AggregateOverrides::default();
        assert_eq!(resolve(&none, "kernel", "entropy_avail"), "mean");
    }

    #[test]
    fn uniform_measurement_aggregate_covers_every_field() {
        let o = overrides(serde_json::json!({ "DEFAULT": "median", "diskio": "max" }));
        assert_eq!(resolve(&o, "diskio", "reads"), "max");
        assert_eq!(resolve(&o, "diskio", "writes"), "max");
    }

    #[test]
    fn blank_entries_fall_through() {
        let o = overrides(serde_json::json!({
            "DEFAULT": "",
            "kernel": { "DEFAULT": " ", "entropy_avail": "" },
            "diskio": ""
        }));
        assert_eq!(resolve(&o, "kernel", "entropy_avail"), "mean");
        assert_eq!(resolve(&o, "diskio", "reads"), "mean");
    }
}
