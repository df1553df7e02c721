//! Fuzzy continuous-query text equivalence.
//!
//! InfluxDB re-renders stored definitions: identifiers lose or change their
//! quoting, whitespace is normalized, and `time(..)` buckets come back in the
//! largest exact unit (`60m` is echoed as `1h`). Two texts are equivalent when
//! they match after dropping whitespace and the quote characters `"`, `'` and
//! `` ` ``, folding ASCII case, and replacing every `time(..)` argument by its
//! tick count. Anything else (a different bucket, aggregate, field list or
//! target) is drift.

use tk_schemas::normalize;

const BUCKET_OPEN: &str = "time(";

fn is_cosmetic(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '\'' | '`')
}

/// The comparison key for a statement text.
fn canonical_form(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !is_cosmetic(*c))
        .map(|c| c.to_ascii_lowercase())
        .collect();
    normalize_buckets(&stripped)
}

// `time(1h)` and `time(1h,30m)` become tick counts. An argument that does not
// parse is kept as written.
fn normalize_buckets(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(i) = rest.find(BUCKET_OPEN) {
        let (head, tail) = rest.split_at(i + BUCKET_OPEN.len());
        out.push_str(head);
        let Some(close) = tail.find(')') else {
            rest = tail;
            continue;
        };
        let args: Vec<String> = tail[..close]
            .split(',')
            .map(|arg| match normalize(arg) {
                Ok(ticks) => ticks.to_string(),
                Err(_) => arg.to_string(),
            })
            .collect();
        out.push_str(&args.join(","));
        rest = &tail[close..];
    }
    out.push_str(rest);
    out
}

pub fn equivalent(a: &str, b: &str) -> bool {
    canonical_form(a) == canonical_form(b)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OURS: &str = r#"CREATE CONTINUOUS QUERY "cq_cpu_1m" ON "telegraf" BEGIN SELECT mean("usage_idle") AS "usage_idle" INTO "telegraf"."a_week"."cpu" FROM "telegraf"."two_days"."cpu" GROUP BY time(1m), * END"#;

    #[test]
    fn backend_echo_is_equivalent() {
        let echoed = "CREATE CONTINUOUS QUERY cq_cpu_1m ON telegraf BEGIN SELECT mean(usage_idle) AS usage_idle INTO telegraf.a_week.cpu FROM telegraf.two_days.cpu GROUP BY time(1m), * END";
        assert!(equivalent(OURS, echoed));
        assert_eq!(canonical_form(OURS), canonical_form(echoed));
    }

    #[test]
    fn whitespace_and_case_are_cosmetic() {
        let spaced = OURS.replace(' ', "\n   ").to_lowercase();
        assert!(equivalent(OURS, &spaced));
    }

    #[test]
    fn different_bucket_is_drift() {
        let changed = OURS.replace("time(1m)", "time(5m)");
        assert!(!equivalent(OURS, &changed));
    }

    #[test]
    fn bucket_echoed_in_a_larger_unit_is_equivalent() {
        let ours = OURS.replace("time(1m)", "time(60m)");
        let echoed = OURS.replace("time(1m)", "time(1h)");
        assert!(equivalent(&ours, &echoed));
        assert!(equivalent(
            &OURS.replace("time(1m)", "time(1440m)"),
            &OURS.replace("time(1m)", "time(1d)")
        ));
        assert!(equivalent(
            &OURS.replace("time(1m)", "time(7d)"),
            &OURS.replace("time(1m)", "time(1w)")
        ));
    }

    #[test]
    fn bucket_offset_is_normalized_too() {
        let ours = OURS.replace("time(1m)", "time(1h, 30m)");
        let echoed = OURS.replace("time(1m)", "time(1h,30m0s)");
        assert!(equivalent(&ours, &echoed));
        assert!(!equivalent(&ours, &OURS.replace("time(1m)", "time(1h,15m)")));
    }

    #[test]
    fn unparseable_bucket_is_compared_as_text() {
        let odd = OURS.replace("time(1m)", "time(:interval:)");
        assert!(equivalent(&odd, &odd.to_uppercase()));
        assert!(!equivalent(&odd, OURS));
    }

    #[test]
    fn same_unit_different_bucket_is_still_drift() {
        let a = OURS.replace("time(1m)", "time(60m)");
        let b = OURS.replace("time(1m)", "time(2h)");
        assert!(!equivalent(&a, &b));
    }

    #[test]
    fn different_aggregate_is_drift() {
        let changed = OURS.replace("mean(", "max(");
        assert!(!equivalent(OURS, &changed));
    }

    #[test]
    fn prefix_is_not_equivalent() {
        assert!(!equivalent(OURS, &OURS[..OURS.len() - 4]));
    }
}
