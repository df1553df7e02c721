//! Line protocol encoding for bookkeeping points (string fields only).

use tk_schemas::BookkeepingPoint;

fn escape_key(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, ',' | '=' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_measurement(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, ',' | ' ') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn escape_string_value(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// `measurement field="v",.. <ns>`; fields in key order.
pub fn encode_point(p: &BookkeepingPoint) -> String {
    let fields = p
        .fields
        .iter()
        .map(|(k, v)| format!("{}={}", escape_key(k), escape_string_value(v)))
        .collect::<Vec<_>>()
        .join(",");
    format!(
        "{} {} {}",
        escape_measurement(&p.measurement),
        fields,
        p.timestamp_ns
    )
}

/// Newline-separated batch body for `/write`.
pub fn encode_batch(points: &[BookkeepingPoint]) -> String {
    points
        .iter()
        .map(encode_point)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn point(rp: &str, ts: i64) -> BookkeepingPoint {
        BookkeepingPoint {
            measurement: "grafana_rp".to_string(),
            fields: BTreeMap::from([("rp".to_string(), rp.to_string())]),
            timestamp_ns: ts,
        }
    }

    #[test]
    fn encodes_string_field_and_ns_timestamp() {
        assert_eq!(
            encode_point(&point("a_week", 604_800_000_000_000)),
            r#"grafana_rp rp="a_week" 604800000000000"#
        );
    }

    #[test]
    fn escapes_special_characters() {
        let p = BookkeepingPoint {
            measurement: "my meas,x".to_string(),
            fields: BTreeMap::from([("a key".to_string(), r#"say "hi"\"#.to_string())]),
            timestamp_ns: 1,
        };
        assert_eq!(
            encode_point(&p),
            r#"my\ meas\,x a\ key="say \"hi\"\\" 1"#
        );
    }

    #[test]
    fn batch_is_newline_separated() {
        let body = encode_batch(&[point("a", 1), point("b", 2)]);
        assert_eq!(body, "grafana_rp rp=\"a\" 1\ngrafana_rp rp=\"b\" 2");
    }
}
