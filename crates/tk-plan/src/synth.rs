//! InfluxQL statement rendering.
//!
//! Every function here is deterministic: identical inputs give byte-identical
//! text. Field lists are emitted in sorted order and identifiers are always
//! double-quoted, because continuous query text is later compared against the
//! definition InfluxDB echoes back.

use tk_schemas::{
    continuous_query_name, AggregateOverrides, ContinuousQuery, Measurement, RetentionPolicy,
    TierDuration,
};

use crate::aggregate;
use crate::watermark::Watermark;

/// Replication factor for every tier we create.
pub const REPLICATION: u32 = 1;

/// Double-quote an identifier, escaping `\` and `"`.
pub fn quote_ident(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn qualified(database: &str, policy: &str, measurement: &str) -> String {
    format!(
        "{}.{}.{}",
        quote_ident(database),
        quote_ident(policy),
        quote_ident(measurement)
    )
}

pub fn create_retention_policy(database: &str, rp: &RetentionPolicy) -> String {
    let mut s = format!(
        "CREATE RETENTION POLICY {} ON {} DURATION {} REPLICATION {}",
        quote_ident(&rp.name),
        quote_ident(database),
        rp.duration.as_influxql(),
        REPLICATION
    );
    if rp.is_default {
        s.push_str(" DEFAULT");
    }
    s
}

pub fn drop_retention_policy(database: &str, name: &str) -> String {
    format!(
        "DROP RETENTION POLICY {} ON {}",
        quote_ident(name),
        quote_ident(database)
    )
}

pub fn set_default_retention_policy(database: &str, name: &str) -> String {
    format!(
        "ALTER RETENTION POLICY {} ON {} DEFAULT",
        quote_ident(name),
        quote_ident(database)
    )
}

pub fn drop_continuous_query(database: &str, name: &str) -> String {
    format!(
        "DROP CONTINUOUS QUERY {} ON {}",
        quote_ident(name),
        quote_ident(database)
    )
}

/// `agg("f") AS "f", ..` over the measurement's fields in sorted order.
fn select_list(overrides: &AggregateOverrides, measurement: &Measurement) -> String {
    measurement
        .fields
        .iter()
        .map(|field| {
            let f = quote_ident(field);
            format!(
                "{}({}) AS {}",
                aggregate::resolve(overrides, &measurement.name, field),
                f,
                f
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Downsampling job from `source` into `target` for one measurement.
///
/// `None` when `target` has no resolution: such a tier is not a downsampling
/// target.
pub fn continuous_query(
    database: &str,
    source: &RetentionPolicy,
    target: &RetentionPolicy,
    measurement: &Measurement,
    overrides: &AggregateOverrides,
) -> Option<ContinuousQuery> {
    let resolution = target.resolution.as_ref()?;
    let name = continuous_query_name(&measurement.name, resolution);
    let text = format!(
        "CREATE CONTINUOUS QUERY {} ON {} BEGIN SELECT {} INTO {} FROM {} GROUP BY time({}), * END",
        quote_ident(&name),
        quote_ident(database),
        select_list(overrides, measurement),
        qualified(database, &target.name, &measurement.name),
        qualified(database, &source.name, &measurement.name),
        resolution.as_influxql()
    );
    Some(ContinuousQuery {
        name,
        source_policy: source.name.clone(),
        target_policy: target.name.clone(),
        measurement: measurement.name.clone(),
        text,
    })
}

fn where_clause(bound: Watermark, window: Option<&TierDuration>) -> String {
    let mut conds: Vec<String> = Vec::new();
    if let Watermark::After(ts) = bound {
        conds.push(format!("time > {ts}"));
    }
    if let Some(w) = window.filter(|w| !w.is_infinite()) {
        conds.push(format!("time >= now() - {}", w.as_influxql()));
    }
    if conds.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conds.join(" AND "))
    }
}

/// Copy every measurement from one tier into another, raw.
///
/// `bound` skips points already present in the destination; `window` limits
/// the copy to what the destination would retain (ignored when infinite).
pub fn transfer(
    database: &str,
    from: &str,
    to: &str,
    bound: Watermark,
    window: Option<&TierDuration>,
) -> String {
    format!(
        "SELECT * INTO {}.{}.:MEASUREMENT FROM {}.{}./.*/{} GROUP BY *",
        quote_ident(database),
        quote_ident(to),
        quote_ident(database),
        quote_ident(from),
        where_clause(bound, window)
    )
}

/// Aggregate one measurement's history from `from` into a resolution tier.
///
/// `None` when `target` has no resolution.
pub fn downsample_history(
    database: &str,
    from: &str,
    target: &RetentionPolicy,
    measurement: &Measurement,
    overrides: &AggregateOverrides,
) -> Option<String> {
    let resolution = target.resolution.as_ref()?;
    Some(format!(
        "SELECT {} INTO {} FROM {}{} GROUP BY time({}), *",
        select_list(overrides, measurement),
        qualified(database, &target.name, &measurement.name),
        qualified(database, from, &measurement.name),
        where_clause(Watermark::Unbounded, Some(&target.duration)),
        resolution.as_influxql()
    ))
}
