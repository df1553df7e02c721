//! InfluxDB 1.x `/query` response decoding.
//!
//! ```json
//! {"results":[{"statement_id":0,"series":[{"name":"..","columns":[..],"values":[[..]]}]}]}
//! ```
//!
//! Errors come back either top-level (`{"error": ".."}`) or per statement
//! (`{"results":[{"error": ".."}]}`), usually with HTTP 200 for the latter.

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::Value;
use tk_schemas::{ActualContinuousQuery, ActualRetentionPolicy, TierDuration};

use crate::error::GatewayError;

static NULL: Value = Value::Null;

#[derive(Debug, Default, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Series {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub columns: Vec<String>,
    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl Series {
    fn column(&self, name: &str) -> Result<usize, GatewayError> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| GatewayError::Decode(format!("missing column '{name}'")))
    }
}

/// Decode a `/query` body for a single statement into its series.
pub fn decode(body: &str, statement: &str) -> Result<Vec<Series>, GatewayError> {
    let resp: QueryResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::Decode(format!("query response json: {e}")))?;
    if let Some(message) = resp.error {
        return Err(GatewayError::Statement {
            statement: statement.to_string(),
            message,
        });
    }
    let first = resp.results.into_iter().next().unwrap_or_default();
    if let Some(message) = first.error {
        return Err(GatewayError::Statement {
            statement: statement.to_string(),
            message,
        });
    }
    Ok(first.series)
}

fn as_str<'a>(v: &'a Value, what: &str) -> Result<&'a str, GatewayError> {
    v.as_str()
        .ok_or_else(|| GatewayError::Decode(format!("{what}: expected string, got {v}")))
}

/// `SHOW RETENTION POLICIES`: columns `name, duration, shardGroupDuration,
/// replicaN, default`.
pub fn retention_policies(series: &[Series]) -> Result<Vec<ActualRetentionPolicy>, GatewayError> {
    let mut out = Vec::new();
    for s in series {
        let name_ix = s.column("name")?;
        let dur_ix = s.column("duration")?;
        let def_ix = s.column("default")?;
        for row in &s.values {
            let cell = |ix: usize| row.get(ix).unwrap_or(&NULL);
            let name = as_str(cell(name_ix), "retention policy name")?.to_string();
            let literal = as_str(cell(dur_ix), "retention policy duration")?;
            let duration = TierDuration::parse(literal).map_err(|e| {
                GatewayError::Decode(format!("retention policy '{name}' duration: {e}"))
            })?;
            let is_default = cell(def_ix).as_bool().unwrap_or(false);
            out.push(ActualRetentionPolicy {
                name,
                duration,
                is_default,
            });
        }
    }
    Ok(out)
}

/// `SHOW CONTINUOUS QUERIES`: one series per database, columns `name, query`.
/// Only the series named `database` is kept.
pub fn continuous_queries(
    series: &[Series],
    database: &str,
) -> Result<Vec<ActualContinuousQuery>, GatewayError> {
    let mut out = Vec::new();
    for s in series.iter().filter(|s| s.name.as_deref() == Some(database)) {
        let name_ix = s.column("name")?;
        let query_ix = s.column("query")?;
        for row in &s.values {
            let cell = |ix: usize| row.get(ix).unwrap_or(&NULL);
            out.push(ActualContinuousQuery {
                name: as_str(cell(name_ix), "continuous query name")?.to_string(),
                text: as_str(cell(query_ix), "continuous query text")?.to_string(),
            });
        }
    }
    Ok(out)
}

/// `SHOW FIELD KEYS`: one series per measurement, column `fieldKey`.
pub fn field_keys(series: &[Series]) -> Result<BTreeMap<String, BTreeSet<String>>, GatewayError> {
    let mut out: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
    for s in series {
        let Some(measurement) = s.name.clone() else {
            continue;
        };
        let key_ix = s.column("fieldKey")?;
        let fields = out.entry(measurement).or_default();
        for row in &s.values {
            let cell = row.get(key_ix).unwrap_or(&NULL);
            fields.insert(as_str(cell, "field key")?.to_string());
        }
    }
    Ok(out)
}

/// First `time` cell of the first row, as nanoseconds (`epoch=ns`).
pub fn first_timestamp(series: &[Series]) -> Result<Option<i64>, GatewayError> {
    let Some(s) = series.first() else {
        return Ok(None);
    };
    let Some(row) = s.values.first() else {
        return Ok(None);
    };
    let ix = s.column("time")?;
    match row.get(ix) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v
            .as_i64()
            .map(Some)
            .ok_or_else(|| GatewayError::Decode(format!("time: expected integer ns, got {v}"))),
    }
}
