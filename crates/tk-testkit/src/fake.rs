//! In-memory InfluxDB catalog.
//!
//! Interprets the DDL the planner renders (retention policies, continuous
//! queries, default switch) so applying a plan changes what the next
//! introspection returns. Data movement (`SELECT .. INTO ..`) is recorded, not
//! simulated. Stored continuous-query text is echoed back the way InfluxDB
//! re-renders definitions: identifier quotes stripped and `time(..)` buckets
//! in the largest exact unit (`60m` comes back as `1h`).
//!
//! Clones share state.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tk_influx::{Gateway, GatewayError, GatewayResult};
use tk_schemas::{
    normalize, ActualContinuousQuery, ActualRetentionPolicy, BookkeepingPoint, TierDuration,
    INFINITE_TICKS,
};

#[derive(Debug, Default)]
struct State {
    policies: Vec<ActualRetentionPolicy>,
    queries: Vec<ActualContinuousQuery>,
    fields: BTreeMap<String, BTreeSet<String>>,
    latest: BTreeMap<(String, String), i64>,
    executed: Vec<String>,
    moved: Vec<String>,
    written: Vec<(String, BookkeepingPoint)>,
    fail_statement: Option<(String, String)>,
    offline: bool,
}

#[derive(Debug, Clone)]
pub struct FakeInflux {
    database: String,
    state: Arc<Mutex<State>>,
}

impl FakeInflux {
    pub fn new(database: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            state: Arc::new(Mutex::new(State::default())),
        }
    }

    /// A fresh InfluxDB database: only `autogen`, infinite, default.
    pub fn fresh(database: impl Into<String>) -> Self {
        Self::new(database).with_policy("autogen", "INF", true)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // -- seeding ----------------------------------------------------------

    /// Panics on an invalid duration literal (test fixture input).
    pub fn with_policy(self, name: &str, duration: &str, is_default: bool) -> Self {
        let duration = TierDuration::parse(duration).expect("fixture duration");
        {
            let mut st = self.lock();
            if is_default {
                for p in st.policies.iter_mut() {
                    p.is_default = false;
                }
            }
            st.policies.push(ActualRetentionPolicy {
                name: name.to_string(),
                duration,
                is_default,
            });
        }
        self
    }

    pub fn with_measurement(self, name: &str, fields: &[&str]) -> Self {
        self.lock().fields.insert(
            name.to_string(),
            fields.iter().map(|f| f.to_string()).collect(),
        );
        self
    }

    /// Stored verbatim, as if created by someone else.
    pub fn with_query(self, name: &str, text: &str) -> Self {
        self.lock().queries.push(ActualContinuousQuery {
            name: name.to_string(),
            text: text.to_string(),
        });
        self
    }

    pub fn with_latest(self, tier: &str, measurement: &str, ts_ns: i64) -> Self {
        self.lock()
            .latest
            .insert((tier.to_string(), measurement.to_string()), ts_ns);
        self
    }

    // -- failure injection ------------------------------------------------

    /// The first statement containing `pattern` fails with `message` and is
    /// not applied. Later statements are unaffected.
    pub fn fail_statement_containing(self, pattern: &str, message: &str) -> Self {
        self.lock().fail_statement = Some((pattern.to_string(), message.to_string()));
        self
    }

    /// Every call fails with a connection error.
    pub fn offline(self) -> Self {
        self.lock().offline = true;
        self
    }

    // -- inspection -------------------------------------------------------

    /// Successfully executed statements, in order.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    /// Executed `SELECT .. INTO ..` statements, in order.
    pub fn data_movements(&self) -> Vec<String> {
        self.lock().moved.clone()
    }

    pub fn written_points(&self) -> Vec<(String, BookkeepingPoint)> {
        self.lock().written.clone()
    }

    pub fn policy_names(&self) -> Vec<String> {
        self.lock().policies.iter().map(|p| p.name.clone()).collect()
    }

    pub fn default_policy(&self) -> Option<String> {
        self.lock()
            .policies
            .iter()
            .find(|p| p.is_default)
            .map(|p| p.name.clone())
    }

    /// Stored text of a continuous query, as introspection returns it.
    pub fn query_text(&self, name: &str) -> Option<String> {
        self.lock()
            .queries
            .iter()
            .find(|q| q.name == name)
            .map(|q| q.text.clone())
    }

    pub fn query_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().queries.iter().map(|q| q.name.clone()).collect();
        names.sort();
        names
    }

    fn check_online(&self) -> GatewayResult<()> {
        if self.lock().offline {
            return Err(GatewayError::Connection(
                "connection refused (fake offline)".to_string(),
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Statement interpretation
// ---------------------------------------------------------------------------

/// Whitespace-separated tokens; `"..."` is one token with escapes removed.
fn tokens(statement: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut chars = statement.chars().peekable();
    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
            continue;
        }
        let mut tok = String::new();
        if c == '"' {
            chars.next();
            while let Some(c) = chars.next() {
                match c {
                    '\\' => {
                        if let Some(n) = chars.next() {
                            tok.push(n);
                        }
                    }
                    '"' => break,
                    _ => tok.push(c),
                }
            }
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() {
                    break;
                }
                tok.push(c);
                chars.next();
            }
        }
        out.push(tok);
    }
    out
}

fn statement_error(statement: &str, message: impl Into<String>) -> GatewayError {
    GatewayError::Statement {
        statement: statement.to_string(),
        message: message.into(),
    }
}

fn upper(toks: &[String], n: usize) -> String {
    toks.iter()
        .take(n)
        .map(|t| t.to_ascii_uppercase())
        .collect::<Vec<_>>()
        .join(" ")
}

const NANOS_PER_SECOND: i64 = 1_000_000_000;

/// Largest unit first; InfluxQL renders a duration in the first one that
/// divides it exactly.
const ECHO_UNITS: &[(i64, &str)] = &[
    (7 * 86_400 * NANOS_PER_SECOND, "w"),
    (86_400 * NANOS_PER_SECOND, "d"),
    (3_600 * NANOS_PER_SECOND, "h"),
    (60 * NANOS_PER_SECOND, "m"),
    (NANOS_PER_SECOND, "s"),
    (1_000_000, "ms"),
    (1_000, "u"),
];

fn echo_duration(ticks: i64) -> String {
    for (per, unit) in ECHO_UNITS {
        if ticks % per == 0 {
            return format!("{}{unit}", ticks / per);
        }
    }
    format!("{ticks}ns")
}

fn echo_buckets(text: &str) -> String {
    const OPEN: &str = "time(";
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(i) = rest.find(OPEN) {
        let (head, tail) = rest.split_at(i + OPEN.len());
        out.push_str(head);
        let Some(close) = tail.find(')') else {
            rest = tail;
            continue;
        };
        let args: Vec<String> = tail[..close]
            .split(',')
            .map(|arg| match normalize(arg) {
                Ok(ticks) if ticks != INFINITE_TICKS => echo_duration(ticks),
                _ => arg.to_string(),
            })
            .collect();
        out.push_str(&args.join(", "));
        rest = &tail[close..];
    }
    out.push_str(rest);
    out
}

impl State {
    fn apply(&mut self, statement: &str) -> GatewayResult<()> {
        let toks = tokens(statement);
        let head = upper(&toks, 3);
        let name = toks.get(3).cloned().unwrap_or_default();

        match head.as_str() {
            "CREATE RETENTION POLICY" => {
                let duration = toks
                    .iter()
                    .position(|t| t.eq_ignore_ascii_case("DURATION"))
                    .and_then(|i| toks.get(i + 1))
                    .ok_or_else(|| statement_error(statement, "missing DURATION"))?;
                let duration = TierDuration::parse(duration)
                    .map_err(|e| statement_error(statement, e.to_string()))?;
                let is_default = toks
                    .last()
                    .map(|t| t.eq_ignore_ascii_case("DEFAULT"))
                    .unwrap_or(false);
                if let Some(existing) = self.policies.iter().find(|p| p.name == name) {
                    if existing.duration != duration {
                        return Err(statement_error(
                            statement,
                            "retention policy conflicts with an existing policy",
                        ));
                    }
                } else {
                    self.policies.push(ActualRetentionPolicy {
                        name: name.clone(),
                        duration,
                        is_default: false,
                    });
                }
                if is_default {
                    self.set_default(&name);
                }
                Ok(())
            }
            "DROP RETENTION POLICY" => {
                let before = self.policies.len();
                self.policies.retain(|p| p.name != name);
                if self.policies.len() == before {
                    return Err(statement_error(
                        statement,
                        format!("retention policy not found: {name}"),
                    ));
                }
                Ok(())
            }
            "ALTER RETENTION POLICY" => {
                if !self.policies.iter().any(|p| p.name == name) {
                    return Err(statement_error(
                        statement,
                        format!("retention policy not found: {name}"),
                    ));
                }
                if toks
                    .last()
                    .map(|t| t.eq_ignore_ascii_case("DEFAULT"))
                    .unwrap_or(false)
                {
                    self.set_default(&name);
                }
                Ok(())
            }
            "CREATE CONTINUOUS QUERY" => {
                if self.queries.iter().any(|q| q.name == name) {
                    return Err(statement_error(statement, "continuous query already exists"));
                }
                self.queries.push(ActualContinuousQuery {
                    name,
                    text: echo_buckets(&statement.replace('"', "")),
                });
                Ok(())
            }
            "DROP CONTINUOUS QUERY" => {
                let before = self.queries.len();
                self.queries.retain(|q| q.name != name);
                if self.queries.len() == before {
                    return Err(statement_error(statement, "continuous query not found"));
                }
                Ok(())
            }
            _ if upper(&toks, 1) == "SELECT"
                && toks.iter().any(|t| t.eq_ignore_ascii_case("INTO")) =>
            {
                self.moved.push(statement.to_string());
                Ok(())
            }
            _ => Err(statement_error(statement, "fake influx: unsupported statement")),
        }
    }

    fn set_default(&mut self, name: &str) {
        for p in self.policies.iter_mut() {
            p.is_default = p.name == name;
        }
    }
}

#[async_trait::async_trait]
impl Gateway for FakeInflux {
    fn name(&self) -> &'static str {
        "fake-influx"
    }

    async fn list_retention_policies(&self) -> GatewayResult<Vec<ActualRetentionPolicy>> {
        self.check_online()?;
        Ok(self.lock().policies.clone())
    }

    async fn list_continuous_queries(&self) -> GatewayResult<Vec<ActualContinuousQuery>> {
        self.check_online()?;
        Ok(self.lock().queries.clone())
    }

    async fn list_measurement_fields(&self) -> GatewayResult<BTreeMap<String, BTreeSet<String>>> {
        self.check_online()?;
        Ok(self.lock().fields.clone())
    }

    async fn execute(&self, statement: &str) -> GatewayResult<()> {
        self.check_online()?;
        let mut st = self.lock();
        if let Some((pattern, message)) = st.fail_statement.clone() {
            if statement.contains(&pattern) {
                st.fail_statement = None;
                return Err(statement_error(statement, message));
            }
        }
        st.apply(statement)?;
        st.executed.push(statement.to_string());
        Ok(())
    }

    async fn latest_timestamp(&self, tier: &str, measurement: &str) -> GatewayResult<Option<i64>> {
        self.check_online()?;
        Ok(self
            .lock()
            .latest
            .get(&(tier.to_string(), measurement.to_string()))
            .copied())
    }

    async fn write_points(&self, tier: &str, points: &[BookkeepingPoint]) -> GatewayResult<()> {
        self.check_online()?;
        let mut st = self.lock();
        if !st.policies.iter().any(|p| p.name == tier) {
            return Err(statement_error(
                "write",
                format!("retention policy not found: {tier}"),
            ));
        }
        for p in points {
            st.written.push((tier.to_string(), p.clone()));
        }
        Ok(())
    }
}
