//! Live InfluxDB 1.x gateway over HTTP.
//!
//! - reads (`SHOW ..`, latest timestamp) are `GET /query` with `epoch=ns`
//! - statements are `POST /query` (InfluxDB refuses DDL over GET)
//! - bookkeeping points are `POST /write` with `precision=ns`
//!
//! Credentials are passed in by the caller and never logged.

use std::collections::{BTreeMap, BTreeSet};

use tk_config::{ConnectionConfig, ResolvedCredentials};
use tk_schemas::{ActualContinuousQuery, ActualRetentionPolicy, BookkeepingPoint};
use tracing::debug;

use crate::error::GatewayError;
use crate::gateway::{Gateway, GatewayResult};
use crate::{line, wire};

fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}

#[derive(Clone)]
pub struct InfluxHttpGateway {
    http: reqwest::Client,
    base_url: String,
    database: String,
    credentials: Option<ResolvedCredentials>,
}

impl std::fmt::Debug for InfluxHttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InfluxHttpGateway")
            .field("base_url", &self.base_url)
            .field("database", &self.database)
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl InfluxHttpGateway {
    pub fn new(base_url: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            database: database.into(),
            credentials: None,
        }
    }

    pub fn from_config(conn: &ConnectionConfig, credentials: Option<ResolvedCredentials>) -> Self {
        Self::new(conn.base_url(), conn.database.clone()).with_credentials(credentials)
    }

    pub fn with_credentials(mut self, credentials: Option<ResolvedCredentials>) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authed(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            Some(c) => req.basic_auth(&c.username, Some(&c.password)),
            None => req,
        }
    }

    async fn read_body(resp: reqwest::Response) -> GatewayResult<String> {
        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| GatewayError::Connection(format!("reading response body: {e}")))?;
        // InfluxDB reports statement errors as JSON on 400 too; let the decoder
        // surface those with their message.
        if !status.is_success() && !(status.as_u16() == 400 && body.trim_start().starts_with('{')) {
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    async fn query(&self, statement: &str) -> GatewayResult<Vec<wire::Series>> {
        debug!(statement, "influx query");
        let req = self.http.get(self.url("query")).query(&[
            ("db", self.database.as_str()),
            ("epoch", "ns"),
            ("q", statement),
        ]);
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        let body = Self::read_body(resp).await?;
        wire::decode(&body, statement)
    }
}

#[async_trait::async_trait]
impl Gateway for InfluxHttpGateway {
    fn name(&self) -> &'static str {
        "influx-http"
    }

    async fn list_retention_policies(&self) -> GatewayResult<Vec<ActualRetentionPolicy>> {
        let q = format!("SHOW RETENTION POLICIES ON {}", quote(&self.database));
        let series = self.query(&q).await?;
        wire::retention_policies(&series)
    }

    async fn list_continuous_queries(&self) -> GatewayResult<Vec<ActualContinuousQuery>> {
        let series = self.query("SHOW CONTINUOUS QUERIES").await?;
        wire::continuous_queries(&series, &self.database)
    }

    async fn list_measurement_fields(&self) -> GatewayResult<BTreeMap<String, BTreeSet<String>>> {
        let q = format!("SHOW FIELD KEYS ON {}", quote(&self.database));
        let series = self.query(&q).await?;
        wire::field_keys(&series)
    }

    async fn execute(&self, statement: &str) -> GatewayResult<()> {
        debug!(statement, "influx execute");
        let req = self
            .http
            .post(self.url("query"))
            .query(&[("db", self.database.as_str()), ("q", statement)]);
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        let body = Self::read_body(resp).await?;
        wire::decode(&body, statement).map(|_| ())
    }

    async fn latest_timestamp(&self, tier: &str, measurement: &str) -> GatewayResult<Option<i64>> {
        let q = format!(
            "SELECT * FROM {}.{}.{} ORDER BY time DESC LIMIT 1",
            quote(&self.database),
            quote(tier),
            quote(measurement)
        );
        let series = self.query(&q).await?;
        wire::first_timestamp(&series)
    }

    async fn write_points(&self, tier: &str, points: &[BookkeepingPoint]) -> GatewayResult<()> {
        if points.is_empty() {
            return Ok(());
        }
        let req = self
            .http
            .post(self.url("write"))
            .query(&[
                ("db", self.database.as_str()),
                ("rp", tier),
                ("precision", "ns"),
            ])
            .body(line::encode_batch(points));
        let resp = self
            .authed(req)
            .send()
            .await
            .map_err(|e| GatewayError::Connection(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GatewayError::Http {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }
}
