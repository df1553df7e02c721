//! Desired state: a pure function of validated config and one schema snapshot.

use serde::Serialize;
use tk_config::TierConfig;
use tk_schemas::{ContinuousQuery, Measurement, RetentionPolicy, SchemaSnapshot};

use crate::synth;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DesiredState {
    pub database: String,
    /// Configured order.
    pub retention_policies: Vec<RetentionPolicy>,
    pub default_policy: String,
    /// Downsampling sources, in name order. Excludes bookkeeping.
    pub measurements: Vec<Measurement>,
    /// Sorted by name, unique by name.
    pub continuous_queries: Vec<ContinuousQuery>,
}

impl DesiredState {
    /// One continuous query per (downsampling tier × measurement), reading from
    /// the default tier. The bookkeeping measurement is never a source.
    pub fn derive(config: &TierConfig, schema: &SchemaSnapshot) -> Self {
        let default = config.default_policy();
        let measurements: Vec<Measurement> = schema
            .without(&config.bookkeeping.measurement)
            .measurements()
            .collect();

        let mut continuous_queries: Vec<ContinuousQuery> = Vec::new();
        for target in config.downsampling_policies() {
            for m in &measurements {
                if let Some(cq) = synth::continuous_query(
                    config.database(),
                    default,
                    target,
                    m,
                    &config.aggregates,
                ) {
                    continuous_queries.push(cq);
                }
            }
        }
        continuous_queries.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            database: config.database().to_string(),
            retention_policies: config.policies().to_vec(),
            default_policy: default.name.clone(),
            measurements,
            continuous_queries,
        }
    }

    pub fn policy(&self, name: &str) -> Option<&RetentionPolicy> {
        self.retention_policies.iter().find(|p| p.name == name)
    }

    pub fn default_tier(&self) -> Option<&RetentionPolicy> {
        self.policy(&self.default_policy)
    }

    pub fn downsampling_policies(&self) -> impl Iterator<Item = &RetentionPolicy> {
        self.retention_policies
            .iter()
            .filter(|p| !p.is_default && p.resolution.is_some())
    }

    pub fn continuous_query(&self, name: &str) -> Option<&ContinuousQuery> {
        self.continuous_queries
            .binary_search_by(|cq| cq.name.as_str().cmp(name))
            .ok()
            .map(|i| &self.continuous_queries[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    fn config() -> TierConfig {
        TierConfig::from_json(&serde_json::json!({
            "connection": { "database": "telegraf" },
            "retention_policies": [
                { "name": "two_days", "duration": "2d", "default": true },
                { "name": "a_week", "duration": "7d", "resolution": "1m" },
                { "name": "archive", "duration": "30d" },
                { "name": "forever", "duration": "INF", "resolution": "4h" },
            ],
        }))
        .unwrap()
    }

    fn schema() -> SchemaSnapshot {
        let mut m = BTreeMap::new();
        m.insert("cpu".to_string(), BTreeSet::from(["usage_idle".to_string()]));
        m.insert("mem".to_string(), BTreeSet::from(["used".to_string()]));
        m.insert("grafana_rp".to_string(), BTreeSet::from(["rp".to_string()]));
        SchemaSnapshot::new(m)
    }

    #[test]
    fn cross_product_skips_resolutionless_tiers_and_bookkeeping() {
        let desired = DesiredState::derive(&config(), &schema());
        let names: Vec<&str> = desired
            .continuous_queries
            .iter()
            .map(|cq| cq.name.as_str())
            .collect();
        assert_eq!(names, vec!["cq_cpu_1m", "cq_cpu_4h", "cq_mem_1m", "cq_mem_4h"]);
        assert!(desired
            .continuous_queries
            .iter()
            .all(|cq| cq.source_policy == "two_days"));
        assert_eq!(desired.default_policy, "two_days");
        assert_eq!(desired.measurements.len(), 2);
        assert_eq!(desired.retention_policies.len(), 4);
        assert_eq!(
            desired.continuous_query("cq_mem_4h").map(|cq| cq.target_policy.as_str()),
            Some("forever")
        );
    }

    #[test]
    fn derivation_does_not_depend_on_call_count() {
        let c = config();
        let s = schema();
        assert_eq!(DesiredState::derive(&c, &s), DesiredState::derive(&c, &s));
    }
}
