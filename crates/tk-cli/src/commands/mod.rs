//! Command handlers shared by `sync` and `teardown`.
//!
//! Everything that can fail without touching the network (YAML layering,
//! unused keys, tier validation, credential lookup) happens in
//! [`load_tier_config`] / [`reconcile`] before the first request.

use anyhow::{Context, Result};
use tk_config::{resolve_credentials, TierConfig, UnusedKeyPolicy};
use tk_influx::{DryRunGateway, Gateway, InfluxHttpGateway};
use tk_runtime::{Reconciler, RunError, RunReport};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub enum Pass {
    Sync,
    Teardown,
}

#[derive(Debug)]
pub struct LoadedTierConfig {
    pub config: TierConfig,
    pub config_hash: String,
}

pub fn load_tier_config(paths: &[String], strict: bool) -> Result<LoadedTierConfig> {
    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = tk_config::load_layered_yaml(&path_refs)?;

    let policy = if strict {
        UnusedKeyPolicy::Fail
    } else {
        UnusedKeyPolicy::Warn
    };
    let unused = tk_config::report_unused_keys(&loaded.config_json, policy)?;
    for key in &unused.unused_leaf_pointers {
        warn!(key = %key, "unused config key");
    }

    let config = TierConfig::from_json(&loaded.config_json).context("invalid tier config")?;
    info!(
        config_hash = %loaded.config_hash,
        database = config.database(),
        tiers = config.policies().len(),
        "config loaded"
    );
    Ok(LoadedTierConfig {
        config,
        config_hash: loaded.config_hash,
    })
}

pub async fn reconcile(loaded: &LoadedTierConfig, pass: Pass, dry_run: bool) -> Result<RunReport> {
    let credentials = resolve_credentials(&loaded.config.connection)?;
    let live = InfluxHttpGateway::from_config(&loaded.config.connection, credentials);

    let report = if dry_run {
        let dry = DryRunGateway::new(live);
        run_pass(loaded, &dry, pass).await?
    } else {
        run_pass(loaded, &live, pass).await?
    };
    Ok(report)
}

async fn run_pass(
    loaded: &LoadedTierConfig,
    gateway: &dyn Gateway,
    pass: Pass,
) -> Result<RunReport, RunError> {
    let reconciler =
        Reconciler::new(&loaded.config, gateway).with_config_hash(loaded.config_hash.clone());
    match pass {
        Pass::Sync => reconciler.run().await,
        Pass::Teardown => reconciler.teardown().await,
    }
}

pub fn print_report(report: &RunReport, dry_run: bool) {
    println!("run_id={}", report.run_id);
    println!("mode={}", report.mode);
    println!("gateway={}", report.gateway);
    if let Some(h) = &report.config_hash {
        println!("config_hash={h}");
    }
    println!("dry_run={dry_run}");
    println!("operations={}", report.plan.len());
    for (i, op) in report.plan.iter().enumerate() {
        println!("step={} op={}", i + 1, op);
        if dry_run {
            println!("  {}", op.statement());
        }
    }
    for a in &report.advisories {
        println!("advisory={a}");
    }
    println!("bookkeeping_points={}", report.bookkeeping_points);
}
