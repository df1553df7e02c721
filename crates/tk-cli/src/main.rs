use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;

use commands::Pass;

#[derive(Parser)]
#[command(name = "tierkeep")]
#[command(about = "InfluxDB 1.x retention tier reconciler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Bootstrap the tiers on a fresh database, or converge an existing one.
    Sync {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Print the statements instead of executing them.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Fail instead of warning on unused config keys.
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Return the database to the single legacy tier. Guardrail: refuses
    /// unless --yes is provided (or --dry-run).
    Teardown {
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Acknowledge that every continuous query and every non-legacy
        /// retention policy will be dropped.
        #[arg(long, default_value_t = false)]
        yes: bool,

        #[arg(long, default_value_t = false)]
        dry_run: bool,

        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> site -> host ...)
        #[arg(required = true)]
        paths: Vec<String>,
    },
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present; absence is fine.
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Sync {
            config_paths,
            dry_run,
            strict,
        } => {
            let loaded = commands::load_tier_config(&config_paths, strict)?;
            let report = commands::reconcile(&loaded, Pass::Sync, dry_run).await?;
            commands::print_report(&report, dry_run);
        }

        Commands::Teardown {
            config_paths,
            yes,
            dry_run,
            strict,
        } => {
            let loaded = commands::load_tier_config(&config_paths, strict)?;
            if !yes && !dry_run {
                anyhow::bail!(
                    "REFUSING TEARDOWN: this drops every continuous query and every retention policy \
                     on '{}' except '{}'. Re-run with: `tierkeep teardown --yes` (or preview with --dry-run)",
                    loaded.config.database(),
                    loaded.config.legacy_policy
                );
            }
            let report = commands::reconcile(&loaded, Pass::Teardown, dry_run).await?;
            commands::print_report(&report, dry_run);
        }

        Commands::ConfigHash { paths } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = tk_config::load_layered_yaml(&path_refs)?;
            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }
    }

    Ok(())
}
