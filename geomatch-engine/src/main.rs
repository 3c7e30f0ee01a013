//! GeoMatch CLI - reconcile addresses from the command line
//!
//! All command output is JSON on stdout; logs go to stderr.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geomatch_common::config::{ConfigOverrides, ConfigResolver};
use geomatch_common::logging::init_tracing;
use geomatch_engine::adapters::known_names;
use geomatch_engine::{build_orchestrator, extract_file, reconcile_batch};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Command-line arguments for geomatch
#[derive(Parser, Debug)]
#[command(name = "geomatch")]
#[command(about = "Address reconciliation against multiple validation sources")]
#[command(version)]
struct Cli {
    /// TOML config file (defaults to <config_dir>/geomatch/config.toml)
    #[arg(long, global = true, env = "GEOMATCH_CONFIG")]
    config: Option<PathBuf>,

    /// Adapters to query, in order (e.g. local,dummy,viacep)
    #[arg(long, global = true, value_delimiter = ',')]
    providers: Option<Vec<String>>,

    /// Per-adapter timeout in seconds
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Addresses reconciled concurrently
    #[arg(long, global = true)]
    workers: Option<usize>,

    /// Pretty-print JSON output
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Extract addresses from a .csv or .sql file and reconcile them all
    Reconcile {
        file: PathBuf,
    },
    /// Reconcile one or more addresses given on the command line
    Check {
        #[arg(required = true)]
        address: Vec<String>,
    },
    /// Print the addresses extracted from a .csv or .sql file
    Extract {
        file: PathBuf,
    },
    /// List the adapter names that can be configured
    Providers,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            providers: self.providers.clone(),
            adapter_timeout_secs: self.timeout_secs,
            workers: self.workers,
            ..ConfigOverrides::default()
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let resolver = match &cli.config {
        Some(path) => ConfigResolver::with_config_file(path),
        None => ConfigResolver::new(),
    };
    let config = resolver
        .resolve(&cli.overrides())
        .context("Failed to resolve configuration")?;

    init_tracing(&config.log_level);

    match &cli.command {
        Command::Providers => print_json(&known_names(), cli.pretty),
        Command::Extract { file } => {
            let addresses = extract_file(file)
                .with_context(|| format!("Failed to extract addresses from {}", file.display()))?;
            print_json(&addresses, cli.pretty)
        }
        Command::Check { address } => {
            let orchestrator =
                build_orchestrator(&config, None).context("Failed to configure adapters")?;

            let mut results = Vec::with_capacity(address.len());
            for raw in address {
                results.push(orchestrator.reconcile(raw).await);
            }
            print_json(&results, cli.pretty)
        }
        Command::Reconcile { file } => {
            let addresses = extract_file(file)
                .with_context(|| format!("Failed to extract addresses from {}", file.display()))?;
            let orchestrator =
                build_orchestrator(&config, None).context("Failed to configure adapters")?;

            info!(
                file = %file.display(),
                addresses = addresses.len(),
                providers = ?config.providers,
                "Reconciling file"
            );

            let cancel = CancellationToken::new();
            let ctrl_c_token = cancel.clone();
            tokio::spawn(async move {
                match tokio::signal::ctrl_c().await {
                    Ok(()) => {
                        warn!("Received Ctrl+C, cancelling outstanding reconciliations");
                        ctrl_c_token.cancel();
                    }
                    Err(e) => warn!("Failed to install Ctrl+C handler: {}", e),
                }
            });

            let outcome = reconcile_batch(&orchestrator, addresses, config.workers, &cancel).await;
            print_json(&outcome, cli.pretty)
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    let rendered = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;

    println!("{}", rendered);
    Ok(())
}
