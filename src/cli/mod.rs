//! # Command Line Interface
//!
//! `pingdb probe` runs the connectivity probe from the shell and exits
//! non-zero on failure; `pingdb serve` exposes it over HTTP.

pub mod output;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::future::join_all;
use tracing::info;

use crate::api::{build_router, start_api_server};
use crate::config::AppConfig;
use crate::observability::{init_logging, log_config_info};
use crate::probe::{ConnectivityProbe, InvocationResult};
use crate::startup::build_probe;

#[derive(Parser)]
#[command(name = "pingdb")]
#[command(about = "Database connectivity probe with a cached credential secret")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Secret identifier override
    #[arg(long, global = true)]
    pub secret_id: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the probe and print the outcome
    Probe {
        /// Number of concurrent invocations sharing one secret cache
        #[arg(short = 'n', long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
        invocations: u32,

        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Serve the HTTP trigger
    Serve {
        /// Address to bind to (overrides PINGDB_BIND_ADDRESS)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

pub async fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = AppConfig::from_env().context("Failed to load configuration")?;
    if let Some(secret_id) = cli.secret_id {
        config.secret_id = secret_id;
    }
    if cli.verbose {
        config.observability.log_level = "debug".to_string();
    }
    config.validate()?;

    init_logging(&config.observability)?;
    log_config_info(&config);

    let probe = Arc::new(build_probe(&config).await?);

    match cli.command {
        Commands::Probe { invocations, json } => {
            let results = run_invocations(&probe, invocations as usize).await;
            output::print_results(&results, json)?;

            let failed = results.iter().filter(|r| !r.is_success()).count();
            info!(
                invocations = results.len(),
                failed,
                cached_secrets = probe.cache().len(),
                "Probe run finished"
            );
            Ok(if failed == 0 { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
        Commands::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind_address.clone());
            start_api_server(&bind, build_router(probe)).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run `count` invocations concurrently. Results are in start order.
pub async fn run_invocations(probe: &ConnectivityProbe, count: usize) -> Vec<InvocationResult> {
    join_all((0..count).map(|_| async move { InvocationResult::from_outcome(&probe.run().await) }))
        .await
}
