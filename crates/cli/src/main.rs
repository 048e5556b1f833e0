//! KCloud Cost Estimator CLI
//!
//! Command-line front end for the energy prediction and power model
//! calibration endpoints of the cost estimator service.

mod client;
mod commands;
mod output;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use commands::{calibration, health, predict};
use std::path::PathBuf;

/// KCloud Cost Estimator CLI
#[derive(Parser)]
#[command(name = "kce")]
#[command(author, version, about = "CLI for the KCloud Cost Estimator", long_about = None)]
pub struct Cli {
    /// Estimator API URL (can also be set via KCE_API_URL env var)
    #[arg(long, env = "KCE_API_URL", default_value = "http://localhost:8001")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict a container's power draw over a horizon
    Predict {
        /// JSON file holding a full prediction request
        #[arg(long, conflicts_with = "values")]
        file: Option<PathBuf>,

        /// Historical CPU usage in cores, oldest first (comma separated)
        #[arg(long, value_delimiter = ',', num_args = 1..)]
        values: Vec<f64>,

        /// Container name
        #[arg(long, default_value = "container")]
        container: String,

        /// Pod name
        #[arg(long, default_value = "pod")]
        pod: String,

        /// Namespace
        #[arg(long, short, default_value = "default")]
        namespace: String,

        /// Container CPU request in cores
        #[arg(long, default_value_t = 1.0)]
        cpu_request: f64,

        /// Current node CPU utilization (%)
        #[arg(long)]
        node_util: Option<f64>,

        /// Idle node CPU utilization (%)
        #[arg(long, default_value_t = 0.0)]
        idle_util: f64,

        /// Co-located container as cpu_request:cpu_util (repeatable)
        #[arg(long = "sibling")]
        siblings: Vec<String>,

        /// Prediction horizon in minutes
        #[arg(long)]
        horizon: Option<i64>,
    },

    /// Fit the power model from measurement pairs
    Calibrate {
        /// JSON file with container_node_data and node_power_data
        #[arg(long)]
        file: PathBuf,
    },

    /// Show the active power model
    Config,

    /// Score the active power model against measurements
    Validate {
        /// JSON file with a measurements array
        #[arg(long)]
        file: PathBuf,
    },

    /// Restore the default power model
    Reset,

    /// Show service health
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let client = client::ApiClient::new(&cli.api_url)?;

    match cli.command {
        Commands::Predict {
            file,
            values,
            container,
            pod,
            namespace,
            cpu_request,
            node_util,
            idle_util,
            siblings,
            horizon,
        } => {
            let request = match file {
                Some(path) => predict::load_request(&path, horizon)?,
                None => {
                    if values.is_empty() {
                        bail!("either --file or --values is required");
                    }
                    let Some(node_util) = node_util else {
                        bail!("--node-util is required with --values");
                    };
                    predict::InlineRequest {
                        values,
                        container,
                        pod,
                        namespace,
                        cpu_request,
                        node_util,
                        idle_util,
                        siblings,
                    }
                    .into_request(horizon.unwrap_or(30))?
                }
            };
            predict::predict(&client, request, cli.format).await?;
        }
        Commands::Calibrate { file } => {
            calibration::calibrate(&client, &file, cli.format).await?;
        }
        Commands::Config => {
            calibration::show_config(&client, cli.format).await?;
        }
        Commands::Validate { file } => {
            calibration::validate(&client, &file, cli.format).await?;
        }
        Commands::Reset => {
            calibration::reset(&client, cli.format).await?;
        }
        Commands::Health => {
            health::show_health(&client, cli.format).await?;
        }
    }

    Ok(())
}
