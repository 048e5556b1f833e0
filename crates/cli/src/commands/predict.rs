//! Energy prediction command

use anyhow::{bail, Context, Result};
use colored::Colorize;
use std::path::Path;

use crate::client::{ApiClient, PredictionEnvelope, PredictionRequest, SiblingContainer};
use crate::output::{
    color_provenance, format_cores, format_percent, format_share, format_watts, print_json,
    print_rows, print_warning, FieldRow, OutputFormat,
};

/// Request fields given on the command line instead of a file
#[derive(Debug, Clone)]
pub struct InlineRequest {
    pub values: Vec<f64>,
    pub container: String,
    pub pod: String,
    pub namespace: String,
    pub cpu_request: f64,
    pub node_util: f64,
    pub idle_util: f64,
    /// `cpu_request:cpu_util` pairs
    pub siblings: Vec<String>,
}

impl InlineRequest {
    pub fn into_request(self, horizon_minutes: i64) -> Result<PredictionRequest> {
        let containers_on_node = self
            .siblings
            .iter()
            .map(|s| parse_sibling(s))
            .collect::<Result<Vec<_>>>()?;
        Ok(PredictionRequest {
            container_name: self.container,
            pod_name: self.pod,
            namespace: self.namespace,
            historical_cpu_cores: self.values,
            historical_timestamps: None,
            container_cpu_request: self.cpu_request,
            node_current_util: self.node_util,
            node_idle_util: self.idle_util,
            containers_on_node,
            prediction_horizon_minutes: horizon_minutes,
        })
    }
}

fn parse_sibling(raw: &str) -> Result<SiblingContainer> {
    let Some((request, util)) = raw.split_once(':') else {
        bail!("sibling '{}' must be formatted as cpu_request:cpu_util", raw);
    };
    Ok(SiblingContainer {
        cpu_request: request
            .trim()
            .parse()
            .with_context(|| format!("invalid sibling cpu_request '{}'", request))?,
        cpu_util: util
            .trim()
            .parse()
            .with_context(|| format!("invalid sibling cpu_util '{}'", util))?,
    })
}

/// Read a prediction request body from a JSON file
pub fn load_request(path: &Path, horizon_override: Option<i64>) -> Result<PredictionRequest> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut request: PredictionRequest =
        serde_json::from_str(&content).context("Failed to parse prediction request")?;
    if let Some(horizon) = horizon_override {
        request.prediction_horizon_minutes = horizon;
    }
    Ok(request)
}

pub async fn predict(
    client: &ApiClient,
    request: PredictionRequest,
    format: OutputFormat,
) -> Result<()> {
    let result: PredictionEnvelope = client.post("predict/energy", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let p = &result.prediction;
            println!("{}", "Energy Prediction".bold());
            println!("{}", "=".repeat(50));
            println!(
                "Container:              {}/{}/{}",
                p.namespace.cyan(),
                p.pod_name.cyan(),
                p.container_name.cyan()
            );
            println!("Horizon:                {} min", p.prediction_horizon_minutes);
            println!();

            print_rows(&[
                FieldRow::new("Predicted power", format_watts(p.predicted_power_watts).green().bold().to_string()),
                FieldRow::new(
                    "Confidence interval",
                    format!(
                        "{} .. {}",
                        format_watts(p.confidence_interval.low),
                        format_watts(p.confidence_interval.high)
                    ),
                ),
                FieldRow::new("Predicted CPU", format_cores(p.predicted_cpu_cores)),
                FieldRow::new("Node utilization", format_percent(p.predicted_node_util_percent)),
                FieldRow::new("Node power", format_watts(p.predicted_node_power_watts)),
                FieldRow::new("Attribution share", format_share(p.attribution_share)),
                FieldRow::new("Model", color_provenance(&p.model_provenance)),
            ]);

            for warning in &p.warnings {
                print_warning(warning);
            }
            println!();
            println!("Predicted at: {}", p.prediction_timestamp.dimmed());
        }
    }

    Ok(())
}
