//! Power model calibration commands

use anyhow::{Context, Result};
use colored::Colorize;
use serde::de::DeserializeOwned;
use std::path::Path;

use crate::client::{
    ApiClient, CalibrationRequest, CalibrationResponse, ModelConfig, PowerModelParams,
    ValidationRequest, ValidationResponse,
};
use crate::output::{
    color_provenance, color_r2, format_watts, print_info, print_json, print_rows,
    print_success, FieldRow, OutputFormat,
};

fn read_json<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse {}", what))
}

fn parameter_rows(params: &PowerModelParams) -> Vec<FieldRow> {
    vec![
        FieldRow::new("container_to_node_slope", format!("{:.4}", params.container_to_node_slope)),
        FieldRow::new(
            "container_to_node_intercept",
            format!("{:.4}", params.container_to_node_intercept),
        ),
        FieldRow::new("node_util_to_power_slope", format!("{:.4}", params.node_util_to_power_slope)),
        FieldRow::new(
            "node_util_to_power_intercept",
            format!("{:.4}", params.node_util_to_power_intercept),
        ),
        FieldRow::new("node_idle_power", format_watts(params.node_idle_power_watts)),
        FieldRow::new("node_max_power", format_watts(params.node_max_power_watts)),
    ]
}

pub async fn calibrate(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let request: CalibrationRequest = read_json(file, "calibration data")?;
    let result: CalibrationResponse = client.post("calibrate", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            print_success("Power model calibrated");
            println!();
            print_rows(&parameter_rows(&result.calibration));
            println!();
            println!("{}", "Fit Quality".bold());
            println!("{}", "-".repeat(50));
            println!(
                "Container → node R²:    {}",
                color_r2(result.fit_quality.container_to_node_r2)
            );
            println!(
                "Node util → power R²:   {}",
                color_r2(result.fit_quality.node_util_to_power_r2)
            );
        }
    }

    Ok(())
}

pub async fn show_config(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: ModelConfig = client.get("calibration/config").await?;
    print_model(&result, format)
}

pub async fn reset(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: ModelConfig = client.post_empty("calibration/reset").await?;
    if matches!(format, OutputFormat::Table) {
        print_success("Power model reset to defaults");
        println!();
    }
    print_model(&result, format)
}

fn print_model(model: &ModelConfig, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(model)?,
        OutputFormat::Table => {
            println!("{}", "Active Power Model".bold());
            println!("{}", "=".repeat(50));
            println!("Provenance:             {}", color_provenance(&model.model_provenance));
            println!("Activated at:           {}", model.activated_at.dimmed());
            println!();
            print_rows(&parameter_rows(&model.calibration));
            print_info(&model.note);
        }
    }
    Ok(())
}

pub async fn validate(client: &ApiClient, file: &Path, format: OutputFormat) -> Result<()> {
    let request: ValidationRequest = read_json(file, "validation measurements")?;
    let result: ValidationResponse = client.post("calibration/validate", &request).await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            let v = &result.validation;
            println!(
                "{} ({} model, {} samples)",
                "Validation".bold(),
                color_provenance(&result.model_provenance),
                v.samples
            );
            println!("{}", "=".repeat(50));
            print_rows(&[
                FieldRow::new("Utilization MAE", format!("{:.3} %", v.utilization_mae)),
                FieldRow::new("Utilization RMSE", format!("{:.3} %", v.utilization_rmse)),
                FieldRow::new("Power MAE", format_watts(v.power_mae)),
                FieldRow::new("Power RMSE", format_watts(v.power_rmse)),
            ]);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_calibration_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"container_node_data":[{{"container_cpu_cores":0.5,"node_cpu_util_percent":15.2}}],
                "node_power_data":[{{"node_cpu_util_percent":10,"node_power_watts":58}}]}}"#
        )
        .unwrap();
        let request: CalibrationRequest = read_json(file.path(), "calibration data").unwrap();
        assert_eq!(request.container_node_data.len(), 1);
        assert_eq!(request.node_power_data[0].node_power_watts, 58.0);
    }

    #[test]
    fn test_missing_file() {
        let err = read_json::<CalibrationRequest>(Path::new("/nonexistent.json"), "x").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }

    #[test]
    fn test_parameter_rows() {
        let rows = parameter_rows(&PowerModelParams {
            container_to_node_slope: 23.993,
            container_to_node_intercept: 4.5347,
            node_util_to_power_slope: 0.7254,
            node_util_to_power_intercept: 53.88,
            node_idle_power_watts: 53.88,
            node_max_power_watts: 126.34,
        });
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[5].value, "126.34 W");
    }
}
