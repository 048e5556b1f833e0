//! Service health command

use anyhow::Result;
use colored::Colorize;
use tabled::Tabled;

use crate::client::{ApiClient, HealthStatus};
use crate::output::{color_provenance, color_status, print_json, print_rows, OutputFormat};

#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Component")]
    name: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Message")]
    message: String,
}

pub async fn show_health(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let result: HealthStatus = client.get("health").await?;

    match format {
        OutputFormat::Json => print_json(&result)?,
        OutputFormat::Table => {
            println!("{}", "Estimator Health".bold());
            println!("{}", "=".repeat(50));
            println!("Status:                 {}", color_status(&result.status));
            println!("Version:                {}", result.version);
            if let Some(provenance) = &result.model_provenance {
                println!("Power model:            {}", color_provenance(provenance));
            }
            println!();

            let rows: Vec<ComponentRow> = result
                .components
                .iter()
                .map(|(name, health)| ComponentRow {
                    name: name.clone(),
                    status: color_status(&health.status),
                    message: health.message.clone().unwrap_or_else(|| "-".to_string()),
                })
                .collect();
            print_rows(&rows);
        }
    }

    Ok(())
}
