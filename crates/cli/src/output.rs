//! Output formatting utilities

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

/// One labelled value in a key/value table
#[derive(Tabled)]
pub struct FieldRow {
    #[tabled(rename = "Field")]
    pub field: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

impl FieldRow {
    pub fn new(field: &str, value: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
        }
    }
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_rows<T: Tabled>(rows: &[T]) {
    if rows.is_empty() {
        println!("{}", "No items found".yellow());
        return;
    }
    let table = Table::new(rows).with(Style::rounded()).to_string();
    println!("{}", table);
}

pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

pub fn format_watts(watts: f64) -> String {
    format!("{:.2} W", watts)
}

pub fn format_percent(percent: f64) -> String {
    format!("{:.1}%", percent)
}

pub fn format_cores(cores: f64) -> String {
    if cores < 1.0 {
        format!("{:.0}m", cores * 1000.0)
    } else {
        format!("{:.2}", cores)
    }
}

/// Attribution share (0-1) as a percentage
pub fn format_share(share: f64) -> String {
    format!("{:.0}%", share * 100.0)
}

/// R² colored by how well the line explains the measurements
pub fn color_r2(r2: f64) -> String {
    let formatted = format!("{:.4}", r2);
    if r2 >= 0.9 {
        formatted.green().to_string()
    } else if r2 >= 0.7 {
        formatted.yellow().to_string()
    } else {
        formatted.red().to_string()
    }
}

pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "alive" | "success" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "error" | "failed" => status.red().to_string(),
        _ => status.to_string(),
    }
}

pub fn color_provenance(provenance: &str) -> String {
    match provenance {
        "calibrated" => provenance.green().to_string(),
        "default" => provenance.cyan().to_string(),
        _ => provenance.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cores() {
        assert_eq!(format_cores(0.25), "250m");
        assert_eq!(format_cores(1.5), "1.50");
    }

    #[test]
    fn test_format_units() {
        assert_eq!(format_watts(49.456), "49.46 W");
        assert_eq!(format_percent(41.42), "41.4%");
        assert_eq!(format_share(0.59), "59%");
    }
}
