//! Cost Estimator - container energy prediction service
//!
//! Serves energy predictions and power model calibration over HTTP,
//! alongside health probes and Prometheus metrics.

use anyhow::Result;
use cost_estimator::{api, config::EstimatorConfig};
use estimator_lib::{
    health::HealthRegistry,
    observability::{EstimatorMetrics, StructuredLogger},
    ModelProvenance,
};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const ESTIMATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    let config = EstimatorConfig::load()?;

    // RUST_LOG wins over the configured level
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with(fmt::layer().json())
        .init();

    info!(
        instance = %config.instance_name,
        max_horizon_minutes = config.max_horizon_minutes,
        max_history_points = config.max_history_points,
        max_ar_order = config.max_ar_order,
        "Estimator configured"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register_all().await;

    let metrics = EstimatorMetrics::new();
    metrics.set_model_provenance(ModelProvenance::Default);

    let logger = StructuredLogger::new(&config.instance_name);
    let addr = config.listen_addr();
    logger.log_startup(ESTIMATOR_VERSION, &addr);

    let app_state = Arc::new(api::AppState::new(
        config.forecast_config(),
        health_registry.clone(),
        metrics,
        logger.clone(),
    ));

    health_registry.set_ready(true).await;

    let server = tokio::spawn(api::serve(addr, app_state));

    tokio::select! {
        result = server => {
            match result {
                Ok(Ok(())) => logger.log_shutdown("API server stopped"),
                Ok(Err(e)) => {
                    error!(error = %e, "API server failed");
                    return Err(e);
                }
                Err(e) => return Err(e.into()),
            }
        }
        signal = tokio::signal::ctrl_c() => {
            signal?;
            logger.log_shutdown("SIGINT received");
        }
    }

    info!("Shutting down");
    Ok(())
}
