//! Power model calibration
//!
//! Fits the two affine sub-models from field measurements and publishes the
//! result as the process-wide active model. Readers always observe a
//! complete model: a new one is built off to the side and swapped in under
//! the write lock, so a failed fit never touches the current model.

mod regression;

pub use regression::{LinearFit, MIN_CALIBRATION_SAMPLES};

use crate::error::{EstimatorError, Result};
use crate::models::{Cores, ModelProvenance, Percent};
use crate::power::PowerModel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock};
use tracing::info;

pub const CONTAINER_TO_NODE: &str = "container_to_node";
pub const NODE_UTIL_TO_POWER: &str = "node_util_to_power";

/// The power model currently used for predictions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveModel {
    pub model: PowerModel,
    pub provenance: ModelProvenance,
    pub activated_at: DateTime<Utc>,
}

impl ActiveModel {
    fn literature_default() -> Self {
        Self {
            model: PowerModel::literature_default(),
            provenance: ModelProvenance::Default,
            activated_at: Utc::now(),
        }
    }
}

/// Outcome of a successful calibration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub model: PowerModel,
    pub container_to_node_r2: f64,
    pub node_util_to_power_r2: f64,
    pub activated_at: DateTime<Utc>,
}

/// One held-out measurement used to score a model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationSample {
    pub container_cpu_cores: f64,
    pub actual_node_util: f64,
    pub actual_power: f64,
}

/// Error of a model against held-out measurements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub utilization_mae: f64,
    pub utilization_rmse: f64,
    pub power_mae: f64,
    pub power_rmse: f64,
    pub samples: usize,
}

/// Validation metrics together with the model they were computed against
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub validation: ValidationMetrics,
    pub model_provenance: ModelProvenance,
}

/// Fit a complete power model without publishing it
pub fn fit_power_model(
    container_node_samples: &[(f64, f64)],
    node_power_samples: &[(f64, f64)],
) -> Result<(PowerModel, LinearFit, LinearFit)> {
    let c2n = LinearFit::fit(CONTAINER_TO_NODE, container_node_samples)?;
    let u2p = LinearFit::fit(NODE_UTIL_TO_POWER, node_power_samples)?;

    let max_util = node_power_samples
        .iter()
        .map(|(util, _)| *util)
        .fold(f64::NEG_INFINITY, f64::max);
    let at_idle = u2p.intercept;
    let at_max = u2p.predict(max_util);

    let model = PowerModel {
        container_to_node_slope: c2n.slope,
        container_to_node_intercept: c2n.intercept,
        node_util_to_power_slope: u2p.slope,
        node_util_to_power_intercept: u2p.intercept,
        node_idle_power_watts: at_idle.min(at_max),
        node_max_power_watts: at_idle.max(at_max),
    };
    model.validate()?;
    Ok((model, c2n, u2p))
}

/// Score `model` against held-out measurements
pub fn validate_model(model: &PowerModel, samples: &[ValidationSample]) -> Result<ValidationMetrics> {
    if samples.is_empty() {
        return Err(EstimatorError::InvalidRequest(
            "validation requires at least one sample".to_string(),
        ));
    }

    let util_errors: Vec<f64> = samples
        .iter()
        .map(|s| (model.raw_container_util(Cores(s.container_cpu_cores)) - s.actual_node_util).abs())
        .collect();
    let power_errors: Vec<f64> = samples
        .iter()
        .map(|s| (model.raw_node_power(Percent(s.actual_node_util)) - s.actual_power).abs())
        .collect();

    let n = samples.len() as f64;
    let mae = |e: &[f64]| e.iter().sum::<f64>() / n;
    let rmse = |e: &[f64]| (e.iter().map(|v| v * v).sum::<f64>() / n).sqrt();

    Ok(ValidationMetrics {
        utilization_mae: mae(&util_errors),
        utilization_rmse: rmse(&util_errors),
        power_mae: mae(&power_errors),
        power_rmse: rmse(&power_errors),
        samples: samples.len(),
    })
}

/// Owns the active power model shared by every request
#[derive(Debug, Clone)]
pub struct CalibrationEngine {
    active: Arc<RwLock<Arc<ActiveModel>>>,
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CalibrationEngine {
    /// Start from the literature defaults
    pub fn new() -> Self {
        Self {
            active: Arc::new(RwLock::new(Arc::new(ActiveModel::literature_default()))),
        }
    }

    /// Snapshot of the active model
    pub fn active(&self) -> Result<Arc<ActiveModel>> {
        let guard = self
            .active
            .read()
            .map_err(|e| EstimatorError::LockPoisoned(e.to_string()))?;
        Ok(Arc::clone(&guard))
    }

    /// Fit both sub-models and publish the result
    pub fn calibrate(
        &self,
        container_node_samples: &[(f64, f64)],
        node_power_samples: &[(f64, f64)],
    ) -> Result<CalibrationReport> {
        let (model, c2n, u2p) = fit_power_model(container_node_samples, node_power_samples)?;
        let next = Arc::new(ActiveModel {
            model,
            provenance: ModelProvenance::Calibrated,
            activated_at: Utc::now(),
        });
        let activated_at = next.activated_at;
        self.publish(next)?;

        info!(
            container_to_node_slope = model.container_to_node_slope,
            container_to_node_intercept = model.container_to_node_intercept,
            container_to_node_r2 = c2n.r_squared,
            node_util_to_power_slope = model.node_util_to_power_slope,
            node_util_to_power_intercept = model.node_util_to_power_intercept,
            node_util_to_power_r2 = u2p.r_squared,
            idle_watts = model.node_idle_power_watts,
            max_watts = model.node_max_power_watts,
            "Power model calibrated"
        );

        Ok(CalibrationReport {
            model,
            container_to_node_r2: c2n.r_squared,
            node_util_to_power_r2: u2p.r_squared,
            activated_at,
        })
    }

    /// Restore the literature defaults
    pub fn reset(&self) -> Result<Arc<ActiveModel>> {
        let next = Arc::new(ActiveModel::literature_default());
        self.publish(Arc::clone(&next))?;
        info!("Power model reset to literature defaults");
        Ok(next)
    }

    /// Score the active model against held-out measurements
    ///
    /// Metrics and provenance come from the same model snapshot.
    pub fn validate(&self, samples: &[ValidationSample]) -> Result<ValidationReport> {
        let active = self.active()?;
        let metrics = validate_model(&active.model, samples)?;
        info!(
            samples = metrics.samples,
            provenance = active.provenance.as_str(),
            utilization_mae = metrics.utilization_mae,
            power_mae = metrics.power_mae,
            "Power model validated"
        );
        Ok(ValidationReport {
            validation: metrics,
            model_provenance: active.provenance,
        })
    }

    fn publish(&self, next: Arc<ActiveModel>) -> Result<()> {
        let mut guard = self
            .active
            .write()
            .map_err(|e| EstimatorError::LockPoisoned(e.to_string()))?;
        *guard = next;
        Ok(())
    }
}
