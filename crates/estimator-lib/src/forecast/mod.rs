//! Workload forecasting
//!
//! Produces a trajectory of future CPU usage (cores) from a container's
//! recent history. Forecasting is a pure function of its input: no shared
//! state, identical input gives identical output.

mod autoregressive;

pub use autoregressive::ForecastModel;

use crate::error::{EstimatorError, Result};
use crate::series::HistoricalSeries;
use crate::stats::distinct_count;
use autoregressive::FittedModel;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Minimum number of historical points required for a forecast
pub const MIN_FORECAST_POINTS: usize = 3;

/// Default maximum horizon (4 hours)
pub const DEFAULT_MAX_HORIZON_MINUTES: u32 = 240;

/// Default cap on history length fed to the model
pub const DEFAULT_MAX_HISTORY_POINTS: usize = 10_000;

/// Default cap on projected steps (one day at one-minute sampling)
pub const DEFAULT_MAX_FORECAST_STEPS: usize = 1_440;

/// Default maximum autoregressive order considered
pub const DEFAULT_MAX_AR_ORDER: usize = 3;

/// Guard against division by zero in MAPE
const MAPE_EPSILON: f64 = 1e-10;

/// Bounds that keep worst-case forecasting latency predictable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Horizons above this are rejected
    pub max_horizon_minutes: u32,
    /// Longer series are truncated to their most recent points
    pub max_history_points: usize,
    /// Upper bound on projected steps
    pub max_forecast_steps: usize,
    /// Highest AR order considered during order selection
    pub max_ar_order: usize,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            max_horizon_minutes: DEFAULT_MAX_HORIZON_MINUTES,
            max_history_points: DEFAULT_MAX_HISTORY_POINTS,
            max_forecast_steps: DEFAULT_MAX_FORECAST_STEPS,
            max_ar_order: DEFAULT_MAX_AR_ORDER,
        }
    }
}

/// In-sample accuracy of the fitted model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error, in percent
    pub mape: f64,
}

impl AccuracyMetrics {
    fn from_pairs(pairs: &[(f64, f64)]) -> Self {
        if pairs.is_empty() {
            return Self { mae: 0.0, rmse: 0.0, mape: 0.0 };
        }
        let n = pairs.len() as f64;
        let mae = pairs.iter().map(|(a, f)| (a - f).abs()).sum::<f64>() / n;
        let rmse = (pairs.iter().map(|(a, f)| (a - f).powi(2)).sum::<f64>() / n).sqrt();
        let mape = pairs
            .iter()
            .map(|(a, f)| ((a - f) / (a + MAPE_EPSILON)).abs())
            .sum::<f64>()
            / n
            * 100.0;
        Self { mae, rmse, mape }
    }
}

/// Forecast of future CPU usage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResult {
    /// Predicted cores, one value per future step
    pub trajectory: Vec<f64>,
    /// Mean of the trajectory
    pub point_estimate: f64,
    /// One-step error variance scaled by the number of steps
    pub variance: f64,
    /// Sampling interval inferred from the series
    pub step_secs: f64,
    pub model: ForecastModel,
    pub accuracy: AccuracyMetrics,
}

impl ForecastResult {
    pub fn std_dev(&self) -> f64 {
        self.variance.sqrt()
    }

    pub fn steps(&self) -> usize {
        self.trajectory.len()
    }

    /// `point_estimate ± k·σ`, lower bound floored at zero cores
    pub fn interval(&self, k_sigma: f64) -> (f64, f64) {
        let spread = k_sigma * self.std_dev();
        ((self.point_estimate - spread).max(0.0), self.point_estimate + spread)
    }
}

/// Forecasts container CPU usage from its history
#[derive(Debug, Clone, Default)]
pub struct WorkloadForecaster {
    config: ForecastConfig,
}

impl WorkloadForecaster {
    pub fn new(config: ForecastConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Reject horizons outside `1..=max_horizon_minutes`
    pub fn validate_horizon(&self, horizon_minutes: i64) -> Result<()> {
        if horizon_minutes <= 0 || horizon_minutes > i64::from(self.config.max_horizon_minutes) {
            return Err(EstimatorError::InvalidHorizon {
                horizon_minutes,
                max_minutes: self.config.max_horizon_minutes,
            });
        }
        Ok(())
    }

    /// Forecast CPU usage `horizon_minutes` into the future
    pub fn forecast(&self, series: &HistoricalSeries, horizon_minutes: i64) -> Result<ForecastResult> {
        if series.len() < MIN_FORECAST_POINTS {
            return Err(EstimatorError::InsufficientData {
                required: MIN_FORECAST_POINTS,
                actual: series.len(),
            });
        }
        self.validate_horizon(horizon_minutes)?;

        let series = series.most_recent(self.config.max_history_points.max(MIN_FORECAST_POINTS));
        let values = series.values();
        let step_secs = series.median_step_secs().ok_or_else(|| {
            EstimatorError::InvalidSeries("cannot infer sampling interval".to_string())
        })?;
        let steps = self.steps_for(horizon_minutes, step_secs);

        let fitted = if distinct_count(values) == 1 {
            FittedModel::constant(values[0], values.len())
        } else {
            autoregressive::fit(values, self.config.max_ar_order)
        };

        let trajectory: Vec<f64> = fitted
            .project(values, steps)
            .into_iter()
            .map(|v| v.max(0.0))
            .collect();
        let point_estimate = trajectory.iter().sum::<f64>() / trajectory.len() as f64;
        let variance = fitted.one_step_variance * steps as f64;
        let accuracy = AccuracyMetrics::from_pairs(&fitted.fitted_pairs);

        debug!(
            model = %fitted.model.describe(),
            points = values.len(),
            step_secs,
            steps,
            point_estimate,
            variance,
            "Workload forecast computed"
        );

        Ok(ForecastResult {
            trajectory,
            point_estimate,
            variance,
            step_secs,
            model: fitted.model,
            accuracy,
        })
    }

    /// Number of sampling intervals covering the horizon
    fn steps_for(&self, horizon_minutes: i64, step_secs: f64) -> usize {
        let raw = ((horizon_minutes as f64 * 60.0) / step_secs).ceil();
        let capped = raw.min(self.config.max_forecast_steps.max(1) as f64);
        (capped as usize).max(1)
    }
}
