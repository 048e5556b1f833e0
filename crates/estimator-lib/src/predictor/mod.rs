//! End-to-end energy prediction
//!
//! Validates a request, forecasts the container's CPU usage, and attributes
//! node power to it using whichever power model is active at the time.

mod collaborators;

pub use collaborators::{InMemoryCollaborators, MetricsHistoryProvider, SiblingEnumerator};

use crate::calibration::CalibrationEngine;
use crate::error::{EstimatorError, Result};
use crate::forecast::{ForecastConfig, WorkloadForecaster};
use crate::models::{
    ContainerRef, Cores, Percent, PredictionRequest, PredictionResponse, SiblingContainer,
};
use crate::power::NodeContext;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Default history window pulled from a metrics collaborator
pub const DEFAULT_HISTORY_WINDOW_MINUTES: i64 = 60;

/// Inputs for a prediction whose series and siblings come from collaborators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollaboratorQuery {
    pub target: ContainerRef,
    pub container_cpu_request: Cores,
    pub node_current_util: Percent,
    pub node_idle_util: Percent,
    pub prediction_horizon_minutes: i64,
    #[serde(default = "default_history_window")]
    pub history_window_minutes: i64,
}

fn default_history_window() -> i64 {
    DEFAULT_HISTORY_WINDOW_MINUTES
}

/// Check request fields against their documented ranges
pub fn validate_request(request: &PredictionRequest) -> Result<()> {
    let cpu_request = request.container_cpu_request.0;
    if !cpu_request.is_finite() || cpu_request <= 0.0 {
        return Err(EstimatorError::InvalidRequest(format!(
            "container_cpu_request must be positive, got {}",
            cpu_request
        )));
    }
    if !request.node_current_util.is_valid() {
        return Err(EstimatorError::InvalidRequest(format!(
            "node_current_util must be within [0, 100], got {}",
            request.node_current_util.0
        )));
    }
    if !request.node_idle_util.is_valid() {
        return Err(EstimatorError::InvalidRequest(format!(
            "node_idle_util must be within [0, 100], got {}",
            request.node_idle_util.0
        )));
    }
    if request.node_idle_util.0 > request.node_current_util.0 {
        return Err(EstimatorError::InvalidRequest(format!(
            "node_idle_util ({}) exceeds node_current_util ({})",
            request.node_idle_util.0, request.node_current_util.0
        )));
    }
    for (idx, sibling) in request.containers_on_node.iter().enumerate() {
        validate_sibling(idx, sibling)?;
    }
    Ok(())
}

fn validate_sibling(idx: usize, sibling: &SiblingContainer) -> Result<()> {
    if !sibling.cpu_request.0.is_finite() || sibling.cpu_request.0 < 0.0 {
        return Err(EstimatorError::InvalidRequest(format!(
            "containers_on_node[{}].cpu_request must be non-negative",
            idx
        )));
    }
    if !sibling.cpu_util.is_valid() {
        return Err(EstimatorError::InvalidRequest(format!(
            "containers_on_node[{}].cpu_util must be within [0, 100]",
            idx
        )));
    }
    Ok(())
}

/// Combines the forecaster with the active power model
#[derive(Debug, Clone, Default)]
pub struct EnergyPredictor {
    forecaster: WorkloadForecaster,
    calibration: CalibrationEngine,
}

impl EnergyPredictor {
    pub fn new(config: ForecastConfig, calibration: CalibrationEngine) -> Self {
        Self {
            forecaster: WorkloadForecaster::new(config),
            calibration,
        }
    }

    pub fn forecaster(&self) -> &WorkloadForecaster {
        &self.forecaster
    }

    pub fn calibration(&self) -> &CalibrationEngine {
        &self.calibration
    }

    /// Predict the container's power draw over the requested horizon
    pub fn predict(&self, request: &PredictionRequest) -> Result<PredictionResponse> {
        validate_request(request)?;
        let forecast = self
            .forecaster
            .forecast(&request.series, request.prediction_horizon_minutes)?;

        // One snapshot for point and interval, even if a calibration lands mid-request
        let active = self.calibration.active()?;
        let ctx = NodeContext {
            node_current_util: request.node_current_util,
            node_idle_util: request.node_idle_util,
            siblings: &request.containers_on_node,
            container_cpu_request: request.container_cpu_request,
        };
        let point = Cores(forecast.point_estimate);
        let application = active.model.apply(point, &ctx);
        let interval = active
            .model
            .confidence_interval(point, forecast.std_dev(), &ctx);

        for warning in &application.warnings {
            warn!(
                container = %request.target,
                stage = ?warning.stage,
                raw = warning.raw,
                clamped = warning.clamped,
                "Prediction value clamped to physical bounds"
            );
        }
        debug!(
            container = %request.target,
            model = %forecast.model.describe(),
            cores = forecast.point_estimate,
            node_util = application.projected_util.0,
            share = application.attribution_share,
            watts = application.predicted_power.0,
            provenance = active.provenance.as_str(),
            "Energy prediction computed"
        );

        Ok(PredictionResponse {
            container_name: request.target.container_name.clone(),
            pod_name: request.target.pod_name.clone(),
            namespace: request.target.namespace.clone(),
            predicted_power_watts: application.predicted_power,
            confidence_interval: interval,
            prediction_horizon_minutes: request.prediction_horizon_minutes,
            predicted_cpu_cores: point,
            predicted_node_util_percent: application.projected_util,
            predicted_node_power_watts: application.node_power,
            attribution_share: application.attribution_share,
            model_provenance: active.provenance,
            warnings: application.warnings.iter().map(|w| w.to_string()).collect(),
            prediction_timestamp: Utc::now(),
        })
    }

    /// Fetch history and siblings from collaborators, then predict
    pub async fn predict_with_collaborators(
        &self,
        query: CollaboratorQuery,
        history: &dyn MetricsHistoryProvider,
        siblings: &dyn SiblingEnumerator,
    ) -> Result<PredictionResponse> {
        if query.history_window_minutes <= 0 {
            return Err(EstimatorError::InvalidRequest(format!(
                "history_window_minutes must be positive, got {}",
                query.history_window_minutes
            )));
        }
        let series = history
            .fetch_history(&query.target, Duration::minutes(query.history_window_minutes))
            .await?;
        let containers_on_node = siblings.siblings(&query.target).await?;

        self.predict(&PredictionRequest {
            target: query.target,
            series,
            container_cpu_request: query.container_cpu_request,
            node_current_util: query.node_current_util,
            node_idle_util: query.node_idle_util,
            containers_on_node,
            prediction_horizon_minutes: query.prediction_horizon_minutes,
        })
    }
}
