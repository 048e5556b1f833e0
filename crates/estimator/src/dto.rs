//! Request and response bodies for the HTTP API

use chrono::{DateTime, Utc};
use estimator_lib::calibration::{
    CalibrationReport, ValidationMetrics, ValidationReport, ValidationSample,
};
use estimator_lib::forecast::MIN_FORECAST_POINTS;
use estimator_lib::{
    ActiveModel, ContainerRef, Cores, EstimatorError, HistoricalSeries, ModelProvenance,
    Percent, PowerModel, PredictionRequest, PredictionResponse, Result, SiblingContainer,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_HORIZON_MINUTES: i64 = 30;

pub const MODEL_NOTE: &str = "Using paper defaults from Dell X3430 unless calibrated";

fn default_horizon() -> i64 {
    DEFAULT_HORIZON_MINUTES
}

/// Body of `POST /predict/energy`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnergyPredictionRequest {
    pub container_name: String,
    pub pod_name: String,
    pub namespace: String,
    /// CPU usage samples in cores, oldest first
    pub historical_cpu_cores: Vec<f64>,
    /// Sample times; one-minute spacing ending now when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_timestamps: Option<Vec<DateTime<Utc>>>,
    pub container_cpu_request: f64,
    pub node_current_util: f64,
    pub node_idle_util: f64,
    #[serde(default)]
    pub containers_on_node: Vec<SiblingContainer>,
    #[serde(default = "default_horizon")]
    pub prediction_horizon_minutes: i64,
}

impl EnergyPredictionRequest {
    pub fn into_domain(self) -> Result<PredictionRequest> {
        for (field, value) in [
            ("container_name", &self.container_name),
            ("pod_name", &self.pod_name),
            ("namespace", &self.namespace),
        ] {
            if value.trim().is_empty() {
                return Err(EstimatorError::InvalidRequest(format!(
                    "{} must not be empty",
                    field
                )));
            }
        }
        if self.historical_cpu_cores.len() < MIN_FORECAST_POINTS {
            return Err(EstimatorError::InsufficientData {
                required: MIN_FORECAST_POINTS,
                actual: self.historical_cpu_cores.len(),
            });
        }

        let series = match self.historical_timestamps {
            Some(timestamps) => HistoricalSeries::new(timestamps, self.historical_cpu_cores)?,
            None => HistoricalSeries::from_values_ending_now(self.historical_cpu_cores)?,
        };

        Ok(PredictionRequest {
            target: ContainerRef::new(self.container_name, self.pod_name, self.namespace),
            series,
            container_cpu_request: Cores(self.container_cpu_request),
            node_current_util: Percent(self.node_current_util),
            node_idle_util: Percent(self.node_idle_util),
            containers_on_node: self.containers_on_node,
            prediction_horizon_minutes: self.prediction_horizon_minutes,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionEnvelope {
    pub prediction: PredictionResponse,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ContainerNodePoint {
    pub container_cpu_cores: f64,
    pub node_cpu_util_percent: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NodePowerPoint {
    pub node_cpu_util_percent: f64,
    pub node_power_watts: f64,
}

/// Body of `POST /calibrate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRequest {
    pub container_node_data: Vec<ContainerNodePoint>,
    pub node_power_data: Vec<NodePowerPoint>,
}

impl CalibrationRequest {
    pub fn container_node_pairs(&self) -> Vec<(f64, f64)> {
        self.container_node_data
            .iter()
            .map(|p| (p.container_cpu_cores, p.node_cpu_util_percent))
            .collect()
    }

    pub fn node_power_pairs(&self) -> Vec<(f64, f64)> {
        self.node_power_data
            .iter()
            .map(|p| (p.node_cpu_util_percent, p.node_power_watts))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FitQuality {
    pub container_to_node_r2: f64,
    pub node_util_to_power_r2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResponse {
    pub calibration: PowerModel,
    pub fit_quality: FitQuality,
    pub activated_at: DateTime<Utc>,
    pub status: String,
}

impl From<CalibrationReport> for CalibrationResponse {
    fn from(report: CalibrationReport) -> Self {
        Self {
            calibration: report.model,
            fit_quality: FitQuality {
                container_to_node_r2: report.container_to_node_r2,
                node_util_to_power_r2: report.node_util_to_power_r2,
            },
            activated_at: report.activated_at,
            status: "calibration_successful".to_string(),
        }
    }
}

/// Body of `GET /calibration/config` and `POST /calibration/reset`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfigResponse {
    pub calibration: PowerModel,
    pub model_provenance: ModelProvenance,
    pub activated_at: DateTime<Utc>,
    pub note: String,
}

impl From<&ActiveModel> for ModelConfigResponse {
    fn from(active: &ActiveModel) -> Self {
        Self {
            calibration: active.model,
            model_provenance: active.provenance,
            activated_at: active.activated_at,
            note: MODEL_NOTE.to_string(),
        }
    }
}

/// Body of `POST /calibration/validate`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub measurements: Vec<ValidationSample>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub validation: ValidationMetrics,
    pub model_provenance: ModelProvenance,
}

impl From<ValidationReport> for ValidationResponse {
    fn from(report: ValidationReport) -> Self {
        Self {
            validation: report.validation,
            model_provenance: report.model_provenance,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivenessResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn body() -> serde_json::Value {
        json!({
            "container_name": "api",
            "pod_name": "api-0",
            "namespace": "shop",
            "historical_cpu_cores": [0.8, 0.82, 0.85, 0.83, 0.81, 0.84],
            "container_cpu_request": 1.0,
            "node_current_util": 45.5,
            "node_idle_util": 5.0
        })
    }

    #[test]
    fn test_defaults_applied() {
        let request: EnergyPredictionRequest = serde_json::from_value(body()).unwrap();
        assert_eq!(request.prediction_horizon_minutes, 30);
        assert!(request.containers_on_node.is_empty());

        let domain = request.into_domain().unwrap();
        assert_eq!(domain.series.len(), 6);
        assert_eq!(domain.series.median_step_secs(), Some(60.0));
        assert_eq!(domain.target.to_string(), "shop/api-0/api");
    }

    #[test]
    fn test_short_history_is_insufficient_data() {
        let mut raw = body();
        raw["historical_cpu_cores"] = json!([0.5]);
        let request: EnergyPredictionRequest = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            request.into_domain(),
            Err(EstimatorError::InsufficientData { required: 3, actual: 1 })
        ));
    }

    #[test]
    fn test_explicit_timestamps_must_match() {
        let mut raw = body();
        raw["historical_timestamps"] = json!(["2024-05-01T12:00:00Z", "2024-05-01T12:05:00Z"]);
        let request: EnergyPredictionRequest = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            request.into_domain(),
            Err(EstimatorError::InvalidSeries(_))
        ));
    }

    #[test]
    fn test_blank_identifier_rejected() {
        let mut raw = body();
        raw["namespace"] = json!(" ");
        let request: EnergyPredictionRequest = serde_json::from_value(raw).unwrap();
        assert!(matches!(
            request.into_domain(),
            Err(EstimatorError::InvalidRequest(_))
        ));
    }
}
