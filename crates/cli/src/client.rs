//! API client for the cost estimator service

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use url::Url;

pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;
        Self::decode(response).await
    }

    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;
        Self::decode(response).await
    }

    /// POST without a request body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;
        let response = self
            .client
            .post(url)
            .send()
            .await
            .context("Failed to send request")?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ErrorResponse>(&body) {
                Ok(err) => anyhow::bail!("API error ({}): [{}] {}", status, err.code, err.message),
                Err(_) => anyhow::bail!("API error ({}): {}", status, body),
            }
        }
        response.json().await.context("Failed to parse response")
    }
}

// API request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiblingContainer {
    pub cpu_request: f64,
    pub cpu_util: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub container_name: String,
    pub pod_name: String,
    pub namespace: String,
    pub historical_cpu_cores: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_timestamps: Option<Vec<String>>,
    pub container_cpu_request: f64,
    pub node_current_util: f64,
    pub node_idle_util: f64,
    #[serde(default)]
    pub containers_on_node: Vec<SiblingContainer>,
    #[serde(default = "default_horizon")]
    pub prediction_horizon_minutes: i64,
}

fn default_horizon() -> i64 {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub container_name: String,
    pub pod_name: String,
    pub namespace: String,
    pub predicted_power_watts: f64,
    pub confidence_interval: ConfidenceInterval,
    pub prediction_horizon_minutes: i64,
    pub predicted_cpu_cores: f64,
    pub predicted_node_util_percent: f64,
    pub predicted_node_power_watts: f64,
    pub attribution_share: f64,
    pub model_provenance: String,
    #[serde(default)]
    pub warnings: Vec<String>,
    pub prediction_timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionEnvelope {
    pub prediction: Prediction,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerModelParams {
    pub container_to_node_slope: f64,
    pub container_to_node_intercept: f64,
    pub node_util_to_power_slope: f64,
    pub node_util_to_power_intercept: f64,
    pub node_idle_power_watts: f64,
    pub node_max_power_watts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerNodePoint {
    pub container_cpu_cores: f64,
    pub node_cpu_util_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodePowerPoint {
    pub node_cpu_util_percent: f64,
    pub node_power_watts: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationRequest {
    pub container_node_data: Vec<ContainerNodePoint>,
    pub node_power_data: Vec<NodePowerPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitQuality {
    pub container_to_node_r2: f64,
    pub node_util_to_power_r2: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationResponse {
    pub calibration: PowerModelParams,
    pub fit_quality: FitQuality,
    pub activated_at: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub calibration: PowerModelParams,
    pub model_provenance: String,
    pub activated_at: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMeasurement {
    pub container_cpu_cores: f64,
    pub actual_node_util: f64,
    pub actual_power: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationRequest {
    pub measurements: Vec<ValidationMeasurement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationMetrics {
    pub utilization_mae: f64,
    pub utilization_rmse: f64,
    pub power_mae: f64,
    pub power_rmse: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResponse {
    pub validation: ValidationMetrics,
    pub model_provenance: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_provenance: Option<String>,
    pub components: BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}
